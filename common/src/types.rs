//! 解析結果の型定義
//!
//! CLIとバックエンド間で共有される型:
//! - AnalysisResult: 解析エンドポイントの応答（document / object）
//! - ProbeResult: メタデータのみの接続確認応答
//! - ChatContext: チャットエンドポイントへそのまま転送する不透明データ

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 解析エンドポイントが返したチャット用コンテキスト
///
/// クライアント側では中身を解釈・生成しない。受け取った値をそのまま
/// `image_context` としてチャットエンドポイントへ送り返す。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatContext(serde_json::Value);

impl ChatContext {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// `image_type` フィールド（あれば）
    pub fn image_type(&self) -> Option<&str> {
        self.0.get("image_type").and_then(|v| v.as_str())
    }
}

/// AI解析結果
///
/// `type` フィールドで判別するタグ付きユニオン。
/// ワイヤ形式は `{"type": "...", "data": {...}, "chat_context": {...}}`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnalysisResult {
    Document {
        data: DocumentData,
        #[serde(default)]
        chat_context: ChatContext,
    },
    Object {
        data: ObjectData,
        #[serde(default)]
        chat_context: ChatContext,
    },
}

impl AnalysisResult {
    pub fn chat_context(&self) -> &ChatContext {
        match self {
            AnalysisResult::Document { chat_context, .. } => chat_context,
            AnalysisResult::Object { chat_context, .. } => chat_context,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisResult::Document { .. } => "document",
            AnalysisResult::Object { .. } => "object",
        }
    }
}

/// 文書として解析された場合のデータ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentData {
    #[serde(rename = "text", deserialize_with = "null_as_default")]
    pub extracted_text: String,

    pub tables: Vec<TableInfo>,

    pub key_value_pairs: Vec<KeyValuePair>,
}

/// 表の大きさ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableInfo {
    #[serde(alias = "row_count")]
    pub rows: u32,
    #[serde(alias = "column_count")]
    pub columns: u32,
}

/// キーと値のペア
///
/// モック応答では文字列、Form Recognizer の `to_dict()` では
/// `{"content": "..."}` 形式のオブジェクトが来るため両方受け付ける。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValuePair {
    #[serde(deserialize_with = "text_or_content")]
    pub key: String,
    #[serde(deserialize_with = "text_or_content")]
    pub value: String,
}

/// 物体として解析された場合のデータ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectData {
    #[serde(rename = "objects_detected", deserialize_with = "null_as_default")]
    pub detected_objects: Vec<DetectedObject>,

    pub description: Option<String>,

    #[serde(deserialize_with = "null_as_default")]
    pub tags: BTreeSet<String>,

    #[serde(deserialize_with = "null_as_default")]
    pub categories: BTreeSet<String>,
}

/// 検出された物体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    #[serde(rename = "object")]
    pub label: String,

    /// 信頼度 (0.0〜1.0)
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,

    /// [x, y, w, h]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<[f64; 4]>,
}

/// メタデータのみ送信した場合の応答（接続確認用）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeResult {
    pub message: String,

    /// サービス名 → 設定済みかどうか
    pub config_status: BTreeMap<String, bool>,

    #[serde(rename = "azure_services_ready")]
    pub services_ready: u32,

    pub timestamp: String,
}

impl ProbeResult {
    /// 確認対象のサービス数
    pub const EXPECTED_SERVICES: u32 = 4;
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn text_or_content<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Object(map) => map
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
