//! 解析結果の表示内容を組み立てる
//!
//! UIツールキットには依存しない。`RenderDescription` は描画層（CLIなど）が
//! そのまま表示できる形に整えたデータで、`Display` でプレーンテキストにもなる。

use crate::types::{AnalysisResult, DocumentData, ObjectData, ProbeResult};
use std::fmt;

/// 文書テキストの要約に使う最大文字数
pub const SUMMARY_MAX_CHARS: usize = 200;

pub const NO_OBJECTS_PLACEHOLDER: &str = "特定の物体は検出されませんでした";
pub const NO_DESCRIPTION_PLACEHOLDER: &str = "説明はありません";
pub const DOCUMENT_PROMPT: &str = "文書を検出しました。どのようなことをお手伝いしましょうか？";
/// 物体数が分からないときに個数の代わりに使う語
pub const UNKNOWN_COUNT_WORD: &str = "いくつか";

/// 描画用の説明
#[derive(Debug, Clone, PartialEq)]
pub struct RenderDescription {
    pub heading: String,
    pub body: RenderBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderBody {
    Document {
        summary: String,
        table_count: usize,
        key_values: Vec<(String, String)>,
    },
    Object {
        /// "label (95%)" 形式。検出なしの場合はプレースホルダ1行
        objects: Vec<String>,
        description: String,
        tags: Vec<String>,
        categories: Vec<String>,
    },
    Probe {
        message: String,
        services: Vec<(String, bool)>,
        services_ready: u32,
        expected_services: u32,
        timestamp: String,
    },
}

/// 解析結果から表示内容を作る（純粋関数）
pub fn describe(result: &AnalysisResult) -> RenderDescription {
    match result {
        AnalysisResult::Document { data, .. } => describe_document(data),
        AnalysisResult::Object { data, .. } => describe_object(data),
    }
}

fn describe_document(data: &DocumentData) -> RenderDescription {
    RenderDescription {
        heading: "📄 文書を検出しました".to_string(),
        body: RenderBody::Document {
            summary: summarize(&data.extracted_text, SUMMARY_MAX_CHARS),
            table_count: data.tables.len(),
            key_values: data
                .key_value_pairs
                .iter()
                .map(|kv| (kv.key.clone(), kv.value.clone()))
                .collect(),
        },
    }
}

fn describe_object(data: &ObjectData) -> RenderDescription {
    let objects = if data.detected_objects.is_empty() {
        vec![NO_OBJECTS_PLACEHOLDER.to_string()]
    } else {
        data.detected_objects
            .iter()
            .map(|obj| format!("{} ({})", obj.label, format_confidence(obj.confidence)))
            .collect()
    };

    let description = data
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(NO_DESCRIPTION_PLACEHOLDER)
        .to_string();

    RenderDescription {
        heading: "🎯 検出された物体".to_string(),
        body: RenderBody::Object {
            objects,
            description,
            tags: data.tags.iter().cloned().collect(),
            categories: data.categories.iter().cloned().collect(),
        },
    }
}

/// 接続確認の結果を表示内容にする
pub fn describe_probe(probe: &ProbeResult) -> RenderDescription {
    RenderDescription {
        heading: "🔧 サービス設定".to_string(),
        body: RenderBody::Probe {
            message: probe.message.clone(),
            services: probe
                .config_status
                .iter()
                .map(|(name, configured)| (name.replace('_', " "), *configured))
                .collect(),
            services_ready: probe.services_ready,
            expected_services: ProbeResult::EXPECTED_SERVICES,
            timestamp: probe.timestamp.clone(),
        },
    }
}

/// チャット開始時のシステムメッセージ
pub fn initial_prompt(result: &AnalysisResult) -> String {
    match result {
        AnalysisResult::Document { .. } => DOCUMENT_PROMPT.to_string(),
        AnalysisResult::Object { data, .. } => {
            let count = match data.detected_objects.len() {
                0 => UNKNOWN_COUNT_WORD.to_string(),
                n => format!("{}個", n),
            };
            format!("{}の物体が見えます。何について知りたいですか？", count)
        }
    }
}

/// 信頼度をパーセント表記にする（0〜100に丸め）
///
/// ```
/// use vision_assistant_common::format_confidence;
///
/// assert_eq!(format_confidence(0.953), "95%");
/// assert_eq!(format_confidence(0.0), "0%");
/// ```
pub fn format_confidence(confidence: f64) -> String {
    let pct = if confidence.is_nan() {
        0.0
    } else {
        (confidence * 100.0).round().clamp(0.0, 100.0)
    };
    format!("{}%", pct as u32)
}

/// 先頭 `max_chars` 文字に切り詰める（切り詰めた場合のみ "..." を付ける）
pub fn summarize(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

impl fmt::Display for RenderDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.heading)?;
        match &self.body {
            RenderBody::Document { summary, table_count, key_values } => {
                writeln!(f, "抽出テキスト: {}", summary)?;
                writeln!(f, "{}個の表を検出", table_count)?;
                for (key, value) in key_values {
                    writeln!(f, "  {}: {}", key, value)?;
                }
            }
            RenderBody::Object { objects, description, tags, categories } => {
                for obj in objects {
                    writeln!(f, "  - {}", obj)?;
                }
                writeln!(f, "説明: {}", description)?;
                if !tags.is_empty() {
                    writeln!(f, "タグ: {}", tags.join(", "))?;
                }
                if !categories.is_empty() {
                    writeln!(f, "カテゴリ: {}", categories.join(", "))?;
                }
            }
            RenderBody::Probe { message, services, services_ready, expected_services, timestamp } => {
                writeln!(f, "{}", message)?;
                for (name, configured) in services {
                    let mark = if *configured { "✅ 設定済み" } else { "❌ 未設定" };
                    writeln!(f, "  {}: {}", name, mark)?;
                }
                writeln!(f, "準備済みサービス: {}/{}", services_ready, expected_services)?;
                if !timestamp.is_empty() {
                    writeln!(f, "タイムスタンプ: {}", timestamp)?;
                }
            }
        }
        Ok(())
    }
}
