//! APIレスポンスパーサー
//!
//! 解析エンドポイント・チャットエンドポイントの応答ボディをパースする。
//! HTTPステータスの判定は呼び出し側で済ませておくこと。

use crate::error::{Error, Result};
use crate::types::{AnalysisResult, ProbeResult};
use serde_json::Value;

/// 判別子として受け付ける `type` の値
pub const ANALYSIS_KINDS: &[&str] = &["document", "object"];

/// 解析レスポンスをパース
///
/// # Arguments
/// * `body` - レスポンスボディ
///
/// # Returns
/// * `Ok(AnalysisResult)` - パース成功
/// * `Err(Error::Json)` - JSONとして不正
/// * `Err(Error::Parse)` - `type` が無い、または未知の値
///
/// # Examples
/// ```
/// use vision_assistant_common::parse_analysis_response;
///
/// let body = r#"{"type": "document", "data": {"text": "hello"}, "chat_context": {}}"#;
/// let result = parse_analysis_response(body).unwrap();
/// assert_eq!(result.kind(), "document");
/// ```
pub fn parse_analysis_response(body: &str) -> Result<AnalysisResult> {
    let value: Value = serde_json::from_str(body.trim())?;

    let kind = value
        .get("type")
        .ok_or_else(|| Error::Parse("typeフィールドがありません".into()))?;
    let kind = kind
        .as_str()
        .ok_or_else(|| Error::Parse(format!("typeが文字列ではありません: {}", kind)))?;
    if !ANALYSIS_KINDS.contains(&kind) {
        return Err(Error::Parse(format!("不明なtype: {}", kind)));
    }

    serde_json::from_value(value)
        .map_err(|e| Error::Parse(format!("解析結果のパースエラー: {}", e)))
}

/// 接続確認（メタデータのみ）レスポンスをパース
pub fn parse_probe_response(body: &str) -> Result<ProbeResult> {
    let value: Value = serde_json::from_str(body.trim())?;
    if !value.is_object() {
        return Err(Error::Parse("応答がJSONオブジェクトではありません".into()));
    }

    serde_json::from_value(value)
        .map_err(|e| Error::Parse(format!("接続確認応答のパースエラー: {}", e)))
}

/// チャットレスポンスから回答を取り出す
///
/// `answer` が無い場合は `reply`（旧チャットAPIの形式）を見る。
/// どちらも無ければ `Ok(None)`。
pub fn parse_chat_response(body: &str) -> Result<Option<String>> {
    let value: Value = serde_json::from_str(body.trim())?;

    let answer = ["answer", "reply"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(answer)
}
