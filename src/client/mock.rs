//! 固定応答を返すモッククライアント
//!
//! 実エンドポイントが使えない環境での動作確認用。
//! どの応答を返すかは設定（`mock_kind`）で決める。

use super::{AnalysisClient, ChatClient};
use crate::config::{Config, MockKind};
use crate::error::AnalysisError;
use crate::intake::FileMetadata;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;
use vision_assistant_common::{
    AnalysisResult, ChatContext, DetectedObject, DocumentData, KeyValuePair, ObjectData,
    ProbeResult, TableInfo,
};

const MOCK_ENDPOINT: &str = "mock://vision-assistant";

pub struct MockVisionClient {
    kind: MockKind,
    latency: Duration,
    calls: AtomicUsize,
}

impl MockVisionClient {
    pub fn new(kind: MockKind, latency: Duration) -> Self {
        Self {
            kind,
            latency,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.mock_kind, Duration::from_millis(config.mock_latency_ms))
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn next_is_document(&self) -> bool {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.kind {
            MockKind::Document => true,
            MockKind::Object => false,
            MockKind::Alternate => n % 2 == 0,
        }
    }
}

fn sample_document() -> AnalysisResult {
    let text = "これはForm Recognizerで実際の文書から抽出したテキストの例です。\
                AIで分析できる重要な情報が含まれています。";
    AnalysisResult::Document {
        data: DocumentData {
            extracted_text: text.to_string(),
            tables: vec![TableInfo { rows: 3, columns: 2 }],
            key_value_pairs: vec![KeyValuePair {
                key: "日付".into(),
                value: "2024-01-15".into(),
            }],
        },
        chat_context: ChatContext::new(json!({
            "image_type": "document",
            "extracted_text": text,
        })),
    }
}

fn sample_objects() -> AnalysisResult {
    let objects = [("car", 0.95), ("person", 0.87), ("building", 0.78)]
        .into_iter()
        .map(|(label, confidence)| DetectedObject {
            label: label.to_string(),
            confidence,
            bounding_box: None,
        })
        .collect();

    AnalysisResult::Object {
        data: ObjectData {
            detected_objects: objects,
            description: Some("近代的な建物の前で車のそばに立つ人".into()),
            tags: ["vehicle", "person", "architecture", "outdoor"]
                .into_iter()
                .map(String::from)
                .collect(),
            categories: ["transport", "people", "urban"]
                .into_iter()
                .map(String::from)
                .collect(),
        },
        chat_context: ChatContext::new(json!({
            "image_type": "object",
            "description": "建物の前で車のそばに立つ人",
        })),
    }
}

#[async_trait]
impl AnalysisClient for MockVisionClient {
    async fn analyze(&self, image_base64: &str) -> Result<AnalysisResult, AnalysisError> {
        debug!(image_len = image_base64.len(), "モック解析");
        self.simulate_latency().await;
        Ok(if self.next_is_document() {
            sample_document()
        } else {
            sample_objects()
        })
    }

    async fn probe(&self, metadata: &FileMetadata) -> Result<ProbeResult, AnalysisError> {
        debug!(file = %metadata.filename, "モック接続確認");
        self.simulate_latency().await;
        let config_status: BTreeMap<String, bool> = ["vision", "form_recognizer", "openai", "search"]
            .into_iter()
            .map(|name| (name.to_string(), true))
            .collect();
        Ok(ProbeResult {
            message: "モックバックエンドは正常です".into(),
            services_ready: config_status.len() as u32,
            config_status,
            timestamp: metadata.timestamp.clone(),
        })
    }

    fn endpoint(&self) -> &str {
        MOCK_ENDPOINT
    }
}

#[async_trait]
impl ChatClient for MockVisionClient {
    async fn chat(&self, question: &str, context: &ChatContext) -> Result<Option<String>, AnalysisError> {
        self.simulate_latency().await;
        let subject = match context.image_type() {
            Some("document") => "文書",
            Some("object") => "画像",
            _ => "解析結果",
        };
        Ok(Some(format!("（モック応答）{}について「{}」への回答です。", subject, question)))
    }
}
