//! 解析・チャットエンドポイントのクライアント
//!
//! - `HttpVisionClient`: 実エンドポイントへ JSON を POST する
//! - `MockVisionClient`: 設定で選ぶ固定応答（開発・デモ用）

mod http;
mod mock;

pub use http::HttpVisionClient;
pub use mock::MockVisionClient;

use crate::config::{ClientMode, Config};
use crate::error::{AnalysisError, Result};
use crate::intake::FileMetadata;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use vision_assistant_common::{AnalysisResult, ChatContext, ProbeResult};

/// 画像解析エンドポイント
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// base64画像を送信して解析結果を得る
    async fn analyze(&self, image_base64: &str) -> std::result::Result<AnalysisResult, AnalysisError>;

    /// メタデータのみ送信して接続状況を確認する
    async fn probe(&self, metadata: &FileMetadata) -> std::result::Result<ProbeResult, AnalysisError>;

    /// エラー表示用のURL
    fn endpoint(&self) -> &str;
}

/// チャットエンドポイント
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// 回答が含まれない応答の場合は `Ok(None)`
    async fn chat(
        &self,
        question: &str,
        context: &ChatContext,
    ) -> std::result::Result<Option<String>, AnalysisError>;
}

/// 解析リクエスト本体
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub(crate) enum RequestBody<'a> {
    Analyze(AnalyzePayload<'a>),
    Chat {
        question: &'a str,
        image_context: &'a ChatContext,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum AnalyzePayload<'a> {
    Image {
        image: &'a str,
    },
    Probe {
        #[serde(flatten)]
        metadata: &'a FileMetadata,
        test_mode: bool,
    },
}

/// 解析用・チャット用のクライアント一式
#[derive(Clone)]
pub struct Clients {
    pub analysis: Arc<dyn AnalysisClient>,
    pub chat: Arc<dyn ChatClient>,
}

impl Clients {
    /// 1つの実装で両方を賄う
    pub fn shared<T>(client: Arc<T>) -> Self
    where
        T: AnalysisClient + ChatClient + 'static,
    {
        Self {
            analysis: client.clone(),
            chat: client,
        }
    }
}

/// 設定に応じてクライアントを作る
pub fn build_clients(config: &Config) -> Result<Clients> {
    match config.client {
        ClientMode::Http => Ok(Clients::shared(Arc::new(HttpVisionClient::new(config)?))),
        ClientMode::Mock => Ok(Clients::shared(Arc::new(MockVisionClient::from_config(config)))),
    }
}
