//! reqwest を使ったエンドポイント呼び出し
//!
//! 解析とチャットは同じURLへ POST し、`action` フィールドで区別する。

use super::{AnalysisClient, AnalyzePayload, ChatClient, RequestBody};
use crate::config::Config;
use crate::error::{AnalysisError, Result, VisionError};
use crate::intake::FileMetadata;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use vision_assistant_common::{
    parse_analysis_response, parse_chat_response, parse_probe_response, AnalysisResult,
    ChatContext, ProbeResult,
};

pub struct HttpVisionClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpVisionClient {
    pub fn new(config: &Config) -> Result<Self> {
        Config::check_endpoint(&config.endpoint_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .map_err(|e| VisionError::Config(format!("HTTPクライアント初期化エラー: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint_url.clone(),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// POSTしてボディ文字列を返す（通信エラーのみ再試行）
    async fn post(&self, body: &RequestBody<'_>) -> std::result::Result<String, AnalysisError> {
        let mut attempt = 0;
        loop {
            match self.post_once(body).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, max = self.max_retries, error = %e, "再試行します");
                    tokio::time::sleep(backoff(self.retry_delay, attempt)).await;
                }
                other => return other,
            }
        }
    }

    async fn post_once(&self, body: &RequestBody<'_>) -> std::result::Result<String, AnalysisError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(format!("レスポンス読み込みエラー: {}", e)))?;

        debug!(status = status.as_u16(), bytes = text.len(), "レスポンス受信");

        if !status.is_success() {
            return Err(AnalysisError::Service {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

/// attempt 回目の待ち時間（retry_delay × attempt、溢れたら上限で止める）
fn backoff(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(attempt).unwrap_or(Duration::MAX)
}

#[async_trait]
impl AnalysisClient for HttpVisionClient {
    async fn analyze(&self, image_base64: &str) -> std::result::Result<AnalysisResult, AnalysisError> {
        debug!(endpoint = %self.endpoint, image_len = image_base64.len(), "解析リクエスト送信");
        let body = RequestBody::Analyze(AnalyzePayload::Image { image: image_base64 });
        let text = self.post(&body).await?;
        Ok(parse_analysis_response(&text)?)
    }

    async fn probe(&self, metadata: &FileMetadata) -> std::result::Result<ProbeResult, AnalysisError> {
        debug!(endpoint = %self.endpoint, file = %metadata.filename, "接続確認リクエスト送信");
        let body = RequestBody::Analyze(AnalyzePayload::Probe {
            metadata,
            test_mode: true,
        });
        let text = self.post(&body).await?;
        Ok(parse_probe_response(&text)?)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatClient for HttpVisionClient {
    async fn chat(
        &self,
        question: &str,
        context: &ChatContext,
    ) -> std::result::Result<Option<String>, AnalysisError> {
        debug!(endpoint = %self.endpoint, question_len = question.chars().count(), "チャットリクエスト送信");
        let body = RequestBody::Chat {
            question,
            image_context: context,
        };
        let text = self.post(&body).await?;
        Ok(parse_chat_response(&text)?)
    }
}
