use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 解析エンドポイントURLを上書きする環境変数
pub const ENDPOINT_ENV: &str = "VISION_ASSISTANT_ENDPOINT";

/// 使用するクライアント実装
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    #[default]
    Http,
    Mock,
}

/// モック応答の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MockKind {
    Document,
    Object,
    /// document / object を交互に返す
    #[default]
    Alternate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 解析・チャット共通のエンドポイントURL
    pub endpoint_url: String,
    pub client: ClientMode,
    pub mock_kind: MockKind,
    pub mock_latency_ms: u64,
    pub timeout_seconds: u64,
    /// 通信エラー時の再試行回数（0で再試行なし）
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: "http://localhost:7071/api/analyze_image".into(),
            client: ClientMode::Http,
            mock_kind: MockKind::Alternate,
            mock_latency_ms: 1000,
            timeout_seconds: 60,
            max_retries: 0,
            retry_delay_ms: 500,
        }
    }
}

impl Config {
    /// 設定ファイルを読み込み、環境変数で上書きする
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        // 環境変数を優先
        if let Ok(url) = std::env::var(ENDPOINT_ENV) {
            if !url.trim().is_empty() {
                config.endpoint_url = url.trim().to_string();
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| VisionError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("vision-assistant").join("config.json"))
    }

    pub fn set_endpoint(&mut self, url: String) -> Result<()> {
        Self::check_endpoint(&url)?;
        self.endpoint_url = url;
        self.save()
    }

    pub fn set_client(&mut self, client: ClientMode) -> Result<()> {
        self.client = client;
        self.save()
    }

    /// エンドポイントURLの形式チェック
    pub fn check_endpoint(url: &str) -> Result<()> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| VisionError::Config(format!("不正なURL '{}': {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(VisionError::Config(format!(
                "http/https 以外のスキームは使えません: {}",
                other
            ))),
        }
    }
}
