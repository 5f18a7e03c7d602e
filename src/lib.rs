//! 画像AI解析・チャットアシスタント
//!
//! 画像を検証して解析エンドポイントへ送り、返ってきた結果をもとに
//! チャットで質問を続けるクライアント側のワークフロー。

pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod intake;
pub mod interactive;
pub mod workflow;

pub use chat::{ChatMessage, ChatSession, Sender};
pub use client::{build_clients, AnalysisClient, ChatClient, Clients, HttpVisionClient, MockVisionClient};
pub use config::Config;
pub use error::{AnalysisError, Result, ValidationError, VisionError, WorkflowError};
pub use intake::SelectedFile;
pub use workflow::{AnalysisUpdate, WorkflowController, WorkflowState};
