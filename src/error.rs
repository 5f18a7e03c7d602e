use crate::workflow::WorkflowState;
use thiserror::Error;

/// 画像ファイルの受付エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ファイルが大きすぎます（{size} bytes、最大 {limit} bytes）")]
    TooLarge { size: u64, limit: u64 },

    #[error("対応していない形式です: {0}（JPEG / PNG / GIF を使用してください）")]
    UnsupportedType(String),
}

/// 解析・チャット呼び出しのエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("通信エラー: {0}")]
    Transport(String),

    #[error("サービスエラー (HTTP {status}): {body}")]
    Service { status: u16, body: String },

    #[error("レスポンスの解析に失敗: {0}")]
    Decode(String),

    #[error("質問が空です")]
    EmptyQuestion,
}

impl AnalysisError {
    /// 再試行してよいエラーか（通信エラーのみ）
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::Transport(_))
    }
}

impl From<vision_assistant_common::Error> for AnalysisError {
    fn from(err: vision_assistant_common::Error) -> Self {
        AnalysisError::Decode(err.to_string())
    }
}

/// ワークフロー操作のエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("画像が選択されていません")]
    NoFileSelected,

    #[error("解析中です。完了までお待ちください")]
    AnalysisInProgress,

    #[error("解析結果がありません（現在の状態: {0:?}）")]
    NoAnalysis(WorkflowState),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Common(#[from] vision_assistant_common::Error),

    #[error("入力エラー: {0}")]
    Prompt(String),
}

pub type Result<T> = std::result::Result<T, VisionError>;
