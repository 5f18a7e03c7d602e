//! 応答ボディのパースエラー

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// ボディがJSONとして読めない
    #[error("JSONとして不正な応答: {0}")]
    Json(#[from] serde_json::Error),

    /// JSONだが期待した形ではない（type欠落・未知のtypeなど）
    #[error("応答の形式が不正: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
