//! Vision Assistant Common Library
//!
//! CLIと描画層で共有される型とユーティリティ

pub mod types;
pub mod error;
pub mod parser;
pub mod presenter;

pub use types::{
    AnalysisResult, ChatContext, DetectedObject, DocumentData, KeyValuePair, ObjectData,
    ProbeResult, TableInfo,
};
pub use error::{Error, Result};
pub use parser::{parse_analysis_response, parse_chat_response, parse_probe_response};
pub use presenter::{
    describe, describe_probe, format_confidence, initial_prompt, summarize, RenderBody,
    RenderDescription,
};
