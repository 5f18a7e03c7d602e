//! 画像ファイルの受付
//!
//! サイズとMIMEタイプを検証し、送信用のbase64文字列に変換する。

use crate::error::{Result, ValidationError, VisionError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// 受け付ける最大サイズ (4 MiB)
pub const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/jpg", "image/gif"];

/// 拡張子 → MIMEタイプ
const EXTENSION_MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
];

const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// 検証済みの画像ファイル
#[derive(Debug, Clone)]
pub struct SelectedFile {
    name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

/// 接続確認で送るメタデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub filename: String,
    pub filesize: u64,
    pub filetype: String,
    pub timestamp: String,
}

impl SelectedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// base64エンコード（呼ぶたびに変換する）
    pub fn encode(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn metadata(&self, timestamp: String) -> FileMetadata {
        FileMetadata {
            filename: self.name.clone(),
            filesize: self.size_bytes(),
            filetype: self.mime_type.clone(),
            timestamp,
        }
    }

    /// "12.34 KB" 形式
    pub fn size_label(&self) -> String {
        format!("{:.2} KB", self.size_bytes() as f64 / 1024.0)
    }
}

/// ファイルを検証して `SelectedFile` を作る
///
/// サイズを先に確認し、次にMIMEタイプを確認する。
pub fn validate(
    name: impl Into<String>,
    mime_type: &str,
    bytes: impl Into<Arc<[u8]>>,
) -> std::result::Result<SelectedFile, ValidationError> {
    let bytes = bytes.into();
    check_size(bytes.len() as u64)?;
    let mime_type = check_mime_type(mime_type)?;

    Ok(SelectedFile {
        name: name.into(),
        mime_type,
        bytes,
    })
}

fn check_size(size: u64) -> std::result::Result<(), ValidationError> {
    if size > MAX_FILE_SIZE {
        return Err(ValidationError::TooLarge {
            size,
            limit: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

fn check_mime_type(mime_type: &str) -> std::result::Result<String, ValidationError> {
    let normalized = mime_type.trim().to_ascii_lowercase();
    if ACCEPTED_MIME_TYPES.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(ValidationError::UnsupportedType(mime_type.to_string()))
    }
}

/// 拡張子からMIMEタイプを推定
pub fn mime_type_from_path(path: &Path) -> &'static str {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .and_then(|ext| {
            EXTENSION_MIME_TYPES
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, mime)| *mime)
        })
        .unwrap_or(UNKNOWN_MIME_TYPE)
}

/// パスから画像を読み込んで検証
///
/// 読み込む前にメタデータでサイズを確認する。
pub fn load(path: &Path) -> Result<SelectedFile> {
    if !path.is_file() {
        return Err(VisionError::FileNotFound(path.display().to_string()));
    }

    check_size(std::fs::metadata(path)?.len())?;

    // 拡張子から形式が分からない場合は読み込まずに拡張子を示して断る
    let mime_type = mime_type_from_path(path);
    if mime_type == UNKNOWN_MIME_TYPE {
        return Err(ValidationError::UnsupportedType(extension_label(path)).into());
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let bytes = std::fs::read(path)?;

    Ok(validate(name, mime_type, bytes)?)
}

fn extension_label(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => "拡張子なし".to_string(),
    }
}
