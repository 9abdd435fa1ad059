//! File intake: the uploaded spreadsheet and its synchronous validation
//!
//! Validation runs before any parsing starts. A file that fails here is never
//! handed to the parsing worker.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::IntakeConfig;

pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_XLS: &str = "application/vnd.ms-excel";
pub const MIME_ODS: &str = "application/vnd.oasis.opendocument.spreadsheet";
pub const MIME_CSV: &str = "text/csv";
pub const MIME_UNKNOWN: &str = "application/octet-stream";

/// A spreadsheet file accepted from the user
#[derive(Debug, Clone)]
pub struct IntakeFile {
    /// Original file name (used for logging and format hints)
    pub name: String,
    /// Declared MIME type
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl IntakeFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, deriving the MIME type from the extension when not given
    pub fn from_path<P: AsRef<Path>>(path: P, mime_type: Option<String>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let mime_type = mime_type.unwrap_or_else(|| {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            mime_for_extension(&ext).to_string()
        });

        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the content should be decoded as CSV rather than a workbook
    pub fn is_csv(&self) -> bool {
        let mime = normalize_mime(&self.mime_type);
        mime == MIME_CSV
            || mime == "application/csv"
            || mime == "text/comma-separated-values"
            || self.name.to_lowercase().ends_with(".csv")
    }
}

/// MIME type for a spreadsheet file extension
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "xlsx" | "xlsm" => MIME_XLSX,
        "xls" => MIME_XLS,
        "ods" => MIME_ODS,
        "csv" => MIME_CSV,
        _ => MIME_UNKNOWN,
    }
}

/// Strip parameters (`; charset=...`) and lowercase
fn normalize_mime(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_lowercase()
}

/// Reason a file was refused at intake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileValidationError {
    SizeExceeded { size: u64, limit: u64 },
    UnsupportedType { mime_type: String },
}

impl std::fmt::Display for FileValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileValidationError::SizeExceeded { size, limit } => write!(
                f,
                "file is {} bytes, larger than the {} byte limit",
                size, limit
            ),
            FileValidationError::UnsupportedType { mime_type } => {
                write!(f, "unsupported file type '{}'", mime_type)
            }
        }
    }
}

impl std::error::Error for FileValidationError {}

/// Check a file's size and type against the intake configuration
pub fn validate(file: &IntakeFile, config: &IntakeConfig) -> Result<(), FileValidationError> {
    if file.size() > config.max_file_bytes {
        return Err(FileValidationError::SizeExceeded {
            size: file.size(),
            limit: config.max_file_bytes,
        });
    }

    let mime = normalize_mime(&file.mime_type);
    let accepted = config
        .accepted_mime_types
        .iter()
        .any(|m| normalize_mime(m) == mime);
    if !accepted {
        return Err(FileValidationError::UnsupportedType {
            mime_type: file.mime_type.clone(),
        });
    }

    Ok(())
}
