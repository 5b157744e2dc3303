//! Error types for devtools-source-map

use thiserror::Error;

/// A present but unreadable embedded source map.
///
/// A missing map is not an error; decoding reports it as `None`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Embedded source map is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Embedded source map is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Embedded source map is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid percent escape in embedded source map at byte {offset}")]
    PercentEscape { offset: usize },

    #[error("Unsupported source map version {0} (expected 3)")]
    UnsupportedVersion(u32),

    #[error("Invalid base64 VLQ digit {digit:?} in mappings at byte {offset}")]
    InvalidVlqDigit { digit: char, offset: usize },

    #[error("Unterminated VLQ value in mappings at byte {offset}")]
    UnterminatedVlq { offset: usize },

    #[error("VLQ value overflows at byte {offset}")]
    VlqOverflow { offset: usize },

    #[error("Mapping segment on line {line} has {fields} fields (expected 1, 4 or 5)")]
    InvalidSegment { line: usize, fields: usize },

    #[error("Mapping on line {line} references source {index} but only {len} sources exist")]
    SourceOutOfRange { line: usize, index: i64, len: usize },

    #[error("Mapping on line {line} references name {index} but only {len} names exist")]
    NameOutOfRange { line: usize, index: i64, len: usize },

    #[error("Mapping on line {line} has a negative {field}")]
    NegativePosition { line: usize, field: &'static str },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
