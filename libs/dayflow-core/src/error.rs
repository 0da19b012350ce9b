//! Error types for dayflow-core.

use thiserror::Error;

/// Result type alias using ParseError.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors raised while interpreting user input or model output.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid time of day: {value}")]
    InvalidTime { value: String },

    #[error("unknown source kind: {value}")]
    UnknownSource { value: String },

    #[error("unknown diary style: {value}")]
    UnknownStyle { value: String },

    #[error("invalid JSON in model response: {0}")]
    InvalidJson(String),

    #[error("expected {expected} items in model response, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("empty model response")]
    EmptyResponse,
}
