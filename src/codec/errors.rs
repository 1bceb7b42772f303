//! # Codec Errors

use thiserror::Error;

/// Result type for export/import encoding
pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    /// The token type has no representation in the target format
    #[error("Token type '{tokentype}' of {serial} is not supported by {format}")]
    UnsupportedType {
        serial: String,
        tokentype: String,
        format: &'static str,
    },

    #[error("Token {0} has an invalid seed")]
    InvalidSeed(String),

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Encryption failed: {0}")]
    Crypto(String),

    #[error("MAC check failed for token {0}")]
    MacMismatch(String),

    #[error("Malformed key container: {0}")]
    Malformed(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CodecError {
    /// Whether the error only means "skip this token" during export
    pub fn is_skip(&self) -> bool {
        matches!(self, CodecError::UnsupportedType { .. })
    }
}
