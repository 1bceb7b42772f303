//! # Store Errors

use std::io;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a token store or identity backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Token not found: {0}")]
    TokenNotFound(String),

    #[error("Token already exists: {0}")]
    TokenExists(String),

    #[error("Realm does not exist: {0}")]
    UnknownRealm(String),

    #[error("Store document is invalid: {0}")]
    Corrupt(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_is_corrupt() {
        let err: StoreError = serde_json::from_str::<u8>("x").unwrap_err().into();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_display_names_serial() {
        let err = StoreError::TokenNotFound("HOTP0001".into());
        assert_eq!(err.to_string(), "Token not found: HOTP0001");
    }
}
