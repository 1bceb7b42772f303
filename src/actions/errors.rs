//! # Action Errors

use std::io;

use thiserror::Error;

use crate::codec::CodecError;
use crate::store::StoreError;

pub type ActionResult<T> = Result<T, ActionError>;

#[derive(Debug, Error)]
pub enum ActionError {
    /// Action parameters rejected before any token is touched
    #[error("Invalid parameter for action '{action}': {reason}")]
    InvalidParameter { action: &'static str, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Writing to the output channel failed
    #[error("Output error: {0}")]
    Output(#[from] io::Error),
}

impl ActionError {
    pub(crate) fn invalid(action: &'static str, reason: impl Into<String>) -> Self {
        ActionError::InvalidParameter {
            action,
            reason: reason.into(),
        }
    }
}
