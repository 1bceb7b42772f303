//! CLI-specific error types
//!
//! Every CLI error is fatal: it is printed as one line on stderr and the
//! process exits non-zero. Per-token failures never become a `CliError`.

use std::fmt;
use std::io;

use crate::actions::ActionError;
use crate::codec::CodecError;
use crate::criteria::CriteriaError;
use crate::pipeline::PipelineError;
use crate::store::StoreError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file or option error
    ConfigError,
    /// Malformed criterion, unknown field or invalid operand
    InvalidCriterion,
    /// Action parameters rejected
    InvalidAction,
    /// Store could not be opened or scanned
    StoreError,
    /// Import file could not be read or validated
    ImportError,
    /// I/O error on stdout/stderr
    IoError,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "JANITOR_CONFIG_ERROR",
            Self::InvalidCriterion => "JANITOR_INVALID_CRITERION",
            Self::InvalidAction => "JANITOR_INVALID_ACTION",
            Self::StoreError => "JANITOR_STORE_ERROR",
            Self::ImportError => "JANITOR_IMPORT_ERROR",
            Self::IoError => "JANITOR_IO_ERROR",
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn invalid_criterion(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidCriterion, msg)
    }

    pub fn import_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ImportError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<CriteriaError> for CliError {
    fn from(e: CriteriaError) -> Self {
        Self::invalid_criterion(e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::new(CliErrorCode::StoreError, e.to_string())
    }
}

impl From<CodecError> for CliError {
    fn from(e: CodecError) -> Self {
        Self::import_error(e.to_string())
    }
}

impl From<ActionError> for CliError {
    fn from(e: ActionError) -> Self {
        match e {
            ActionError::InvalidParameter { .. } => Self::new(CliErrorCode::InvalidAction, e.to_string()),
            ActionError::Store(e) => e.into(),
            ActionError::Codec(e) => Self::io_error(e.to_string()),
            ActionError::Output(e) => e.into(),
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Action(e) => e.into(),
            PipelineError::Scan(e) => e.into(),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
