//! # Criteria Errors
//!
//! Every variant is a user input error, raised while compiling criteria and
//! before any token is read.

use thiserror::Error;

use super::ast::Domain;

/// Result type for criteria compilation
pub type CriteriaResult<T> = Result<T, CriteriaError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error("Malformed criterion '{expression}': {reason}")]
    Malformed { expression: String, reason: String },

    #[error("Unknown {scope} '{field}'. Allowed are: {allowed}")]
    UnknownField {
        scope: &'static str,
        field: String,
        allowed: String,
    },

    #[error("Not a valid {domain} for '{field}': {operand}")]
    InvalidOperand {
        field: String,
        domain: Domain,
        operand: String,
    },
}

impl CriteriaError {
    pub fn malformed(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_operand(field: impl Into<String>, domain: Domain, operand: impl Into<String>) -> Self {
        Self::InvalidOperand {
            field: field.into(),
            domain,
            operand: operand.into(),
        }
    }
}
