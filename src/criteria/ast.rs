//! Criterion structures
//!
//! Defines the parsed representation of one user-supplied comparison.

use std::fmt;

/// Comparison kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equality, or regular expression search on string values
    Eq,
    /// Strictly greater than (integers)
    Gt,
    /// Strictly less than (integers)
    Lt,
    /// Strictly later than (date/time)
    After,
    /// Strictly earlier than (date/time)
    Before,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::After => "after",
            Operator::Before => "before",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value domain the operand and the stored value are coerced into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Integer,
    String,
    Datetime,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Integer => "integer",
            Domain::String => "string",
            Domain::Datetime => "datetime",
        }
    }

    /// Whether `>=`/`<=` are meaningful on this domain
    pub fn is_ordered(&self) -> bool {
        !matches!(self, Domain::String)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a criterion's field lives on a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    /// Key in the tokeninfo side table
    Tokeninfo,
    /// Column of the token itself
    Column,
}

impl FieldScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldScope::Tokeninfo => "tokeninfo key",
            FieldScope::Column => "token attribute",
        }
    }
}

/// One field/operator/operand comparison.
///
/// The operand stays textual until compilation coerces it into `domain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub field: String,
    pub operator: Operator,
    pub operand: String,
    pub domain: Domain,
}

impl Criterion {
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        operand: impl Into<String>,
        domain: Domain,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            operand: operand.into(),
            domain,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} '{}' ({})",
            self.field, self.operator, self.operand, self.domain
        )
    }
}
