//! Static field → domain tables
//!
//! The domain of a filter expression comes from here, never from the
//! operand the user typed.

use super::ast::{Domain, FieldScope};
use super::errors::{CriteriaError, CriteriaResult};

/// Token columns that can be filtered on
pub const TOKEN_COLUMNS: &[(&str, Domain)] = &[
    ("serial", Domain::String),
    ("tokentype", Domain::String),
    ("description", Domain::String),
    ("active", Domain::String),
    ("revoked", Domain::String),
    ("locked", Domain::String),
    ("otplen", Domain::Integer),
    ("count", Domain::Integer),
    ("maxfail", Domain::Integer),
    ("failcount", Domain::Integer),
    ("rollout_state", Domain::String),
    ("user_id", Domain::String),
    ("resolver", Domain::String),
];

/// Columns holding a flag. Equality operands must be `true`, `false` or an
/// integer.
pub const BOOLEAN_COLUMNS: &[&str] = &["active", "revoked", "locked"];

/// Tokeninfo keys with a declared domain
pub const TOKENINFO_KEYS: &[(&str, Domain)] = &[
    ("last_auth", Domain::Datetime),
    ("count_auth", Domain::Integer),
    ("count_auth_max", Domain::Integer),
    ("count_auth_success", Domain::Integer),
    ("count_auth_success_max", Domain::Integer),
    ("validity_period_start", Domain::Datetime),
    ("validity_period_end", Domain::Datetime),
    ("next_pin_change", Domain::Datetime),
    ("timeStep", Domain::Integer),
    ("timeWindow", Domain::Integer),
    ("timeShift", Domain::Integer),
    ("hashlib", Domain::String),
    ("tokenkind", Domain::String),
    ("import_file", Domain::String),
];

fn table(scope: FieldScope) -> &'static [(&'static str, Domain)] {
    match scope {
        FieldScope::Tokeninfo => TOKENINFO_KEYS,
        FieldScope::Column => TOKEN_COLUMNS,
    }
}

/// Domain of a declared field, or `UnknownField`
pub fn domain_of(scope: FieldScope, field: &str) -> CriteriaResult<Domain> {
    table(scope)
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, domain)| *domain)
        .ok_or_else(|| CriteriaError::UnknownField {
            scope: scope.as_str(),
            field: field.to_string(),
            allowed: allowed(scope),
        })
}

/// Comma separated list of the declared names
pub fn allowed(scope: FieldScope) -> String {
    table(scope)
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}
