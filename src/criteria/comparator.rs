//! Compiled comparisons
//!
//! A [`Comparator`] is built once per criterion from the user's operand and
//! then evaluated against every stored value. Building is the only step that
//! can fail; evaluation is total and answers `false` for stored values that
//! do not coerce into the comparator's domain.

use chrono::{DateTime, Utc};
use regex::Regex;

use super::ast::{Criterion, Domain, Operator};
use super::datetime::{parse_datetime, parse_stored, NaiveZone};
use super::errors::{CriteriaError, CriteriaResult};
use crate::store::{FieldValue, LAST_AUTH_KEY};

/// One compiled criterion, one variant per valid operator × domain pair
#[derive(Debug, Clone)]
pub enum Comparator {
    /// EQ × STRING: regular expression search on strings, integer
    /// equality on integer and boolean values
    RegexOrEqual {
        pattern: Regex,
        as_integer: Option<i64>,
    },
    /// EQ × INTEGER
    IntegerEq(i64),
    /// GT × INTEGER
    GreaterThan(i64),
    /// LT × INTEGER
    LessThan(i64),
    /// EQ × DATETIME
    SameInstant {
        instant: DateTime<Utc>,
        stored_zone: NaiveZone,
    },
    /// AFTER × DATETIME
    After {
        instant: DateTime<Utc>,
        stored_zone: NaiveZone,
    },
    /// BEFORE × DATETIME
    Before {
        instant: DateTime<Utc>,
        stored_zone: NaiveZone,
    },
}

impl Comparator {
    /// Build the comparator for `criterion`.
    ///
    /// Fails with `InvalidOperand` when the operand does not coerce into the
    /// criterion's domain, and with `Malformed` for operator/domain pairs
    /// that have no meaning (ordering strings, AFTER on integers).
    pub fn make(criterion: &Criterion) -> CriteriaResult<Self> {
        let Criterion {
            field,
            operator,
            operand,
            domain,
        } = criterion;
        let invalid = || CriteriaError::invalid_operand(field, *domain, operand);

        match (operator, domain) {
            (Operator::Eq, Domain::String) => Ok(Comparator::RegexOrEqual {
                pattern: Regex::new(operand).map_err(|_| invalid())?,
                as_integer: scalar_operand(operand),
            }),
            (Operator::Eq | Operator::Gt | Operator::Lt, Domain::Integer) => {
                let value: i64 = operand.trim().parse().map_err(|_| invalid())?;
                Ok(match operator {
                    Operator::Gt => Comparator::GreaterThan(value),
                    Operator::Lt => Comparator::LessThan(value),
                    _ => Comparator::IntegerEq(value),
                })
            }
            (Operator::Eq | Operator::After | Operator::Before, Domain::Datetime) => {
                let instant = parse_datetime(operand, NaiveZone::Local).ok_or_else(invalid)?;
                let stored_zone = stored_zone(field);
                Ok(match operator {
                    Operator::After => Comparator::After {
                        instant,
                        stored_zone,
                    },
                    Operator::Before => Comparator::Before {
                        instant,
                        stored_zone,
                    },
                    _ => Comparator::SameInstant {
                        instant,
                        stored_zone,
                    },
                })
            }
            _ => Err(CriteriaError::malformed(
                criterion.to_string(),
                format!("operator {} does not apply to {} values", operator, domain),
            )),
        }
    }

    /// Evaluate against a stored value. Never fails.
    pub fn evaluate(&self, value: &FieldValue) -> bool {
        match self {
            Comparator::RegexOrEqual {
                pattern,
                as_integer,
            } => match value {
                FieldValue::Str(s) => pattern.is_match(s),
                other => as_integer.is_some() && other.as_integer() == *as_integer,
            },
            Comparator::IntegerEq(v) => value.as_integer() == Some(*v),
            Comparator::GreaterThan(v) => value.as_integer().is_some_and(|x| x > *v),
            Comparator::LessThan(v) => value.as_integer().is_some_and(|x| x < *v),
            Comparator::SameInstant {
                instant,
                stored_zone,
            } => stored_instant(value, *stored_zone).is_some_and(|x| x == *instant),
            Comparator::After {
                instant,
                stored_zone,
            } => stored_instant(value, *stored_zone).is_some_and(|x| x > *instant),
            Comparator::Before {
                instant,
                stored_zone,
            } => stored_instant(value, *stored_zone).is_some_and(|x| x < *instant),
        }
    }

    pub fn operator(&self) -> Operator {
        match self {
            Comparator::RegexOrEqual { .. }
            | Comparator::IntegerEq(_)
            | Comparator::SameInstant { .. } => Operator::Eq,
            Comparator::GreaterThan(_) => Operator::Gt,
            Comparator::LessThan(_) => Operator::Lt,
            Comparator::After { .. } => Operator::After,
            Comparator::Before { .. } => Operator::Before,
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            Comparator::RegexOrEqual { .. } => Domain::String,
            Comparator::IntegerEq(_) | Comparator::GreaterThan(_) | Comparator::LessThan(_) => {
                Domain::Integer
            }
            Comparator::SameInstant { .. } | Comparator::After { .. } | Comparator::Before { .. } => {
                Domain::Datetime
            }
        }
    }
}

/// Operand as compared against integer and boolean values.
///
/// `true`/`false` (any case) stand for 1 and 0.
pub fn scalar_operand(operand: &str) -> Option<i64> {
    let operand = operand.trim();
    if operand.eq_ignore_ascii_case("true") {
        return Some(1);
    }
    if operand.eq_ignore_ascii_case("false") {
        return Some(0);
    }
    operand.parse().ok()
}

/// Legacy `last_auth` values were written in UTC without an offset
fn stored_zone(field: &str) -> NaiveZone {
    if field == LAST_AUTH_KEY {
        NaiveZone::Utc
    } else {
        NaiveZone::Local
    }
}

fn stored_instant(value: &FieldValue, zone: NaiveZone) -> Option<DateTime<Utc>> {
    parse_stored(value.as_str()?, zone)
}
