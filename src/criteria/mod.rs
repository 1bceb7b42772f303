//! Criteria subsystem
//!
//! Compiles user-supplied comparisons into predicates over typed field
//! values before any token is read.
//!
//! # Value Domains
//!
//! - INTEGER: loose integer conversion, `==`, `>=` (strictly greater), `<=`
//!   (strictly less)
//! - STRING: regular expression search; integer equality on scalar values
//! - DATETIME: calendar date/time, `>=` (after), `<=` (before)
//!
//! Operand errors are fatal and surface at compile time. Stored values that
//! do not coerce simply do not match.

mod ast;
mod comparator;
mod compiler;
mod datetime;
mod errors;
mod fields;

pub use ast::{Criterion, Domain, FieldScope, Operator};
pub use comparator::Comparator;
pub use compiler::{CriterionCompiler, FieldFilter, FilterSet, ValueOptions};
pub use datetime::{parse_datetime, parse_stored, AuthAge, NaiveZone};
pub use errors::{CriteriaError, CriteriaResult};
pub use fields::{domain_of, BOOLEAN_COLUMNS, TOKENINFO_KEYS, TOKEN_COLUMNS};
