//! Criterion compiler
//!
//! Turns filter expressions of the form `field OP value` (OP one of `==`,
//! `>=`, `<=`) and the independent per-operator value options into a
//! [`FieldFilter`]: one target field plus a [`FilterSet`] evaluated on it.
//!
//! Operator mapping:
//! - `==` compares for equality in the field's domain
//! - `>=` is strictly greater (integers) or strictly later (date/time)
//! - `<=` is strictly less (integers) or strictly earlier (date/time)

use super::ast::{Criterion, Domain, FieldScope, Operator};
use super::comparator::{scalar_operand, Comparator};
use super::errors::{CriteriaError, CriteriaResult};
use super::fields::{domain_of, BOOLEAN_COLUMNS};
use crate::store::{FieldValue, TokenRecord};

/// Conjunction of compiled comparators. Empty matches everything.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    comparators: Vec<Comparator>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, comparator: Comparator) {
        self.comparators.push(comparator);
    }

    /// True when every comparator holds; stops at the first that does not
    pub fn matches(&self, value: &FieldValue) -> bool {
        self.comparators.iter().all(|c| c.evaluate(value))
    }

    pub fn len(&self) -> usize {
        self.comparators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparators.is_empty()
    }

    pub fn comparators(&self) -> &[Comparator] {
        &self.comparators
    }
}

/// A filter set bound to the one field it evaluates
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub scope: FieldScope,
    pub field: String,
    pub filters: FilterSet,
}

impl FieldFilter {
    /// Evaluate against a token. A token without the field does not match.
    pub fn matches(&self, token: &TokenRecord) -> bool {
        let value = match self.scope {
            FieldScope::Tokeninfo => token.tokeninfo(&self.field).map(FieldValue::from),
            FieldScope::Column => token.column(&self.field),
        };
        match value {
            Some(value) => self.filters.matches(&value),
            None => false,
        }
    }
}

/// Independent value options, each adding one criterion on the same key
#[derive(Debug, Clone, Default)]
pub struct ValueOptions {
    /// Equality or regular expression
    pub value: Option<String>,
    pub greater_than: Option<String>,
    pub less_than: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl ValueOptions {
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.greater_than.is_none()
            && self.less_than.is_none()
            && self.after.is_none()
            && self.before.is_none()
    }

    /// Criteria on `field`, in option order. The option picks the domain.
    pub fn criteria(&self, field: &str) -> Vec<Criterion> {
        let options = [
            (&self.value, Operator::Eq, Domain::String),
            (&self.greater_than, Operator::Gt, Domain::Integer),
            (&self.less_than, Operator::Lt, Domain::Integer),
            (&self.after, Operator::After, Domain::Datetime),
            (&self.before, Operator::Before, Domain::Datetime),
        ];
        options
            .into_iter()
            .filter_map(|(operand, operator, domain)| {
                operand
                    .as_ref()
                    .map(|operand| Criterion::new(field, operator, operand.as_str(), domain))
            })
            .collect()
    }
}

/// Split `field OP value` at the first operator
fn split_expression(expression: &str) -> Option<(&str, &str, &str)> {
    let (at, symbol) = ["==", ">=", "<="]
        .iter()
        .filter_map(|symbol| expression.find(symbol).map(|at| (at, *symbol)))
        .min_by_key(|(at, _)| *at)?;

    let field = expression[..at].trim();
    let mut chars = field.chars();
    let valid_start = chars.next().map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !(valid_start && valid_rest) {
        return None;
    }

    Some((field, symbol, expression[at + symbol.len()..].trim()))
}

/// Compiles user filter input into comparators
pub struct CriterionCompiler;

impl CriterionCompiler {
    /// Parse `field OP value`, resolving the field's domain in `scope`
    pub fn parse(expression: &str, scope: FieldScope) -> CriteriaResult<Criterion> {
        let (field, symbol, operand) = split_expression(expression).ok_or_else(|| {
            CriteriaError::malformed(expression, "expected <field> ==|>=|<= <value>")
        })?;
        if operand.is_empty() {
            return Err(CriteriaError::malformed(expression, "missing value"));
        }

        let domain = domain_of(scope, field)?;
        let operator = match (symbol, domain) {
            ("==", _) => Operator::Eq,
            (">=", Domain::Integer) => Operator::Gt,
            (">=", Domain::Datetime) => Operator::After,
            ("<=", Domain::Integer) => Operator::Lt,
            ("<=", Domain::Datetime) => Operator::Before,
            _ => {
                return Err(CriteriaError::malformed(
                    expression,
                    format!("'{}' cannot be ordered, only '==' applies", field),
                ))
            }
        };

        Ok(Criterion::new(field, operator, operand, domain))
    }

    /// Compile criteria into one conjunctive filter set, failing on the first
    /// invalid operand
    pub fn compile<'c>(criteria: impl IntoIterator<Item = &'c Criterion>) -> CriteriaResult<FilterSet> {
        let mut set = FilterSet::new();
        for criterion in criteria {
            set.push(Comparator::make(criterion)?);
        }
        Ok(set)
    }

    /// Build the tokeninfo filter from the expression and the value options.
    ///
    /// Both surfaces must name the same key; value options need a key.
    /// Returns `None` when neither surface was used.
    pub fn tokeninfo_filter(
        expression: Option<&str>,
        key: Option<&str>,
        options: &ValueOptions,
    ) -> CriteriaResult<Option<FieldFilter>> {
        let mut criteria = Vec::new();
        let mut field = key.map(str::to_string);

        if let Some(expression) = expression {
            let criterion = Self::parse(expression, FieldScope::Tokeninfo)?;
            if let Some(key) = &field {
                if *key != criterion.field {
                    return Err(CriteriaError::malformed(
                        expression,
                        format!(
                            "only one tokeninfo key can be filtered, '{}' was already given",
                            key
                        ),
                    ));
                }
            }
            field = Some(criterion.field.clone());
            criteria.push(criterion);
        }

        if !options.is_empty() {
            let key = key.ok_or_else(|| {
                CriteriaError::malformed("--tokeninfo-value*", "a tokeninfo key is required")
            })?;
            criteria.extend(options.criteria(key));
        }

        match field {
            Some(field) if !criteria.is_empty() => Ok(Some(FieldFilter {
                scope: FieldScope::Tokeninfo,
                field,
                filters: Self::compile(&criteria)?,
            })),
            _ => Ok(None),
        }
    }

    /// Build the column filter from a `column OP value` expression
    pub fn column_filter(expression: &str) -> CriteriaResult<FieldFilter> {
        let criterion = Self::parse(expression, FieldScope::Column)?;
        if BOOLEAN_COLUMNS.contains(&criterion.field.as_str()) && scalar_operand(&criterion.operand).is_none() {
            return Err(CriteriaError::invalid_operand(
                &criterion.field,
                criterion.domain,
                &criterion.operand,
            ));
        }
        Ok(FieldFilter {
            scope: FieldScope::Column,
            field: criterion.field.clone(),
            filters: Self::compile([&criterion])?,
        })
    }
}
