//! Token selection
//!
//! Applies the checks the store does not evaluate itself. Per token the
//! order is fixed and the first failing check excludes it:
//!
//! 1. last authentication recency
//! 2. serial pattern
//! 3. description pattern
//! 4. tokeninfo key absence / presence
//! 5. tokeninfo value filter, then column filter
//! 6. orphan state

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::criteria::{parse_stored, AuthAge, FieldFilter, NaiveZone};
use crate::store::{IdentityBackend, TokenRecord};

use super::result::MatchResult;

/// Checks evaluated per token, compiled once before the scan
#[derive(Debug, Clone, Default)]
pub struct SelectionCriteria {
    /// Exclude tokens that authenticated within this age
    pub last_auth: Option<AuthAge>,
    pub serial: Option<Regex>,
    pub description: Option<Regex>,
    pub has_tokeninfo_key: Option<String>,
    pub has_not_tokeninfo_key: Option<String>,
    pub tokeninfo_filter: Option<FieldFilter>,
    pub column_filter: Option<FieldFilter>,
    /// `Some(true)` keeps only orphaned tokens, `Some(false)` drops them
    pub orphaned: Option<bool>,
}

/// Evaluates [`SelectionCriteria`] against batches of tokens
pub struct Selector<'a> {
    criteria: &'a SelectionCriteria,
    now: DateTime<Utc>,
}

impl<'a> Selector<'a> {
    pub fn new(criteria: &'a SelectionCriteria) -> Self {
        Self::at(criteria, Utc::now())
    }

    /// Selector with a fixed notion of "now" for recency checks
    pub fn at(criteria: &'a SelectionCriteria, now: DateTime<Utc>) -> Self {
        Self { criteria, now }
    }

    /// Keep the tokens of `batch` that pass every check, preserving order
    pub fn select(&self, batch: Vec<TokenRecord>, identity: &dyn IdentityBackend) -> MatchResult {
        let scanned = batch.len();
        let tokens: Vec<TokenRecord> = batch
            .into_iter()
            .filter(|token| self.matches(token, identity))
            .collect();

        tracing::info!(scanned, matched = tokens.len(), "tokens processed");

        MatchResult { tokens, scanned }
    }

    /// Whether a single token passes every check
    pub fn matches(&self, token: &TokenRecord, identity: &dyn IdentityBackend) -> bool {
        let c = self.criteria;

        if let Some(age) = &c.last_auth {
            if self.authenticated_within(token, age) {
                return false;
            }
        }
        if let Some(serial) = &c.serial {
            if !serial.is_match(&token.serial) {
                return false;
            }
        }
        if let Some(description) = &c.description {
            if !description.is_match(&token.description) {
                return false;
            }
        }
        if let Some(key) = &c.has_not_tokeninfo_key {
            if token.tokeninfo.contains_key(key) {
                return false;
            }
        }
        if let Some(key) = &c.has_tokeninfo_key {
            if !token.tokeninfo.contains_key(key) {
                return false;
            }
        }
        if let Some(filter) = &c.tokeninfo_filter {
            if !filter.matches(token) {
                return false;
            }
        }
        if let Some(filter) = &c.column_filter {
            if !filter.matches(token) {
                return false;
            }
        }
        match c.orphaned {
            Some(wanted) => token.is_orphaned(identity) == wanted,
            None => true,
        }
    }

    /// Tokens without a readable last authentication never count as recent
    fn authenticated_within(&self, token: &TokenRecord, age: &AuthAge) -> bool {
        token
            .last_auth()
            .and_then(|value| parse_stored(value, NaiveZone::Utc))
            .is_some_and(|last_auth| age.is_newer(last_auth, self.now))
    }
}
