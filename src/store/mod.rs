//! Token store subsystem
//!
//! The pipeline reaches the persisted tokens and the user directory only
//! through the two narrow traits defined here:
//!
//! - [`TokenStore`]: keyset-paginated fetch, lookup, upsert and removal
//! - [`IdentityBackend`]: owner resolution and realm lookup
//!
//! [`JsonStore`] implements both over a single JSON document.

mod errors;
mod json;
mod record;

pub use errors::{StoreError, StoreResult};
pub use json::{JsonStore, StoreDocument};
pub use record::{FieldValue, OwnerRef, TokenRecord, UserInfo, LAST_AUTH_KEY};

/// Conditions the store evaluates itself while fetching.
///
/// `None` means "do not filter on this attribute".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralFilter {
    pub tokentype: Option<String>,
    pub active: Option<bool>,
    pub assigned: Option<bool>,
}

impl StructuralFilter {
    /// Checks a record against the filter.
    ///
    /// Token types compare case-insensitively.
    pub fn admits(&self, record: &TokenRecord) -> bool {
        if let Some(tokentype) = &self.tokentype {
            if !record.tokentype.eq_ignore_ascii_case(tokentype) {
                return false;
            }
        }
        if let Some(active) = self.active {
            if record.active != active {
                return false;
            }
        }
        if let Some(assigned) = self.assigned {
            if record.is_assigned() != assigned {
                return false;
            }
        }
        true
    }
}

/// Persisted token inventory
pub trait TokenStore {
    /// Fetch tokens admitted by `filter`, ordered by serial.
    ///
    /// Only serials strictly greater than `after` are returned. With a
    /// `limit`, at most that many records come back.
    fn fetch(
        &self,
        filter: &StructuralFilter,
        after: Option<&str>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<TokenRecord>>;

    /// Look up a single token
    fn get(&self, serial: &str) -> StoreResult<Option<TokenRecord>>;

    /// Insert or replace a token. The change is durable when this returns.
    fn save(&mut self, record: &TokenRecord) -> StoreResult<()>;

    /// Remove a token. Fails with [`StoreError::TokenNotFound`] if absent.
    fn remove(&mut self, serial: &str) -> StoreResult<()>;
}

/// User directory consulted for owners
pub trait IdentityBackend {
    fn resolve(&self, owner: &OwnerRef) -> Option<UserInfo>;

    fn realm_exists(&self, realm: &str) -> bool;
}

/// Everything the pipeline needs from the outside world
pub trait Backend: TokenStore + IdentityBackend {}

impl<T: TokenStore + IdentityBackend> Backend for T {}
