//! JSON document backed store
//!
//! The whole inventory lives in one JSON document:
//!
//! ```json
//! { "tokens": [...], "users": [...], "realms": ["corp"] }
//! ```
//!
//! Every mutation rewrites the document through a temporary file and a
//! rename, so a change is durable before the next token is touched. A
//! mutation whose write fails is rolled back in memory as well.
//!
//! Each mutation rewrites the whole document, so a run changing N tokens
//! costs O(N²) I/O. This store is meant for tests and small inventories.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use super::record::{OwnerRef, TokenRecord, UserInfo};
use super::{IdentityBackend, StructuralFilter, TokenStore};

/// On-disk layout of the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub tokens: Vec<TokenRecord>,
    #[serde(default)]
    pub users: Vec<UserInfo>,
    /// Realms known besides the ones users live in
    #[serde(default)]
    pub realms: Vec<String>,
}

/// Token store and identity backend over a [`StoreDocument`]
#[derive(Debug)]
pub struct JsonStore {
    path: Option<PathBuf>,
    tokens: BTreeMap<String, TokenRecord>,
    users: Vec<UserInfo>,
    realms: BTreeSet<String>,
}

impl JsonStore {
    /// Store without a backing file. Mutations only change memory.
    pub fn in_memory(document: StoreDocument) -> StoreResult<Self> {
        Self::from_document(document, None)
    }

    /// Opens the store document at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let document: StoreDocument = serde_json::from_str(&content)?;
        Self::from_document(document, Some(path.to_path_buf()))
    }

    fn from_document(document: StoreDocument, path: Option<PathBuf>) -> StoreResult<Self> {
        let mut tokens = BTreeMap::new();
        for token in document.tokens {
            if tokens.contains_key(&token.serial) {
                return Err(StoreError::Corrupt(format!(
                    "duplicate serial {}",
                    token.serial
                )));
            }
            tokens.insert(token.serial.clone(), token);
        }

        let mut realms: BTreeSet<String> = document.realms.into_iter().collect();
        realms.extend(document.users.iter().map(|u| u.realm.clone()));

        Ok(Self {
            path,
            tokens,
            users: document.users,
            realms,
        })
    }

    /// Snapshot of the current state
    pub fn document(&self) -> StoreDocument {
        StoreDocument {
            tokens: self.tokens.values().cloned().collect(),
            users: self.users.clone(),
            realms: self.realms.iter().cloned().collect(),
        }
    }

    /// Number of tokens in the store
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn persist(&self) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let body = serde_json::to_vec_pretty(&self.document())?;
        let tmp = path.with_extension("json.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(&body)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl TokenStore for JsonStore {
    fn fetch(
        &self,
        filter: &StructuralFilter,
        after: Option<&str>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<TokenRecord>> {
        let lower = match after {
            Some(serial) => Bound::Excluded(serial.to_string()),
            None => Bound::Unbounded,
        };

        let admitted = self
            .tokens
            .range((lower, Bound::Unbounded))
            .map(|(_, token)| token)
            .filter(|token| filter.admits(token))
            .cloned();

        Ok(match limit {
            Some(limit) => admitted.take(limit).collect(),
            None => admitted.collect(),
        })
    }

    fn get(&self, serial: &str) -> StoreResult<Option<TokenRecord>> {
        Ok(self.tokens.get(serial).cloned())
    }

    fn save(&mut self, record: &TokenRecord) -> StoreResult<()> {
        for realm in &record.realms {
            if !self.realms.contains(realm) {
                return Err(StoreError::UnknownRealm(realm.clone()));
            }
        }
        let previous = self.tokens.insert(record.serial.clone(), record.clone());
        self.persist().map_err(|e| {
            match previous {
                Some(previous) => self.tokens.insert(record.serial.clone(), previous),
                None => self.tokens.remove(&record.serial),
            };
            e
        })
    }

    fn remove(&mut self, serial: &str) -> StoreResult<()> {
        let Some(removed) = self.tokens.remove(serial) else {
            return Err(StoreError::TokenNotFound(serial.to_string()));
        };
        self.persist().map_err(|e| {
            self.tokens.insert(serial.to_string(), removed);
            e
        })
    }
}

impl IdentityBackend for JsonStore {
    fn resolve(&self, owner: &OwnerRef) -> Option<UserInfo> {
        self.users.iter().find(|user| user.is(owner)).cloned()
    }

    fn realm_exists(&self, realm: &str) -> bool {
        self.realms.contains(realm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn document() -> StoreDocument {
        StoreDocument {
            tokens: vec![
                TokenRecord::new("C1", "totp"),
                TokenRecord::new("A1", "hotp"),
                TokenRecord::new("B1", "hotp"),
            ],
            users: Vec::new(),
            realms: vec!["corp".into()],
        }
    }

    fn serials(tokens: &[TokenRecord]) -> Vec<&str> {
        tokens.iter().map(|t| t.serial.as_str()).collect()
    }

    #[test]
    fn test_fetch_is_ordered_by_serial() {
        let store = JsonStore::in_memory(document()).unwrap();
        let all = store.fetch(&StructuralFilter::default(), None, None).unwrap();
        assert_eq!(serials(&all), vec!["A1", "B1", "C1"]);
    }

    #[test]
    fn test_keyset_pagination() {
        let store = JsonStore::in_memory(document()).unwrap();
        let filter = StructuralFilter::default();

        let first = store.fetch(&filter, None, Some(2)).unwrap();
        assert_eq!(serials(&first), vec!["A1", "B1"]);

        let second = store.fetch(&filter, Some("B1"), Some(2)).unwrap();
        assert_eq!(serials(&second), vec!["C1"]);

        let third = store.fetch(&filter, Some("C1"), Some(2)).unwrap();
        assert!(third.is_empty());
    }

    #[test]
    fn test_duplicate_serial_rejected() {
        let mut doc = document();
        doc.tokens.push(TokenRecord::new("A1", "spass"));
        assert!(matches!(
            JsonStore::in_memory(doc),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_remove_missing_token() {
        let mut store = JsonStore::in_memory(document()).unwrap();
        assert!(matches!(
            store.remove("ZZ"),
            Err(StoreError::TokenNotFound(_))
        ));
    }

    #[test]
    fn test_save_rejects_unknown_realm() {
        let mut store = JsonStore::in_memory(document()).unwrap();
        let mut token = TokenRecord::new("D1", "hotp");
        token.realms = vec!["elsewhere".into()];
        assert!(matches!(
            store.save(&token),
            Err(StoreError::UnknownRealm(_))
        ));
    }

    #[test]
    fn test_mutations_are_persisted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        fs::write(&path, serde_json::to_vec(&document()).unwrap()).unwrap();

        let mut store = JsonStore::open(&path).unwrap();
        store.remove("B1").unwrap();

        let reopened = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.get("B1").unwrap().is_none());
    }

    #[test]
    fn test_failed_write_leaves_token_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        fs::write(&path, serde_json::to_vec(&document()).unwrap()).unwrap();
        let mut store = JsonStore::open(&path).unwrap();

        // A directory in place of the temporary file makes every write fail
        let blocker = path.with_extension("json.tmp");
        fs::create_dir(&blocker).unwrap();

        assert!(store.remove("A1").is_err());
        assert!(store.get("A1").unwrap().is_some());

        let mut changed = TokenRecord::new("B1", "hotp").with_description("changed");
        changed.active = false;
        assert!(store.save(&changed).is_err());
        assert_eq!(store.get("B1").unwrap().unwrap().description, "");
        assert!(store.save(&TokenRecord::new("D1", "hotp")).is_err());
        assert!(store.get("D1").unwrap().is_none());

        fs::remove_dir(&blocker).unwrap();
        store.save(&TokenRecord::new("C1", "totp").with_description("later")).unwrap();

        let reopened = JsonStore::open(&path).unwrap();
        assert!(reopened.get("A1").unwrap().is_some());
        assert!(reopened.get("B1").unwrap().unwrap().active);
        assert!(reopened.get("D1").unwrap().is_none());
        assert_eq!(reopened.len(), 3);
    }
}
