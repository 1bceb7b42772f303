//! Token records as handed out by the store
//!
//! A record is a snapshot: the pipeline holds it for the duration of one
//! batch and writes changes back through [`TokenStore::save`].
//!
//! [`TokenStore::save`]: super::TokenStore::save

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::IdentityBackend;

/// Tokeninfo key holding the last successful authentication time
pub const LAST_AUTH_KEY: &str = "last_auth";

/// Typed value of a token column or tokeninfo entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl FieldValue {
    /// Integer view of the value, the way a loose integer conversion sees it.
    ///
    /// Booleans count as 0/1, strings are trimmed and parsed. Anything else
    /// has no integer view.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Bool(b) => Some(i64::from(*b)),
            FieldValue::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Returns the string if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

/// Reference from a token to the user owning it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub user_id: String,
    pub resolver: String,
    pub realm: String,
}

/// A user as resolved by the identity backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub uid: String,
    pub resolver: String,
    pub realm: String,
    pub username: String,
    #[serde(default)]
    pub givenname: String,
    #[serde(default)]
    pub surname: String,
    /// Additional attributes such as email or phone
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl UserInfo {
    /// Look up a user attribute by name, including the well-known ones
    pub fn info(&self, attribute: &str) -> Option<&str> {
        match attribute {
            "username" => Some(&self.username),
            "givenname" => Some(&self.givenname),
            "surname" => Some(&self.surname),
            "userid" | "uid" => Some(&self.uid),
            other => self.attributes.get(other).map(String::as_str),
        }
    }

    /// `login@realm`, as used for token owners in exports
    pub fn login(&self) -> String {
        format!("{}@{}", self.username, self.realm)
    }

    /// Whether this user is the one a token refers to
    pub fn is(&self, owner: &OwnerRef) -> bool {
        self.uid == owner.user_id && self.resolver == owner.resolver && self.realm == owner.realm
    }
}

fn default_true() -> bool {
    true
}

fn default_otplen() -> i64 {
    6
}

fn default_maxfail() -> i64 {
    10
}

/// A persisted token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub serial: String,
    pub tokentype: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_otplen")]
    pub otplen: i64,
    #[serde(default)]
    pub count: i64,
    #[serde(default = "default_maxfail")]
    pub maxfail: i64,
    #[serde(default)]
    pub failcount: i64,
    /// Hex encoded seed
    #[serde(default)]
    pub otpkey: String,
    #[serde(default)]
    pub rollout_state: String,
    #[serde(default)]
    pub owner: Option<OwnerRef>,
    #[serde(default)]
    pub realms: Vec<String>,
    #[serde(default)]
    pub tokeninfo: BTreeMap<String, String>,
}

impl TokenRecord {
    /// Creates an active, unassigned token with default settings
    pub fn new(serial: impl Into<String>, tokentype: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            tokentype: tokentype.into(),
            description: String::new(),
            active: true,
            revoked: false,
            locked: false,
            otplen: default_otplen(),
            count: 0,
            maxfail: default_maxfail(),
            failcount: 0,
            otpkey: String::new(),
            rollout_state: String::new(),
            owner: None,
            realms: Vec::new(),
            tokeninfo: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.realms.push(owner.realm.clone());
        self.owner = Some(owner);
        self
    }

    pub fn with_tokeninfo(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tokeninfo.insert(key.into(), value.into());
        self
    }

    pub fn with_otpkey(mut self, otpkey: impl Into<String>) -> Self {
        self.otpkey = otpkey.into();
        self
    }

    /// Whether a user is assigned to the token
    pub fn is_assigned(&self) -> bool {
        self.owner.is_some()
    }

    /// A token is orphaned when its owner no longer resolves
    pub fn is_orphaned(&self, identity: &dyn IdentityBackend) -> bool {
        match &self.owner {
            Some(owner) => identity.resolve(owner).is_none(),
            None => false,
        }
    }

    pub fn tokeninfo(&self, key: &str) -> Option<&str> {
        self.tokeninfo.get(key).map(String::as_str)
    }

    /// Stored last authentication time, unparsed
    pub fn last_auth(&self) -> Option<&str> {
        self.tokeninfo(LAST_AUTH_KEY)
    }

    /// Typed value of a database column.
    ///
    /// Unknown column names and unset owner columns yield `None`.
    pub fn column(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "serial" => FieldValue::Str(self.serial.clone()),
            "tokentype" => FieldValue::Str(self.tokentype.clone()),
            "description" => FieldValue::Str(self.description.clone()),
            "active" => FieldValue::Bool(self.active),
            "revoked" => FieldValue::Bool(self.revoked),
            "locked" => FieldValue::Bool(self.locked),
            "otplen" => FieldValue::Int(self.otplen),
            "count" => FieldValue::Int(self.count),
            "maxfail" => FieldValue::Int(self.maxfail),
            "failcount" => FieldValue::Int(self.failcount),
            "rollout_state" => FieldValue::Str(self.rollout_state.clone()),
            "user_id" => FieldValue::Str(self.owner.as_ref()?.user_id.clone()),
            "resolver" => FieldValue::Str(self.owner.as_ref()?.resolver.clone()),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_view() {
        assert_eq!(FieldValue::Int(7).as_integer(), Some(7));
        assert_eq!(FieldValue::Bool(true).as_integer(), Some(1));
        assert_eq!(FieldValue::from(" 42 ").as_integer(), Some(42));
        assert_eq!(FieldValue::from("4.2").as_integer(), None);
        assert_eq!(FieldValue::from("abc").as_integer(), None);
    }

    #[test]
    fn test_column_types() {
        let token = TokenRecord::new("HOTP1", "hotp").with_description("desk");
        assert_eq!(token.column("otplen"), Some(FieldValue::Int(6)));
        assert_eq!(token.column("active"), Some(FieldValue::Bool(true)));
        assert_eq!(token.column("description"), Some(FieldValue::from("desk")));
        assert_eq!(token.column("user_id"), None);
        assert_eq!(token.column("nope"), None);
    }

    #[test]
    fn test_record_defaults_from_json() {
        let token: TokenRecord =
            serde_json::from_str(r#"{"serial": "T1", "tokentype": "totp"}"#).unwrap();
        assert!(token.active);
        assert_eq!(token.otplen, 6);
        assert!(!token.is_assigned());
    }

    #[test]
    fn test_user_info_attributes() {
        let mut user = UserInfo {
            uid: "1000".into(),
            resolver: "ldap".into(),
            realm: "corp".into(),
            username: "alice".into(),
            givenname: "Alice".into(),
            surname: "Liddell".into(),
            attributes: BTreeMap::new(),
        };
        user.attributes.insert("email".into(), "alice@example.com".into());

        assert_eq!(user.info("username"), Some("alice"));
        assert_eq!(user.info("email"), Some("alice@example.com"));
        assert_eq!(user.info("phone"), None);
        assert_eq!(user.login(), "alice@corp");
    }
}
