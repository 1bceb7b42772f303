//! Token and owner listings
//!
//! Every value is single-quoted and comma separated, e.g.
//! `'OATH0001','hotp','alice','Alice','Smith','1000','ldap','corp'`.

use std::collections::BTreeMap;

use crate::store::{IdentityBackend, TokenRecord, UserInfo};

/// Marker printed when an owner is set but cannot be resolved
pub const UNRESOLVED_OWNER: &str = "**failed to resolve user**";

/// Owner key used for tokens without owner in summaries
pub const NO_OWNER: &str = "N/A, , , , , ";

/// Owner of a token as far as the listing is concerned
pub enum Owner {
    Unassigned,
    Resolved(UserInfo),
    Unresolved,
}

impl Owner {
    pub fn of(token: &TokenRecord, identity: &dyn IdentityBackend) -> Self {
        match &token.owner {
            None => Owner::Unassigned,
            Some(owner) => match identity.resolve(owner) {
                Some(user) => Owner::Resolved(user),
                None => Owner::Unresolved,
            },
        }
    }

    pub fn user(&self) -> Option<&UserInfo> {
        match self {
            Owner::Resolved(user) => Some(user),
            _ => None,
        }
    }
}

fn quoted<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(|v| format!("'{}'", v))
        .collect::<Vec<_>>()
        .join(",")
}

fn user_fields<'a>(user: &'a UserInfo, attributes: &'a [String]) -> Vec<&'a str> {
    let mut fields = vec![
        user.username.as_str(),
        user.givenname.as_str(),
        user.surname.as_str(),
        user.uid.as_str(),
        user.resolver.as_str(),
        user.realm.as_str(),
    ];
    fields.extend(attributes.iter().map(|a| user.info(a).unwrap_or("")));
    fields
}

/// One listing row for a token
pub fn list_row(token: &TokenRecord, owner: &Owner, attributes: &[String]) -> String {
    let mut fields = vec![token.serial.as_str(), token.tokentype.as_str()];
    match owner {
        Owner::Unassigned => {}
        Owner::Resolved(user) => fields.extend(user_fields(user, attributes)),
        Owner::Unresolved => fields.push(UNRESOLVED_OWNER),
    }
    quoted(fields)
}

/// Summary key identifying an owner
pub fn owner_key(owner: &Owner, attributes: &[String]) -> String {
    match owner {
        Owner::Resolved(user) => quoted(user_fields(user, attributes)),
        _ => NO_OWNER.to_string(),
    }
}

/// Tokens per owner, accumulated across batches
#[derive(Debug, Default)]
pub struct OwnerSummary {
    counts: BTreeMap<String, usize>,
}

impl OwnerSummary {
    pub fn add(&mut self, key: String) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `owner,count` lines in owner order
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.counts.iter().map(|(owner, count)| format!("{},{}", owner, count))
    }
}
