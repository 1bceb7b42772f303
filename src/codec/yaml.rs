//! Human-readable token documents
//!
//! Each exported token becomes one YAML sequence item, so the items of a
//! streamed export concatenate into a single valid list. The same documents
//! can be loaded back to rewrite tokens, e.g. after the encryption key of
//! the store was changed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::{TokenRecord, UserInfo};

use super::errors::{CodecError, CodecResult};
use super::seed::{decode_seed, encode_seed};

fn is_false(b: &bool) -> bool {
    !*b
}

/// Exported view of a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDocument {
    pub serial: String,
    #[serde(rename = "type")]
    pub tokentype: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub otplen: i64,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub maxfail: i64,
    #[serde(default)]
    pub failcount: i64,
    #[serde(default)]
    pub otpkey: String,
    /// Set when `otpkey` is base32 instead of hex
    #[serde(default, skip_serializing_if = "is_false")]
    pub otpkey_b32: bool,
    #[serde(default)]
    pub rollout_state: String,
    #[serde(default)]
    pub realms: Vec<String>,
    #[serde(default)]
    pub info: BTreeMap<String, String>,
    /// `login@realm` or `n/a`. Informational only, never imported.
    #[serde(default)]
    pub owner: String,
}

impl TokenDocument {
    pub fn from_token(token: &TokenRecord, owner: Option<&UserInfo>, b32: bool) -> CodecResult<Self> {
        Ok(Self {
            serial: token.serial.clone(),
            tokentype: token.tokentype.clone(),
            description: token.description.clone(),
            active: token.active,
            otplen: token.otplen,
            count: token.count,
            maxfail: token.maxfail,
            failcount: token.failcount,
            otpkey: encode_seed(token, b32)?,
            otpkey_b32: b32,
            rollout_state: token.rollout_state.clone(),
            realms: token.realms.clone(),
            info: token.tokeninfo.clone(),
            owner: owner.map(UserInfo::login).unwrap_or_else(|| "n/a".to_string()),
        })
    }

    /// Overwrite `token` with the exported state. Ownership is left alone.
    pub fn apply_to(&self, token: &mut TokenRecord) -> CodecResult<()> {
        if !token.tokentype.eq_ignore_ascii_case(&self.tokentype) {
            return Err(CodecError::Malformed(format!(
                "token {} is of type {}, document says {}",
                token.serial, token.tokentype, self.tokentype
            )));
        }
        token.otpkey = decode_seed(&self.serial, &self.otpkey, self.otpkey_b32)?;
        token.description = self.description.clone();
        token.active = self.active;
        token.otplen = self.otplen;
        token.count = self.count;
        token.maxfail = self.maxfail;
        token.failcount = self.failcount;
        token.rollout_state = self.rollout_state.clone();
        token.realms = self.realms.clone();
        token.tokeninfo = self.info.clone();
        Ok(())
    }

    /// One YAML sequence item
    pub fn to_yaml_item(&self) -> CodecResult<String> {
        Ok(serde_yaml::to_string(std::slice::from_ref(self))?)
    }
}

/// Load a list of token documents
pub fn load_documents(text: &str) -> CodecResult<Vec<TokenDocument>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(text)?)
}
