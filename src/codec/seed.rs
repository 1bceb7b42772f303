//! Seed representation helpers

use crate::store::TokenRecord;

use super::base32;
use super::errors::{CodecError, CodecResult};

/// The token's hex seed, re-encoded as base32 when asked
pub fn encode_seed(token: &TokenRecord, b32: bool) -> CodecResult<String> {
    if !b32 {
        return Ok(token.otpkey.clone());
    }
    let raw = hex::decode(&token.otpkey).map_err(|_| CodecError::InvalidSeed(token.serial.clone()))?;
    Ok(base32::encode(&raw))
}

/// Turn an exported seed back into hex
pub fn decode_seed(serial: &str, otpkey: &str, b32: bool) -> CodecResult<String> {
    if b32 {
        let raw = base32::decode(otpkey).ok_or_else(|| CodecError::InvalidSeed(serial.to_string()))?;
        return Ok(hex::encode(raw));
    }
    hex::decode(otpkey).map_err(|_| CodecError::InvalidSeed(serial.to_string()))?;
    Ok(otpkey.to_ascii_lowercase())
}
