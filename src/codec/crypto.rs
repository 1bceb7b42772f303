//! Sealing primitives for the key container
//!
//! Values are AES-128-GCM encrypted and carried as
//! `base64(nonce || ciphertext || tag)`. MACs are HMAC-SHA256 over the
//! decoded cipher value.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Key, Nonce};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::{CodecError, CodecResult};

/// Length of the pre-shared and MAC keys in bytes
pub const KEY_LEN: usize = 16;

const NONCE_LEN: usize = 12;

type HmacSha256 = Hmac<Sha256>;

/// Fresh random key
pub fn random_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Parse a hex encoded pre-shared key
pub fn key_from_hex(text: &str) -> CodecResult<[u8; KEY_LEN]> {
    let raw = hex::decode(text.trim()).map_err(|e| CodecError::InvalidKey(e.to_string()))?;
    raw.try_into().map_err(|raw: Vec<u8>| {
        CodecError::InvalidKey(format!("expected {} bytes, got {}", KEY_LEN, raw.len()))
    })
}

/// Encrypt `plaintext`, returning the raw cipher value
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> CodecResult<Vec<u8>> {
    let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(key));

    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CodecError::Crypto(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a raw cipher value. `None` if it was not sealed under `key`.
pub fn open(key: &[u8; KEY_LEN], sealed: &[u8]) -> Option<Vec<u8>> {
    if sealed.len() < NONCE_LEN + 16 {
        return None;
    }
    let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(key));
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher.decrypt(Nonce::from_slice(nonce), ciphertext).ok()
}

pub fn mac(key: &[u8], data: &[u8]) -> CodecResult<Vec<u8>> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| CodecError::InvalidKey(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time MAC check
pub fn verify_mac(key: &[u8], data: &[u8], expected: &[u8]) -> bool {
    match mac(key, data) {
        Ok(actual) => actual.as_slice().ct_eq(expected).into(),
        Err(_) => false,
    }
}

pub fn to_base64(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

pub fn from_base64(text: &str) -> Option<Vec<u8>> {
    general_purpose::STANDARD.decode(text.trim()).ok()
}
