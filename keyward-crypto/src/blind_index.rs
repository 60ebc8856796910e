//! Blind-index tokens: deterministic keyed hashes for equality lookup.
//!
//! `token = base64(HMAC-SHA256(salt, "keyward/blind-index/v1" || 0x00 || value))`
//!
//! The same `(value, salt)` always yields the same token. Recovering `value`
//! from a token requires the salt and a search over candidate inputs.

use crate::error::{CryptoError, CryptoResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

const DOMAIN: &[u8] = b"keyward/blind-index/v1\x00";

/// Size of a freshly generated blind-index salt.
pub const BLIND_INDEX_SALT_SIZE: usize = 16;

/// Decrypted blind-index salt. Zeroized on drop, redacted in `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BlindIndexSalt(Vec<u8>);

impl BlindIndexSalt {
    /// Wraps existing salt bytes. Empty salts are rejected.
    pub fn from_bytes(bytes: Vec<u8>) -> CryptoResult<Self> {
        if bytes.is_empty() {
            return Err(CryptoError::InvalidInput("blind index salt is empty".to_string()));
        }
        Ok(Self(bytes))
    }

    /// Draws a new random salt.
    pub fn random() -> Self {
        Self(crate::key::random_bytes(BLIND_INDEX_SALT_SIZE))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for BlindIndexSalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlindIndexSalt([REDACTED])")
    }
}

/// A blind-index token, stored beside the encrypted secret it indexes.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlindIndexToken(String);

impl BlindIndexToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps a token read back from storage.
    pub fn from_stored(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Debug for BlindIndexToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlindIndexToken({})", self.0)
    }
}

impl fmt::Display for BlindIndexToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the blind-index token for `value` under `salt`.
pub fn compute_blind_index(value: &str, salt: &BlindIndexSalt) -> CryptoResult<BlindIndexToken> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(salt.as_bytes())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    mac.update(DOMAIN);
    mac.update(value.as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(BlindIndexToken(STANDARD.encode(digest)))
}
