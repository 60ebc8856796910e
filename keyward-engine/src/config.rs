//! Engine configuration.
//!
//! The server-held secrets are read once, validated once, and handed to the
//! services as [`ServerKeys`]. Nothing downstream touches the environment.

use crate::error::{EngineError, EngineResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use keyward_crypto::{KEY_SIZE, KdfParams, SymmetricKey, derive_server_key};
use serde::Deserialize;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Environment variable holding the base64 root encryption key.
pub const ROOT_ENCRYPTION_KEY_ENV: &str = "ROOT_ENCRYPTION_KEY";

/// Environment variable holding the server encryption key.
pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";

/// Minimum length of the server encryption key, in bytes.
pub const MIN_ENCRYPTION_KEY_LEN: usize = 16;

const BLIND_INDEX_KEY_INFO: &[u8] = b"keyward/blind-index-salt/v1";

/// Raw configuration, as deserialized or read from the environment.
#[derive(Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Base64 encoding of exactly 32 random bytes.
    #[serde(default)]
    pub root_encryption_key: String,

    /// Server-wide secret, typically 32 hex characters. Used as UTF-8 bytes.
    #[serde(default)]
    pub encryption_key: String,

    /// Argon2id costs for newly created private-key records.
    #[serde(default)]
    pub kdf: KdfParams,
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("root_encryption_key", &redacted(&self.root_encryption_key))
            .field("encryption_key", &redacted(&self.encryption_key))
            .field("kdf", &self.kdf)
            .finish()
    }
}

fn redacted(s: &str) -> &'static str {
    if s.is_empty() { "<unset>" } else { "[REDACTED]" }
}

impl EngineConfig {
    /// Reads the server secrets from the process environment.
    ///
    /// Unset variables become empty strings; [`EngineConfig::validate`]
    /// turns them into [`EngineError::MissingKeyMaterial`].
    pub fn from_env() -> Self {
        Self {
            root_encryption_key: std::env::var(ROOT_ENCRYPTION_KEY_ENV).unwrap_or_default(),
            encryption_key: std::env::var(ENCRYPTION_KEY_ENV).unwrap_or_default(),
            kdf: KdfParams::default(),
        }
    }

    /// Builds a config from explicit values.
    pub fn new(root_encryption_key: impl Into<String>, encryption_key: impl Into<String>) -> Self {
        Self {
            root_encryption_key: root_encryption_key.into(),
            encryption_key: encryption_key.into(),
            kdf: KdfParams::default(),
        }
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Checks presence and shape of the server secrets and decodes them.
    pub fn validate(&self) -> EngineResult<ServerKeys> {
        let root_b64 = self.root_encryption_key.trim();
        if root_b64.is_empty() {
            return Err(EngineError::MissingKeyMaterial(format!(
                "{ROOT_ENCRYPTION_KEY_ENV} is not set"
            )));
        }
        let encryption = self.encryption_key.trim();
        if encryption.is_empty() {
            return Err(EngineError::MissingKeyMaterial(format!(
                "{ENCRYPTION_KEY_ENV} is not set"
            )));
        }

        let root = Zeroizing::new(STANDARD.decode(root_b64).map_err(|e| {
            EngineError::Config(format!("{ROOT_ENCRYPTION_KEY_ENV} is not valid base64: {e}"))
        })?);
        if root.len() != KEY_SIZE {
            return Err(EngineError::Config(format!(
                "{ROOT_ENCRYPTION_KEY_ENV} must decode to {KEY_SIZE} bytes, got {}",
                root.len()
            )));
        }
        if encryption.len() < MIN_ENCRYPTION_KEY_LEN {
            return Err(EngineError::Config(format!(
                "{ENCRYPTION_KEY_ENV} must be at least {MIN_ENCRYPTION_KEY_LEN} bytes"
            )));
        }

        Ok(ServerKeys {
            root: root.to_vec(),
            encryption: encryption.as_bytes().to_vec(),
        })
    }
}

/// Validated server-held secrets. Zeroized on drop, redacted in `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ServerKeys {
    root: Vec<u8>,
    encryption: Vec<u8>,
}

impl ServerKeys {
    /// Key protecting blind-index salts: HKDF over both server secrets.
    pub fn blind_index_key(&self) -> EngineResult<SymmetricKey> {
        Ok(derive_server_key(&self.root, &self.encryption, BLIND_INDEX_KEY_INFO)?)
    }
}

impl fmt::Debug for ServerKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerKeys([REDACTED])")
    }
}
