//! Server-custodied blind indexing.
//!
//! Each project owns one random salt, encrypted under a key derived from the
//! two server secrets. The server opens the salt to compute lookup tokens for
//! secret names; it never needs, and never receives, a user key to do so.

use crate::config::ServerKeys;
use crate::error::{EngineError, EngineResult};
use crate::registry::{BlindIndexRegistry, BlindIndexState};
use crate::types::{BlindIndexConfig, ProjectId};
use keyward_crypto::{
    BlindIndexSalt, BlindIndexToken, EncryptedData, KeyEncoding, SymmetricAlgorithm, SymmetricKey,
    decrypt, encrypt_with,
};
use std::fmt;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Creates blind-index configs and computes tokens from them.
#[derive(Clone)]
pub struct SearchIndexService {
    salt_key: SymmetricKey,
}

impl fmt::Debug for SearchIndexService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchIndexService").finish_non_exhaustive()
    }
}

impl SearchIndexService {
    pub fn new(keys: &ServerKeys) -> EngineResult<Self> {
        Ok(Self {
            salt_key: keys.blind_index_key()?,
        })
    }

    /// Generates a fresh salt for `project_id` and encrypts it for storage.
    ///
    /// The salt is stored as base64 text, recorded as [`KeyEncoding::Base64`].
    pub fn create_config(&self, project_id: ProjectId) -> EngineResult<BlindIndexConfig> {
        let salt = BlindIndexSalt::random();
        let key_encoding = KeyEncoding::Base64;
        let encoded = Zeroizing::new(key_encoding.encode(salt.as_bytes())?);

        let EncryptedData {
            algorithm,
            ciphertext,
            iv,
            tag,
        } = encrypt_with(SymmetricAlgorithm::Aes256Gcm, &self.salt_key, encoded.as_bytes())?;
        debug!(project_id = %project_id, "created blind index config");

        Ok(BlindIndexConfig {
            project_id,
            algorithm,
            key_encoding,
            salt_iv: iv,
            encrypted_salt_ciphertext: ciphertext,
            salt_tag: tag,
        })
    }

    /// Decrypts the salt in `config`.
    ///
    /// A config sealed under different server secrets, or altered in storage,
    /// fails with [`EngineError::AuthenticationFailure`].
    pub fn open_salt(&self, config: &BlindIndexConfig) -> EngineResult<BlindIndexSalt> {
        let sealed = EncryptedData {
            algorithm: config.algorithm,
            ciphertext: config.encrypted_salt_ciphertext.clone(),
            iv: config.salt_iv.clone(),
            tag: config.salt_tag.clone(),
        };
        let encoded = Zeroizing::new(decrypt(&self.salt_key, &sealed).map_err(|e| {
            warn!(project_id = %config.project_id, "cannot open blind index salt");
            EngineError::from(e)
        })?);
        let raw = config.key_encoding.decode(&encoded)?;
        Ok(BlindIndexSalt::from_bytes(raw)?)
    }

    /// Computes the lookup token for `value` under an already-opened salt.
    pub fn compute_blind_index(
        &self,
        value: &str,
        salt: &BlindIndexSalt,
    ) -> EngineResult<BlindIndexToken> {
        if value.is_empty() {
            return Err(EngineError::InvalidInput(
                "cannot index an empty value".to_string(),
            ));
        }
        Ok(keyward_crypto::compute_blind_index(value, salt)?)
    }

    /// Opens `config` and computes the token for `value`.
    pub fn blind_index(&self, config: &BlindIndexConfig, value: &str) -> EngineResult<BlindIndexToken> {
        let salt = self.open_salt(config)?;
        self.compute_blind_index(value, &salt)
    }

    /// Returns the items whose stored token equals `token`.
    pub fn find_matches<'a, T, I>(&self, token: &BlindIndexToken, candidates: I) -> Vec<T>
    where
        I: IntoIterator<Item = (&'a BlindIndexToken, T)>,
    {
        candidates
            .into_iter()
            .filter(|(stored, _)| tokens_equal(stored, token))
            .map(|(_, item)| item)
            .collect()
    }

    /// Returns the project's config, creating and storing one if absent.
    pub fn ensure_config(
        &self,
        registry: &BlindIndexRegistry,
        project_id: ProjectId,
    ) -> EngineResult<BlindIndexConfig> {
        if registry.state(project_id)? != BlindIndexState::Absent {
            return registry.get(project_id);
        }
        let config = self.create_config(project_id)?;
        self.store_config(registry, config)
    }

    /// Stores a freshly created config, deferring to one stored concurrently.
    fn store_config(
        &self,
        registry: &BlindIndexRegistry,
        config: BlindIndexConfig,
    ) -> EngineResult<BlindIndexConfig> {
        let project_id = config.project_id;
        match registry.insert(config.clone()) {
            Ok(()) => {
                info!(project_id = %project_id, "stored blind index config");
                Ok(config)
            }
            // Lost a race with another creator; theirs is the config.
            Err(EngineError::Conflict(_)) => {
                debug!(project_id = %project_id, "blind index config already stored");
                registry.get(project_id)
            }
            Err(e) => Err(e),
        }
    }

    /// Computes the token for `value` in `project_id`, activating its config.
    pub fn lookup(
        &self,
        registry: &BlindIndexRegistry,
        project_id: ProjectId,
        value: &str,
    ) -> EngineResult<BlindIndexToken> {
        let config = registry.get(project_id)?;
        let token = self.blind_index(&config, value)?;
        if registry.state(project_id)? == BlindIndexState::Created {
            registry.mark_active(project_id)?;
            debug!(project_id = %project_id, "blind index config active");
        }
        Ok(token)
    }
}

/// Compares two tokens without short-circuiting on the first differing byte.
fn tokens_equal(a: &BlindIndexToken, b: &BlindIndexToken) -> bool {
    let (a, b) = (a.as_str().as_bytes(), b.as_str().as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
