//! Persisted shapes and identifiers.

use keyward_crypto::encoding::b64;
use keyward_crypto::{
    EncryptedPrivateKeyRecord, KEY_SIZE, KeyEncoding, PublicKeyBytes, SymmetricAlgorithm,
    fill_random,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Project identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// User identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The per-project symmetric key. Only ever held in memory.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ProjectKey([u8; KEY_SIZE]);

impl ProjectKey {
    /// Draws a new random project key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        fill_random(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// The key as a symmetric key for encrypting secret values.
    pub fn to_symmetric_key(&self) -> keyward_crypto::SymmetricKey {
        keyward_crypto::SymmetricKey::from_bytes(self.0)
    }
}

impl PartialEq for ProjectKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for ProjectKey {}

impl fmt::Debug for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProjectKey([REDACTED])")
    }
}

/// One member's boxed copy of a project key.
///
/// Opening it takes the receiver's private key and the sender's public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEnvelope {
    pub project_id: ProjectId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
}

/// A project's encrypted blind-index salt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlindIndexConfig {
    pub project_id: ProjectId,
    pub algorithm: SymmetricAlgorithm,
    pub key_encoding: KeyEncoding,
    #[serde(rename = "saltIV", with = "b64")]
    pub salt_iv: Vec<u8>,
    #[serde(rename = "encryptedSaltCipherText", with = "b64")]
    pub encrypted_salt_ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    pub salt_tag: Vec<u8>,
}

/// A user's public key and password-protected private key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserKeyRecord {
    pub user_id: UserId,
    pub public_key: PublicKeyBytes,
    pub encrypted_private_key: EncryptedPrivateKeyRecord,
}

/// A user's identity and public key, as needed to address an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    pub public_key: PublicKeyBytes,
}

impl From<&UserKeyRecord> for Member {
    fn from(record: &UserKeyRecord) -> Self {
        Self {
            user_id: record.user_id,
            public_key: record.public_key,
        }
    }
}
