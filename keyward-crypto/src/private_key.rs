//! Password-protected storage of a user's X25519 private key.
//!
//! Two record layouts exist:
//!
//! - **V1**: `Argon2id(password, salt)` is the key that encrypts the private key.
//! - **V2**: `Argon2id(password, salt)` encrypts a random *protected key*, and
//!   the protected key encrypts the private key. A password change only
//!   rewraps the 32-byte protected key.
//!
//! Unwrapping never reveals which step failed. A wrong password, a corrupted
//! ciphertext, a swapped salt, or a truncated field all surface as
//! [`CryptoError::AuthenticationFailure`].

use crate::cipher::{EncryptedData, decrypt, encrypt};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KdfParams, Salt, SymmetricKey, derive_key, generate_random_key};
use crypto_box::SecretKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Layout of an [`EncryptedPrivateKeyRecord`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordVersion {
    V1,
    #[default]
    V2,
}

/// A private key encrypted under a password-derived key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPrivateKeyRecord {
    pub version: RecordVersion,
    pub kdf: KdfParams,
    pub salt: Salt,
    /// The private key, encrypted under the password key (V1) or the protected key (V2).
    pub encrypted_private_key: EncryptedData,
    /// V2 only: the protected key, encrypted under the password key.
    pub protected_key: Option<EncryptedData>,
}

/// Encrypts `sk` under `password`, producing a record of the given version.
pub fn protect_private_key(
    sk: &SecretKey,
    password: &str,
    params: &KdfParams,
    version: RecordVersion,
) -> CryptoResult<EncryptedPrivateKeyRecord> {
    if password.is_empty() {
        return Err(CryptoError::InvalidInput("password must not be empty".to_string()));
    }

    let salt = Salt::random();
    let password_key = derive_key(password, &salt, params)?;
    let sk_bytes = Zeroizing::new(sk.to_bytes());

    let (encrypted_private_key, protected_key) = match version {
        RecordVersion::V1 => (encrypt(&password_key, sk_bytes.as_slice())?, None),
        RecordVersion::V2 => {
            let protected = generate_random_key();
            let wrapped = encrypt(&password_key, protected.as_bytes())?;
            (encrypt(&protected, sk_bytes.as_slice())?, Some(wrapped))
        }
    };

    Ok(EncryptedPrivateKeyRecord {
        version,
        kdf: *params,
        salt,
        encrypted_private_key,
        protected_key,
    })
}

/// Recovers the raw private key from `record` using `password`.
pub fn derive_private_key(
    password: &str,
    record: &EncryptedPrivateKeyRecord,
) -> CryptoResult<SecretKey> {
    let content_key = unlock_content_key(password, record)?;
    let plaintext = Zeroizing::new(
        decrypt(&content_key, &record.encrypted_private_key)
            .map_err(|_| CryptoError::AuthenticationFailure)?,
    );

    let bytes: [u8; 32] = plaintext
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::AuthenticationFailure)?;
    Ok(SecretKey::from(bytes))
}

/// Re-encrypts `record` for `new_password`.
///
/// V2 records keep their protected key and private-key ciphertext; only the
/// protected-key wrapper and salt change. V1 records are re-encrypted in full.
pub fn rewrap_private_key(
    record: &EncryptedPrivateKeyRecord,
    old_password: &str,
    new_password: &str,
) -> CryptoResult<EncryptedPrivateKeyRecord> {
    if new_password.is_empty() {
        return Err(CryptoError::InvalidInput("password must not be empty".to_string()));
    }

    match record.version {
        RecordVersion::V1 => {
            let sk = derive_private_key(old_password, record)?;
            protect_private_key(&sk, new_password, &record.kdf, RecordVersion::V1)
        }
        RecordVersion::V2 => {
            let protected = unlock_content_key(old_password, record)?;
            // The protected key must still open the private key before we rewrap it.
            let _opened = Zeroizing::new(
                decrypt(&protected, &record.encrypted_private_key)
                    .map_err(|_| CryptoError::AuthenticationFailure)?,
            );

            let salt = Salt::random();
            let new_password_key = derive_key(new_password, &salt, &record.kdf)?;
            let wrapped = encrypt(&new_password_key, protected.as_bytes())?;

            Ok(EncryptedPrivateKeyRecord {
                version: RecordVersion::V2,
                kdf: record.kdf,
                salt,
                encrypted_private_key: record.encrypted_private_key.clone(),
                protected_key: Some(wrapped),
            })
        }
    }
}

/// Returns the key that directly encrypts the private key.
fn unlock_content_key(
    password: &str,
    record: &EncryptedPrivateKeyRecord,
) -> CryptoResult<SymmetricKey> {
    let password_key = derive_key(password, &record.salt, &record.kdf)
        .map_err(|_| CryptoError::AuthenticationFailure)?;

    match (record.version, &record.protected_key) {
        (RecordVersion::V1, None) => Ok(password_key),
        (RecordVersion::V2, Some(wrapped)) => {
            let raw = Zeroizing::new(
                decrypt(&password_key, wrapped).map_err(|_| CryptoError::AuthenticationFailure)?,
            );
            SymmetricKey::from_slice(&raw).map_err(|_| CryptoError::AuthenticationFailure)
        }
        _ => Err(CryptoError::AuthenticationFailure),
    }
}
