//! Authenticated public-key encryption.
//!
//! X25519 key agreement + XSalsa20-Poly1305 (the NaCl `box` construction).
//! Unlike an anonymous sealed box, the sender's long-term secret key takes part
//! in the key agreement, so a recipient who opens a message with the sender's
//! public key also learns that the holder of that key produced it.

use crate::encoding::{b64, b64_array};
use crate::error::{CryptoError, CryptoResult};
use crate::key::fill_random;
use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// X25519 key length in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// XSalsa20 nonce length in bytes.
pub const BOX_NONCE_SIZE: usize = 24;

/// Poly1305 tag appended to every box ciphertext.
pub const BOX_TAG_SIZE: usize = 16;

/// A user's X25519 keypair.
///
/// The secret key implements `ZeroizeOnDrop` (from crypto_box).
pub struct UserKeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

impl UserKeyPair {
    /// Generates a fresh keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        let secret = SecretKey::generate(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Reconstructs a keypair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = SecretKey::from(bytes);
        let public = secret.public_key();
        Self { secret, public }
    }

    pub fn public_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }
}

impl std::fmt::Debug for UserKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserKeyPair")
            .field("public", &self.public_bytes())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Parses a 32-byte X25519 public key.
pub fn public_key_from_slice(bytes: &[u8]) -> CryptoResult<PublicKey> {
    let arr: [u8; PUBLIC_KEY_SIZE] =
        bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            })?;
    Ok(PublicKey::from(arr))
}

/// Output of [`encrypt_asymmetric`]. The Poly1305 tag is the trailing 16
/// bytes of `ciphertext`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsymmetricCiphertext {
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
}

/// Encrypts `message` for `recipient_pk`, authenticated by `sender_sk`.
///
/// A fresh 24-byte nonce is drawn for every call.
pub fn encrypt_asymmetric(
    message: &[u8],
    recipient_pk: &PublicKey,
    sender_sk: &SecretKey,
) -> CryptoResult<AsymmetricCiphertext> {
    let salsa_box = SalsaBox::new(recipient_pk, sender_sk);

    let mut nonce_bytes = [0u8; BOX_NONCE_SIZE];
    fill_random(&mut nonce_bytes);

    let ciphertext = salsa_box
        .encrypt(crypto_box::Nonce::from_slice(&nonce_bytes), message)
        .map_err(|e| CryptoError::Encryption(format!("box encryption failed: {e}")))?;

    Ok(AsymmetricCiphertext {
        ciphertext,
        nonce: nonce_bytes.to_vec(),
    })
}

/// Opens a box produced by [`encrypt_asymmetric`].
///
/// Fails with [`CryptoError::AuthenticationFailure`] when the keys do not pair
/// up or when the nonce or ciphertext were altered.
pub fn decrypt_asymmetric(
    ciphertext: &[u8],
    nonce: &[u8],
    sender_pk: &PublicKey,
    recipient_sk: &SecretKey,
) -> CryptoResult<Vec<u8>> {
    if nonce.len() != BOX_NONCE_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "nonce must be {BOX_NONCE_SIZE} bytes, got {}",
            nonce.len()
        )));
    }
    if ciphertext.len() < BOX_TAG_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "ciphertext shorter than the {BOX_TAG_SIZE}-byte tag"
        )));
    }

    let salsa_box = SalsaBox::new(sender_pk, recipient_sk);
    salsa_box
        .decrypt(crypto_box::Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailure)
}

/// Serde-friendly public key wrapper for persisted rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKeyBytes(#[serde(with = "b64_array")] pub [u8; 32]);

impl PublicKeyBytes {
    pub fn to_public_key(&self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<&PublicKey> for PublicKeyBytes {
    fn from(pk: &PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}
