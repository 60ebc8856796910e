//! Cryptographic primitives for keyward.
//!
//! Provides the building blocks of the secret engine:
//! - AES-256-GCM / ChaCha20-Poly1305 with detached IV and tag
//! - X25519 + XSalsa20-Poly1305 authenticated boxes between two users
//! - Argon2id password derivation and HKDF-SHA256 server-key derivation
//! - Password-protected private-key records
//! - HMAC-SHA256 blind-index tokens
//!
//! # Key hierarchy
//!
//! 1. **User keypair**: X25519. The public half is stored in the clear; the
//!    secret half is stored in an [`EncryptedPrivateKeyRecord`] that only the
//!    user's password opens.
//!
//! 2. **Project key**: 32 random bytes per project. Never stored in the
//!    clear; each member receives a copy boxed from a sender to them.
//!
//! 3. **Blind-index salt**: 16 random bytes per project, encrypted under a key
//!    derived from two server-held secrets. Only the server can open it.
//!
//! Nothing in this crate performs I/O or keeps state between calls.

pub mod blind_index;
mod cipher;
pub mod encoding;
pub mod envelope;
mod error;
mod key;
pub mod private_key;

pub use blind_index::{BLIND_INDEX_SALT_SIZE, BlindIndexSalt, BlindIndexToken, compute_blind_index};
pub use cipher::{
    EncryptedData, IV_SIZE, SymmetricAlgorithm, TAG_SIZE, decrypt, decrypt_string, encrypt,
    encrypt_string, encrypt_with,
};
pub use encoding::KeyEncoding;
pub use envelope::{
    AsymmetricCiphertext, BOX_NONCE_SIZE, PublicKeyBytes, UserKeyPair, decrypt_asymmetric,
    encrypt_asymmetric, public_key_from_slice,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    KEY_SIZE, KdfParams, SALT_SIZE, Salt, SymmetricKey, derive_key, derive_server_key,
    fill_random, generate_random_key, random_bytes,
};
pub use private_key::{
    EncryptedPrivateKeyRecord, RecordVersion, derive_private_key, protect_private_key,
    rewrap_private_key,
};

/// Re-exported so callers can name key types without depending on crypto_box.
pub use crypto_box::{PublicKey, SecretKey};
