//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised by the primitives.
///
/// Every verification failure (bad tag, wrong key, wrong password, tampered
/// nonce) is reported as [`CryptoError::AuthenticationFailure`] with no
/// further detail.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("authentication failed (wrong key or tampered data)")]
    AuthenticationFailure,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl CryptoError {
    /// True for failures caused by a key, tag or nonce that did not verify.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailure)
    }
}

impl From<base64::DecodeError> for CryptoError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Encoding(e.to_string())
    }
}

impl From<hex::FromHexError> for CryptoError {
    fn from(e: hex::FromHexError) -> Self {
        Self::Encoding(e.to_string())
    }
}
