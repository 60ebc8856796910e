//! Engine error types.

use keyward_crypto::CryptoError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced to request-handling code.
///
/// None of these are retryable with the same inputs.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A tag, key pairing, or password did not verify. Deliberately vague.
    #[error("access denied: cannot decrypt")]
    AuthenticationFailure,

    /// A server-held secret is absent. Raised at startup, never per request.
    #[error("missing key material: {0}")]
    MissingKeyMaterial(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CryptoError> for EngineError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::AuthenticationFailure => Self::AuthenticationFailure,
            CryptoError::InvalidInput(msg) | CryptoError::Encoding(msg) => Self::InvalidInput(msg),
            CryptoError::InvalidKeyLength { expected, actual } => Self::InvalidInput(format!(
                "invalid key length: expected {expected} bytes, got {actual}"
            )),
            CryptoError::KeyDerivation(msg) => Self::Config(format!("key derivation: {msg}")),
            CryptoError::Encryption(msg) => Self::InvalidInput(format!("encryption: {msg}")),
        }
    }
}
