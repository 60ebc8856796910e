//! Byte encodings for persisted key material.

use crate::error::{CryptoError, CryptoResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// How a decrypted blob is turned back into raw key bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEncoding {
    /// The bytes are used as-is (must be valid UTF-8 text).
    Utf8,
    /// The bytes are standard base64 text.
    #[default]
    Base64,
    /// The bytes are lowercase or uppercase hex text.
    Hex,
}

impl KeyEncoding {
    /// Renders raw key bytes as text in this encoding.
    ///
    /// `Utf8` requires the input to already be valid UTF-8.
    pub fn encode(self, raw: &[u8]) -> CryptoResult<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(raw)
                .map(str::to_owned)
                .map_err(|_| CryptoError::Encoding("key bytes are not valid UTF-8".to_string())),
            Self::Base64 => Ok(STANDARD.encode(raw)),
            Self::Hex => Ok(hex::encode(raw)),
        }
    }

    /// Decodes text produced by [`KeyEncoding::encode`] back into raw bytes.
    pub fn decode(self, encoded: &[u8]) -> CryptoResult<Vec<u8>> {
        match self {
            Self::Utf8 => {
                std::str::from_utf8(encoded)
                    .map_err(|_| CryptoError::Encoding("key bytes are not valid UTF-8".to_string()))?;
                Ok(encoded.to_vec())
            }
            Self::Base64 => Ok(STANDARD.decode(encoded)?),
            Self::Hex => Ok(hex::decode(encoded)?),
        }
    }
}

/// Serde adapter storing `Vec<u8>` fields as standard base64 strings.
pub mod b64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter storing fixed-size arrays as standard base64 strings.
pub mod b64_array {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(s).map_err(serde::de::Error::custom)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected {N} bytes, got {len}")))
    }
}
