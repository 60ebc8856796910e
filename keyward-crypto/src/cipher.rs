//! Symmetric authenticated encryption with a detached IV and tag.
//!
//! Each call to [`encrypt`] draws a fresh 96-bit IV from the OS CSPRNG. The
//! ciphertext, IV and tag travel together in [`EncryptedData`]; none of them
//! is ever persisted alone.

use crate::encoding::b64;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{SymmetricKey, fill_random};
use aes_gcm::Aes256Gcm;
use aes_gcm::aead::{self, AeadInPlace, KeyInit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::ChaCha20Poly1305;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// IV (nonce) size for both supported AEADs.
pub const IV_SIZE: usize = 12;

/// Authentication tag size for both supported AEADs.
pub const TAG_SIZE: usize = 16;

/// Symmetric AEAD algorithms understood by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymmetricAlgorithm {
    #[default]
    #[serde(rename = "AES_256_GCM")]
    Aes256Gcm,
    #[serde(rename = "CHACHA20_POLY1305")]
    ChaCha20Poly1305,
}

impl SymmetricAlgorithm {
    fn tag_byte(self) -> u8 {
        match self {
            Self::Aes256Gcm => 1,
            Self::ChaCha20Poly1305 => 2,
        }
    }

    fn from_tag_byte(b: u8) -> CryptoResult<Self> {
        match b {
            1 => Ok(Self::Aes256Gcm),
            2 => Ok(Self::ChaCha20Poly1305),
            other => Err(CryptoError::InvalidInput(format!(
                "unknown algorithm identifier {other}"
            ))),
        }
    }
}

/// Ciphertext plus everything needed to verify and decrypt it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    pub algorithm: SymmetricAlgorithm,
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
    #[serde(with = "b64")]
    pub tag: Vec<u8>,
}

impl EncryptedData {
    /// Compact form: `algorithm (1) || iv (12) || tag (16) || ciphertext`, base64.
    pub fn to_base64(&self) -> String {
        let mut out = Vec::with_capacity(1 + IV_SIZE + TAG_SIZE + self.ciphertext.len());
        out.push(self.algorithm.tag_byte());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        STANDARD.encode(out)
    }

    /// Parses the compact form produced by [`EncryptedData::to_base64`].
    pub fn from_base64(s: &str) -> CryptoResult<Self> {
        let raw = STANDARD.decode(s)?;
        let header = 1 + IV_SIZE + TAG_SIZE;
        if raw.len() < header {
            return Err(CryptoError::InvalidInput(format!(
                "encrypted blob too short: {} bytes, need at least {header}",
                raw.len()
            )));
        }

        let algorithm = SymmetricAlgorithm::from_tag_byte(raw[0])?;
        Ok(Self {
            algorithm,
            iv: raw[1..1 + IV_SIZE].to_vec(),
            tag: raw[1 + IV_SIZE..header].to_vec(),
            ciphertext: raw[header..].to_vec(),
        })
    }
}

/// Encrypts `plaintext` under `key` with AES-256-GCM and a fresh random IV.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    encrypt_with(SymmetricAlgorithm::Aes256Gcm, key, plaintext)
}

/// Encrypts `plaintext` under `key` with the chosen algorithm and a fresh random IV.
pub fn encrypt_with(
    algorithm: SymmetricAlgorithm,
    key: &SymmetricKey,
    plaintext: &[u8],
) -> CryptoResult<EncryptedData> {
    let mut iv = [0u8; IV_SIZE];
    fill_random(&mut iv);

    let mut buffer = plaintext.to_vec();
    let tag = match algorithm {
        SymmetricAlgorithm::Aes256Gcm => seal::<Aes256Gcm>(key, &iv, &mut buffer)?,
        SymmetricAlgorithm::ChaCha20Poly1305 => seal::<ChaCha20Poly1305>(key, &iv, &mut buffer)?,
    };

    Ok(EncryptedData {
        algorithm,
        ciphertext: buffer,
        iv: iv.to_vec(),
        tag,
    })
}

/// Verifies and decrypts `data` under `key`.
///
/// Returns [`CryptoError::AuthenticationFailure`] when the tag does not verify;
/// no plaintext is released in that case.
pub fn decrypt(key: &SymmetricKey, data: &EncryptedData) -> CryptoResult<Vec<u8>> {
    if data.iv.len() != IV_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "iv must be {IV_SIZE} bytes, got {}",
            data.iv.len()
        )));
    }
    if data.tag.len() != TAG_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "tag must be {TAG_SIZE} bytes, got {}",
            data.tag.len()
        )));
    }

    let mut buffer = Zeroizing::new(data.ciphertext.clone());
    match data.algorithm {
        SymmetricAlgorithm::Aes256Gcm => open::<Aes256Gcm>(key, data, &mut buffer)?,
        SymmetricAlgorithm::ChaCha20Poly1305 => open::<ChaCha20Poly1305>(key, data, &mut buffer)?,
    }
    Ok(buffer.to_vec())
}

/// Encrypts a UTF-8 string.
pub fn encrypt_string(key: &SymmetricKey, plaintext: &str) -> CryptoResult<EncryptedData> {
    encrypt(key, plaintext.as_bytes())
}

/// Decrypts into a UTF-8 string.
pub fn decrypt_string(key: &SymmetricKey, data: &EncryptedData) -> CryptoResult<String> {
    let bytes = decrypt(key, data)?;
    String::from_utf8(bytes)
        .map_err(|_| CryptoError::Encoding("decrypted bytes are not valid UTF-8".to_string()))
}

fn seal<C>(key: &SymmetricKey, iv: &[u8; IV_SIZE], buffer: &mut Vec<u8>) -> CryptoResult<Vec<u8>>
where
    C: AeadInPlace + KeyInit,
{
    let cipher = C::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let tag = cipher
        .encrypt_in_place_detached(aead::Nonce::<C>::from_slice(iv), b"", buffer)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(tag.to_vec())
}

fn open<C>(key: &SymmetricKey, data: &EncryptedData, buffer: &mut [u8]) -> CryptoResult<()>
where
    C: AeadInPlace + KeyInit,
{
    let cipher = C::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    cipher
        .decrypt_in_place_detached(
            aead::Nonce::<C>::from_slice(&data.iv),
            b"",
            buffer,
            aead::Tag::<C>::from_slice(&data.tag),
        )
        .map_err(|_| CryptoError::AuthenticationFailure)
}
