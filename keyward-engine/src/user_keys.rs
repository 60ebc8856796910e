//! User keypairs and password unlock.

use crate::error::{EngineError, EngineResult};
use crate::types::{Member, UserId, UserKeyRecord};
use keyward_crypto::{
    KdfParams, PublicKeyBytes, RecordVersion, SecretKey, UserKeyPair, derive_private_key,
    protect_private_key, rewrap_private_key,
};
use tracing::{debug, info, warn};

/// A user whose private key has been recovered for the current request.
#[derive(Debug)]
pub struct UnlockedUser {
    pub user_id: UserId,
    pub keypair: UserKeyPair,
}

impl UnlockedUser {
    pub fn member(&self) -> Member {
        Member {
            user_id: self.user_id,
            public_key: PublicKeyBytes::from(&self.keypair.public),
        }
    }

    pub fn secret(&self) -> &SecretKey {
        &self.keypair.secret
    }
}

/// Creates and unlocks password-protected user keypairs.
#[derive(Clone, Debug)]
pub struct UserKeyService {
    kdf: KdfParams,
}

impl UserKeyService {
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    /// Generates a keypair for `user_id` and protects it with `password`.
    pub fn create_user(
        &self,
        user_id: UserId,
        password: &str,
    ) -> EngineResult<(UserKeyRecord, UnlockedUser)> {
        let keypair = UserKeyPair::generate();
        let encrypted_private_key =
            protect_private_key(&keypair.secret, password, &self.kdf, RecordVersion::V2)?;

        let record = UserKeyRecord {
            user_id,
            public_key: PublicKeyBytes::from(&keypair.public),
            encrypted_private_key,
        };
        info!(user_id = %user_id, "created user keypair");
        Ok((record, UnlockedUser { user_id, keypair }))
    }

    /// Recovers the private key in `record` with `password`.
    ///
    /// Wrong passwords, corrupted records and records whose private key does
    /// not match the stored public key all fail the same way.
    pub fn derive_private_key(
        &self,
        password: &str,
        record: &UserKeyRecord,
    ) -> EngineResult<SecretKey> {
        let sk = derive_private_key(password, &record.encrypted_private_key)
            .map_err(|_| EngineError::AuthenticationFailure)?;
        if sk.public_key().as_bytes() != &record.public_key.0 {
            return Err(EngineError::AuthenticationFailure);
        }
        Ok(sk)
    }

    /// Unlocks a user whose record may not exist.
    ///
    /// An absent record is [`EngineError::NotFound`]; a wrong password is
    /// [`EngineError::AuthenticationFailure`].
    pub fn unlock(
        &self,
        user_id: UserId,
        password: &str,
        record: Option<&UserKeyRecord>,
    ) -> EngineResult<UnlockedUser> {
        let record = record.ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))?;
        if record.user_id != user_id {
            return Err(EngineError::InvalidInput(format!(
                "record belongs to user {}, not {user_id}",
                record.user_id
            )));
        }

        match self.derive_private_key(password, record) {
            Ok(sk) => {
                debug!(user_id = %user_id, "unlocked user private key");
                Ok(UnlockedUser {
                    user_id,
                    keypair: UserKeyPair::from_secret_bytes(sk.to_bytes()),
                })
            }
            Err(e) => {
                warn!(user_id = %user_id, "private key unlock failed");
                Err(e)
            }
        }
    }

    /// Re-protects `record` under `new_password`.
    pub fn change_password(
        &self,
        record: &UserKeyRecord,
        old_password: &str,
        new_password: &str,
    ) -> EngineResult<UserKeyRecord> {
        let encrypted_private_key =
            rewrap_private_key(&record.encrypted_private_key, old_password, new_password)?;
        info!(user_id = %record.user_id, "rewrapped user private key");
        Ok(UserKeyRecord {
            encrypted_private_key,
            ..record.clone()
        })
    }
}
