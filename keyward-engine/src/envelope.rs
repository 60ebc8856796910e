//! Project-key envelopes.
//!
//! Wraps the keyward-crypto box primitives to hand one project key to many
//! members: each member gets an independent envelope boxed from a sender
//! to them. Only user keys are involved here; server secrets never are.
//!
//! Revoking a member deletes their envelope. It does not re-encrypt the
//! project key, so a member who already unwrapped the key can keep using it
//! until the project key is rotated.

use crate::error::{EngineError, EngineResult};
use crate::registry::EnvelopeRegistry;
use crate::types::{KeyEnvelope, Member, ProjectId, ProjectKey, UserId};
use crate::user_keys::UnlockedUser;
use keyward_crypto::{KEY_SIZE, PublicKeyBytes, SecretKey, decrypt_asymmetric, encrypt_asymmetric};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Looks up a user's public key, e.g. to find who sent an envelope.
pub trait PublicKeyDirectory {
    fn public_key(&self, user_id: UserId) -> Option<PublicKeyBytes>;
}

impl PublicKeyDirectory for HashMap<UserId, PublicKeyBytes> {
    fn public_key(&self, user_id: UserId) -> Option<PublicKeyBytes> {
        self.get(&user_id).copied()
    }
}

/// What a revocation did and did not accomplish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct RevocationNotice {
    pub project_id: ProjectId,
    pub user_id: UserId,
    /// Always true: the revoked user may hold a cached plaintext key, so only
    /// rotating the project key fully cuts off access.
    pub rotation_required: bool,
}

/// Creates and opens project-key envelopes.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvelopeService;

impl EnvelopeService {
    pub fn new() -> Self {
        Self
    }

    /// Generates a fresh project key.
    pub fn generate_project_key(&self) -> ProjectKey {
        ProjectKey::generate()
    }

    /// Boxes `project_key` from `sender` to `recipient`.
    ///
    /// `recipient` may be the sender themself (the admin's self-envelope).
    pub fn create_envelope(
        &self,
        project_id: ProjectId,
        project_key: &ProjectKey,
        recipient: &Member,
        sender_id: UserId,
        sender_sk: &SecretKey,
    ) -> EngineResult<KeyEnvelope> {
        let boxed = encrypt_asymmetric(
            project_key.as_bytes(),
            &recipient.public_key.to_public_key(),
            sender_sk,
        )?;

        debug!(
            project_id = %project_id,
            sender_id = %sender_id,
            receiver_id = %recipient.user_id,
            "created project key envelope"
        );
        Ok(KeyEnvelope {
            project_id,
            sender_id,
            receiver_id: recipient.user_id,
            ciphertext: boxed.ciphertext,
            nonce: boxed.nonce,
        })
    }

    /// Recovers the project key from an envelope.
    ///
    /// Fails with [`EngineError::AuthenticationFailure`] when the keys do not
    /// match the envelope or it was altered. Never returns unverified bytes.
    pub fn open_envelope(
        &self,
        envelope: &KeyEnvelope,
        recipient_sk: &SecretKey,
        sender_pk: &PublicKeyBytes,
    ) -> EngineResult<ProjectKey> {
        let opened = decrypt_asymmetric(
            &envelope.ciphertext,
            &envelope.nonce,
            &sender_pk.to_public_key(),
            recipient_sk,
        )
        .map_err(|e| {
            warn!(
                project_id = %envelope.project_id,
                receiver_id = %envelope.receiver_id,
                "cannot access project key"
            );
            EngineError::from(e)
        })?;
        let opened = Zeroizing::new(opened);

        let bytes: [u8; KEY_SIZE] = opened.as_slice().try_into().map_err(|_| {
            EngineError::InvalidInput(format!(
                "envelope holds {} bytes, expected a {KEY_SIZE}-byte project key",
                opened.len()
            ))
        })?;
        Ok(ProjectKey::from_bytes(bytes))
    }

    /// Opens the envelope addressed to `user` in `registry`.
    pub fn unlock_project_key(
        &self,
        registry: &EnvelopeRegistry,
        directory: &dyn PublicKeyDirectory,
        project_id: ProjectId,
        user: &UnlockedUser,
    ) -> EngineResult<ProjectKey> {
        let envelope = registry.get(project_id, user.user_id)?;
        let sender_pk = directory.public_key(envelope.sender_id).ok_or_else(|| {
            EngineError::NotFound(format!("public key for user {}", envelope.sender_id))
        })?;
        self.open_envelope(&envelope, user.secret(), &sender_pk)
    }

    /// Gives `new_member` access to `project_id` with one new envelope.
    ///
    /// The granter must hold an envelope of their own: the key boxed for the
    /// new member is the one the granter's envelope opens to. A granter with
    /// no envelope gets [`EngineError::NotFound`]; one whose envelope does not
    /// open gets [`EngineError::AuthenticationFailure`]. A member who already
    /// holds an envelope is a [`EngineError::Conflict`].
    pub fn grant_access(
        &self,
        registry: &EnvelopeRegistry,
        directory: &dyn PublicKeyDirectory,
        project_id: ProjectId,
        granter: &UnlockedUser,
        new_member: &Member,
    ) -> EngineResult<KeyEnvelope> {
        let project_key = self
            .unlock_project_key(registry, directory, project_id, granter)
            .map_err(|e| {
                warn!(
                    project_id = %project_id,
                    granter_id = %granter.user_id,
                    "grant refused: granter cannot open the project key"
                );
                e
            })?;
        let envelope = self.create_envelope(
            project_id,
            &project_key,
            new_member,
            granter.user_id,
            granter.secret(),
        )?;
        registry.insert(envelope.clone())?;
        info!(
            project_id = %project_id,
            granter_id = %granter.user_id,
            member_id = %new_member.user_id,
            "granted project access"
        );
        Ok(envelope)
    }

    /// Deletes `user_id`'s envelope for `project_id`.
    pub fn revoke_access(
        &self,
        registry: &EnvelopeRegistry,
        project_id: ProjectId,
        user_id: UserId,
    ) -> EngineResult<RevocationNotice> {
        registry.remove(project_id, user_id)?.ok_or_else(|| {
            EngineError::NotFound(format!("no envelope for user {user_id} in project {project_id}"))
        })?;
        warn!(
            project_id = %project_id,
            user_id = %user_id,
            "revoked project access; previously unwrapped keys remain valid until rotation"
        );
        Ok(RevocationNotice {
            project_id,
            user_id,
            rotation_required: true,
        })
    }
}
