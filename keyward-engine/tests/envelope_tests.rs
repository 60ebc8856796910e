//! Project-key envelope tests.
//!
//! Validates that:
//! - Every member opens their own envelope to the same project key
//! - Wrong receiver keys, wrong sender keys and tampering are rejected
//! - Grants are unique per (project, member) and revocation deletes

mod support;

use keyward_engine::{
    EngineError, EnvelopeRegistry, EnvelopeService, KeyEnvelope, ProjectId, ProjectKey,
    PublicKeyDirectory, UnlockedUser, UserId,
};
use keyward_crypto::PublicKeyBytes;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashMap;
use support::unlocked_user;

#[test]
fn member_envelope_opens_to_same_key() {
    let svc = EnvelopeService::new();
    let (admin, member) = (unlocked_user(), unlocked_user());
    let project = ProjectId::new();
    let key = svc.generate_project_key();

    let env = svc
        .create_envelope(project, &key, &member.member(), admin.user_id, admin.secret())
        .unwrap();
    assert_eq!(env.sender_id, admin.user_id);
    assert_eq!(env.receiver_id, member.user_id);
    assert_eq!(env.nonce.len(), 24);

    let opened = svc
        .open_envelope(&env, member.secret(), &admin.member().public_key)
        .unwrap();
    assert_eq!(opened, key);
}

#[test]
fn third_party_cannot_open() {
    let svc = EnvelopeService::new();
    let (admin, member, outsider) = (unlocked_user(), unlocked_user(), unlocked_user());
    let key = svc.generate_project_key();

    let env = svc
        .create_envelope(ProjectId::new(), &key, &member.member(), admin.user_id, admin.secret())
        .unwrap();
    let err = svc
        .open_envelope(&env, outsider.secret(), &admin.member().public_key)
        .unwrap_err();
    assert!(matches!(err, EngineError::AuthenticationFailure));
}

#[test]
fn tampered_envelope_rejected() {
    let svc = EnvelopeService::new();
    let admin = unlocked_user();
    let key = svc.generate_project_key();
    let env = svc
        .create_envelope(ProjectId::new(), &key, &admin.member(), admin.user_id, admin.secret())
        .unwrap();
    let sender_pk = admin.member().public_key;

    let mut bad_ct = env.clone();
    bad_ct.ciphertext[0] ^= 0x01;
    assert!(matches!(
        svc.open_envelope(&bad_ct, admin.secret(), &sender_pk).unwrap_err(),
        EngineError::AuthenticationFailure
    ));

    let mut bad_nonce = env.clone();
    bad_nonce.nonce[23] ^= 0x80;
    assert!(matches!(
        svc.open_envelope(&bad_nonce, admin.secret(), &sender_pk).unwrap_err(),
        EngineError::AuthenticationFailure
    ));

    let mut short_nonce = env;
    short_nonce.nonce.truncate(12);
    assert!(matches!(
        svc.open_envelope(&short_nonce, admin.secret(), &sender_pk).unwrap_err(),
        EngineError::InvalidInput(_)
    ));
}

#[test]
fn envelopes_for_same_key_differ() {
    let svc = EnvelopeService::new();
    let admin = unlocked_user();
    let key = svc.generate_project_key();
    let project = ProjectId::new();

    let a = svc
        .create_envelope(project, &key, &admin.member(), admin.user_id, admin.secret())
        .unwrap();
    let b = svc
        .create_envelope(project, &key, &admin.member(), admin.user_id, admin.secret())
        .unwrap();
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.ciphertext, b.ciphertext);
}

/// Stores `admin`'s self-envelope for a fresh project, as bootstrap does.
fn seeded_project(
    svc: &EnvelopeService,
    registry: &EnvelopeRegistry,
    admin: &UnlockedUser,
) -> (ProjectId, ProjectKey) {
    let project = ProjectId::new();
    let key = svc.generate_project_key();
    let env = svc
        .create_envelope(project, &key, &admin.member(), admin.user_id, admin.secret())
        .unwrap();
    registry.insert(env).unwrap();
    (project, key)
}

fn directory_of(users: &[&UnlockedUser]) -> HashMap<UserId, PublicKeyBytes> {
    users
        .iter()
        .map(|u| (u.user_id, u.member().public_key))
        .collect()
}

#[test]
fn grant_then_unlock_through_registry() {
    let svc = EnvelopeService::new();
    let registry = EnvelopeRegistry::new();
    let (admin, member) = (unlocked_user(), unlocked_user());
    let (project, key) = seeded_project(&svc, &registry, &admin);
    let directory = directory_of(&[&admin, &member]);

    let env = svc
        .grant_access(&registry, &directory, project, &admin, &member.member())
        .unwrap();
    assert_eq!(env.sender_id, admin.user_id);
    assert_eq!(registry.receivers(project).unwrap().len(), 2);

    let unlocked = svc
        .unlock_project_key(&registry, &directory, project, &member)
        .unwrap();
    assert_eq!(unlocked, key);
}

#[test]
fn member_can_grant_onward() {
    let svc = EnvelopeService::new();
    let registry = EnvelopeRegistry::new();
    let (admin, member, newcomer) = (unlocked_user(), unlocked_user(), unlocked_user());
    let (project, key) = seeded_project(&svc, &registry, &admin);
    let directory = directory_of(&[&admin, &member, &newcomer]);

    svc.grant_access(&registry, &directory, project, &admin, &member.member())
        .unwrap();
    svc.grant_access(&registry, &directory, project, &member, &newcomer.member())
        .unwrap();

    let unlocked = svc
        .unlock_project_key(&registry, &directory, project, &newcomer)
        .unwrap();
    assert_eq!(unlocked, key);
}

#[test]
fn non_member_cannot_grant() {
    let svc = EnvelopeService::new();
    let registry = EnvelopeRegistry::new();
    let (admin, outsider, member) = (unlocked_user(), unlocked_user(), unlocked_user());
    let (project, _key) = seeded_project(&svc, &registry, &admin);
    let directory = directory_of(&[&admin, &outsider, &member]);

    let err = svc
        .grant_access(&registry, &directory, project, &outsider, &member.member())
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert!(registry.get(project, member.user_id).is_err());
    assert_eq!(registry.len().unwrap(), 1);
}

#[test]
fn granter_with_foreign_envelope_cannot_grant() {
    // An envelope stored under the granter's id but boxed for someone else
    // does not open, so nothing is granted.
    let svc = EnvelopeService::new();
    let registry = EnvelopeRegistry::new();
    let (admin, impostor, member) = (unlocked_user(), unlocked_user(), unlocked_user());
    let project = ProjectId::new();
    let key = svc.generate_project_key();
    let mut env = svc
        .create_envelope(project, &key, &admin.member(), admin.user_id, admin.secret())
        .unwrap();
    env.receiver_id = impostor.user_id;
    registry.insert(env).unwrap();
    let directory = directory_of(&[&admin, &impostor, &member]);

    let err = svc
        .grant_access(&registry, &directory, project, &impostor, &member.member())
        .unwrap_err();
    assert!(matches!(err, EngineError::AuthenticationFailure));
    assert!(registry.get(project, member.user_id).is_err());
}

#[test]
fn unknown_sender_is_not_found() {
    let svc = EnvelopeService::new();
    let registry = EnvelopeRegistry::new();
    let (admin, member) = (unlocked_user(), unlocked_user());
    let (project, _key) = seeded_project(&svc, &registry, &admin);
    svc.grant_access(&registry, &directory_of(&[&admin]), project, &admin, &member.member())
        .unwrap();

    let empty: HashMap<UserId, PublicKeyBytes> = HashMap::new();
    assert!(empty.public_key(admin.user_id).is_none());
    assert!(matches!(
        svc.unlock_project_key(&registry, &empty, project, &member)
            .unwrap_err(),
        EngineError::NotFound(_)
    ));
}

#[test]
fn duplicate_grant_is_conflict() {
    let svc = EnvelopeService::new();
    let registry = EnvelopeRegistry::new();
    let (admin, member) = (unlocked_user(), unlocked_user());
    let (project, _key) = seeded_project(&svc, &registry, &admin);
    let directory = directory_of(&[&admin, &member]);

    svc.grant_access(&registry, &directory, project, &admin, &member.member())
        .unwrap();
    let err = svc
        .grant_access(&registry, &directory, project, &admin, &member.member())
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    assert_eq!(registry.len().unwrap(), 2);
}

#[test]
fn revoke_deletes_envelope_and_requires_rotation() {
    let svc = EnvelopeService::new();
    let registry = EnvelopeRegistry::new();
    let (admin, member) = (unlocked_user(), unlocked_user());
    let (project, _key) = seeded_project(&svc, &registry, &admin);
    svc.grant_access(&registry, &directory_of(&[&admin]), project, &admin, &member.member())
        .unwrap();

    let notice = svc.revoke_access(&registry, project, member.user_id).unwrap();
    assert_eq!(notice.project_id, project);
    assert_eq!(notice.user_id, member.user_id);
    assert!(notice.rotation_required);

    assert!(matches!(
        registry.get(project, member.user_id).unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert!(matches!(
        svc.revoke_access(&registry, project, member.user_id)
            .unwrap_err(),
        EngineError::NotFound(_)
    ));
}

#[test]
fn envelope_json_roundtrip_still_opens() {
    let svc = EnvelopeService::new();
    let admin = unlocked_user();
    let key = svc.generate_project_key();
    let env = svc
        .create_envelope(ProjectId::new(), &key, &admin.member(), admin.user_id, admin.secret())
        .unwrap();

    let json = serde_json::to_string(&env).unwrap();
    let back: KeyEnvelope = serde_json::from_str(&json).unwrap();
    assert_eq!(back, env);
    assert_eq!(
        svc.open_envelope(&back, admin.secret(), &admin.member().public_key)
            .unwrap(),
        key
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_project_key_roundtrips(bytes in any::<[u8; 32]>()) {
        let svc = EnvelopeService::new();
        let (sender, receiver) = (unlocked_user(), unlocked_user());
        let key = ProjectKey::from_bytes(bytes);

        let env = svc
            .create_envelope(ProjectId::new(), &key, &receiver.member(), sender.user_id, sender.secret())
            .unwrap();
        let opened = svc
            .open_envelope(&env, receiver.secret(), &sender.member().public_key)
            .unwrap();
        prop_assert_eq!(opened.as_bytes(), &bytes);
    }
}
