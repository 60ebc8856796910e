//! Blind-index service tests.

mod support;

use keyward_crypto::{BlindIndexToken, SymmetricAlgorithm};
use keyward_engine::{
    BlindIndexRegistry, BlindIndexState, EngineConfig, EngineError, KeyEngine, ProjectId,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use support::{TEST_ENCRYPTION_KEY, fast_kdf, root_key_b64, test_engine};

#[test]
fn same_name_same_token() {
    let engine = test_engine();
    let cfg = engine.search().create_config(ProjectId::new()).unwrap();

    let a = engine.search().blind_index(&cfg, "DATABASE_URL").unwrap();
    let b = engine.search().blind_index(&cfg, "DATABASE_URL").unwrap();
    assert_eq!(a, b);
}

#[test]
fn different_names_different_tokens() {
    let engine = test_engine();
    let cfg = engine.search().create_config(ProjectId::new()).unwrap();
    let salt = engine.search().open_salt(&cfg).unwrap();

    let names = ["DATABASE_URL", "database_url", "DATABASE_URL ", "API_KEY", "A", "B"];
    let tokens: Vec<_> = names
        .iter()
        .map(|n| engine.search().compute_blind_index(n, &salt).unwrap())
        .collect();
    for i in 0..tokens.len() {
        for j in (i + 1)..tokens.len() {
            assert_ne!(tokens[i], tokens[j], "{} vs {}", names[i], names[j]);
        }
    }
}

#[test]
fn projects_get_independent_salts() {
    let engine = test_engine();
    let a = engine.search().create_config(ProjectId::new()).unwrap();
    let b = engine.search().create_config(ProjectId::new()).unwrap();
    assert_ne!(
        engine.search().blind_index(&a, "API_KEY").unwrap(),
        engine.search().blind_index(&b, "API_KEY").unwrap()
    );
}

#[test]
fn salt_survives_engine_restart() {
    let first = test_engine();
    let cfg = first.search().create_config(ProjectId::new()).unwrap();
    let before = first.search().blind_index(&cfg, "STRIPE_KEY").unwrap();

    let json = serde_json::to_string(&cfg).unwrap();
    let restarted = test_engine();
    let stored = serde_json::from_str(&json).unwrap();
    assert_eq!(restarted.search().blind_index(&stored, "STRIPE_KEY").unwrap(), before);
}

#[test]
fn different_root_key_cannot_open_salt() {
    let cfg = test_engine().search().create_config(ProjectId::new()).unwrap();
    let other = KeyEngine::new(
        EngineConfig::new(root_key_b64(9), TEST_ENCRYPTION_KEY).with_kdf(fast_kdf()),
    )
    .unwrap();
    assert!(matches!(
        other.search().open_salt(&cfg).unwrap_err(),
        EngineError::AuthenticationFailure
    ));
}

#[test]
fn tampered_config_rejected() {
    let engine = test_engine();
    let mut cfg = engine.search().create_config(ProjectId::new()).unwrap();
    cfg.salt_tag[0] ^= 0x01;
    assert!(matches!(
        engine.search().open_salt(&cfg).unwrap_err(),
        EngineError::AuthenticationFailure
    ));
}

#[test]
fn truncated_iv_is_invalid_input() {
    let engine = test_engine();
    let mut cfg = engine.search().create_config(ProjectId::new()).unwrap();
    cfg.salt_iv.pop();
    assert!(matches!(
        engine.search().open_salt(&cfg).unwrap_err(),
        EngineError::InvalidInput(_)
    ));
}

#[test]
fn mislabelled_algorithm_fails() {
    let engine = test_engine();
    let mut cfg = engine.search().create_config(ProjectId::new()).unwrap();
    assert_eq!(cfg.algorithm, SymmetricAlgorithm::Aes256Gcm);
    cfg.algorithm = SymmetricAlgorithm::ChaCha20Poly1305;
    assert!(matches!(
        engine.search().open_salt(&cfg).unwrap_err(),
        EngineError::AuthenticationFailure
    ));
}

#[test]
fn registry_lifecycle_absent_created_active() {
    let engine = test_engine();
    let registry = BlindIndexRegistry::new();
    let project = ProjectId::new();
    assert_eq!(registry.state(project).unwrap(), BlindIndexState::Absent);
    assert!(matches!(
        engine.search().lookup(&registry, project, "X").unwrap_err(),
        EngineError::NotFound(_)
    ));

    let created = engine.search().ensure_config(&registry, project).unwrap();
    assert_eq!(registry.state(project).unwrap(), BlindIndexState::Created);

    let again = engine.search().ensure_config(&registry, project).unwrap();
    assert_eq!(again, created);

    let token = engine.search().lookup(&registry, project, "DATABASE_URL").unwrap();
    assert_eq!(registry.state(project).unwrap(), BlindIndexState::Active);
    assert_eq!(token, engine.search().blind_index(&created, "DATABASE_URL").unwrap());
}

#[test]
fn lookup_finds_stored_secret() {
    let engine = test_engine();
    let registry = BlindIndexRegistry::new();
    let project = ProjectId::new();
    engine.search().ensure_config(&registry, project).unwrap();

    let rows: Vec<(BlindIndexToken, u32)> = ["DATABASE_URL", "REDIS_URL", "API_KEY"]
        .iter()
        .zip(1..)
        .map(|(name, id)| (engine.search().lookup(&registry, project, name).unwrap(), id))
        .collect();

    let wanted = engine.search().lookup(&registry, project, "REDIS_URL").unwrap();
    let hits = engine
        .search()
        .find_matches(&wanted, rows.iter().map(|(t, id)| (t, *id)));
    assert_eq!(hits, vec![2]);

    let missing = engine.search().lookup(&registry, project, "NOPE").unwrap();
    assert!(
        engine
            .search()
            .find_matches(&missing, rows.iter().map(|(t, id)| (t, *id)))
            .is_empty()
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn token_is_deterministic(name in "[A-Za-z0-9_]{1,64}") {
        let engine = test_engine();
        let cfg = engine.search().create_config(ProjectId::new()).unwrap();
        let salt = engine.search().open_salt(&cfg).unwrap();
        let a = engine.search().compute_blind_index(&name, &salt).unwrap();
        let b = engine.search().compute_blind_index(&name, &salt).unwrap();
        prop_assert_eq!(a, b);
    }
}
