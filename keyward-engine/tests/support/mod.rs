//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use keyward_crypto::{KdfParams, UserKeyPair};
use keyward_engine::{EngineConfig, KeyEngine, UnlockedUser, UserId};

pub const TEST_ENCRYPTION_KEY: &str = "0123456789abcdef0123456789abcdef";

/// Cheap Argon2id costs so tests stay fast.
pub fn fast_kdf() -> KdfParams {
    KdfParams {
        memory_kib: 8 * 1024,
        iterations: 1,
        parallelism: 1,
    }
}

pub fn root_key_b64(fill: u8) -> String {
    STANDARD.encode([fill; 32])
}

pub fn test_config() -> EngineConfig {
    EngineConfig::new(root_key_b64(7), TEST_ENCRYPTION_KEY).with_kdf(fast_kdf())
}

pub fn test_engine() -> KeyEngine {
    KeyEngine::new(test_config()).unwrap()
}

/// A user with a fresh keypair, already unlocked.
pub fn unlocked_user() -> UnlockedUser {
    UnlockedUser {
        user_id: UserId::new(),
        keypair: UserKeyPair::generate(),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
