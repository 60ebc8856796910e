//! Key distribution and blind-index search for keyward.
//!
//! Two services with separate key material:
//! - [`EnvelopeService`] moves project keys between users. User keys only.
//! - [`SearchIndexService`] computes lookup tokens for secret names. Server
//!   secrets only.
//!
//! [`UserKeyService`] recovers a user's private key from their password, and
//! [`KeyEngine`] wires all three together from one validated [`EngineConfig`].

pub mod config;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod search_index;
pub mod types;
pub mod user_keys;

pub use config::{EngineConfig, ServerKeys};
pub use envelope::{EnvelopeService, PublicKeyDirectory, RevocationNotice};
pub use error::{EngineError, EngineResult};
pub use registry::{BlindIndexRegistry, BlindIndexState, EnvelopeRegistry};
pub use search_index::SearchIndexService;
pub use types::*;
pub use user_keys::{UnlockedUser, UserKeyService};

use tracing::{info, warn};

/// Rows produced when a project is provisioned.
#[derive(Debug)]
pub struct ProvisionedProject {
    pub project_id: ProjectId,
    pub blind_index: BlindIndexConfig,
    pub admin_envelope: KeyEnvelope,
    /// Plaintext project key, for the caller's immediate use only.
    pub project_key: ProjectKey,
}

/// Entry point constructed once at process start.
#[derive(Debug)]
pub struct KeyEngine {
    envelopes: EnvelopeService,
    users: UserKeyService,
    search: SearchIndexService,
}

impl KeyEngine {
    /// Validates `config` and builds the services.
    ///
    /// Missing server secrets fail here, before any request is served.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let keys = config.validate()?;
        let engine = Self {
            envelopes: EnvelopeService::new(),
            users: UserKeyService::new(config.kdf),
            search: SearchIndexService::new(&keys)?,
        };
        info!("key engine initialized");
        Ok(engine)
    }

    /// Builds the engine from `ROOT_ENCRYPTION_KEY` and `ENCRYPTION_KEY`.
    pub fn from_env() -> EngineResult<Self> {
        Self::new(EngineConfig::from_env())
    }

    pub fn envelopes(&self) -> &EnvelopeService {
        &self.envelopes
    }

    pub fn users(&self) -> &UserKeyService {
        &self.users
    }

    pub fn search(&self) -> &SearchIndexService {
        &self.search
    }

    /// Provisions key material for a new project.
    ///
    /// Creates the blind-index config, a fresh project key, and the admin's
    /// self-envelope, storing both rows in the given registries. Either both
    /// rows are stored or neither is.
    pub fn bootstrap_project(
        &self,
        project_id: ProjectId,
        admin: &UnlockedUser,
        envelopes: &EnvelopeRegistry,
        blind_indexes: &BlindIndexRegistry,
    ) -> EngineResult<ProvisionedProject> {
        if blind_indexes.state(project_id)? != BlindIndexState::Absent {
            return Err(EngineError::Conflict(format!(
                "project {project_id} already has a blind index config"
            )));
        }
        if envelopes.get(project_id, admin.user_id).is_ok() {
            return Err(EngineError::Conflict(format!(
                "user {} already has an envelope for project {project_id}",
                admin.user_id
            )));
        }

        let blind_index = self.search.create_config(project_id)?;
        let project_key = self.envelopes.generate_project_key();
        let admin_envelope = self.envelopes.create_envelope(
            project_id,
            &project_key,
            &admin.member(),
            admin.user_id,
            admin.secret(),
        )?;

        blind_indexes.insert(blind_index.clone())?;
        if let Err(e) = envelopes.insert(admin_envelope.clone()) {
            blind_indexes.remove(project_id)?;
            warn!(project_id = %project_id, "bootstrap rolled back blind index config");
            return Err(e);
        }

        info!(project_id = %project_id, admin_id = %admin.user_id, "provisioned project keys");
        Ok(ProvisionedProject {
            project_id,
            blind_index,
            admin_envelope,
            project_key,
        })
    }
}
