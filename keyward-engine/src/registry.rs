//! Thread-safe in-memory stores for envelopes and blind-index configs.
//!
//! These model the uniqueness rules the persistence layer must enforce:
//! at most one envelope per `(project, receiver)` and at most one
//! blind-index config per project. Request handlers that persist elsewhere
//! use them as a reference and in tests.

use crate::error::{EngineError, EngineResult};
use crate::types::{BlindIndexConfig, KeyEnvelope, ProjectId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

fn poisoned<E: std::fmt::Display>(e: E) -> EngineError {
    EngineError::Storage(format!("registry lock poisoned: {e}"))
}

/// Envelopes keyed by `(project, receiver)`.
#[derive(Clone, Default)]
pub struct EnvelopeRegistry {
    envelopes: Arc<RwLock<HashMap<(ProjectId, UserId), KeyEnvelope>>>,
}

impl EnvelopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an envelope. A second envelope for the same receiver is a conflict.
    pub fn insert(&self, envelope: KeyEnvelope) -> EngineResult<()> {
        let key = (envelope.project_id, envelope.receiver_id);
        let mut map = self.envelopes.write().map_err(poisoned)?;
        if map.contains_key(&key) {
            return Err(EngineError::Conflict(format!(
                "user {} already has an envelope for project {}",
                key.1, key.0
            )));
        }
        map.insert(key, envelope);
        Ok(())
    }

    /// Returns the envelope addressed to `receiver` for `project`.
    pub fn get(&self, project: ProjectId, receiver: UserId) -> EngineResult<KeyEnvelope> {
        self.envelopes
            .read()
            .map_err(poisoned)?
            .get(&(project, receiver))
            .cloned()
            .ok_or_else(|| {
                EngineError::NotFound(format!("no envelope for user {receiver} in project {project}"))
            })
    }

    /// Removes and returns the envelope for `receiver`, if any.
    pub fn remove(&self, project: ProjectId, receiver: UserId) -> EngineResult<Option<KeyEnvelope>> {
        Ok(self
            .envelopes
            .write()
            .map_err(poisoned)?
            .remove(&(project, receiver)))
    }

    /// All receivers holding an envelope for `project`.
    pub fn receivers(&self, project: ProjectId) -> EngineResult<Vec<UserId>> {
        let mut out: Vec<UserId> = self
            .envelopes
            .read()
            .map_err(poisoned)?
            .keys()
            .filter(|(p, _)| *p == project)
            .map(|(_, u)| *u)
            .collect();
        out.sort();
        Ok(out)
    }

    pub fn len(&self) -> EngineResult<usize> {
        Ok(self.envelopes.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> EngineResult<bool> {
        Ok(self.envelopes.read().map_err(poisoned)?.is_empty())
    }
}

/// Lifecycle of a project's blind-index config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlindIndexState {
    /// No config exists yet.
    Absent,
    /// A config was created and stored but has not been opened.
    Created,
    /// The config has been opened successfully and is in use.
    Active,
}

/// One blind-index config per project, with its lifecycle state.
#[derive(Clone, Default)]
pub struct BlindIndexRegistry {
    configs: Arc<RwLock<HashMap<ProjectId, (BlindIndexConfig, BlindIndexState)>>>,
}

impl BlindIndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, project: ProjectId) -> EngineResult<BlindIndexState> {
        Ok(self
            .configs
            .read()
            .map_err(poisoned)?
            .get(&project)
            .map_or(BlindIndexState::Absent, |(_, state)| *state))
    }

    /// Stores a new config (`Absent -> Created`). Refuses a second config.
    pub fn insert(&self, config: BlindIndexConfig) -> EngineResult<()> {
        let mut map = self.configs.write().map_err(poisoned)?;
        if map.contains_key(&config.project_id) {
            return Err(EngineError::Conflict(format!(
                "project {} already has a blind index config",
                config.project_id
            )));
        }
        map.insert(config.project_id, (config, BlindIndexState::Created));
        Ok(())
    }

    pub fn get(&self, project: ProjectId) -> EngineResult<BlindIndexConfig> {
        self.configs
            .read()
            .map_err(poisoned)?
            .get(&project)
            .map(|(config, _)| config.clone())
            .ok_or_else(|| EngineError::NotFound(format!("no blind index config for project {project}")))
    }

    /// Drops the project's config, returning the project to `Absent`.
    pub fn remove(&self, project: ProjectId) -> EngineResult<Option<BlindIndexConfig>> {
        Ok(self
            .configs
            .write()
            .map_err(poisoned)?
            .remove(&project)
            .map(|(config, _)| config))
    }

    /// `Created -> Active`. Already-active configs stay active.
    pub fn mark_active(&self, project: ProjectId) -> EngineResult<()> {
        let mut map = self.configs.write().map_err(poisoned)?;
        match map.get_mut(&project) {
            Some((_, state)) => {
                *state = BlindIndexState::Active;
                Ok(())
            }
            None => Err(EngineError::NotFound(format!(
                "no blind index config for project {project}"
            ))),
        }
    }
}
