//! Session aggregate.

use crate::consensus::result::ConsensusResult;
use crate::core::backend::{BackendConfig, BackendId};
use crate::response::ModelResponse;
use crate::session::history::HistoryEntry;
use crate::synthesizer::SynthesizerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration-derived inputs a session is built from.
///
/// Kept inside the [`Session`] so that a full reset can restore the exact
/// initial state rather than an empty one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSeed {
    /// Configured backend roster, in registration order.
    pub backends: Vec<BackendConfig>,
    /// Backends enabled at session start.
    pub active: Vec<BackendId>,
    pub synthesizer: SynthesizerConfig,
    /// History list cap; oldest entries are evicted first.
    pub history_limit: usize,
}

impl Default for SessionSeed {
    fn default() -> Self {
        Self {
            backends: BackendConfig::default_roster(),
            active: BackendConfig::default_active(),
            synthesizer: SynthesizerConfig::default(),
            history_limit: 50,
        }
    }
}

/// The single mutable state container for a request's lifetime.
///
/// Holds the current prompt, the active backend set, one [`ModelResponse`]
/// per configured backend, the consensus result, the synthesizer
/// configuration, and the bounded history. Mutated only through
/// [`transition`](crate::session::transition::transition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub seed: SessionSeed,
    /// Per-backend API credentials, set by explicit user action.
    pub credentials: HashMap<BackendId, String>,
    /// Currently enabled backends, in activation order.
    pub active: Vec<BackendId>,
    pub prompt: String,
    pub processing: bool,
    /// Exactly one entry per configured backend.
    pub responses: HashMap<BackendId, ModelResponse>,
    pub consensus: ConsensusResult,
    pub synthesizer: SynthesizerConfig,
    /// Newest-first, capped at `seed.history_limit`.
    pub history: Vec<HistoryEntry>,
}

impl Session {
    /// The initial configuration-derived state.
    pub fn initial(seed: SessionSeed) -> Self {
        let responses = seed
            .backends
            .iter()
            .map(|b| (b.id.clone(), ModelResponse::idle(b.id.clone())))
            .collect();
        Self {
            credentials: HashMap::new(),
            active: seed.active.clone(),
            prompt: String::new(),
            processing: false,
            responses,
            consensus: ConsensusResult::idle(),
            synthesizer: seed.synthesizer.clone(),
            history: Vec::new(),
            seed,
        }
    }

    pub fn backend_config(&self, id: &BackendId) -> Option<&BackendConfig> {
        self.seed.backends.iter().find(|b| &b.id == id)
    }

    pub fn is_active(&self, id: &BackendId) -> bool {
        self.active.contains(id)
    }

    /// Active backends in roster registration order — the stable order the
    /// consensus engine breaks ties with.
    pub fn active_in_registration_order(&self) -> Vec<BackendId> {
        self.seed
            .backends
            .iter()
            .filter(|b| self.active.contains(&b.id))
            .map(|b| b.id.clone())
            .collect()
    }

    /// Responses of the active set, in registration order.
    pub fn active_responses(&self) -> Vec<ModelResponse> {
        self.active_in_registration_order()
            .iter()
            .filter_map(|id| self.responses.get(id))
            .cloned()
            .collect()
    }

    /// Completion predicate: every active backend reached a terminal state.
    pub fn all_active_terminal(&self) -> bool {
        !self.active.is_empty()
            && self
                .active
                .iter()
                .all(|id| self.responses.get(id).is_some_and(|r| r.is_terminal()))
    }

    pub fn credential(&self, id: &BackendId) -> Option<&str> {
        self.credentials.get(id).map(String::as_str)
    }
}
