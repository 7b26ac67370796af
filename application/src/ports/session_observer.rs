//! Session observer port
//!
//! The presentation layer only renders state; this port is how it learns
//! about changes. All methods default to no-ops so observers implement
//! only what they display.

use neurosync_domain::{BackendId, ConsensusResult, ModelResponse};

/// Observer notified after each session state change.
pub trait SessionObserver: Send + Sync {
    /// A new request started for the given active backends.
    fn on_request_started(&self, _prompt: &str, _backends: &[BackendId]) {}

    /// One backend's response changed (text, status, or metrics).
    fn on_response(&self, _response: &ModelResponse) {}

    /// The consensus result changed.
    fn on_consensus(&self, _consensus: &ConsensusResult) {}
}

/// No-op observer for headless use.
pub struct NullObserver;

impl SessionObserver for NullObserver {}
