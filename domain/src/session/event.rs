//! Session transition events.

use crate::consensus::result::ConsensusDelta;
use crate::core::backend::BackendId;
use crate::response::ModelResponse;
use crate::session::history::HistoryEntry;
use crate::synthesizer::SynthesizerConfig;

/// The closed set of events the session reducer accepts.
///
/// Events describe *what changed*; the orchestration layer decides *when*.
/// Anything requiring a clock or I/O (timestamps, computed responses) is
/// resolved by the caller and carried in the payload so the transition
/// function stays pure.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Store an API credential for one backend.
    SetCredential { backend: BackendId, key: String },
    /// Enable/disable a backend. Never clears its prior response data.
    ToggleBackend(BackendId),
    /// Begin a new request: resets active responses, consensus to Analyzing.
    StartRequest { prompt: String },
    /// Reset a single backend for a fresh attempt; siblings untouched.
    RetryBackend(BackendId),
    /// Replace one backend's response with the tracker's latest derivation.
    UpdateResponse {
        backend: BackendId,
        response: ModelResponse,
    },
    /// Apply a partial consensus update.
    UpdateConsensus(ConsensusDelta),
    /// Replace the synthesizer configuration (explicit user action).
    SetSynthesizer(SynthesizerConfig),
    /// Append a completed synthesis to the bounded history.
    AddHistory(HistoryEntry),
    /// Clear prompt, responses and consensus, keeping configuration.
    ClearOutputs,
    /// Restore the exact initial configuration-derived state.
    Reset,
}
