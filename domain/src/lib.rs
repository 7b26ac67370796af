//! Domain layer for neurosync
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Fan-out
//!
//! One prompt is sent to every backend in the *active set* concurrently.
//! Each backend streams incremental text into its own [`ModelResponse`]
//! slot until it reaches a terminal status (`Completed`, `Error`, `Timeout`).
//!
//! ## Consensus
//!
//! Once every active backend is terminal, the completed set is merged into
//! a single answer:
//!
//! - **Heuristic**: a deterministic weighted merge over the raw texts
//!   ([`consensus::heuristic`])
//! - **Delegate**: a designated arbiter model synthesizes the responses
//!   ([`consensus::prompt`] builds its input)
//!
//! ## Session
//!
//! All mutable request state lives in a single [`Session`] value, advanced
//! exclusively through the pure [`transition`] function over a closed set of
//! [`SessionEvent`]s. I/O triggering lives entirely outside this crate.

pub mod consensus;
pub mod core;
pub mod response;
pub mod session;
pub mod synthesizer;

// Re-export commonly used types
pub use consensus::heuristic::{HeuristicConsensus, HeuristicParams, merge};
pub use consensus::prompt::synthesis_prompt;
pub use consensus::result::{ConsensusDelta, ConsensusResult, ConsensusStatus, Contributor};
pub use core::backend::{ApiStyle, BackendConfig, BackendId, ChatMessage, Role};
pub use core::error::DomainError;
pub use core::prompt::Prompt;
pub use response::{BackendStatus, ModelResponse, StreamDelta};
pub use session::event::SessionEvent;
pub use session::history::HistoryEntry;
pub use session::state::{Session, SessionSeed};
pub use session::transition::transition;
pub use synthesizer::{SamplingParams, SynthesizerConfig, SynthesizerMode};
