//! Consensus domain
//!
//! Merging N independent backend responses into one answer.
//!
//! Two strategies exist:
//!
//! - [`heuristic`] — a deterministic, synchronous weighted merge over the
//!   completed set. No network, no model calls, reproducible.
//! - [`prompt`] — builds the input for a delegated arbiter model, which
//!   performs the merge through one more stream invocation.
//!
//! [`result`] holds the shared result types for both paths.

pub mod heuristic;
pub mod prompt;
pub mod result;

pub use heuristic::{HeuristicConsensus, HeuristicParams, merge};
pub use prompt::synthesis_prompt;
pub use result::{ConsensusDelta, ConsensusResult, ConsensusStatus, Contributor};
