//! Application layer for neurosync
//!
//! Use cases and ports. The [`Orchestrator`] is the core: it fans one
//! prompt out to every active backend through the [`StreamGateway`] port,
//! tracks each stream with a per-attempt [`ResponseTracker`], detects group
//! completion reactively, and triggers synthesis exactly once per request.
//!
//! Infrastructure adapters implement the ports; the presentation layer
//! observes state through [`SessionObserver`].

pub mod orchestrator;
pub mod ports;
pub mod store;
pub mod tracker;

pub use orchestrator::{Orchestrator, OrchestratorError, TimeoutTiers};
pub use ports::history_store::{HistoryError, HistoryStore};
pub use ports::session_observer::{NullObserver, SessionObserver};
pub use ports::stream_gateway::{AdapterError, StreamGateway, StreamHandle, StreamRequest};
pub use store::SessionStore;
pub use tracker::ResponseTracker;
