//! Session state and its pure transition function.
//!
//! The [`Session`](state::Session) is the single owned mutable object for a
//! request's lifetime. It is advanced exclusively through
//! [`transition`](transition::transition) over the closed
//! [`SessionEvent`](event::SessionEvent) set — all I/O triggering lives in
//! the orchestration layer, which observes state and issues events.

pub mod event;
pub mod history;
pub mod state;
pub mod transition;

pub use event::SessionEvent;
pub use history::HistoryEntry;
pub use state::{Session, SessionSeed};
pub use transition::transition;
