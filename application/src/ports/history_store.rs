//! History persistence port
//!
//! Bounded list of completed syntheses. The core only needs "append a
//! completed result" and "list prior entries"; `clear` mirrors the
//! delete-all operation of the external history boundary.

use async_trait::async_trait;
use neurosync_domain::HistoryEntry;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append an entry; the oldest entry is evicted once the cap is hit.
    async fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError>;

    /// List entries newest-first.
    async fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Remove all entries.
    async fn clear(&self) -> Result<(), HistoryError>;
}
