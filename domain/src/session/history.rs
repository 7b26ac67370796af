//! Bounded request history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed synthesis, kept newest-first in a capped list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    pub consensus: String,
}

impl HistoryEntry {
    pub fn new(
        id: u64,
        timestamp: DateTime<Utc>,
        prompt: impl Into<String>,
        consensus: impl Into<String>,
    ) -> Self {
        Self {
            id,
            timestamp,
            prompt: prompt.into(),
            consensus: consensus.into(),
        }
    }
}

/// Insert newest-first, evicting the oldest entries beyond `cap`.
pub fn push_bounded(history: &mut Vec<HistoryEntry>, entry: HistoryEntry, cap: usize) {
    history.insert(0, entry);
    history.truncate(cap);
}
