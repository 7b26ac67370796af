//! In-memory history store.
//!
//! Bounded newest-first list of completed syntheses. Process-local; the
//! session keeps its own copy of the same entries for rendering, this
//! store is the port implementation the orchestrator appends to.

use async_trait::async_trait;
use neurosync_application::{HistoryError, HistoryStore};
use neurosync_domain::HistoryEntry;
use std::collections::VecDeque;
use tokio::sync::Mutex;

pub struct InMemoryHistoryStore {
    entries: Mutex<VecDeque<HistoryEntry>>,
    limit: usize,
}

impl InMemoryHistoryStore {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            limit,
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut entries = self.entries.lock().await;
        entries.push_front(entry);
        entries.truncate(self.limit);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().cloned().collect())
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        self.entries.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64) -> HistoryEntry {
        HistoryEntry::new(id, chrono::Utc::now(), format!("prompt {id}"), "answer")
    }

    #[tokio::test]
    async fn newest_entries_come_first() {
        let store = InMemoryHistoryStore::new(10);
        store.append(entry(1)).await.unwrap();
        store.append(entry(2)).await.unwrap();
        let entries = store.list().await.unwrap();
        assert_eq!(entries[0].id, 2);
        assert_eq!(entries[1].id, 1);
    }

    #[tokio::test]
    async fn oldest_entries_are_evicted_at_the_cap() {
        let store = InMemoryHistoryStore::new(2);
        for id in 1..=3 {
            store.append(entry(id)).await.unwrap();
        }
        let entries = store.list().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, 3);
        assert_eq!(entries[1].id, 2);
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let store = InMemoryHistoryStore::new(10);
        store.append(entry(1)).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
