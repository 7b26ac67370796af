//! Session store: the single place session events are applied.
//!
//! Wraps the pure domain [`transition`] function and notifies the
//! registered [`SessionObserver`] after each applied event. All writers go
//! through [`dispatch`](SessionStore::dispatch), which is only ever called
//! from the orchestrator's event loop — no concurrent writers exist.

use crate::ports::session_observer::{NullObserver, SessionObserver};
use neurosync_domain::{Session, SessionEvent, transition};
use std::sync::Arc;

pub struct SessionStore {
    state: Session,
    observer: Arc<dyn SessionObserver>,
}

impl SessionStore {
    pub fn new(state: Session) -> Self {
        Self {
            state,
            observer: Arc::new(NullObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn session(&self) -> &Session {
        &self.state
    }

    /// Apply one event and notify the observer of what changed.
    pub fn dispatch(&mut self, event: SessionEvent) {
        let notify_backend = match &event {
            SessionEvent::UpdateResponse { backend, .. } => Some(backend.clone()),
            SessionEvent::RetryBackend(backend) => Some(backend.clone()),
            _ => None,
        };
        let notify_consensus = matches!(
            &event,
            SessionEvent::UpdateConsensus(_) | SessionEvent::StartRequest { .. }
        );

        let started = matches!(&event, SessionEvent::StartRequest { .. });

        self.state = transition(self.state.clone(), event);

        if started {
            self.observer.on_request_started(
                &self.state.prompt,
                &self.state.active_in_registration_order(),
            );
        }
        if let Some(backend) = notify_backend
            && let Some(response) = self.state.responses.get(&backend)
        {
            self.observer.on_response(response);
        }
        if notify_consensus {
            self.observer.on_consensus(&self.state.consensus);
        }
    }
}
