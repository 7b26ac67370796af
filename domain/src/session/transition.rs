//! The session reducer.
//!
//! `transition` is a total, pure function `(state, event) -> state'`. It
//! never schedules timers, performs network calls, or reads the clock; the
//! orchestrator observes state changes and issues the events.

use crate::consensus::result::{ConsensusResult, ConsensusStatus};
use crate::response::ModelResponse;
use crate::session::event::SessionEvent;
use crate::session::history::push_bounded;
use crate::session::state::Session;

/// Apply one event to the session, producing the next state.
pub fn transition(mut state: Session, event: SessionEvent) -> Session {
    match event {
        SessionEvent::SetCredential { backend, key } => {
            state.credentials.insert(backend, key);
            state
        }

        SessionEvent::ToggleBackend(id) => {
            // Response data is deliberately left alone: an inactive backend
            // retains stale state until a new request resets it.
            if let Some(pos) = state.active.iter().position(|a| a == &id) {
                state.active.remove(pos);
            } else if state.responses.contains_key(&id) {
                state.active.push(id);
            }
            state
        }

        SessionEvent::StartRequest { prompt } => {
            for id in state.active.clone() {
                state
                    .responses
                    .insert(id.clone(), ModelResponse::idle(id));
            }
            state.prompt = prompt;
            state.processing = true;
            state.consensus = ConsensusResult {
                status: ConsensusStatus::Analyzing,
                ..ConsensusResult::idle()
            };
            state
        }

        SessionEvent::RetryBackend(id) => {
            if state.prompt.is_empty() || !state.is_active(&id) {
                return state;
            }
            state.responses.insert(id.clone(), ModelResponse::idle(id));
            state.processing = true;
            // A late-finishing retried backend must be re-incorporated, so
            // the consensus goes back to Analyzing.
            state.consensus = ConsensusResult {
                status: ConsensusStatus::Analyzing,
                ..ConsensusResult::idle()
            };
            state
        }

        SessionEvent::UpdateResponse { backend, response } => {
            // Late callbacks for a deactivated backend are ignored, and
            // terminal responses are sticky until an explicit reset event.
            if !state.is_active(&backend) {
                return state;
            }
            match state.responses.get(&backend) {
                Some(current) if current.is_terminal() => state,
                Some(_) => {
                    state.responses.insert(backend, response);
                    state
                }
                None => state,
            }
        }

        SessionEvent::UpdateConsensus(delta) => {
            state.consensus = state.consensus.patched(delta);
            if state.consensus.is_terminal() {
                state.processing = false;
            }
            state
        }

        SessionEvent::SetSynthesizer(config) => {
            state.synthesizer = config;
            state
        }

        SessionEvent::AddHistory(entry) => {
            let cap = state.seed.history_limit;
            push_bounded(&mut state.history, entry, cap);
            state
        }

        SessionEvent::ClearOutputs => {
            for id in state.responses.keys().cloned().collect::<Vec<_>>() {
                state
                    .responses
                    .insert(id.clone(), ModelResponse::idle(id));
            }
            state.prompt.clear();
            state.processing = false;
            state.consensus = ConsensusResult::idle();
            state
        }

        SessionEvent::Reset => Session::initial(state.seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::result::ConsensusDelta;
    use crate::core::backend::BackendId;
    use crate::response::BackendStatus;
    use crate::session::history::HistoryEntry;
    use crate::session::state::SessionSeed;

    fn start(session: Session) -> Session {
        transition(
            session,
            SessionEvent::StartRequest {
                prompt: "What is Rust?".to_string(),
            },
        )
    }

    fn streaming_response(id: &str, text: &str) -> ModelResponse {
        let mut r = ModelResponse::idle(BackendId::new(id));
        r.status = BackendStatus::Streaming;
        r.text = text.to_string();
        r
    }

    #[test]
    fn start_request_resets_active_backends_and_consensus() {
        let mut session = Session::initial(SessionSeed::default());
        session
            .responses
            .insert(BackendId::new("openai"), streaming_response("openai", "old"));
        session.consensus.text = "stale".to_string();

        let session = start(session);
        assert!(session.processing);
        assert_eq!(session.prompt, "What is Rust?");
        assert_eq!(session.consensus.status, ConsensusStatus::Analyzing);
        assert!(session.consensus.text.is_empty());
        assert!(session.responses[&BackendId::new("openai")].text.is_empty());
    }

    #[test]
    fn toggle_preserves_response_data_round_trip() {
        let id = BackendId::new("openai");
        let mut session = start(Session::initial(SessionSeed::default()));
        session
            .responses
            .insert(id.clone(), streaming_response("openai", "partial output"));
        let before = session.responses[&id].clone();

        let session = transition(session, SessionEvent::ToggleBackend(id.clone()));
        assert!(!session.is_active(&id));
        let session = transition(session, SessionEvent::ToggleBackend(id.clone()));
        assert!(session.is_active(&id));
        assert_eq!(session.responses[&id], before);
    }

    #[test]
    fn updates_for_inactive_backends_are_ignored() {
        let id = BackendId::new("openai");
        let session = start(Session::initial(SessionSeed::default()));
        let session = transition(session, SessionEvent::ToggleBackend(id.clone()));

        let session = transition(
            session,
            SessionEvent::UpdateResponse {
                backend: id.clone(),
                response: streaming_response("openai", "late chunk"),
            },
        );
        assert!(session.responses[&id].text.is_empty());
    }

    #[test]
    fn terminal_responses_are_sticky() {
        let id = BackendId::new("openai");
        let session = start(Session::initial(SessionSeed::default()));

        let mut timed_out = ModelResponse::idle(id.clone());
        timed_out.status = BackendStatus::Timeout;
        timed_out.text = "partial".to_string();
        let session = transition(
            session,
            SessionEvent::UpdateResponse {
                backend: id.clone(),
                response: timed_out,
            },
        );

        // A late chunk from the same attempt must not mutate the text.
        let session = transition(
            session,
            SessionEvent::UpdateResponse {
                backend: id.clone(),
                response: streaming_response("openai", "partial plus more"),
            },
        );
        assert_eq!(session.responses[&id].text, "partial");
        assert_eq!(session.responses[&id].status, BackendStatus::Timeout);
    }

    #[test]
    fn retry_resets_only_the_named_backend() {
        let retried = BackendId::new("openai");
        let sibling = BackendId::new("gemini");
        let mut session = start(Session::initial(SessionSeed::default()));
        session
            .responses
            .insert(retried.clone(), streaming_response("openai", "failed output"));
        session
            .responses
            .insert(sibling.clone(), streaming_response("gemini", "good output"));

        let session = transition(session, SessionEvent::RetryBackend(retried.clone()));
        assert!(session.responses[&retried].text.is_empty());
        assert_eq!(session.responses[&retried].status, BackendStatus::Idle);
        assert_eq!(session.responses[&sibling].text, "good output");
    }

    #[test]
    fn retry_without_current_prompt_is_a_no_op() {
        let session = Session::initial(SessionSeed::default());
        let after = transition(session.clone(), SessionEvent::RetryBackend(BackendId::new("openai")));
        assert_eq!(after, session);
    }

    #[test]
    fn terminal_consensus_ends_processing() {
        let session = start(Session::initial(SessionSeed::default()));
        assert!(session.processing);
        let session = transition(
            session,
            SessionEvent::UpdateConsensus(ConsensusDelta::status(ConsensusStatus::Completed)),
        );
        assert!(!session.processing);
    }

    #[test]
    fn history_is_bounded_by_seed_limit() {
        let seed = SessionSeed {
            history_limit: 2,
            ..SessionSeed::default()
        };
        let mut session = Session::initial(seed);
        for id in 0..4 {
            session = transition(
                session,
                SessionEvent::AddHistory(HistoryEntry::new(
                    id,
                    chrono::Utc::now(),
                    format!("p{id}"),
                    "c",
                )),
            );
        }
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].id, 3);
    }

    #[test]
    fn reset_restores_the_initial_configuration_derived_state() {
        let initial = Session::initial(SessionSeed::default());
        let mut session = start(initial.clone());
        session = transition(
            session,
            SessionEvent::SetCredential {
                backend: BackendId::new("openai"),
                key: "sk-test".to_string(),
            },
        );
        session = transition(session, SessionEvent::ToggleBackend(BackendId::new("grok")));

        let session = transition(session, SessionEvent::Reset);
        assert_eq!(session, initial);
    }

    #[test]
    fn clear_outputs_keeps_credentials_and_config() {
        let mut session = start(Session::initial(SessionSeed::default()));
        session = transition(
            session,
            SessionEvent::SetCredential {
                backend: BackendId::new("openai"),
                key: "sk-test".to_string(),
            },
        );
        let session = transition(session, SessionEvent::ClearOutputs);
        assert!(session.prompt.is_empty());
        assert!(!session.processing);
        assert_eq!(session.consensus, ConsensusResult::idle());
        assert_eq!(
            session.credential(&BackendId::new("openai")),
            Some("sk-test")
        );
    }
}
