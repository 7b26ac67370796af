//! Request orchestration.
//!
//! The [`Orchestrator`] owns the event loop for one session. Fan-out spawns
//! one pump task per active backend; every pump reports back through a
//! single mpsc channel, so all session mutation happens on the caller's
//! task — adapters never touch state directly.
//!
//! Two-phase timeouts are enforced in the pump itself: a connection
//! deadline until the first text fragment arrives, then a generation
//! deadline for the rest of the stream. Either way the pump guarantees a
//! terminal delta, which is what makes group completion detection sound.
//!
//! Synthesis fires exactly once per request: the guard is checked and set
//! with no await point in between, and retries re-arm it.

use crate::ports::history_store::{HistoryError, HistoryStore};
use crate::ports::session_observer::SessionObserver;
use crate::ports::stream_gateway::{StreamGateway, StreamHandle, StreamRequest};
use crate::store::SessionStore;
use crate::tracker::ResponseTracker;
use neurosync_domain::{
    BackendConfig, BackendId, BackendStatus, ChatMessage, ConsensusDelta, ConsensusStatus,
    Contributor, DomainError, HeuristicParams, HistoryEntry, ModelResponse, Prompt, Session,
    SessionEvent, StreamDelta, SynthesizerMode, merge, synthesis_prompt,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Confidence reported for a delegated synthesis that completed.
const DELEGATED_CONFIDENCE: f64 = 0.95;

/// The two streaming deadlines, measured per backend attempt.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutTiers {
    /// From request start until the first text fragment.
    pub connection: Duration,
    /// From the first text fragment until the stream ends.
    pub generation: Duration,
}

impl Default for TimeoutTiers {
    fn default() -> Self {
        Self {
            connection: Duration::from_millis(30_000),
            generation: Duration::from_millis(60_000),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// One pump callback: which backend, which attempt, what happened.
#[derive(Debug)]
struct BackendEvent {
    backend: BackendId,
    attempt: u64,
    delta: StreamDelta,
}

/// Drives one session: fan-out, progress tracking, completion detection,
/// and synthesis.
pub struct Orchestrator {
    store: SessionStore,
    gateway: Arc<dyn StreamGateway>,
    history: Option<Arc<dyn HistoryStore>>,
    timeouts: TimeoutTiers,
    events_tx: mpsc::Sender<BackendEvent>,
    events_rx: mpsc::Receiver<BackendEvent>,
    trackers: HashMap<BackendId, ResponseTracker>,
    cancels: HashMap<BackendId, CancellationToken>,
    next_attempt: u64,
    synthesis_fired: bool,
    next_history_id: u64,
}

impl Orchestrator {
    pub fn new(session: Session, gateway: Arc<dyn StreamGateway>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            store: SessionStore::new(session),
            gateway,
            history: None,
            timeouts: TimeoutTiers::default(),
            events_tx,
            events_rx,
            trackers: HashMap::new(),
            cancels: HashMap::new(),
            next_attempt: 0,
            synthesis_fired: false,
            next_history_id: 0,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.store = self.store.with_observer(observer);
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutTiers) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn session(&self) -> &Session {
        self.store.session()
    }

    /// Apply a session event that does not start I/O (credentials, backend
    /// toggles, synthesizer changes, clears).
    pub fn dispatch(&mut self, event: SessionEvent) {
        self.store.dispatch(event);
    }

    /// Start a new request: validate, reset state, fan out to every active
    /// backend.
    pub fn start_request(&mut self, prompt: &str) -> Result<(), OrchestratorError> {
        let prompt = Prompt::new(prompt)?;
        if self.store.session().processing {
            return Err(DomainError::RequestInFlight.into());
        }
        let targets = self.store.session().active_in_registration_order();
        if targets.is_empty() {
            return Err(DomainError::NoActiveBackends.into());
        }

        info!(backends = targets.len(), "starting request");
        self.store.dispatch(SessionEvent::StartRequest {
            prompt: prompt.into_content(),
        });
        self.synthesis_fired = false;

        for backend in targets {
            self.spawn_backend(backend);
        }
        Ok(())
    }

    /// Re-run a single backend against the current prompt. Sibling
    /// responses and the prior consensus inputs are untouched; the
    /// consensus itself returns to `Analyzing` until the group settles
    /// again.
    pub fn retry_backend(&mut self, backend: &BackendId) -> Result<(), OrchestratorError> {
        if self.store.session().prompt.is_empty() {
            return Err(DomainError::NoCurrentRequest.into());
        }
        if self.store.session().backend_config(backend).is_none() {
            return Err(DomainError::UnknownBackend(backend.to_string()).into());
        }
        if !self.store.session().is_active(backend) {
            debug!(%backend, "retry ignored for inactive backend");
            return Ok(());
        }

        info!(%backend, "retrying backend");
        self.store.dispatch(SessionEvent::RetryBackend(backend.clone()));
        self.synthesis_fired = false;
        self.spawn_backend(backend.clone());
        Ok(())
    }

    /// Block until the consensus reaches a terminal status, processing
    /// pump events as they arrive.
    pub async fn run_until_settled(&mut self) {
        while !self.store.session().consensus.is_terminal() {
            if !self.process_next_event().await {
                break;
            }
        }
    }

    /// One prompt, end to end. Returns the settled session state.
    pub async fn execute(&mut self, prompt: &str) -> Result<Session, OrchestratorError> {
        self.start_request(prompt)?;
        self.run_until_settled().await;
        Ok(self.store.session().clone())
    }

    /// Process exactly one pump event. Returns `false` if the event
    /// channel has closed. Exposed so tests can step the loop.
    pub async fn process_next_event(&mut self) -> bool {
        let Some(event) = self.events_rx.recv().await else {
            return false;
        };
        self.apply_event(event).await;
        true
    }

    fn spawn_backend(&mut self, backend: BackendId) {
        self.next_attempt += 1;
        let attempt = self.next_attempt;

        // Any previous attempt for this backend is now superseded.
        let cancel = CancellationToken::new();
        if let Some(old) = self.cancels.insert(backend.clone(), cancel.clone()) {
            old.cancel();
        }
        self.trackers
            .insert(backend.clone(), ResponseTracker::new(attempt));

        let session = self.store.session();
        let Some(config) = session.backend_config(&backend).cloned() else {
            return;
        };
        let request = StreamRequest::new(config, vec![ChatMessage::user(&session.prompt)])
            .with_credential(session.credential(&backend).map(str::to_string));

        let gateway = self.gateway.clone();
        let tx = self.events_tx.clone();
        let timeouts = self.timeouts;
        tokio::spawn(async move {
            pump(gateway, request, backend, attempt, timeouts, cancel, tx).await;
        });
    }

    async fn apply_event(&mut self, event: BackendEvent) {
        let Some(tracker) = self.trackers.get_mut(&event.backend) else {
            return;
        };
        let Some(current) = self.store.session().responses.get(&event.backend) else {
            return;
        };
        let Some(next) = tracker.apply(current, event.attempt, event.delta) else {
            debug!(backend = %event.backend, attempt = event.attempt, "dropping stale delta");
            return;
        };
        self.store.dispatch(SessionEvent::UpdateResponse {
            backend: event.backend,
            response: next,
        });
        self.maybe_synthesize().await;
    }

    /// Fire synthesis iff every active backend is terminal and it has not
    /// fired for this request yet. The guard is set before the first await
    /// so a racing event cannot trigger a second run.
    async fn maybe_synthesize(&mut self) {
        if self.synthesis_fired || !self.store.session().all_active_terminal() {
            return;
        }
        self.synthesis_fired = true;
        self.run_synthesis().await;
    }

    async fn run_synthesis(&mut self) {
        self.store.dispatch(SessionEvent::UpdateConsensus(ConsensusDelta::status(
            ConsensusStatus::Synthesizing,
        )));

        match self.store.session().synthesizer.mode {
            SynthesizerMode::Heuristic => self.run_heuristic_synthesis(),
            SynthesizerMode::Delegate => self.run_delegated_synthesis().await,
        }

        self.append_history().await;
    }

    fn run_heuristic_synthesis(&mut self) {
        let responses = self.store.session().active_responses();
        let delta = match merge(&responses, &HeuristicParams::default()) {
            Some(consensus) => {
                info!(
                    primary = %consensus.primary,
                    confidence = consensus.confidence,
                    "heuristic synthesis complete"
                );
                ConsensusDelta {
                    status: Some(ConsensusStatus::Completed),
                    text: Some(consensus.text),
                    confidence: Some(consensus.confidence),
                    contributors: Some(consensus.contributors),
                }
            }
            None => {
                warn!("no response qualified for consensus");
                ConsensusDelta {
                    status: Some(ConsensusStatus::Error),
                    text: Some(String::new()),
                    confidence: Some(0.0),
                    contributors: Some(Vec::new()),
                }
            }
        };
        self.store.dispatch(SessionEvent::UpdateConsensus(delta));
    }

    /// Delegate mode: hand the labeled responses to the configured arbiter
    /// and stream its answer into the consensus text as it arrives.
    async fn run_delegated_synthesis(&mut self) {
        let session = self.store.session();
        let config = session.synthesizer.clone();
        let responses = session.active_responses();
        let prompt = synthesis_prompt(&session.prompt, &responses);

        let contributors = even_contributors(&responses);
        let arbiter = BackendConfig {
            id: BackendId::new("synthesizer"),
            name: "Synthesizer".to_string(),
            api_style: config.arbiter_style,
            model_name: config.arbiter_model.clone(),
            endpoint: Some(config.arbiter_endpoint.clone()),
            simulated: false,
            description: String::new(),
        };
        let request = StreamRequest::new(
            arbiter,
            vec![
                ChatMessage::system(&config.system_instruction),
                ChatMessage::user(prompt),
            ],
        )
        .with_credential(Some(config.arbiter_credential.clone()))
        .with_sampling(config.sampling.clone());

        // The arbiter's open is bounded by the connection tier, like any
        // backend pump.
        let gateway = self.gateway.clone();
        let open_deadline = Instant::now() + self.timeouts.connection;
        let opened = tokio::select! {
            _ = sleep_until(open_deadline) => None,
            result = gateway.open_stream(request) => Some(result),
        };
        let mut handle = match opened {
            None => {
                warn!("arbiter connection timed out");
                self.fail_consensus("Synthesis timed out".to_string());
                return;
            }
            Some(Err(err)) => {
                warn!(error = %err, "arbiter stream could not be opened");
                self.fail_consensus(format!("Synthesis failed: {err}"));
                return;
            }
            Some(Ok(handle)) => handle,
        };

        let deadline = Instant::now() + self.timeouts.generation;
        let mut text = String::new();
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => {
                    warn!("arbiter stream timed out");
                    self.fail_consensus("Synthesis timed out".to_string());
                    return;
                }
                delta = handle.recv() => {
                    let Some(delta) = delta else {
                        // Sender gone without a terminal status.
                        break;
                    };
                    if let Some(fragment) = delta.text
                        && !fragment.is_empty()
                    {
                        text.push_str(&fragment);
                        self.store.dispatch(SessionEvent::UpdateConsensus(
                            ConsensusDelta::text(text.clone()),
                        ));
                    }
                    match delta.status {
                        Some(status) if status.is_terminal() => {
                            if status != BackendStatus::Completed {
                                let message = delta
                                    .error
                                    .unwrap_or_else(|| "Synthesis failed".to_string());
                                self.fail_consensus(format!("Synthesis failed: {message}"));
                                return;
                            }
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }

        if text.trim().is_empty() {
            self.fail_consensus("Synthesis produced no output".to_string());
            return;
        }

        info!(chars = text.len(), "delegated synthesis complete");
        self.store.dispatch(SessionEvent::UpdateConsensus(ConsensusDelta {
            status: Some(ConsensusStatus::Completed),
            text: Some(text),
            confidence: Some(DELEGATED_CONFIDENCE),
            contributors: Some(contributors),
        }));
    }

    fn fail_consensus(&mut self, message: String) {
        self.store.dispatch(SessionEvent::UpdateConsensus(ConsensusDelta {
            status: Some(ConsensusStatus::Error),
            text: Some(message),
            confidence: Some(0.0),
            contributors: Some(Vec::new()),
        }));
    }

    /// Record the settled consensus in session history and the history
    /// store, if one is wired up. Only successful syntheses are recorded.
    async fn append_history(&mut self) {
        let session = self.store.session();
        if session.consensus.status != ConsensusStatus::Completed {
            return;
        }
        self.next_history_id += 1;
        let entry = HistoryEntry {
            id: self.next_history_id,
            timestamp: chrono::Utc::now(),
            prompt: session.prompt.clone(),
            consensus: session.consensus.text.clone(),
        };
        self.store.dispatch(SessionEvent::AddHistory(entry.clone()));
        if let Some(history) = &self.history
            && let Err(err) = history.append(entry).await
        {
            warn!(error = %err, "history append failed");
        }
    }
}

/// Equal weights over the qualifying responses, registration order.
fn even_contributors(responses: &[ModelResponse]) -> Vec<Contributor> {
    let qualifying: Vec<&ModelResponse> = responses
        .iter()
        .filter(|r| r.qualifies_for_consensus())
        .collect();
    let share = 1.0 / qualifying.len().max(1) as f64;
    qualifying
        .iter()
        .map(|r| Contributor {
            backend: r.backend.clone(),
            weight: share,
        })
        .collect()
}

/// Per-backend stream pump.
///
/// Emits `Connecting`, opens the stream, then forwards deltas until a
/// terminal status, a deadline, or cancellation. The connection deadline
/// is replaced by the generation deadline when the first text fragment
/// arrives. Every path except cancellation ends with a terminal delta.
async fn pump(
    gateway: Arc<dyn StreamGateway>,
    request: StreamRequest,
    backend: BackendId,
    attempt: u64,
    timeouts: TimeoutTiers,
    cancel: CancellationToken,
    tx: mpsc::Sender<BackendEvent>,
) {
    let send = |delta: StreamDelta| {
        let tx = tx.clone();
        let backend = backend.clone();
        async move {
            let _ = tx
                .send(BackendEvent {
                    backend,
                    attempt,
                    delta,
                })
                .await;
        }
    };

    send(StreamDelta::status(BackendStatus::Connecting)).await;

    // The connection deadline covers the open itself: a server that accepts
    // the socket but never answers still ends in a terminal delta.
    let mut deadline = Instant::now() + timeouts.connection;

    let mut handle: StreamHandle = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(%backend, attempt, "pump cancelled");
            return;
        }
        _ = sleep_until(deadline) => {
            send(StreamDelta::timeout("Connection timed out")).await;
            return;
        }
        result = gateway.open_stream(request) => match result {
            Ok(handle) => handle,
            Err(err) => {
                debug!(%backend, error = %err, "open_stream failed");
                send(StreamDelta::error(err.to_string())).await;
                return;
            }
        }
    };

    let mut first_text_seen = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // Superseded by a retry or reset; the new attempt owns the slot.
                debug!(%backend, attempt, "pump cancelled");
                return;
            }
            _ = sleep_until(deadline) => {
                let message = if first_text_seen {
                    "Generation timed out"
                } else {
                    "Connection timed out"
                };
                send(StreamDelta::timeout(message)).await;
                return;
            }
            delta = handle.recv() => {
                let Some(delta) = delta else {
                    // Adapter dropped its sender without a terminal status.
                    send(StreamDelta::error("Stream ended unexpectedly")).await;
                    return;
                };
                let has_text = delta.text.as_ref().is_some_and(|t| !t.is_empty());
                let terminal = delta.is_terminal();
                send(delta).await;
                if terminal {
                    return;
                }
                if has_text && !first_text_seen {
                    first_text_seen = true;
                    deadline = Instant::now() + timeouts.generation;
                }
            }
        }
    }
}
