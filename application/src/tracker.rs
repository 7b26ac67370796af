//! Per-backend response tracking.
//!
//! A [`ResponseTracker`] owns the bookkeeping for one backend's current
//! attempt: the attempt token distinguishing live callbacks from
//! superseded ones, the start instant latency derives from, and the
//! sticky-terminal guard. Timeouts fire asynchronously and may race a
//! just-arrived final chunk, so every delta is checked against both the
//! attempt token and the terminal flag before it can touch the response.

use neurosync_domain::response::{PROGRESS_CONNECTING, PROGRESS_FIRST_BYTE};
use neurosync_domain::{BackendStatus, ModelResponse, StreamDelta};
use tokio::time::Instant;

/// State machine driver for one backend, one attempt.
#[derive(Debug)]
pub struct ResponseTracker {
    attempt: u64,
    started: Instant,
    first_byte_seen: bool,
    terminal: bool,
}

impl ResponseTracker {
    /// Begin tracking a fresh attempt. Latency is measured from here.
    pub fn new(attempt: u64) -> Self {
        Self {
            attempt,
            started: Instant::now(),
            first_byte_seen: false,
            terminal: false,
        }
    }

    /// Fold a delta into the current response.
    ///
    /// Returns `None` when the delta must be ignored: it belongs to a
    /// superseded attempt, or a terminal status was already reached for
    /// this attempt. Text is append-only; latency and progress are derived
    /// from the latest wall-clock read and never decrease.
    pub fn apply(
        &mut self,
        current: &ModelResponse,
        attempt: u64,
        delta: StreamDelta,
    ) -> Option<ModelResponse> {
        if attempt != self.attempt || self.terminal {
            return None;
        }

        let mut next = current.clone();
        next.latency_ms = self.started.elapsed().as_millis() as u64;

        if let Some(fragment) = delta.text
            && !fragment.is_empty()
        {
            if !self.first_byte_seen {
                self.first_byte_seen = true;
                next.status = BackendStatus::Streaming;
                next.progress = next.progress.max(PROGRESS_FIRST_BYTE);
            }
            next.text.push_str(&fragment);
            next.progress = next
                .progress
                .max(ModelResponse::streaming_progress(next.text.len()));
        }

        next.token_estimate = delta
            .token_count
            .unwrap_or_else(|| ModelResponse::estimate_tokens(&next.text));

        if let Some(error) = delta.error {
            next.error = Some(error);
        }

        if let Some(status) = delta.status {
            match status {
                BackendStatus::Connecting => {
                    // Never regress once bytes are flowing.
                    if !self.first_byte_seen {
                        next.status = BackendStatus::Connecting;
                        next.progress = next.progress.max(PROGRESS_CONNECTING);
                    }
                }
                BackendStatus::Streaming => {
                    self.first_byte_seen = true;
                    next.status = BackendStatus::Streaming;
                    next.progress = next.progress.max(PROGRESS_FIRST_BYTE);
                }
                BackendStatus::Completed => {
                    self.terminal = true;
                    next.status = BackendStatus::Completed;
                    next.progress = 100;
                }
                BackendStatus::Error | BackendStatus::Timeout => {
                    self.terminal = true;
                    next.status = status;
                }
                BackendStatus::Idle => {}
            }
        }

        Some(next)
    }
}
