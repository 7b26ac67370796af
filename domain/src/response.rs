//! Per-backend streaming response state.
//!
//! One [`ModelResponse`] exists per configured backend. While a request is
//! in flight, adapter callbacks arrive as [`StreamDelta`]s and are folded
//! into the response: text is append-only, metrics are derived from the
//! latest wall-clock read, and terminal statuses are sticky.

use crate::core::backend::BackendId;
use serde::{Deserialize, Serialize};

/// Lifecycle status of one backend's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Error,
    Timeout,
}

impl BackendStatus {
    /// Terminal statuses expect no further deltas.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BackendStatus::Completed | BackendStatus::Error | BackendStatus::Timeout
        )
    }
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackendStatus::Idle => "idle",
            BackendStatus::Connecting => "connecting",
            BackendStatus::Streaming => "streaming",
            BackendStatus::Completed => "completed",
            BackendStatus::Error => "error",
            BackendStatus::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

/// One incremental update from a stream adapter.
///
/// Every field is optional: a delta may carry a text fragment, a status
/// transition, an error message, an exact token count, or any combination.
/// Adapters must surface all failures as an `Error`-status delta rather
/// than panicking across the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDelta {
    /// Text fragment to append to the accumulated output.
    pub text: Option<String>,
    /// Status transition.
    pub status: Option<BackendStatus>,
    /// Human-readable error, set alongside `Error`/`Timeout` statuses.
    pub error: Option<String>,
    /// Exact token count supplied by the adapter, if known.
    pub token_count: Option<u32>,
}

impl StreamDelta {
    pub fn text(fragment: impl Into<String>) -> Self {
        Self {
            text: Some(fragment.into()),
            ..Default::default()
        }
    }

    pub fn status(status: BackendStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn completed() -> Self {
        Self::status(BackendStatus::Completed)
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: Some(BackendStatus::Error),
            error: Some(message),
            ..Default::default()
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: Some(BackendStatus::Timeout),
            error: Some(message),
            ..Default::default()
        }
    }

    /// Whether this delta carries a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.map(|s| s.is_terminal()).unwrap_or(false)
    }
}

/// Progress estimate shown on connect, before any byte has arrived.
pub const PROGRESS_CONNECTING: u8 = 5;
/// Progress estimate on first byte.
pub const PROGRESS_FIRST_BYTE: u8 = 10;
/// Progress ceiling while streaming; 100 is reserved for completion.
pub const PROGRESS_STREAMING_CAP: u8 = 90;

/// Accumulated state of one backend for the current request attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Backend this response belongs to.
    pub backend: BackendId,
    pub status: BackendStatus,
    /// Accumulated output. Append-only while streaming, frozen once terminal.
    pub text: String,
    /// Present only for `Error`/`Timeout`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock milliseconds since this backend's attempt began.
    pub latency_ms: u64,
    /// 0-100 heuristic progress estimate, monotonic within an attempt.
    pub progress: u8,
    /// `ceil(len/4)` unless the adapter supplied an exact count.
    pub token_estimate: u32,
}

impl ModelResponse {
    /// Fresh idle state for a backend, used at request start and on retry.
    pub fn idle(backend: BackendId) -> Self {
        Self {
            backend,
            status: BackendStatus::Idle,
            text: String::new(),
            error: None,
            latency_ms: 0,
            progress: 0,
            token_estimate: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// A response qualifies for consensus when it produced text and ended
    /// in `Completed` or `Timeout` (partial output still counts).
    pub fn qualifies_for_consensus(&self) -> bool {
        !self.text.trim().is_empty()
            && matches!(
                self.status,
                BackendStatus::Completed | BackendStatus::Timeout
            )
    }

    /// Token estimate derived from accumulated length.
    pub fn estimate_tokens(text: &str) -> u32 {
        (text.len() as u32).div_ceil(4)
    }

    /// Streaming progress interpolated from accumulated length, clamped to
    /// the streaming cap so only completion reaches 100.
    pub fn streaming_progress(text_len: usize) -> u8 {
        let estimate = PROGRESS_FIRST_BYTE as usize + text_len / 10;
        estimate.min(PROGRESS_STREAMING_CAP as usize) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(BackendStatus::Completed.is_terminal());
        assert!(BackendStatus::Error.is_terminal());
        assert!(BackendStatus::Timeout.is_terminal());
        assert!(!BackendStatus::Idle.is_terminal());
        assert!(!BackendStatus::Connecting.is_terminal());
        assert!(!BackendStatus::Streaming.is_terminal());
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(ModelResponse::estimate_tokens(""), 0);
        assert_eq!(ModelResponse::estimate_tokens("abcd"), 1);
        assert_eq!(ModelResponse::estimate_tokens("abcde"), 2);
    }

    #[test]
    fn streaming_progress_is_monotonic_and_capped() {
        let mut last = 0;
        for len in 0..2000 {
            let p = ModelResponse::streaming_progress(len);
            assert!(p >= last);
            assert!(p <= PROGRESS_STREAMING_CAP);
            last = p;
        }
        assert_eq!(ModelResponse::streaming_progress(0), PROGRESS_FIRST_BYTE);
        assert_eq!(ModelResponse::streaming_progress(100_000), 90);
    }

    #[test]
    fn timeout_with_text_qualifies_for_consensus() {
        let mut r = ModelResponse::idle(BackendId::new("a"));
        r.text = "Result: 4".to_string();
        r.status = BackendStatus::Timeout;
        assert!(r.qualifies_for_consensus());

        r.status = BackendStatus::Error;
        assert!(!r.qualifies_for_consensus());

        r.status = BackendStatus::Completed;
        r.text.clear();
        assert!(!r.qualifies_for_consensus());
    }

    #[test]
    fn error_delta_is_terminal() {
        assert!(StreamDelta::error("boom").is_terminal());
        assert!(!StreamDelta::text("hi").is_terminal());
    }
}
