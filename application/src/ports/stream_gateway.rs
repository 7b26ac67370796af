//! Stream gateway port
//!
//! Defines the interface for invoking LLM backends. Adapters take a
//! prompt, stream incremental [`StreamDelta`]s back through a channel, and
//! guarantee eventually reaching a terminal status or reacting to explicit
//! cancellation. Failures never cross the boundary as panics — they
//! surface as an `Error`-status delta or an [`AdapterError`].

use async_trait::async_trait;
use neurosync_domain::{BackendConfig, ChatMessage, SamplingParams, StreamDelta};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors raised while opening a stream.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Missing credential or malformed endpoint, detected before any
    /// network attempt.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-2xx or malformed terminal response from the backend.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The request could not be sent or the connection dropped.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// One adapter invocation: which backend, with what credential and input.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub backend: BackendConfig,
    pub credential: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub sampling: SamplingParams,
}

impl StreamRequest {
    pub fn new(backend: BackendConfig, messages: Vec<ChatMessage>) -> Self {
        Self {
            backend,
            credential: None,
            messages,
            sampling: SamplingParams::default(),
        }
    }

    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential.filter(|c| !c.is_empty());
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }
}

/// Handle for receiving streaming deltas from one adapter invocation.
///
/// Wraps an `mpsc::Receiver<StreamDelta>` plus the cancellation token the
/// adapter's read loop listens on. Dropping the handle cancels the token,
/// so the underlying stream reader is released on every exit path.
pub struct StreamHandle {
    receiver: mpsc::Receiver<StreamDelta>,
    cancel: CancellationToken,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamDelta>, cancel: CancellationToken) -> Self {
        Self { receiver, cancel }
    }

    /// Receive the next delta; `None` once the adapter task has finished
    /// and dropped its sender.
    pub async fn recv(&mut self) -> Option<StreamDelta> {
        self.receiver.recv().await
    }

    /// Signal the adapter to abort its read loop and release the stream.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Gateway for streaming LLM invocations.
///
/// One implementation routes to the concrete per-dialect adapters; a
/// scripted fake stands in for tests.
#[async_trait]
pub trait StreamGateway: Send + Sync {
    async fn open_stream(&self, request: StreamRequest) -> Result<StreamHandle, AdapterError>;
}
