//! Deterministic simulated backend.
//!
//! Used by backends flagged `simulated` and by the `--simulate` mode:
//! no network, no credentials, reproducible output. The canned answer is
//! chosen by prompt length and stamped with the backend name, so distinct
//! backends produce distinct (but stable) responses for the same prompt.

use neurosync_application::{AdapterError, StreamHandle, StreamRequest};
use neurosync_domain::{ModelResponse, Role, StreamDelta};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const CHUNK_CHARS: usize = 24;

const CANNED: [&str; 3] = [
    "Based on my analysis, the key consideration is correctness first and performance second. \
     The approach that satisfies both starts with a clear ownership model and builds the \
     concurrency strategy on top of it.",
    "There are two viable approaches here. The first optimizes for simplicity and is the right \
     default; the second trades complexity for throughput and only pays off under sustained \
     load. Measure before choosing the second.",
    "The short answer is yes, with one caveat: the guarantee only holds when every participant \
     observes the same ordering of events. Serialize the decision point and the rest of the \
     pipeline can stay concurrent.",
];

pub struct SimulatedAdapter {
    connect_delay: Duration,
    chunk_delay: Duration,
}

impl SimulatedAdapter {
    pub fn new() -> Self {
        Self {
            connect_delay: Duration::from_millis(400),
            chunk_delay: Duration::from_millis(30),
        }
    }

    /// Zero-delay variant for tests.
    pub fn instant() -> Self {
        Self {
            connect_delay: Duration::ZERO,
            chunk_delay: Duration::ZERO,
        }
    }

    pub async fn open_stream(
        &self,
        request: &StreamRequest,
    ) -> Result<StreamHandle, AdapterError> {
        let text = canned_answer(request);
        let chunks = chunk(&text, CHUNK_CHARS);
        let token_count = ModelResponse::estimate_tokens(&text);
        let connect_delay = self.connect_delay;
        let chunk_delay = self.chunk_delay;

        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => return,
                _ = sleep(connect_delay) => {}
            }
            for piece in chunks {
                if tx.send(StreamDelta::text(piece)).await.is_err() {
                    return;
                }
                tokio::select! {
                    _ = child.cancelled() => return,
                    _ = sleep(chunk_delay) => {}
                }
            }
            let done = StreamDelta {
                token_count: Some(token_count),
                ..StreamDelta::completed()
            };
            let _ = tx.send(done).await;
        });
        Ok(StreamHandle::new(rx, cancel))
    }
}

impl Default for SimulatedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn canned_answer(request: &StreamRequest) -> String {
    let prompt = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    let base = CANNED[prompt.len() % CANNED.len()];
    format!("[{}] {}", request.backend.name, base)
}

fn chunk(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|c| c.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurosync_domain::{ApiStyle, BackendConfig, BackendId, BackendStatus, ChatMessage};

    fn request(backend_name: &str, prompt: &str) -> StreamRequest {
        let backend = BackendConfig {
            id: BackendId::new("sim"),
            name: backend_name.to_string(),
            api_style: ApiStyle::Simulated,
            model_name: "sim-model".to_string(),
            endpoint: None,
            simulated: true,
            description: String::new(),
        };
        StreamRequest::new(backend, vec![ChatMessage::user(prompt)])
    }

    async fn collect(mut handle: StreamHandle) -> (String, Option<StreamDelta>) {
        let mut text = String::new();
        let mut terminal = None;
        while let Some(delta) = handle.recv().await {
            if let Some(fragment) = &delta.text {
                text.push_str(fragment);
            }
            if delta.is_terminal() {
                terminal = Some(delta);
                break;
            }
        }
        (text, terminal)
    }

    #[tokio::test]
    async fn output_is_deterministic_per_backend_and_prompt() {
        let adapter = SimulatedAdapter::instant();
        let (first, _) = collect(adapter.open_stream(&request("Alpha", "q")).await.unwrap()).await;
        let (second, _) = collect(adapter.open_stream(&request("Alpha", "q")).await.unwrap()).await;
        let (other, _) = collect(adapter.open_stream(&request("Beta", "q")).await.unwrap()).await;

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert!(first.starts_with("[Alpha] "));
    }

    #[tokio::test]
    async fn stream_ends_with_completed_and_exact_tokens() {
        let adapter = SimulatedAdapter::instant();
        let (text, terminal) =
            collect(adapter.open_stream(&request("Alpha", "hello")).await.unwrap()).await;
        let terminal = terminal.unwrap();
        assert_eq!(terminal.status, Some(BackendStatus::Completed));
        assert_eq!(
            terminal.token_count,
            Some(ModelResponse::estimate_tokens(&text))
        );
    }

    #[test]
    fn chunking_preserves_multibyte_text() {
        let text = "héllo wörld, this is a chunking test with ümlauts";
        let pieces = chunk(text, 7);
        assert_eq!(pieces.concat(), text);
    }
}
