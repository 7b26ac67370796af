//! Chat-completions streaming adapters.
//!
//! Two sub-dialects of the same SSE protocol:
//!
//! - [`ChatCompletionsAdapter`]: the OpenAI-compatible `/chat/completions`
//!   shape, also spoken by Grok, DeepSeek, and local Ollama endpoints.
//! - [`AnthropicAdapter`]: the `/v1/messages` shape, which hoists system
//!   messages into a top-level field and signals completion with a
//!   `message_stop` event instead of `[DONE]`.
//!
//! Per-chunk parse failures are logged and skipped; a malformed chunk must
//! not kill a stream that is otherwise delivering text.

use crate::adapters::sse::{data_payload, sse_lines};
use futures::StreamExt;
use neurosync_application::{AdapterError, StreamHandle, StreamRequest};
use neurosync_domain::{ChatMessage, Role, StreamDelta};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const CHANNEL_CAPACITY: usize = 64;

/// OpenAI-compatible streaming adapter.
pub struct ChatCompletionsAdapter {
    client: reqwest::Client,
}

impl ChatCompletionsAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn open_stream(
        &self,
        request: &StreamRequest,
    ) -> Result<StreamHandle, AdapterError> {
        let endpoint = request
            .backend
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string());

        let body = chat_body(request);
        let mut http = self.client.post(&endpoint).json(&body);
        if let Some(credential) = &request.credential {
            http = http.bearer_auth(credential);
        }
        let response = http
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        Ok(spawn_chat_reader(response))
    }
}

/// Anthropic messages-API streaming adapter.
pub struct AnthropicAdapter {
    client: reqwest::Client,
}

impl AnthropicAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn open_stream(
        &self,
        request: &StreamRequest,
    ) -> Result<StreamHandle, AdapterError> {
        let endpoint = request
            .backend
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ANTHROPIC_ENDPOINT.to_string());

        let (system, messages) = split_system(&request.messages);
        let mut body = json!({
            "model": request.backend.model_name,
            "max_tokens": request
                .sampling
                .max_output_tokens
                .unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": messages,
            "stream": true,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if let Some(temperature) = request.sampling.temperature {
            body["temperature"] = json!(temperature);
        }

        let credential = request
            .credential
            .clone()
            .ok_or_else(|| AdapterError::Config("Anthropic requires an API key".to_string()))?;
        let response = self
            .client
            .post(&endpoint)
            .header("x-api-key", credential)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        Ok(spawn_anthropic_reader(response))
    }
}

fn chat_body(request: &StreamRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|m| json!({ "role": openai_role(m.role), "content": m.content }))
        .collect();
    let mut body = json!({
        "model": request.backend.model_name,
        "messages": messages,
        "stream": true,
    });
    if let Some(temperature) = request.sampling.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = request.sampling.max_output_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(effort) = &request.sampling.reasoning_effort {
        body["reasoning_effort"] = json!(effort);
    }
    body
}

fn openai_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Model => "assistant",
    }
}

/// Anthropic keeps system instructions out of the message list. Multiple
/// system messages are concatenated in order.
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let rest = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| json!({ "role": openai_role(m.role), "content": m.content }))
        .collect();
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, rest)
}

async fn upstream_error(response: reqwest::Response) -> AdapterError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(300).collect();
    AdapterError::Upstream(format!("{status}: {snippet}"))
}

fn spawn_chat_reader(response: reqwest::Response) -> StreamHandle {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let child = cancel.clone();
    tokio::spawn(async move {
        let mut lines = sse_lines(response);
        loop {
            tokio::select! {
                _ = child.cancelled() => return,
                line = lines.next() => match line {
                    None => {
                        let _ = tx.send(StreamDelta::completed()).await;
                        return;
                    }
                    Some(Err(err)) => {
                        let _ = tx
                            .send(StreamDelta::error(format!("Stream read failed: {err}")))
                            .await;
                        return;
                    }
                    Some(Ok(line)) => {
                        let Some(data) = data_payload(&line) else { continue };
                        if data == "[DONE]" {
                            let _ = tx.send(StreamDelta::completed()).await;
                            return;
                        }
                        match serde_json::from_str::<ChatChunk>(data) {
                            Ok(chunk) => {
                                if let Some(text) = chunk.delta_text()
                                    && !text.is_empty()
                                    && tx.send(StreamDelta::text(text)).await.is_err()
                                {
                                    return;
                                }
                            }
                            Err(err) => debug!(%err, "skipping unparseable chat chunk"),
                        }
                    }
                }
            }
        }
    });
    StreamHandle::new(rx, cancel)
}

fn spawn_anthropic_reader(response: reqwest::Response) -> StreamHandle {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let child = cancel.clone();
    tokio::spawn(async move {
        let mut lines = sse_lines(response);
        loop {
            tokio::select! {
                _ = child.cancelled() => return,
                line = lines.next() => match line {
                    None => {
                        let _ = tx.send(StreamDelta::completed()).await;
                        return;
                    }
                    Some(Err(err)) => {
                        let _ = tx
                            .send(StreamDelta::error(format!("Stream read failed: {err}")))
                            .await;
                        return;
                    }
                    Some(Ok(line)) => {
                        let Some(data) = data_payload(&line) else { continue };
                        match serde_json::from_str::<AnthropicEvent>(data) {
                            Ok(AnthropicEvent::ContentBlockDelta { delta }) => {
                                if !delta.text.is_empty()
                                    && tx.send(StreamDelta::text(delta.text)).await.is_err()
                                {
                                    return;
                                }
                            }
                            Ok(AnthropicEvent::MessageStop) => {
                                let _ = tx.send(StreamDelta::completed()).await;
                                return;
                            }
                            Ok(AnthropicEvent::Error { error }) => {
                                let _ = tx.send(StreamDelta::error(error.message)).await;
                                return;
                            }
                            Ok(AnthropicEvent::Other) => {}
                            Err(err) => debug!(%err, "skipping unparseable message event"),
                        }
                    }
                }
            }
        }
    });
    StreamHandle::new(rx, cancel)
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

impl ChatChunk {
    fn delta_text(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.delta.content)
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicEvent {
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: AnthropicTextDelta },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "error")]
    Error { error: AnthropicErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicTextDelta {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    #[serde(default)]
    message: String,
}
