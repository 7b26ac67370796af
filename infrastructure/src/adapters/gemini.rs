//! Gemini streaming adapter.
//!
//! Speaks the native `streamGenerateContent?alt=sse` envelope: system
//! instructions travel in a dedicated field, text arrives under
//! `candidates[0].content.parts[].text`, and the stream ends without an
//! explicit terminator. Exact output token counts are taken from
//! `usageMetadata` when present.

use crate::adapters::sse::{data_payload, sse_lines};
use futures::StreamExt;
use neurosync_application::{AdapterError, StreamHandle, StreamRequest};
use neurosync_domain::{Role, StreamDelta};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const CHANNEL_CAPACITY: usize = 64;

pub struct GeminiAdapter {
    client: reqwest::Client,
}

impl GeminiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn open_stream(
        &self,
        request: &StreamRequest,
    ) -> Result<StreamHandle, AdapterError> {
        let credential = request
            .credential
            .clone()
            .ok_or_else(|| AdapterError::Config("Gemini requires an API key".to_string()))?;
        let base = request
            .backend
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE.to_string());
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            base.trim_end_matches('/'),
            request.backend.model_name,
            credential,
        );

        let body = request_body(request);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            return Err(AdapterError::Upstream(format!("{status}: {snippet}")));
        }

        Ok(spawn_reader(response))
    }
}

fn request_body(request: &StreamRequest) -> Value {
    let contents: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = match m.role {
                Role::Model => "model",
                _ => "user",
            };
            json!({ "role": role, "parts": [{ "text": m.content }] })
        })
        .collect();

    let mut body = json!({ "contents": contents });

    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    if !system.is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system.join("\n\n") }] });
    }

    let mut generation = serde_json::Map::new();
    if let Some(temperature) = request.sampling.temperature {
        generation.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = request.sampling.max_output_tokens {
        generation.insert("maxOutputTokens".to_string(), json!(max_tokens));
    }
    if !generation.is_empty() {
        body["generationConfig"] = Value::Object(generation);
    }

    body
}

fn spawn_reader(response: reqwest::Response) -> StreamHandle {
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
                        // Gemini has no end-of-stream marker.
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
                        match serde_json::from_str::<GeminiChunk>(data) {
                            Ok(chunk) => {
                                let token_count = chunk.output_tokens();
                                let text = chunk.text();
                                if text.is_empty() && token_count.is_none() {
                                    continue;
                                }
                                let delta = StreamDelta {
                                    text: (!text.is_empty()).then_some(text),
                                    token_count,
                                    ..Default::default()
                                };
                                if tx.send(delta).await.is_err() {
                                    return;
                                }
                            }
                            Err(err) => debug!(%err, "skipping unparseable generation chunk"),
                        }
                    }
                }
            }
        }
    });
    StreamHandle::new(rx, cancel)
}

#[derive(Debug, Deserialize)]
struct GeminiChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

impl GeminiChunk {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .concat()
            })
            .unwrap_or_default()
    }

    fn output_tokens(&self) -> Option<u32> {
        self.usage_metadata
            .as_ref()
            .and_then(|u| u.candidates_token_count)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurosync_domain::{ApiStyle, BackendConfig, BackendId, ChatMessage};

    fn request() -> StreamRequest {
        let backend = BackendConfig {
            id: BackendId::new("gemini"),
            name: "Gemini".to_string(),
            api_style: ApiStyle::Gemini,
            model_name: "gemini-2.5-flash".to_string(),
            endpoint: None,
            simulated: false,
            description: String::new(),
        };
        StreamRequest::new(
            backend,
            vec![
                ChatMessage::system("Be brief."),
                ChatMessage::user("Explain lifetimes"),
            ],
        )
    }

    #[test]
    fn body_separates_system_instruction_from_contents() {
        let body = request_body(&request());
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "Be brief."
        );
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn chunk_concatenates_parts_and_reads_usage() {
        let data = r#"{
            "candidates": [{"content": {"parts": [{"text": "A "}, {"text": "lifetime"}], "role": "model"}}],
            "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 2}
        }"#;
        let chunk: GeminiChunk = serde_json::from_str(data).unwrap();
        assert_eq!(chunk.text(), "A lifetime");
        assert_eq!(chunk.output_tokens(), Some(2));
    }

    #[test]
    fn empty_chunk_yields_nothing() {
        let chunk: GeminiChunk = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(chunk.text(), "");
        assert_eq!(chunk.output_tokens(), None);
    }
}
