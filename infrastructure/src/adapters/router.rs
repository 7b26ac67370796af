//! Adapter routing.
//!
//! The single [`StreamGateway`] implementation handed to the application
//! layer. Dispatches each request to the adapter for its wire dialect,
//! after rejecting live requests that are missing a credential — a
//! misconfiguration that should fail fast rather than as a 401 mid-flight.

use crate::adapters::gemini::GeminiAdapter;
use crate::adapters::http_chat::{AnthropicAdapter, ChatCompletionsAdapter};
use crate::adapters::mock::SimulatedAdapter;
use async_trait::async_trait;
use neurosync_application::{AdapterError, StreamGateway, StreamHandle, StreamRequest};
use neurosync_domain::ApiStyle;
use tracing::debug;

pub struct AdapterRouter {
    chat: ChatCompletionsAdapter,
    anthropic: AnthropicAdapter,
    gemini: GeminiAdapter,
    simulated: SimulatedAdapter,
    force_simulated: bool,
}

impl AdapterRouter {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            chat: ChatCompletionsAdapter::new(client.clone()),
            anthropic: AnthropicAdapter::new(client.clone()),
            gemini: GeminiAdapter::new(client),
            simulated: SimulatedAdapter::new(),
            force_simulated: false,
        }
    }

    /// Route every request to the simulation adapter, regardless of the
    /// backend's configured style (`--simulate`).
    pub fn simulated() -> Self {
        Self {
            force_simulated: true,
            ..Self::with_client(reqwest::Client::new())
        }
    }
}

impl Default for AdapterRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Local endpoints (Ollama and friends) are usable without a key.
fn is_local_endpoint(endpoint: &str) -> bool {
    endpoint.contains("//localhost")
        || endpoint.contains("//127.0.0.1")
        || endpoint.contains("//0.0.0.0")
}

#[async_trait]
impl StreamGateway for AdapterRouter {
    async fn open_stream(&self, request: StreamRequest) -> Result<StreamHandle, AdapterError> {
        if self.force_simulated
            || request.backend.simulated
            || request.backend.api_style == ApiStyle::Simulated
        {
            debug!(backend = %request.backend.id, "routing to simulation adapter");
            return self.simulated.open_stream(&request).await;
        }

        if request.credential.is_none() {
            let endpoint = request.backend.endpoint.as_deref().unwrap_or("");
            if !is_local_endpoint(endpoint) {
                return Err(AdapterError::Config(format!(
                    "No API key configured for {}",
                    request.backend.id
                )));
            }
        }

        debug!(backend = %request.backend.id, style = %request.backend.api_style, "opening stream");
        match request.backend.api_style {
            ApiStyle::Gemini => self.gemini.open_stream(&request).await,
            ApiStyle::OpenAi => self.chat.open_stream(&request).await,
            ApiStyle::Anthropic => self.anthropic.open_stream(&request).await,
            ApiStyle::Simulated => self.simulated.open_stream(&request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurosync_domain::{BackendConfig, BackendId, ChatMessage};

    fn live_backend(style: ApiStyle, endpoint: Option<&str>) -> BackendConfig {
        BackendConfig {
            id: BackendId::new("test"),
            name: "Test".to_string(),
            api_style: style,
            model_name: "m".to_string(),
            endpoint: endpoint.map(str::to_string),
            simulated: false,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_network_attempt() {
        let router = AdapterRouter::new();
        let request = StreamRequest::new(
            live_backend(ApiStyle::OpenAi, Some("https://api.openai.com/v1/chat/completions")),
            vec![ChatMessage::user("q")],
        );
        match router.open_stream(request).await {
            Err(AdapterError::Config(message)) => assert!(message.contains("test")),
            Err(other) => panic!("expected config error, got {other:?}"),
            Ok(_) => panic!("expected config error, got a stream"),
        }
    }

    #[tokio::test]
    async fn simulated_flag_overrides_the_wire_style() {
        let router = AdapterRouter::new();
        let mut backend = live_backend(ApiStyle::OpenAi, None);
        backend.simulated = true;
        let request = StreamRequest::new(backend, vec![ChatMessage::user("q")]);
        // No credential and no endpoint, yet the stream opens: it never
        // touched a live adapter.
        assert!(router.open_stream(request).await.is_ok());
    }

    #[tokio::test]
    async fn force_simulated_routes_everything_to_the_mock() {
        let router = AdapterRouter::simulated();
        let request = StreamRequest::new(
            live_backend(ApiStyle::Anthropic, None),
            vec![ChatMessage::user("q")],
        );
        assert!(router.open_stream(request).await.is_ok());
    }

    #[test]
    fn local_endpoints_are_exempt_from_the_credential_check() {
        assert!(is_local_endpoint("http://localhost:11434/v1/chat/completions"));
        assert!(is_local_endpoint("http://127.0.0.1:8080"));
        assert!(!is_local_endpoint("https://api.openai.com/v1/chat/completions"));
        assert!(!is_local_endpoint(""));
    }
}
