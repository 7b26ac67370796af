//! Backend value objects.
//!
//! A *backend* is one configured LLM provider/model that can participate in
//! a fan-out request. Backends are identified by a stable [`BackendId`] and
//! described by a [`BackendConfig`], which tells the infrastructure layer
//! which wire dialect ([`ApiStyle`]) to speak.

use serde::{Deserialize, Serialize};

/// Stable identifier of a backend, unique within the configured roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(String);

impl BackendId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BackendId {
    fn from(s: &str) -> Self {
        BackendId::new(s)
    }
}

impl From<String> for BackendId {
    fn from(s: String) -> Self {
        BackendId::new(s)
    }
}

/// Wire dialect a backend speaks.
///
/// `OpenAi` and `Anthropic` are the two sub-dialects of the generic
/// chat-completions SSE protocol; `Gemini` is the native streaming envelope;
/// `Simulated` routes to the deterministic mock adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStyle {
    Gemini,
    OpenAi,
    Anthropic,
    Simulated,
}

impl ApiStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiStyle::Gemini => "gemini",
            ApiStyle::OpenAi => "openai",
            ApiStyle::Anthropic => "anthropic",
            ApiStyle::Simulated => "simulated",
        }
    }
}

impl std::fmt::Display for ApiStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static description of one backend (Value Object).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Stable identifier, unique within the roster.
    pub id: BackendId,
    /// Human-readable display name.
    pub name: String,
    /// Wire dialect this backend speaks.
    pub api_style: ApiStyle,
    /// Provider-side model name sent in requests.
    pub model_name: String,
    /// Endpoint URL. Optional for styles with a well-known default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Route to the simulation adapter regardless of `api_style`.
    #[serde(default)]
    pub simulated: bool,
    /// Short description shown in listings.
    #[serde(default)]
    pub description: String,
}

impl BackendConfig {
    /// The default five-backend roster.
    pub fn default_roster() -> Vec<BackendConfig> {
        vec![
            BackendConfig {
                id: BackendId::new("gemini"),
                name: "Gemini 2.5 Flash".to_string(),
                api_style: ApiStyle::Gemini,
                model_name: "gemini-2.5-flash".to_string(),
                endpoint: None,
                simulated: false,
                description: "Google Multimodal".to_string(),
            },
            BackendConfig {
                id: BackendId::new("openai"),
                name: "GPT-4o".to_string(),
                api_style: ApiStyle::OpenAi,
                model_name: "gpt-4o".to_string(),
                endpoint: Some("https://api.openai.com/v1/chat/completions".to_string()),
                simulated: false,
                description: "OpenAI Flagship".to_string(),
            },
            BackendConfig {
                id: BackendId::new("anthropic"),
                name: "Claude 3.5 Sonnet".to_string(),
                api_style: ApiStyle::Anthropic,
                model_name: "claude-3-5-sonnet-20240620".to_string(),
                endpoint: Some("https://api.anthropic.com/v1/messages".to_string()),
                simulated: false,
                description: "Anthropic Reasoning".to_string(),
            },
            BackendConfig {
                id: BackendId::new("grok"),
                name: "Grok Beta".to_string(),
                api_style: ApiStyle::OpenAi,
                model_name: "grok-beta".to_string(),
                endpoint: Some("https://api.grok.x.ai/v1/chat/completions".to_string()),
                simulated: false,
                description: "xAI Realtime".to_string(),
            },
            BackendConfig {
                id: BackendId::new("deepseek"),
                name: "DeepSeek V3".to_string(),
                api_style: ApiStyle::OpenAi,
                model_name: "deepseek-chat".to_string(),
                endpoint: Some("https://api.deepseek.com/chat/completions".to_string()),
                simulated: false,
                description: "DeepSeek Coding".to_string(),
            },
        ]
    }

    /// The backends enabled out of the box.
    pub fn default_active() -> Vec<BackendId> {
        vec![
            BackendId::new("gemini"),
            BackendId::new("openai"),
            BackendId::new("anthropic"),
        ]
    }
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Model,
}

/// One message in a chat-style request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}
