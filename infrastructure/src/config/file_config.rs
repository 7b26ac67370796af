//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section is optional; defaults reproduce the built-in five-backend
//! roster, the two-tier timeouts, and the heuristic synthesizer.

use neurosync_application::TimeoutTiers;
use neurosync_domain::{
    ApiStyle, BackendConfig, BackendId, SamplingParams, SessionSeed, SynthesizerConfig,
    SynthesizerMode,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub backends: FileBackendsConfig,
    pub timeouts: FileTimeoutsConfig,
    pub synthesizer: FileSynthesizerConfig,
    pub history: FileHistoryConfig,
}

/// Backend roster and active set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendsConfig {
    /// Backend ids enabled at startup.
    pub active: Vec<String>,
    /// Full roster; replaces the built-in roster when non-empty.
    pub roster: Vec<FileBackendEntry>,
}

impl Default for FileBackendsConfig {
    fn default() -> Self {
        Self {
            active: BackendConfig::default_active()
                .into_iter()
                .map(|id| id.to_string())
                .collect(),
            roster: Vec::new(),
        }
    }
}

/// One roster entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBackendEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub style: ApiStyle,
    pub model: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Environment variable holding this backend's API key.
    #[serde(default)]
    pub key_env: Option<String>,
    #[serde(default)]
    pub simulated: bool,
    #[serde(default)]
    pub description: String,
}

impl FileBackendEntry {
    fn to_domain(&self) -> BackendConfig {
        BackendConfig {
            id: BackendId::new(self.id.clone()),
            name: if self.name.is_empty() {
                self.id.clone()
            } else {
                self.name.clone()
            },
            api_style: self.style,
            model_name: self.model.clone(),
            endpoint: self.endpoint.clone(),
            simulated: self.simulated,
            description: self.description.clone(),
        }
    }

    fn key_env(&self) -> String {
        self.key_env
            .clone()
            .unwrap_or_else(|| default_key_env(&self.id))
    }
}

/// `GEMINI_API_KEY` for `gemini`, and so on.
fn default_key_env(id: &str) -> String {
    format!("{}_API_KEY", id.to_uppercase())
}

/// Two-tier streaming deadlines, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTimeoutsConfig {
    pub connection_ms: u64,
    pub generation_ms: u64,
}

impl Default for FileTimeoutsConfig {
    fn default() -> Self {
        Self {
            connection_ms: 30_000,
            generation_ms: 60_000,
        }
    }
}

/// Synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSynthesizerConfig {
    pub mode: SynthesizerMode,
    pub style: ApiStyle,
    pub endpoint: String,
    pub model: String,
    pub key_env: Option<String>,
    pub system_instruction: Option<String>,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
    /// Reasoning effort hint sent to OpenAI-dialect arbiters.
    pub reasoning_effort: Option<String>,
}

impl Default for FileSynthesizerConfig {
    fn default() -> Self {
        let defaults = SynthesizerConfig::default();
        Self {
            mode: defaults.mode,
            style: defaults.arbiter_style,
            endpoint: defaults.arbiter_endpoint,
            model: defaults.arbiter_model,
            key_env: None,
            system_instruction: None,
            temperature: None,
            max_output_tokens: None,
            reasoning_effort: None,
        }
    }
}

/// History list settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHistoryConfig {
    pub limit: usize,
}

impl Default for FileHistoryConfig {
    fn default() -> Self {
        Self { limit: 50 }
    }
}

impl FileConfig {
    /// The effective roster: configured entries, or the built-in five.
    pub fn roster(&self) -> Vec<BackendConfig> {
        if self.backends.roster.is_empty() {
            BackendConfig::default_roster()
        } else {
            self.backends.roster.iter().map(|e| e.to_domain()).collect()
        }
    }

    /// Build the initial session seed. Active ids not present in the
    /// roster are dropped.
    pub fn to_seed(&self) -> SessionSeed {
        let roster = self.roster();
        let active = self
            .backends
            .active
            .iter()
            .map(|id| BackendId::new(id.clone()))
            .filter(|id| roster.iter().any(|b| &b.id == id))
            .collect();
        SessionSeed {
            backends: roster,
            active,
            synthesizer: self.to_synthesizer(|key| std::env::var(key).ok()),
            history_limit: self.history.limit,
        }
    }

    pub fn to_timeouts(&self) -> TimeoutTiers {
        TimeoutTiers {
            connection: Duration::from_millis(self.timeouts.connection_ms),
            generation: Duration::from_millis(self.timeouts.generation_ms),
        }
    }

    /// Resolve per-backend credentials from the environment.
    pub fn resolve_credentials(&self) -> HashMap<BackendId, String> {
        self.resolve_credentials_with(|key| std::env::var(key).ok())
    }

    pub fn resolve_credentials_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> HashMap<BackendId, String> {
        let entries: Vec<(String, String)> = if self.backends.roster.is_empty() {
            BackendConfig::default_roster()
                .into_iter()
                .map(|b| (b.id.to_string(), default_key_env(b.id.as_str())))
                .collect()
        } else {
            self.backends
                .roster
                .iter()
                .map(|e| (e.id.clone(), e.key_env()))
                .collect()
        };

        entries
            .into_iter()
            .filter_map(|(id, key)| {
                let value = lookup(&key)?;
                (!value.is_empty()).then(|| (BackendId::new(id), value))
            })
            .collect()
    }

    pub fn to_synthesizer(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> SynthesizerConfig {
        let defaults = SynthesizerConfig::default();
        SynthesizerConfig {
            mode: self.synthesizer.mode,
            arbiter_style: self.synthesizer.style,
            arbiter_endpoint: self.synthesizer.endpoint.clone(),
            arbiter_model: self.synthesizer.model.clone(),
            arbiter_credential: self
                .synthesizer
                .key_env
                .as_deref()
                .and_then(&lookup)
                .unwrap_or_default(),
            system_instruction: self
                .synthesizer
                .system_instruction
                .clone()
                .unwrap_or(defaults.system_instruction),
            sampling: SamplingParams {
                temperature: self.synthesizer.temperature,
                max_output_tokens: self.synthesizer.max_output_tokens,
                reasoning_effort: self.synthesizer.reasoning_effort.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_reproduces_the_builtin_setup() {
        let config = FileConfig::default();
        let seed = config.to_seed();
        assert_eq!(seed.backends.len(), 5);
        assert_eq!(seed.active.len(), 3);
        assert_eq!(seed.history_limit, 50);
        assert_eq!(seed.synthesizer.mode, SynthesizerMode::Heuristic);

        let timeouts = config.to_timeouts();
        assert_eq!(timeouts.connection, Duration::from_millis(30_000));
        assert_eq!(timeouts.generation, Duration::from_millis(60_000));
    }

    #[test]
    fn deserialize_full_config() {
        let toml_str = r#"
[backends]
active = ["local"]

[[backends.roster]]
id = "local"
style = "openai"
model = "llama3"
endpoint = "http://localhost:11434/v1/chat/completions"

[timeouts]
connection_ms = 5000
generation_ms = 20000

[synthesizer]
mode = "delegate"
model = "llama3"
reasoning_effort = "low"

[history]
limit = 10
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let seed = config.to_seed();
        assert_eq!(seed.backends.len(), 1);
        assert_eq!(seed.backends[0].id, BackendId::new("local"));
        assert_eq!(seed.active, vec![BackendId::new("local")]);
        assert_eq!(seed.synthesizer.mode, SynthesizerMode::Delegate);
        assert_eq!(
            seed.synthesizer.sampling.reasoning_effort.as_deref(),
            Some("low")
        );
        assert_eq!(seed.history_limit, 10);
        assert_eq!(config.to_timeouts().connection, Duration::from_millis(5000));
    }

    #[test]
    fn deserialize_partial_config_keeps_defaults() {
        let config: FileConfig = toml::from_str("[timeouts]\nconnection_ms = 1000\n").unwrap();
        assert_eq!(config.timeouts.connection_ms, 1000);
        assert_eq!(config.timeouts.generation_ms, 60_000);
        assert_eq!(config.roster().len(), 5);
    }

    #[test]
    fn unknown_active_ids_are_dropped() {
        let config: FileConfig =
            toml::from_str("[backends]\nactive = [\"openai\", \"nonexistent\"]\n").unwrap();
        assert_eq!(config.to_seed().active, vec![BackendId::new("openai")]);
    }

    #[test]
    fn credentials_resolve_from_conventional_env_names() {
        let config = FileConfig::default();
        let credentials = config.resolve_credentials_with(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "GEMINI_API_KEY" => Some(String::new()), // empty values are ignored
            _ => None,
        });
        assert_eq!(credentials.len(), 1);
        assert_eq!(
            credentials.get(&BackendId::new("openai")).map(String::as_str),
            Some("sk-test")
        );
    }

    #[test]
    fn custom_key_env_overrides_the_convention() {
        let toml_str = r#"
[[backends.roster]]
id = "local"
style = "openai"
model = "llama3"
key_env = "LOCAL_LLM_KEY"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let credentials = config.resolve_credentials_with(|key| {
            (key == "LOCAL_LLM_KEY").then(|| "secret".to_string())
        });
        assert_eq!(credentials.len(), 1);
    }
}
