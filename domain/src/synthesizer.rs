//! Synthesizer configuration.
//!
//! Pure configuration for the consensus step. Mutated only by explicit
//! user action (a `SetSynthesizer` session event), never by the
//! orchestration logic itself. Heuristic mode ignores every arbiter field.

use crate::core::backend::ApiStyle;
use serde::{Deserialize, Serialize};

/// How the consensus answer is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesizerMode {
    /// Deterministic weighted merge over the completed responses.
    Heuristic,
    /// Hand the raw responses to a designated arbiter model.
    Delegate,
}

/// Sampling parameters passed to the arbiter call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SamplingParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Provider-specific reasoning effort hint (e.g. "low", "medium", "high").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

/// Configuration for the synthesis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    pub mode: SynthesizerMode,
    /// Wire dialect of the arbiter endpoint (delegate mode only).
    pub arbiter_style: ApiStyle,
    pub arbiter_endpoint: String,
    pub arbiter_model: String,
    #[serde(default)]
    pub arbiter_credential: String,
    /// System instruction sent to the arbiter.
    pub system_instruction: String,
    #[serde(default)]
    pub sampling: SamplingParams,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            mode: SynthesizerMode::Heuristic,
            arbiter_style: ApiStyle::OpenAi,
            arbiter_endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            arbiter_model: "llama3".to_string(),
            arbiter_credential: String::new(),
            system_instruction: "You are a consensus engine. Synthesize the provided \
                AI responses into a single, superior answer. Resolve conflicts, verify \
                facts, and merge insights."
                .to_string(),
            sampling: SamplingParams::default(),
        }
    }
}
