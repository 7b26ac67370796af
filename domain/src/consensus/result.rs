//! Consensus result types.

use crate::core::backend::BackendId;
use serde::{Deserialize, Serialize};

/// Lifecycle status of the consensus for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusStatus {
    Idle,
    /// Request started, backends still streaming.
    Analyzing,
    /// All backends terminal, synthesis in progress.
    Synthesizing,
    Completed,
    Error,
    Timeout,
}

impl ConsensusStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConsensusStatus::Completed | ConsensusStatus::Error | ConsensusStatus::Timeout
        )
    }
}

impl std::fmt::Display for ConsensusStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConsensusStatus::Idle => "idle",
            ConsensusStatus::Analyzing => "analyzing",
            ConsensusStatus::Synthesizing => "synthesizing",
            ConsensusStatus::Completed => "completed",
            ConsensusStatus::Error => "error",
            ConsensusStatus::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

/// One backend's share of the synthesized answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub backend: BackendId,
    /// Normalized weight; contributor weights sum to 1 within rounding.
    pub weight: f64,
}

/// The synthesized answer for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub status: ConsensusStatus,
    /// Empty until `Completed` (delegate mode streams into it while
    /// `Synthesizing`).
    pub text: String,
    /// 0-1. Reflects relative dominance, not factual verification.
    pub confidence: f64,
    /// Ordered by registration order of the contributing backends.
    pub contributors: Vec<Contributor>,
}

impl ConsensusResult {
    /// The reset state at the start of every new request.
    pub fn idle() -> Self {
        Self {
            status: ConsensusStatus::Idle,
            text: String::new(),
            confidence: 0.0,
            contributors: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fold a partial update into this result.
    pub fn patched(mut self, delta: ConsensusDelta) -> Self {
        if let Some(status) = delta.status {
            self.status = status;
        }
        if let Some(text) = delta.text {
            self.text = text;
        }
        if let Some(confidence) = delta.confidence {
            self.confidence = confidence;
        }
        if let Some(contributors) = delta.contributors {
            self.contributors = contributors;
        }
        self
    }
}

impl Default for ConsensusResult {
    fn default() -> Self {
        Self::idle()
    }
}

/// Partial update to a [`ConsensusResult`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsensusDelta {
    pub status: Option<ConsensusStatus>,
    pub text: Option<String>,
    pub confidence: Option<f64>,
    pub contributors: Option<Vec<Contributor>>,
}

impl ConsensusDelta {
    pub fn status(status: ConsensusStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_is_empty() {
        let c = ConsensusResult::idle();
        assert_eq!(c.status, ConsensusStatus::Idle);
        assert!(c.text.is_empty());
        assert!(c.contributors.is_empty());
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn patch_merges_fields() {
        let c = ConsensusResult::idle()
            .patched(ConsensusDelta::status(ConsensusStatus::Synthesizing))
            .patched(ConsensusDelta::text("partial"));
        assert_eq!(c.status, ConsensusStatus::Synthesizing);
        assert_eq!(c.text, "partial");
        // Untouched fields survive
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn terminal_statuses() {
        assert!(ConsensusStatus::Completed.is_terminal());
        assert!(ConsensusStatus::Error.is_terminal());
        assert!(ConsensusStatus::Timeout.is_terminal());
        assert!(!ConsensusStatus::Analyzing.is_terminal());
        assert!(!ConsensusStatus::Synthesizing.is_terminal());
    }
}
