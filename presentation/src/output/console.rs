//! Console output formatter for settled sessions

use colored::Colorize;
use neurosync_domain::{BackendStatus, ConsensusStatus, ModelResponse, Session};
use serde::Serialize;

/// JSON view of a settled request.
#[derive(Serialize)]
struct SessionReport<'a> {
    prompt: &'a str,
    responses: Vec<&'a ModelResponse>,
    consensus: &'a neurosync_domain::ConsensusResult,
}

/// Formats settled sessions for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete result: every backend's response plus the
    /// consensus.
    pub fn format(session: &Session) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Neurosync Results"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n\n",
            "Prompt:".cyan().bold(),
            session.prompt
        ));

        let active = session.active_in_registration_order();
        let names: Vec<String> = active.iter().map(|id| id.to_string()).collect();
        output.push_str(&format!(
            "{} {}\n",
            "Backends:".cyan().bold(),
            names.join(", ")
        ));

        output.push_str(&Self::section_header("Responses"));
        for response in session.active_responses() {
            output.push_str(&Self::format_response(&response));
        }

        output.push_str(&Self::section_header("Consensus"));
        output.push_str(&Self::format_consensus(session));

        output.push_str(&Self::footer());
        output
    }

    /// Only the synthesized answer (default output).
    pub fn format_consensus_only(session: &Session) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} {}\n\n", "Q:".bold(), session.prompt));
        output.push_str(&Self::format_consensus(session));
        output
    }

    /// Format as JSON
    pub fn format_json(session: &Session) -> String {
        let responses = session.active_responses();
        let report = SessionReport {
            prompt: &session.prompt,
            responses: responses.iter().collect(),
            consensus: &session.consensus,
        };
        serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_response(response: &ModelResponse) -> String {
        match response.status {
            BackendStatus::Completed | BackendStatus::Timeout => {
                let mut header = format!("── {} ──", response.backend).yellow().bold().to_string();
                if response.status == BackendStatus::Timeout {
                    header.push_str(&" (timed out, partial)".yellow().to_string());
                }
                format!(
                    "\n{}\n{}\n{}\n",
                    header,
                    response.text,
                    format!(
                        "{} tokens, {}ms",
                        response.token_estimate, response.latency_ms
                    )
                    .dimmed()
                )
            }
            _ => format!(
                "\n{}\nError: {}\n",
                format!("── {} ──", response.backend).red().bold(),
                response.error.as_deref().unwrap_or("Unknown")
            ),
        }
    }

    fn format_consensus(session: &Session) -> String {
        let consensus = &session.consensus;
        let mut output = String::new();

        match consensus.status {
            ConsensusStatus::Completed => {
                output.push_str(&format!("{}\n\n", consensus.text));
                output.push_str(&format!(
                    "{} {:.0}%\n",
                    "Confidence:".cyan().bold(),
                    consensus.confidence * 100.0
                ));
                if !consensus.contributors.is_empty() {
                    output.push_str(&format!("{}\n", "Contributors:".cyan().bold()));
                    for contributor in &consensus.contributors {
                        output.push_str(&format!(
                            "  * {} ({:.0}%)\n",
                            contributor.backend,
                            contributor.weight * 100.0
                        ));
                    }
                }
            }
            ConsensusStatus::Error => {
                let reason = if consensus.text.is_empty() {
                    "no backend produced a usable response"
                } else {
                    consensus.text.as_str()
                };
                output.push_str(&format!(
                    "{} {}\n",
                    "Synthesis failed:".red().bold(),
                    reason
                ));
            }
            other => {
                output.push_str(&format!("{} {}\n", "Status:".bold(), other));
            }
        }

        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurosync_domain::{
        BackendId, ConsensusResult, Contributor, SessionSeed,
    };

    fn settled_session() -> Session {
        let mut session = Session::initial(SessionSeed::default());
        session.prompt = "What is Rust?".to_string();
        session.active = vec![BackendId::new("openai"), BackendId::new("anthropic")];

        let openai = session.responses.get_mut(&BackendId::new("openai")).unwrap();
        openai.status = BackendStatus::Completed;
        openai.text = "A systems language.".to_string();
        openai.latency_ms = 820;
        openai.token_estimate = 5;

        let anthropic = session
            .responses
            .get_mut(&BackendId::new("anthropic"))
            .unwrap();
        anthropic.status = BackendStatus::Error;
        anthropic.error = Some("Connection timed out".to_string());

        session.consensus = ConsensusResult {
            status: ConsensusStatus::Completed,
            text: "Rust is a systems language.".to_string(),
            confidence: 0.85,
            contributors: vec![Contributor {
                backend: BackendId::new("openai"),
                weight: 1.0,
            }],
        };
        session
    }

    #[test]
    fn full_output_covers_responses_and_consensus() {
        colored::control::set_override(false);
        let output = ConsoleFormatter::format(&settled_session());
        assert!(output.contains("What is Rust?"));
        assert!(output.contains("── openai ──"));
        assert!(output.contains("A systems language."));
        assert!(output.contains("Error: Connection timed out"));
        assert!(output.contains("Confidence: 85%"));
        assert!(output.contains("* openai (100%)"));
    }

    #[test]
    fn consensus_only_skips_individual_responses() {
        colored::control::set_override(false);
        let output = ConsoleFormatter::format_consensus_only(&settled_session());
        assert!(output.contains("Rust is a systems language."));
        assert!(!output.contains("── openai ──"));
    }

    #[test]
    fn json_output_round_trips() {
        let output = ConsoleFormatter::format_json(&settled_session());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["prompt"], "What is Rust?");
        assert_eq!(value["consensus"]["confidence"], 0.85);
        assert_eq!(value["responses"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn failed_consensus_explains_itself() {
        colored::control::set_override(false);
        let mut session = settled_session();
        session.consensus = ConsensusResult {
            status: ConsensusStatus::Error,
            text: String::new(),
            confidence: 0.0,
            contributors: Vec::new(),
        };
        let output = ConsoleFormatter::format_consensus_only(&session);
        assert!(output.contains("no backend produced a usable response"));
    }
}
