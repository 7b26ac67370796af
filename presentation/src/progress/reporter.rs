//! Live progress display for a fan-out request.
//!
//! One bar per active backend, positioned by the 0-100 progress estimate,
//! plus a consensus line that appears once synthesis starts. Implements
//! the application's observer port so it stays decoupled from the
//! orchestration loop.

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use neurosync_application::SessionObserver;
use neurosync_domain::{BackendId, BackendStatus, ConsensusResult, ConsensusStatus, ModelResponse};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct StatusReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<BackendId, ProgressBar>>,
    consensus_bar: Mutex<Option<ProgressBar>>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            consensus_bar: Mutex::new(None),
        }
    }

    fn backend_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:>10.bold.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap()
            .progress_chars("=>-")
    }

    fn consensus_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.magenta} {msg}")
            .unwrap()
    }

    fn status_message(response: &ModelResponse) -> String {
        match response.status {
            BackendStatus::Idle => "idle".dimmed().to_string(),
            BackendStatus::Connecting => "connecting...".to_string(),
            BackendStatus::Streaming => {
                format!("streaming ({} tokens)", response.token_estimate)
            }
            BackendStatus::Completed => format!(
                "{} {} tokens, {}ms",
                "done".green(),
                response.token_estimate,
                response.latency_ms
            ),
            BackendStatus::Error => format!(
                "{} {}",
                "error:".red(),
                response.error.as_deref().unwrap_or("unknown")
            ),
            BackendStatus::Timeout => format!(
                "{} {}",
                "timeout:".yellow(),
                response.error.as_deref().unwrap_or("deadline exceeded")
            ),
        }
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionObserver for StatusReporter {
    fn on_request_started(&self, _prompt: &str, backends: &[BackendId]) {
        let mut bars = self.bars.lock().unwrap();
        bars.clear();
        for backend in backends {
            let bar = self.multi.add(ProgressBar::new(100));
            bar.set_style(Self::backend_style());
            bar.set_prefix(backend.to_string());
            bar.set_message("waiting".dimmed().to_string());
            bars.insert(backend.clone(), bar);
        }
    }

    fn on_response(&self, response: &ModelResponse) {
        let bars = self.bars.lock().unwrap();
        if let Some(bar) = bars.get(&response.backend) {
            bar.set_position(response.progress as u64);
            bar.set_message(Self::status_message(response));
            if response.is_terminal() {
                bar.finish();
            }
        }
    }

    fn on_consensus(&self, consensus: &ConsensusResult) {
        let mut slot = self.consensus_bar.lock().unwrap();
        match consensus.status {
            ConsensusStatus::Synthesizing => {
                let bar = slot.get_or_insert_with(|| {
                    let bar = self.multi.add(ProgressBar::new_spinner());
                    bar.set_style(Self::consensus_style());
                    bar.set_prefix("consensus");
                    bar
                });
                bar.set_message("synthesizing...");
                bar.tick();
            }
            ConsensusStatus::Completed => {
                if let Some(bar) = slot.take() {
                    bar.finish_with_message(format!(
                        "{} (confidence {:.0}%)",
                        "complete".green(),
                        consensus.confidence * 100.0
                    ));
                }
            }
            ConsensusStatus::Error | ConsensusStatus::Timeout => {
                if let Some(bar) = slot.take() {
                    bar.finish_with_message("failed".red().to_string());
                }
            }
            ConsensusStatus::Idle | ConsensusStatus::Analyzing => {}
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl SessionObserver for SimpleProgress {
    fn on_request_started(&self, _prompt: &str, backends: &[BackendId]) {
        let names: Vec<String> = backends.iter().map(|b| b.to_string()).collect();
        println!("{} querying {}", "->".cyan(), names.join(", "));
    }

    fn on_response(&self, response: &ModelResponse) {
        match response.status {
            BackendStatus::Completed => {
                println!(
                    "  {} {} ({}ms)",
                    "v".green(),
                    response.backend,
                    response.latency_ms
                );
            }
            BackendStatus::Error | BackendStatus::Timeout => {
                println!(
                    "  {} {} ({})",
                    "x".red(),
                    response.backend,
                    response.error.as_deref().unwrap_or("failed")
                );
            }
            _ => {}
        }
    }

    fn on_consensus(&self, consensus: &ConsensusResult) {
        if consensus.status == ConsensusStatus::Synthesizing {
            println!("{} synthesizing consensus...", "->".cyan());
        }
    }
}
