//! CLI command definitions

use clap::{Parser, ValueEnum};
use neurosync_domain::SynthesizerMode;
use std::path::PathBuf;

/// Output format for results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Full formatted output with every backend's response
    Full,
    /// Only the synthesized consensus
    Consensus,
    /// JSON output
    Json,
}

/// Synthesis strategy
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SynthesizerArg {
    /// Deterministic weighted merge of the responses
    Heuristic,
    /// Hand the responses to a designated arbiter model
    Delegate,
}

impl From<SynthesizerArg> for SynthesizerMode {
    fn from(arg: SynthesizerArg) -> Self {
        match arg {
            SynthesizerArg::Heuristic => SynthesizerMode::Heuristic,
            SynthesizerArg::Delegate => SynthesizerMode::Delegate,
        }
    }
}

/// CLI arguments for neurosync
#[derive(Parser, Debug)]
#[command(name = "neurosync")]
#[command(author, version, about = "Parallel intelligence aggregator - one prompt, many models, one answer")]
#[command(long_about = r#"
Neurosync fans a prompt out to several LLM backends concurrently, streams
their responses side by side, and synthesizes a single consensus answer once
every backend has settled.

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./neurosync.toml    Project-level config
3. ~/.config/neurosync/config.toml   Global config

API keys are read from the environment (GEMINI_API_KEY, OPENAI_API_KEY,
ANTHROPIC_API_KEY, ...), overridable per backend via key_env in the config.

Example:
  neurosync "What's the best way to handle errors in Rust?"
  neurosync -b openai -b anthropic --synthesizer delegate "Compare async runtimes"
  neurosync --simulate -o full "Dry run without any API keys"
"#)]
pub struct Cli {
    /// The prompt to fan out to the active backends
    pub prompt: Option<String>,

    /// Backends to query (can be specified multiple times; defaults to the
    /// configured active set)
    #[arg(short, long, value_name = "BACKEND")]
    pub backend: Vec<String>,

    /// Synthesis strategy (defaults to the configured one)
    #[arg(short, long, value_enum)]
    pub synthesizer: Option<SynthesizerArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "consensus")]
    pub output: OutputFormat,

    /// Route every backend to the deterministic simulation adapter
    #[arg(long)]
    pub simulate: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// List the configured backends and exit
    #[arg(long)]
    pub list_backends: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_backends_and_synthesizer() {
        let cli = Cli::parse_from([
            "neurosync",
            "-b",
            "openai",
            "-b",
            "anthropic",
            "--synthesizer",
            "delegate",
            "question",
        ]);
        assert_eq!(cli.backend, vec!["openai", "anthropic"]);
        assert!(matches!(cli.synthesizer, Some(SynthesizerArg::Delegate)));
        assert_eq!(cli.prompt.as_deref(), Some("question"));
    }

    #[test]
    fn defaults_to_consensus_output() {
        let cli = Cli::parse_from(["neurosync", "question"]);
        assert!(matches!(cli.output, OutputFormat::Consensus));
        assert!(!cli.simulate);
        assert_eq!(cli.verbose, 0);
    }
}
