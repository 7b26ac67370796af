//! CLI entrypoint for neurosync
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, bail};
use clap::Parser;
use neurosync_application::{Orchestrator, StreamGateway};
use neurosync_domain::{BackendId, ConsensusStatus, Session, SessionEvent, transition};
use neurosync_infrastructure::{AdapterRouter, ConfigLoader, InMemoryHistoryStore};
use neurosync_presentation::{Cli, ConsoleFormatter, OutputFormat, StatusReporter};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };

    if cli.list_backends {
        for backend in config.roster() {
            println!(
                "{:<12} {:<24} {:<10} {}",
                backend.id, backend.name, backend.api_style, backend.description
            );
        }
        return Ok(());
    }

    let mut seed = config.to_seed();

    // CLI backend selection overrides the configured active set
    if !cli.backend.is_empty() {
        let mut active = Vec::new();
        for raw in &cli.backend {
            let id = BackendId::new(raw.clone());
            if !seed.backends.iter().any(|b| b.id == id) {
                bail!("Unknown backend: {raw}. Use --list-backends to see the roster.");
            }
            active.push(id);
        }
        seed.active = active;
    }
    if let Some(mode) = cli.synthesizer {
        seed.synthesizer.mode = mode.into();
    }

    let prompt = match cli.prompt {
        Some(p) => p,
        None => bail!("A prompt is required."),
    };

    // === Dependency Injection ===
    let mut session = Session::initial(seed);
    if !cli.simulate {
        for (backend, key) in config.resolve_credentials() {
            session = transition(session, SessionEvent::SetCredential { backend, key });
        }
    }

    let gateway: Arc<dyn StreamGateway> = if cli.simulate {
        Arc::new(AdapterRouter::simulated())
    } else {
        Arc::new(AdapterRouter::new())
    };
    let history = Arc::new(InMemoryHistoryStore::new(config.history.limit));

    let mut orchestrator = Orchestrator::new(session, gateway)
        .with_timeouts(config.to_timeouts())
        .with_history(history);
    if !cli.quiet {
        orchestrator = orchestrator.with_observer(Arc::new(StatusReporter::new()));
    }

    info!("Starting neurosync fan-out");
    let session = orchestrator.execute(&prompt).await?;

    let output = match cli.output {
        OutputFormat::Full => ConsoleFormatter::format(&session),
        OutputFormat::Consensus => ConsoleFormatter::format_consensus_only(&session),
        OutputFormat::Json => ConsoleFormatter::format_json(&session),
    };
    println!("{output}");

    if session.consensus.status != ConsensusStatus::Completed {
        std::process::exit(1);
    }
    Ok(())
}
