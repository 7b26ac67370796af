//! Presentation layer for neurosync
//!
//! CLI definitions, output formatters, and the live per-backend progress
//! display.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat, SynthesizerArg};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{SimpleProgress, StatusReporter};
