//! Infrastructure layer for neurosync
//!
//! Concrete implementations of the application ports: the streaming HTTP
//! adapters for each wire dialect, the deterministic simulated backend,
//! configuration loading, and history persistence.

pub mod adapters;
pub mod config;
pub mod history;

pub use adapters::gemini::GeminiAdapter;
pub use adapters::http_chat::{AnthropicAdapter, ChatCompletionsAdapter};
pub use adapters::mock::SimulatedAdapter;
pub use adapters::router::AdapterRouter;
pub use config::file_config::{
    FileBackendEntry, FileBackendsConfig, FileConfig, FileHistoryConfig, FileSynthesizerConfig,
    FileTimeoutsConfig,
};
pub use config::loader::ConfigLoader;
pub use history::InMemoryHistoryStore;
