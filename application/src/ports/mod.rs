//! Ports (interfaces) for the application layer.
//!
//! Implementations (adapters) live in the infrastructure and presentation
//! layers.

pub mod history_store;
pub mod session_observer;
pub mod stream_gateway;
