//! Stream adapters
//!
//! One adapter per wire dialect, plus the [`router::AdapterRouter`] that
//! implements the application's `StreamGateway` port by dispatching on a
//! backend's [`ApiStyle`](neurosync_domain::ApiStyle). All live adapters
//! share the SSE framing in [`sse`].

pub mod gemini;
pub mod http_chat;
pub mod mock;
pub mod router;
pub mod sse;
