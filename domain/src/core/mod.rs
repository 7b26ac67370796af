//! Core domain primitives shared across modules.

pub mod backend;
pub mod error;
pub mod prompt;
