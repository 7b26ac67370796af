//! Configuration loading and raw file types.

pub mod file_config;
pub mod loader;
