//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("No backends are active")]
    NoActiveBackends,

    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("A request is already in flight")]
    RequestInFlight,

    #[error("No request is current")]
    NoCurrentRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_human_readable() {
        assert_eq!(
            DomainError::UnknownBackend("grok".to_string()).to_string(),
            "Unknown backend: grok"
        );
        assert_eq!(
            DomainError::NoActiveBackends.to_string(),
            "No backends are active"
        );
    }
}
