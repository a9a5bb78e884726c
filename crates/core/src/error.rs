//! Collaborator error taxonomy
//!
//! Every external collaborator reports failures through one of these types.
//! The orchestrator absorbs them into state transitions; only terminal
//! outcomes reach the caller, and then as a structured failure rather than
//! one of these raw errors.

use thiserror::Error;

/// Retriever errors. Always recovered by treating the knowledge base as insufficient.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Retrieval timed out after {0} ms")]
    Timeout(u64),

    #[error("Retrieval backend error: {0}")]
    Backend(String),
}

impl RetrievalError {
    /// Stable short name used in failure payloads and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IndexUnavailable(_) => "index_unavailable",
            Self::Timeout(_) => "timeout",
            Self::Backend(_) => "backend",
        }
    }
}

/// Generator (LLM backend) errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Generation backend error: {0}")]
    Backend(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Generation timed out after {0} ms")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Backend(_) => "backend",
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Configuration(_) => "configuration",
        }
    }
}

/// Per-provider web search errors. Recovered by advancing to the next provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Provider returned no results")]
    Empty,

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Provider not applicable: {0}")]
    NotApplicable(String),
}

impl ProviderError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Empty => "empty",
            Self::Malformed(_) => "malformed",
            Self::NotApplicable(_) => "not_applicable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(RetrievalError::Timeout(10).kind(), "timeout");
        assert_eq!(
            GenerationError::InvalidResponse("x".into()).kind(),
            "invalid_response"
        );
        assert_eq!(ProviderError::Timeout { after_ms: 5 }.kind(), "timeout");
        assert_eq!(ProviderError::Empty.kind(), "empty");
    }

    #[test]
    fn test_provider_timeout_message() {
        let err = ProviderError::Timeout { after_ms: 250 };
        assert_eq!(err.to_string(), "Provider timed out after 250 ms");
    }
}
