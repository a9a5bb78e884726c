//! LLM integration
//!
//! Features:
//! - Generator backends (Ollama, OpenAI-compatible chat completions incl. Groq)
//! - Bounded retry with exponential backoff on transient failures
//! - Backend factory driven by `GenerationConfig`
//! - Prompt templates for knowledge-base and web answers
//! - Web query reformulation

pub mod backend;
pub mod factory;
pub mod prompt;
pub mod reformulate;

pub use backend::{LlmConfig, OllamaBackend, OpenAiCompatibleBackend};
pub use factory::LlmFactory;
pub use prompt::PromptBuilder;
pub use reformulate::{simple_reformulation, QueryReformulator};

use docqa_core::GenerationError;
use thiserror::Error;

/// LLM errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0} ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Network failures, 5xx responses and timeouts are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout(_))
    }
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Generation(msg) | LlmError::Api(msg) => GenerationError::Backend(msg),
            LlmError::Network(msg) => GenerationError::Network(msg),
            LlmError::InvalidResponse(msg) => GenerationError::InvalidResponse(msg),
            LlmError::Timeout(ms) => GenerationError::Timeout(ms),
            LlmError::Configuration(msg) => GenerationError::Configuration(msg),
        }
    }
}
