//! Answer orchestration
//!
//! Routes each question through knowledge-base retrieval, confidence
//! assessment and generation, escalating to web search when local evidence
//! is insufficient. Every answer carries citations from the evidence that
//! was actually used.

pub mod citations;
pub mod events;
pub mod failure;
pub mod orchestrator;
pub mod state;

pub use citations::CitationComposer;
pub use events::AskEvent;
pub use failure::{AskFailure, FailureKind, StepFailure};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use state::{EscalationCause, TransitionError, Workflow, WorkflowState};

use thiserror::Error;

/// Errors building an orchestrator
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Web search setup failed: {0}")]
    Web(#[from] docqa_web::WebError),
}

impl From<docqa_rag::RagError> for AgentError {
    fn from(err: docqa_rag::RagError) -> Self {
        AgentError::Configuration(err.to_string())
    }
}
