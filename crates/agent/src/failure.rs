//! Structured failure result
//!
//! The only error that crosses the orchestrator boundary. It always carries
//! the explicit "could not find an answer" message, never a guessed answer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::WorkflowState;

/// Terminal failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Every web provider failed
    FallbackExhausted,
    /// Generation failed with no path left to escalate to
    GenerationFailed,
    /// The query was cancelled
    Cancelled,
    /// Workflow bookkeeping error
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::FallbackExhausted => "fallback_exhausted",
            FailureKind::GenerationFailed => "generation_failed",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Internal => "internal",
        }
    }
}

/// One error absorbed or hit along the way
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailure {
    pub state: WorkflowState,
    /// Retriever, generator model, provider or validator name
    pub component: String,
    pub kind: String,
    pub reason: String,
}

impl StepFailure {
    pub fn new(
        state: WorkflowState,
        component: impl Into<String>,
        kind: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            state,
            component: component.into(),
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

/// A query that ended in FAILED
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message} ({})", .kind.as_str())]
pub struct AskFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub question: String,
    pub kind: FailureKind,
    pub message: String,
    /// States visited, ending in `failed`
    pub path: Vec<WorkflowState>,
    pub failures: Vec<StepFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub elapsed_ms: u64,
}

impl AskFailure {
    /// Failures recorded in a given state
    pub fn failures_in(&self, state: WorkflowState) -> impl Iterator<Item = &StepFailure> {
        self.failures.iter().filter(move |f| f.state == state)
    }
}
