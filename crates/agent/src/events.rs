//! Orchestrator lifecycle events

use serde::Serialize;

use docqa_core::SourceType;

use crate::failure::FailureKind;
use crate::state::WorkflowState;

/// Events broadcast while a query runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AskEvent {
    /// Workflow moved to a new state
    StateChanged {
        request_id: Option<String>,
        from: WorkflowState,
        to: WorkflowState,
    },
    /// Escalating to web search; sent at most once per query
    FallbackNotice {
        request_id: Option<String>,
        message: String,
    },
    /// Query finished
    Finished {
        request_id: Option<String>,
        source_type: Option<SourceType>,
        failure: Option<FailureKind>,
        elapsed_ms: u64,
    },
}

impl AskEvent {
    pub fn request_id(&self) -> Option<&str> {
        match self {
            AskEvent::StateChanged { request_id, .. }
            | AskEvent::FallbackNotice { request_id, .. }
            | AskEvent::Finished { request_id, .. } => request_id.as_deref(),
        }
    }
}
