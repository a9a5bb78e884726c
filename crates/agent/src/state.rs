//! Per-query workflow state machine
//!
//! ```text
//! START -> RETRIEVE -> ASSESS -> GENERATE_KB -> VALIDATE -> DONE
//!              |          |           |            |
//!              +----------+-----------+------------+--> ESCALATE_NOTICE
//!                                                           |
//!                               WEB_SEARCH <----------------+
//!                                   |
//!                              GENERATE_WEB -> DONE
//! ```
//!
//! Every non-terminal state may also go to FAILED (cancellation). A
//! [`Workflow`] never enters the same state twice, which bounds escalation
//! to one pass.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Orchestrator stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Start,
    Retrieve,
    Assess,
    GenerateKb,
    Validate,
    EscalateNotice,
    WebSearch,
    GenerateWeb,
    Done,
    Failed,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Start => "start",
            WorkflowState::Retrieve => "retrieve",
            WorkflowState::Assess => "assess",
            WorkflowState::GenerateKb => "generate_kb",
            WorkflowState::Validate => "validate",
            WorkflowState::EscalateNotice => "escalate_notice",
            WorkflowState::WebSearch => "web_search",
            WorkflowState::GenerateWeb => "generate_web",
            WorkflowState::Done => "done",
            WorkflowState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Done | WorkflowState::Failed)
    }

    /// States reachable from this one
    pub fn valid_transitions(&self) -> &'static [WorkflowState] {
        use WorkflowState::*;
        match self {
            Start => &[Retrieve, Failed],
            Retrieve => &[Assess, EscalateNotice, Failed],
            Assess => &[GenerateKb, EscalateNotice, Failed],
            GenerateKb => &[Validate, EscalateNotice, Failed],
            Validate => &[Done, EscalateNotice, Failed],
            EscalateNotice => &[WebSearch, Failed],
            WebSearch => &[GenerateWeb, Failed],
            GenerateWeb => &[Done, Failed],
            Done | Failed => &[],
        }
    }

    pub fn can_transition_to(&self, to: WorkflowState) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a query left the knowledge-base path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationCause {
    /// Retriever failed or timed out
    RetrievalFailed,
    /// Confidence verdict was insufficient
    LowConfidence,
    /// Generator failed on the knowledge-base context
    GenerationFailed,
    /// Generated answer matched an insufficient-information marker
    InsufficientAnswer,
}

impl EscalationCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationCause::RetrievalFailed => "retrieval_failed",
            EscalationCause::LowConfidence => "low_confidence",
            EscalationCause::GenerationFailed => "generation_failed",
            EscalationCause::InsufficientAnswer => "insufficient_answer",
        }
    }
}

/// Rejected workflow transitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    #[error("Invalid transition from {from} to {to}")]
    Invalid {
        from: WorkflowState,
        to: WorkflowState,
    },

    #[error("State {0} already visited")]
    Revisit(WorkflowState),

    #[error("Workflow already finished in {0}")]
    Finished(WorkflowState),
}

/// Bookkeeping for one query's pass through the state machine
#[derive(Debug, Clone)]
pub struct Workflow {
    current: WorkflowState,
    path: Vec<WorkflowState>,
    escalation: Option<EscalationCause>,
    notice_emitted: bool,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            current: WorkflowState::Start,
            path: vec![WorkflowState::Start],
            escalation: None,
            notice_emitted: false,
        }
    }

    pub fn current(&self) -> WorkflowState {
        self.current
    }

    /// Every state entered so far, in order
    pub fn path(&self) -> &[WorkflowState] {
        &self.path
    }

    pub fn escalation(&self) -> Option<EscalationCause> {
        self.escalation
    }

    pub fn escalated(&self) -> bool {
        self.escalation.is_some()
    }

    /// Move to `to`, returning the state left behind
    pub fn transition(&mut self, to: WorkflowState) -> Result<WorkflowState, TransitionError> {
        let from = self.current;
        if from.is_terminal() {
            return Err(TransitionError::Finished(from));
        }
        if !from.can_transition_to(to) {
            return Err(TransitionError::Invalid { from, to });
        }
        if self.path.contains(&to) {
            return Err(TransitionError::Revisit(to));
        }

        self.current = to;
        self.path.push(to);
        Ok(from)
    }

    /// Enter ESCALATE_NOTICE, remembering why
    pub fn escalate(&mut self, cause: EscalationCause) -> Result<WorkflowState, TransitionError> {
        let from = self.transition(WorkflowState::EscalateNotice)?;
        self.escalation = Some(cause);
        Ok(from)
    }

    /// True exactly once per workflow, the first time it is asked after escalating
    pub fn take_notice(&mut self) -> bool {
        if !self.escalated() || self.notice_emitted {
            return false;
        }
        self.notice_emitted = true;
        true
    }

    pub fn notice_emitted(&self) -> bool {
        self.notice_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkflowState::*;

    #[test]
    fn test_kb_happy_path() {
        let mut wf = Workflow::new();
        for state in [Retrieve, Assess, GenerateKb, Validate, Done] {
            wf.transition(state).unwrap();
        }
        assert_eq!(wf.path(), &[Start, Retrieve, Assess, GenerateKb, Validate, Done]);
        assert!(!wf.escalated());
    }

    #[test]
    fn test_escalation_from_assess() {
        let mut wf = Workflow::new();
        wf.transition(Retrieve).unwrap();
        wf.transition(Assess).unwrap();
        assert_eq!(wf.escalate(EscalationCause::LowConfidence).unwrap(), Assess);
        wf.transition(WebSearch).unwrap();
        wf.transition(GenerateWeb).unwrap();
        wf.transition(Done).unwrap();
        assert_eq!(wf.escalation(), Some(EscalationCause::LowConfidence));
    }

    #[test]
    fn test_escalate_notice_cannot_be_reentered() {
        let mut wf = Workflow::new();
        wf.transition(Retrieve).unwrap();
        wf.escalate(EscalationCause::RetrievalFailed).unwrap();
        wf.transition(WebSearch).unwrap();
        assert_eq!(
            wf.escalate(EscalationCause::InsufficientAnswer),
            Err(TransitionError::Invalid {
                from: WebSearch,
                to: EscalateNotice
            })
        );
    }

    #[test]
    fn test_notice_taken_once() {
        let mut wf = Workflow::new();
        assert!(!wf.take_notice());
        wf.transition(Retrieve).unwrap();
        wf.escalate(EscalationCause::RetrievalFailed).unwrap();
        assert!(wf.take_notice());
        assert!(!wf.take_notice());
        assert!(wf.notice_emitted());
    }

    #[test]
    fn test_invalid_and_terminal_transitions() {
        let mut wf = Workflow::new();
        assert!(matches!(wf.transition(Done), Err(TransitionError::Invalid { .. })));
        wf.transition(Failed).unwrap();
        assert_eq!(wf.transition(Retrieve), Err(TransitionError::Finished(Failed)));
    }

    #[test]
    fn test_every_live_state_can_fail() {
        let live = [
            Start,
            Retrieve,
            Assess,
            GenerateKb,
            Validate,
            EscalateNotice,
            WebSearch,
            GenerateWeb,
        ];
        for state in live {
            assert!(state.can_transition_to(Failed), "{} should reach failed", state);
        }
        assert!(Done.valid_transitions().is_empty());
    }
}
