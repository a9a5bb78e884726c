//! Knowledge-base-first orchestrator
//!
//! Drives one [`Workflow`] per query. Each state runs at most once; external
//! calls (retrieval, provider search, generation) are bounded by their own
//! timeout and observe the query's cancellation token. Recoverable errors
//! become transitions; only terminal failures reach the caller, as an
//! [`AskFailure`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use docqa_config::{constants::messages, ReformulationMode, Settings};
use docqa_core::{
    bounded, AnswerRecord, CallOutcome, CancellationToken, ConfidenceVerdict, EvidenceSet,
    GenerateRequest, GenerationError, Generator, Query, RetrievalCandidate, RetrievalError,
    Retriever, WebSnippet,
};
use docqa_llm::{PromptBuilder, QueryReformulator};
use docqa_rag::{AnswerQualityValidator, ConfidenceAssessor};
use docqa_web::{build_chain, WebError, WebFallbackChain};

use crate::citations::CitationComposer;
use crate::events::AskEvent;
use crate::failure::{AskFailure, FailureKind, StepFailure};
use crate::state::{EscalationCause, Workflow, WorkflowState};
use crate::AgentError;

const MISSING_CITATIONS_WARNING: &str = "answer has no citations";

/// Values the orchestrator needs beyond its collaborators
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub top_k: usize,
    pub retrieval_timeout: Duration,
    /// Budget for one generation call, retries and backoff included
    pub generation_timeout: Duration,
    pub fallback_notice: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            top_k: settings.retrieval.top_k,
            retrieval_timeout: Duration::from_millis(settings.retrieval.timeout_ms),
            generation_timeout: settings.generation.call_budget(),
            fallback_notice: settings.notice.fallback_message.clone(),
        }
    }
}

/// What a state handler decided
enum Step {
    Go(WorkflowState),
    Escalate(EscalationCause),
    Fail(FailureKind),
}

/// Mutable state of one query
struct Run<'a> {
    query: &'a Query,
    cancel: &'a CancellationToken,
    started: Instant,
    workflow: Workflow,
    failures: Vec<StepFailure>,
    candidates: Vec<RetrievalCandidate>,
    verdict: Option<ConfidenceVerdict>,
    snippets: Vec<WebSnippet>,
    provider: Option<String>,
    answer: Option<(String, EvidenceSet)>,
    notice: Option<String>,
    failure: Option<FailureKind>,
}

impl<'a> Run<'a> {
    fn new(query: &'a Query, cancel: &'a CancellationToken) -> Self {
        Self {
            query,
            cancel,
            started: Instant::now(),
            workflow: Workflow::new(),
            failures: Vec::new(),
            candidates: Vec::new(),
            verdict: None,
            snippets: Vec::new(),
            provider: None,
            answer: None,
            notice: None,
            failure: None,
        }
    }

    fn request_id(&self) -> &str {
        self.query.request_id().unwrap_or("-")
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn record(&mut self, component: &str, kind: &str, reason: impl Into<String>) {
        let failure = StepFailure::new(self.workflow.current(), component, kind, reason);
        tracing::info!(
            request_id = %self.request_id(),
            state = %failure.state,
            component = %failure.component,
            kind = %failure.kind,
            reason = %failure.reason,
            "Step failed"
        );
        self.failures.push(failure);
    }

    fn cancelled(&mut self, component: &str) -> Step {
        self.record(component, "cancelled", "query cancelled");
        Step::Fail(FailureKind::Cancelled)
    }
}

/// Answers questions from the knowledge base, falling back to the web
pub struct Orchestrator {
    config: OrchestratorConfig,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    web: WebFallbackChain,
    assessor: ConfidenceAssessor,
    validator: AnswerQualityValidator,
    reformulator: QueryReformulator,
    prompts: PromptBuilder,
    event_tx: broadcast::Sender<AskEvent>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        web: WebFallbackChain,
        assessor: ConfidenceAssessor,
        validator: AnswerQualityValidator,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            config,
            retriever,
            generator,
            web,
            assessor,
            validator,
            reformulator: QueryReformulator::new(ReformulationMode::Simple),
            prompts: PromptBuilder::default(),
            event_tx,
        }
    }

    /// Wire every component from settings around the given collaborators
    pub fn from_settings(
        settings: &Settings,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, AgentError> {
        let web = build_chain(&settings.web)?;
        let validator = AnswerQualityValidator::from_settings(settings)?;
        let reformulator =
            QueryReformulator::from_settings(settings).with_generator(generator.clone());

        Ok(Self::new(
            OrchestratorConfig::from_settings(settings),
            retriever,
            generator,
            web,
            ConfidenceAssessor::from_settings(settings),
            validator,
        )
        .with_reformulator(reformulator)
        .with_prompts(PromptBuilder::from_settings(&settings.generation)))
    }

    pub fn with_reformulator(mut self, reformulator: QueryReformulator) -> Self {
        self.reformulator = reformulator;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Subscribe to lifecycle events of every query
    pub fn subscribe(&self) -> broadcast::Receiver<AskEvent> {
        self.event_tx.subscribe()
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    pub fn retriever(&self) -> &Arc<dyn Retriever> {
        &self.retriever
    }

    pub fn web_providers(&self) -> Vec<String> {
        self.web.provider_names()
    }

    /// Answer a question without external cancellation
    pub async fn ask(&self, question: &str) -> Result<AnswerRecord, AskFailure> {
        let query = Query::with_generated_id(question);
        self.ask_query(&query, &CancellationToken::new()).await
    }

    /// Run one query through the state machine
    pub async fn ask_query(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<AnswerRecord, AskFailure> {
        let mut run = Run::new(query, cancel);
        tracing::info!(
            request_id = %run.request_id(),
            question = %query.text(),
            "Answering question"
        );

        loop {
            let step = match run.workflow.current() {
                WorkflowState::Start => Step::Go(WorkflowState::Retrieve),
                WorkflowState::Retrieve => self.retrieve(&mut run).await,
                WorkflowState::Assess => self.assess(&mut run),
                WorkflowState::GenerateKb => self.generate_kb(&mut run).await,
                WorkflowState::Validate => self.validate(&mut run),
                WorkflowState::EscalateNotice => self.escalate_notice(&mut run),
                WorkflowState::WebSearch => self.web_search(&mut run).await,
                WorkflowState::GenerateWeb => self.generate_web(&mut run).await,
                WorkflowState::Done => return self.finish(run),
                WorkflowState::Failed => return Err(self.fail(run)),
            };

            if let Err(e) = self.advance(&mut run, step) {
                tracing::error!(request_id = %run.request_id(), error = %e, "Workflow error");
                run.record("workflow", "transition", e.to_string());
                run.failure = Some(FailureKind::Internal);
                return Err(self.fail(run));
            }
        }
    }

    fn advance(&self, run: &mut Run<'_>, step: Step) -> Result<(), crate::TransitionError> {
        let from = match step {
            Step::Go(to) => run.workflow.transition(to)?,
            Step::Escalate(cause) => {
                let from = run.workflow.escalate(cause)?;
                tracing::info!(
                    request_id = %run.request_id(),
                    from = %from,
                    cause = cause.as_str(),
                    "Escalating to web search"
                );
                metrics::counter!("docqa_escalations_total", "cause" => cause.as_str())
                    .increment(1);
                from
            },
            Step::Fail(kind) => {
                run.failure = Some(kind);
                run.workflow.transition(WorkflowState::Failed)?
            },
        };

        let to = run.workflow.current();
        tracing::debug!(
            request_id = %run.request_id(),
            from = %from,
            to = %to,
            "Workflow transition"
        );
        let _ = self.event_tx.send(AskEvent::StateChanged {
            request_id: run.query.request_id().map(String::from),
            from,
            to,
        });
        Ok(())
    }

    async fn retrieve(&self, run: &mut Run<'_>) -> Step {
        let name = self.retriever.name().to_string();
        let outcome = bounded(
            self.retriever.retrieve(run.query.text(), self.config.top_k),
            self.config.retrieval_timeout,
            run.cancel,
        )
        .await;

        let error = match outcome {
            CallOutcome::Completed(Ok(candidates)) => {
                tracing::debug!(
                    request_id = %run.request_id(),
                    candidates = candidates.len(),
                    "Retrieved candidates"
                );
                run.candidates = candidates;
                return Step::Go(WorkflowState::Assess);
            },
            CallOutcome::Completed(Err(e)) => e,
            CallOutcome::TimedOut => {
                RetrievalError::Timeout(self.config.retrieval_timeout.as_millis() as u64)
            },
            CallOutcome::Cancelled => return run.cancelled(&name),
        };

        run.record(&name, error.kind(), error.to_string());
        Step::Escalate(EscalationCause::RetrievalFailed)
    }

    fn assess(&self, run: &mut Run<'_>) -> Step {
        let candidates = std::mem::take(&mut run.candidates);
        run.candidates = self.assessor.rank(candidates);
        let verdict = self.assessor.assess(&run.candidates);

        tracing::info!(
            request_id = %run.request_id(),
            sufficient = verdict.sufficient,
            top_score = verdict.top_score,
            combined_score = verdict.combined_score,
            supporting = verdict.supporting,
            reason = verdict.reason.as_str(),
            "Confidence assessed"
        );

        let sufficient = verdict.sufficient;
        let reason = verdict.reason;
        run.verdict = Some(verdict);

        if sufficient {
            Step::Go(WorkflowState::GenerateKb)
        } else {
            run.record(
                "confidence_assessor",
                reason.as_str(),
                "knowledge base evidence insufficient",
            );
            Step::Escalate(EscalationCause::LowConfidence)
        }
    }

    async fn generate(
        &self,
        run: &mut Run<'_>,
        request: GenerateRequest,
    ) -> Result<String, Step> {
        let model = self.generator.model_name().to_string();
        let outcome = bounded(
            self.generator.generate(request),
            self.config.generation_timeout,
            run.cancel,
        )
        .await;

        let error = match outcome {
            CallOutcome::Completed(Ok(text)) => return Ok(text),
            CallOutcome::Completed(Err(e)) => e,
            CallOutcome::TimedOut => {
                GenerationError::Timeout(self.config.generation_timeout.as_millis() as u64)
            },
            CallOutcome::Cancelled => return Err(run.cancelled(&model)),
        };

        run.record(&model, error.kind(), error.to_string());
        Err(Step::Fail(FailureKind::GenerationFailed))
    }

    async fn generate_kb(&self, run: &mut Run<'_>) -> Step {
        let request = self.prompts.knowledge_base(run.query.text(), &run.candidates);
        match self.generate(run, request).await {
            Ok(text) => {
                let candidates = std::mem::take(&mut run.candidates);
                run.answer = Some((text, EvidenceSet::KnowledgeBase(candidates)));
                Step::Go(WorkflowState::Validate)
            },
            // KB generation failure escalates rather than failing
            Err(Step::Fail(FailureKind::GenerationFailed)) => {
                Step::Escalate(EscalationCause::GenerationFailed)
            },
            Err(step) => step,
        }
    }

    fn validate(&self, run: &mut Run<'_>) -> Step {
        let insufficient = run
            .answer
            .as_ref()
            .map(|(text, _)| self.validator.looks_insufficient(text))
            .unwrap_or(true);

        if !insufficient {
            return Step::Go(WorkflowState::Done);
        }

        run.answer = None;
        run.record(
            "quality_validator",
            "insufficient_answer",
            "generated answer says the context lacks the information",
        );
        Step::Escalate(EscalationCause::InsufficientAnswer)
    }

    fn escalate_notice(&self, run: &mut Run<'_>) -> Step {
        if run.workflow.take_notice() {
            let message = self.config.fallback_notice.clone();
            tracing::info!(request_id = %run.request_id(), notice = %message, "Fallback notice");
            let _ = self.event_tx.send(AskEvent::FallbackNotice {
                request_id: run.query.request_id().map(String::from),
                message: message.clone(),
            });
            run.notice = Some(message);
        }
        Step::Go(WorkflowState::WebSearch)
    }

    async fn web_search(&self, run: &mut Run<'_>) -> Step {
        let search_query = self
            .reformulator
            .reformulate(run.query.text(), run.cancel)
            .await;

        let (failures, step) = match self.web.search(&search_query, run.cancel).await {
            Ok(results) => {
                run.snippets = results.snippets;
                run.provider = Some(results.provider);
                (results.failures, Step::Go(WorkflowState::GenerateWeb))
            },
            Err(WebError::FallbackExhausted { failures }) => {
                tracing::warn!(
                    request_id = %run.request_id(),
                    providers = failures.len(),
                    "All web providers failed"
                );
                (failures, Step::Fail(FailureKind::FallbackExhausted))
            },
            Err(WebError::Cancelled { failures }) => {
                for f in failures {
                    run.record(&f.provider, f.kind(), f.reason());
                }
                return run.cancelled("web_fallback_chain");
            },
            Err(e) => {
                run.record("web_fallback_chain", e.kind(), e.to_string());
                return Step::Fail(FailureKind::Internal);
            },
        };

        for f in failures {
            run.record(&f.provider, f.kind(), f.reason());
        }
        step
    }

    async fn generate_web(&self, run: &mut Run<'_>) -> Step {
        let request = self.prompts.web(run.query.text(), &run.snippets);
        match self.generate(run, request).await {
            Ok(text) => {
                let snippets = std::mem::take(&mut run.snippets);
                run.answer = Some((text, EvidenceSet::Web(snippets)));
                Step::Go(WorkflowState::Done)
            },
            Err(step) => step,
        }
    }

    fn finish(&self, mut run: Run<'_>) -> Result<AnswerRecord, AskFailure> {
        let Some((answer, evidence)) = run.answer.take() else {
            run.record("workflow", "missing_answer", "reached done without an answer");
            run.failure = Some(FailureKind::Internal);
            return Err(self.fail(run));
        };

        let source_type = evidence.source_type();
        let citations = CitationComposer::compose(&evidence);
        let mut warnings = Vec::new();
        if citations.is_empty() {
            tracing::warn!(
                request_id = %run.request_id(),
                source = source_type.as_str(),
                "Answer has no citations"
            );
            warnings.push(MISSING_CITATIONS_WARNING.to_string());
        }

        let elapsed_ms = run.elapsed_ms();
        let record = AnswerRecord {
            request_id: run.query.request_id().map(String::from),
            question: run.query.text().to_string(),
            answer,
            source_type,
            citations,
            elapsed_ms,
            notice: run.notice,
            confidence: run.verdict,
            provider: run.provider,
            warnings,
        };

        tracing::info!(
            request_id = %record.request_id.as_deref().unwrap_or("-"),
            source = source_type.as_str(),
            citations = record.citations.len(),
            escalated = record.escalated(),
            elapsed_ms,
            "Question answered"
        );
        metrics::counter!(
            "docqa_ask_total",
            "outcome" => "answered",
            "source" => source_type.as_str()
        )
        .increment(1);
        metrics::histogram!("docqa_ask_duration_seconds").record(elapsed_ms as f64 / 1000.0);
        let _ = self.event_tx.send(AskEvent::Finished {
            request_id: record.request_id.clone(),
            source_type: Some(source_type),
            failure: None,
            elapsed_ms,
        });

        Ok(record)
    }

    fn fail(&self, run: Run<'_>) -> AskFailure {
        let kind = run.failure.unwrap_or(FailureKind::Internal);
        let elapsed_ms = run.elapsed_ms();
        let failure = AskFailure {
            request_id: run.query.request_id().map(String::from),
            question: run.query.text().to_string(),
            kind,
            message: messages::NO_ANSWER.to_string(),
            path: run.workflow.path().to_vec(),
            failures: run.failures,
            notice: run.notice,
            elapsed_ms,
        };

        tracing::warn!(
            request_id = %failure.request_id.as_deref().unwrap_or("-"),
            kind = kind.as_str(),
            steps = failure.failures.len(),
            elapsed_ms,
            "Question could not be answered"
        );
        metrics::counter!(
            "docqa_ask_total",
            "outcome" => kind.as_str(),
            "source" => "none"
        )
        .increment(1);
        metrics::histogram!("docqa_ask_duration_seconds").record(elapsed_ms as f64 / 1000.0);
        let _ = self.event_tx.send(AskEvent::Finished {
            request_id: failure.request_id.clone(),
            source_type: None,
            failure: Some(kind),
            elapsed_ms,
        });

        failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let mut settings = Settings::default();
        settings.generation.timeout_ms = 1_000;
        settings.generation.max_retries = 2;
        settings.retrieval.top_k = 8;

        let config = OrchestratorConfig::from_settings(&settings);
        assert_eq!(config.top_k, 8);
        // Three attempts plus 250 ms and 500 ms of retry backoff
        assert_eq!(config.generation_timeout, Duration::from_millis(3_750));
        assert_eq!(config.fallback_notice, messages::FALLBACK_NOTICE);
    }
}
