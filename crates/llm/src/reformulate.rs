//! Web query reformulation
//!
//! Questions phrased for a person make poor search queries. Before the web
//! path runs, the question is rewritten according to the configured mode.
//! Reformulation never fails: every error falls back to the simple rewrite.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

use docqa_config::{ReformulationMode, Settings};
use docqa_core::{bounded, CallOutcome, CancellationToken, Generator};

use crate::prompt::PromptBuilder;

static LEADING_QUESTION_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(what|how|when|where|why|who|which|can you|please)\s+").unwrap());

/// Lowercase, drop one leading question word and the trailing "?"
pub fn simple_reformulation(question: &str) -> String {
    let lowered = question.trim().to_lowercase();
    let without_prefix = LEADING_QUESTION_WORD.replace(&lowered, "").into_owned();
    let query = without_prefix
        .strip_suffix('?')
        .unwrap_or(&without_prefix)
        .trim()
        .to_string();
    if query.is_empty() {
        lowered
    } else {
        query
    }
}

/// Rewrites questions into search queries
pub struct QueryReformulator {
    mode: ReformulationMode,
    generator: Option<Arc<dyn Generator>>,
    prompts: PromptBuilder,
    timeout: Duration,
}

impl QueryReformulator {
    pub fn new(mode: ReformulationMode) -> Self {
        Self {
            mode,
            generator: None,
            prompts: PromptBuilder::default(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.web.reformulation)
            .with_timeout(Duration::from_millis(settings.generation.timeout_ms))
    }

    /// Generator used in `llm` mode
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn mode(&self) -> ReformulationMode {
        self.mode
    }

    /// Produce the web search query for `question`
    pub async fn reformulate(&self, question: &str, cancel: &CancellationToken) -> String {
        let query = match self.mode {
            ReformulationMode::None => question.trim().to_string(),
            ReformulationMode::Simple => simple_reformulation(question),
            ReformulationMode::Llm => self.reformulate_with_llm(question, cancel).await,
        };

        tracing::debug!(original = %question, reformulated = %query, "Query reformulated");
        query
    }

    async fn reformulate_with_llm(&self, question: &str, cancel: &CancellationToken) -> String {
        let Some(generator) = &self.generator else {
            return simple_reformulation(question);
        };

        let request = self.prompts.reformulation(question);
        match bounded(generator.generate(request), self.timeout, cancel).await {
            CallOutcome::Completed(Ok(text)) => match clean_llm_query(&text) {
                Some(query) => query,
                None => {
                    tracing::debug!(reply = %text, "Unusable reformulation, using simple rewrite");
                    simple_reformulation(question)
                },
            },
            CallOutcome::Completed(Err(e)) => {
                tracing::warn!(error = %e, "Query reformulation failed");
                simple_reformulation(question)
            },
            CallOutcome::TimedOut => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Query reformulation timed out"
                );
                simple_reformulation(question)
            },
            CallOutcome::Cancelled => simple_reformulation(question),
        }
    }
}

fn clean_llm_query(reply: &str) -> Option<String> {
    let line = reply.lines().map(str::trim).find(|l| !l.is_empty())?;
    let query = line.trim_matches(|c| c == '"' || c == '\'').trim();
    let usable = query.len() >= 3
        && query
            .chars()
            .all(|c| c.is_alphanumeric() || c.is_whitespace());
    usable.then(|| query.to_string())
}
