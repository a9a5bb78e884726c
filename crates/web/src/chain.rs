//! Ordered provider chain
//!
//! Providers are tried one at a time in configuration order. The first
//! provider that returns well-formed results wins; every earlier failure is
//! recorded. Providers are never retried and never raced.

use std::sync::Arc;
use std::time::{Duration, Instant};

use docqa_core::{bounded, CallOutcome, CancellationToken, ProviderError, WebProvider, WebSnippet};

use crate::WebError;

/// One provider that did not produce results
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
    pub elapsed_ms: u64,
}

impl ProviderFailure {
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }

    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

/// Results from the first provider that succeeded
#[derive(Debug, Clone)]
pub struct WebResults {
    pub provider: String,
    pub snippets: Vec<WebSnippet>,
    /// Providers that failed before this one; logged, never shown to users
    pub failures: Vec<ProviderFailure>,
}

struct ChainEntry {
    provider: Arc<dyn WebProvider>,
    timeout: Duration,
}

/// Web search fallback chain
pub struct WebFallbackChain {
    entries: Vec<ChainEntry>,
    max_results: usize,
}

impl WebFallbackChain {
    /// Create a chain; order of `providers` is the order they are tried in
    pub fn new(
        providers: Vec<(Arc<dyn WebProvider>, Duration)>,
        max_results: usize,
    ) -> Result<Self, WebError> {
        if providers.is_empty() {
            return Err(WebError::NoProviders);
        }

        let entries = providers
            .into_iter()
            .map(|(provider, timeout)| ChainEntry { provider, timeout })
            .collect();

        Ok(Self {
            entries,
            max_results: max_results.max(1),
        })
    }

    /// Provider names in the order they are tried
    pub fn provider_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.provider.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Search each provider in turn until one returns usable results
    pub async fn search(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<WebResults, WebError> {
        let mut failures = Vec::new();

        for entry in &self.entries {
            let name = entry.provider.name().to_string();
            let started = Instant::now();

            let outcome = bounded(
                entry.provider.search(query, self.max_results),
                entry.timeout,
                cancel,
            )
            .await;

            let error = match outcome {
                CallOutcome::Cancelled => {
                    tracing::info!(provider = %name, "Web search cancelled");
                    return Err(WebError::Cancelled { failures });
                },
                CallOutcome::TimedOut => ProviderError::Timeout {
                    after_ms: entry.timeout.as_millis() as u64,
                },
                CallOutcome::Completed(Err(e)) => e,
                CallOutcome::Completed(Ok(results)) => match self.usable(results) {
                    Ok(snippets) => {
                        tracing::info!(
                            provider = %name,
                            results = snippets.len(),
                            skipped = failures.len(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Web provider returned results"
                        );
                        return Ok(WebResults {
                            provider: name,
                            snippets,
                            failures,
                        });
                    },
                    Err(e) => e,
                },
            };

            let failure = ProviderFailure {
                provider: name,
                error,
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
            tracing::warn!(
                provider = %failure.provider,
                kind = failure.kind(),
                reason = %failure.reason(),
                elapsed_ms = failure.elapsed_ms,
                "Web provider failed, trying next"
            );
            metrics::counter!(
                "docqa_provider_failures_total",
                "provider" => failure.provider.clone(),
                "kind" => failure.kind()
            )
            .increment(1);
            failures.push(failure);
        }

        Err(WebError::FallbackExhausted { failures })
    }

    fn usable(&self, results: Vec<WebSnippet>) -> Result<Vec<WebSnippet>, ProviderError> {
        if results.is_empty() {
            return Err(ProviderError::Empty);
        }

        let total = results.len();
        let snippets: Vec<WebSnippet> = results
            .into_iter()
            .filter(WebSnippet::is_well_formed)
            .take(self.max_results)
            .collect();

        if snippets.is_empty() {
            return Err(ProviderError::Malformed(format!(
                "none of {} results had a URL and text",
                total
            )));
        }
        Ok(snippets)
    }
}
