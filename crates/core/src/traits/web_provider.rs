//! Web search provider trait

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::evidence::WebSnippet;

/// One web search backend in the fallback chain
///
/// Implementations: `DuckDuckGoProvider`, `WikipediaProvider`,
/// `StackExchangeProvider`, `WeatherProvider`.
#[async_trait]
pub trait WebProvider: Send + Sync + 'static {
    /// Search the provider
    ///
    /// # Arguments
    /// * `query` - Search query (already reformulated)
    /// * `max_results` - Upper bound on snippets to return
    ///
    /// # Returns
    /// Snippets in the provider's own ranking order. An empty result is
    /// reported as [`ProviderError::Empty`], not `Ok(vec![])`.
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<WebSnippet>, ProviderError>;

    /// Provider name, used in snippets, failure records and metric labels
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DownProvider;

    #[async_trait]
    impl WebProvider for DownProvider {
        async fn search(
            &self,
            _query: &str,
            _max: usize,
        ) -> Result<Vec<WebSnippet>, ProviderError> {
            Err(ProviderError::Status(503))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces() {
        let provider: Box<dyn WebProvider> = Box::new(DownProvider);
        let err = provider.search("rust", 3).await.unwrap_err();
        assert_eq!(err, ProviderError::Status(503));
        assert_eq!(provider.name(), "down");
    }
}
