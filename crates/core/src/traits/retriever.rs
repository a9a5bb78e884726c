//! Retrieval trait

use async_trait::async_trait;

use crate::error::RetrievalError;
use crate::evidence::RetrievalCandidate;

/// Retriever interface over the document index
///
/// Implementations:
/// - `LexicalRetriever` - Tantivy BM25 index over knowledge files
///
/// # Example
///
/// ```ignore
/// let retriever: Arc<dyn Retriever> = Arc::new(LexicalRetriever::from_documents(docs)?);
/// let candidates = retriever.retrieve("warranty period", 5).await?;
/// for c in candidates {
///     println!("{:.2} page {:?}", c.score, c.source.page);
/// }
/// ```
#[async_trait]
pub trait Retriever: Send + Sync + 'static {
    /// Retrieve the most similar chunks
    ///
    /// # Arguments
    /// * `query` - Search query
    /// * `top_k` - Maximum number of candidates to return
    ///
    /// # Returns
    /// Candidates sorted by score (highest first), scores in [0, 1]
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalCandidate>, RetrievalError>;

    /// Get retriever name for logging
    fn name(&self) -> &str;

    /// Whether the index currently holds anything to search
    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct FixedRetriever(Vec<RetrievalCandidate>);

    #[async_trait]
    impl Retriever for FixedRetriever {
        async fn retrieve(
            &self,
            _query: &str,
            top_k: usize,
        ) -> Result<Vec<RetrievalCandidate>, RetrievalError> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_retriever_is_object_safe() {
        let retriever: Arc<dyn Retriever> = Arc::new(FixedRetriever(vec![
            RetrievalCandidate::new("a", 0.9, "doc").with_page(1),
            RetrievalCandidate::new("b", 0.7, "doc").with_page(2),
        ]));
        let out = retriever.retrieve("anything", 1).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(retriever.name(), "fixed");
        assert!(retriever.is_ready());
    }
}
