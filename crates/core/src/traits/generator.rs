//! Answer generation trait

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::llm_types::GenerateRequest;

/// Text generator interface
///
/// Implementations:
/// - `OllamaBackend` - Local Ollama inference
/// - `OpenAiCompatibleBackend` - Groq / OpenAI chat completions
///
/// # Example
///
/// ```ignore
/// let generator: Arc<dyn Generator> = Arc::new(OllamaBackend::new(config)?);
/// let request = GenerateRequest::new("Answer from the context only")
///     .with_user_message("Context: ...\n\nQuestion: What is the warranty?");
/// let answer = generator.generate(request).await?;
/// ```
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    /// Generate completion text
    ///
    /// # Arguments
    /// * `request` - Messages and sampling parameters
    ///
    /// # Returns
    /// The generated text, trimmed
    async fn generate(&self, request: GenerateRequest) -> Result<String, GenerationError>;

    /// Get model name for logging
    fn model_name(&self) -> &str;

    /// Check if the backend is reachable
    async fn is_available(&self) -> bool {
        true
    }
}
