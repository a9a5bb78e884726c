//! Generator factory
//!
//! Creates the configured generator backend. The orchestrator only sees
//! `Arc<dyn Generator>`, so switching providers is a configuration change.
//!
//! ## Supported Providers
//! - **Ollama**: local models via `/api/chat`
//! - **Groq**: hosted Llama models via the OpenAI-compatible API
//! - **OpenAI**: chat completions

use std::sync::Arc;

use docqa_config::{GenerationConfig, GenerationProvider};
use docqa_core::Generator;

use crate::backend::{LlmConfig, OllamaBackend, OpenAiCompatibleBackend};
use crate::LlmError;

pub struct LlmFactory;

impl LlmFactory {
    /// Create a generator from configuration
    pub fn create(config: &GenerationConfig) -> Result<Arc<dyn Generator>, LlmError> {
        let llm_config = LlmConfig::from_settings(config);

        tracing::info!(
            provider = config.provider.as_str(),
            model = %llm_config.model,
            endpoint = %llm_config.endpoint,
            "Creating generator backend"
        );

        match config.provider {
            GenerationProvider::Ollama => Ok(Arc::new(OllamaBackend::new(llm_config)?)),
            GenerationProvider::Groq | GenerationProvider::OpenAi => {
                if llm_config.api_key.is_none() {
                    return Err(LlmError::Configuration(format!(
                        "{} requires {}",
                        config.provider.as_str(),
                        config.provider.api_key_env().unwrap_or("an API key")
                    )));
                }
                Ok(Arc::new(OpenAiCompatibleBackend::new(llm_config)?))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama() {
        let generator = LlmFactory::create(&GenerationConfig::default()).unwrap();
        assert_eq!(generator.model_name(), "llama3.1:8b");
    }

    #[test]
    fn test_create_groq_with_key() {
        let config = GenerationConfig {
            provider: GenerationProvider::Groq,
            api_key: Some("gsk-test".to_string()),
            ..GenerationConfig::default()
        };
        let generator = LlmFactory::create(&config).unwrap();
        assert_eq!(generator.model_name(), "llama-3.1-8b-instant");
    }

    #[test]
    fn test_create_openai_with_custom_model() {
        let config = GenerationConfig {
            provider: GenerationProvider::OpenAi,
            api_key: Some("sk-test".to_string()),
            model: Some("gpt-4o".to_string()),
            ..GenerationConfig::default()
        };
        let generator = LlmFactory::create(&config).unwrap();
        assert_eq!(generator.model_name(), "gpt-4o");
    }
}
