//! Generator backend implementations
//!
//! Supports Ollama (`/api/chat`) and OpenAI-compatible chat completions
//! (OpenAI, Groq, local vLLM servers).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use docqa_config::GenerationConfig;
use docqa_core::{GenerateRequest, GenerationError, Generator, Message};

use crate::LlmError;

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// API base URL
    pub endpoint: String,
    /// API key (hosted providers)
    pub api_key: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Temperature
    pub temperature: f32,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::from_settings(&GenerationConfig::default())
    }
}

impl LlmConfig {
    pub fn from_settings(settings: &GenerationConfig) -> Self {
        Self {
            model: settings.model_name().to_string(),
            endpoint: settings.endpoint_url().trim_end_matches('/').to_string(),
            api_key: settings.resolved_api_key(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: Duration::from_millis(settings.timeout_ms),
            max_retries: settings.max_retries,
            initial_backoff: settings.initial_backoff(),
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Run `op` until it succeeds, fails permanently, or retries run out
pub(crate) async fn with_retry<T, F, Fut>(
    max_retries: u32,
    initial_backoff: Duration,
    mut op: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut last_error = None;
    let mut backoff = initial_backoff;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            tracing::warn!(
                "LLM request failed, retrying in {:?} (attempt {}/{})",
                backoff,
                attempt,
                max_retries
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => last_error = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
}

fn transport_error(err: reqwest::Error, timeout_ms: u64) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(timeout_ms)
    } else {
        LlmError::Network(err.to_string())
    }
}

async fn status_error(response: reqwest::Response) -> LlmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    // 5xx and 429 are retryable, other 4xx are not
    if status.is_server_error() || status.as_u16() == 429 {
        LlmError::Network(format!("Server error {}: {}", status, body))
    } else {
        LlmError::Api(format!("HTTP {}: {}", status, body))
    }
}

fn non_empty(text: String) -> Result<String, LlmError> {
    let text = text.trim().to_string();
    if text.is_empty() {
        Err(LlmError::InvalidResponse("Empty completion".to_string()))
    } else {
        Ok(text)
    }
}

/// Ollama backend
pub struct OllamaBackend {
    client: Client,
    config: LlmConfig,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the API URL
    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint, path)
    }

    fn build_request(&self, request: &GenerateRequest) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(OllamaMessage::from).collect(),
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(request.temperature.unwrap_or(self.config.temperature)),
                num_predict: Some(request.max_tokens.unwrap_or(self.config.max_tokens) as i32),
            }),
        }
    }

    /// Execute a single request (used by retry logic)
    async fn execute_request(&self, request: &OllamaChatRequest) -> Result<String, LlmError> {
        let response = self
            .client
            .post(self.api_url("/chat"))
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_ms()))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        non_empty(body.message.content)
    }
}

#[async_trait]
impl Generator for OllamaBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<String, GenerationError> {
        let body = self.build_request(&request);
        let text = with_retry(self.config.max_retries, self.config.initial_backoff, || {
            self.execute_request(&body)
        })
        .await?;
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.api_url("/tags"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

/// OpenAI-compatible backend
///
/// Works with:
/// - OpenAI
/// - Groq (`https://api.groq.com/openai/v1`)
/// - Local servers exposing `/chat/completions`
pub struct OpenAiCompatibleBackend {
    client: Client,
    config: LlmConfig,
}

impl OpenAiCompatibleBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let has_key = config.api_key.as_deref().is_some_and(|k| !k.is_empty());
        if !has_key && !is_local(&config.endpoint) {
            return Err(LlmError::Configuration(
                "API key required for remote endpoints".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint)
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        use reqwest::header::HeaderValue;

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(ref key) = self.config.api_key {
            if let Ok(val) = HeaderValue::from_str(&format!("Bearer {}", key)) {
                headers.insert(reqwest::header::AUTHORIZATION, val);
            }
        }
        headers
    }

    fn build_request(&self, request: &GenerateRequest) -> OpenAiChatRequest {
        OpenAiChatRequest {
            model: self.config.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: Some(request.max_tokens.unwrap_or(self.config.max_tokens)),
            temperature: Some(request.temperature.unwrap_or(self.config.temperature)),
            stream: Some(false),
        }
    }

    async fn execute_request(&self, request: &OpenAiChatRequest) -> Result<String, LlmError> {
        let response = self
            .client
            .post(self.chat_url())
            .headers(self.build_headers())
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_ms()))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        non_empty(choice.message.content)
    }
}

fn is_local(endpoint: &str) -> bool {
    endpoint.starts_with("http://localhost") || endpoint.starts_with("http://127.0.0.1")
}

#[async_trait]
impl Generator for OpenAiCompatibleBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<String, GenerationError> {
        let body = self.build_request(&request);
        let text = with_retry(self.config.max_retries, self.config.initial_backoff, || {
            self.execute_request(&body)
        })
        .await?;
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/models", self.config.endpoint))
            .headers(self.build_headers())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

impl From<&Message> for OllamaMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_config_from_settings() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "llama3.1:8b");
        assert_eq!(config.endpoint, "http://localhost:11434");
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_message_conversion() {
        let msg = Message::user("Hello");
        let ollama_msg: OllamaMessage = (&msg).into();
        assert_eq!(ollama_msg.role, "user");
        assert_eq!(ollama_msg.content, "Hello");
    }

    #[test]
    fn test_ollama_request_uses_overrides() {
        let backend = OllamaBackend::new(LlmConfig::default()).unwrap();
        let request = GenerateRequest::new("sys")
            .with_user_message("q")
            .with_temperature(0.0)
            .with_max_tokens(32);
        let body = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 32);
        assert_eq!(body["options"]["temperature"], 0.0);
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[test]
    fn test_ollama_response_parsing() {
        let raw = r#"{"model":"llama3.1:8b","message":{"role":"assistant","content":"  Two years. "},"done":true}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(non_empty(parsed.message.content).unwrap(), "Two years.");
    }

    #[test]
    fn test_openai_requires_key_for_remote() {
        let config = LlmConfig {
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            ..LlmConfig::default()
        };
        assert!(matches!(
            OpenAiCompatibleBackend::new(config),
            Err(LlmError::Configuration(_))
        ));

        let local = LlmConfig {
            endpoint: "http://localhost:8000/v1".to_string(),
            api_key: None,
            ..LlmConfig::default()
        };
        assert!(OpenAiCompatibleBackend::new(local).is_ok());
    }

    #[test]
    fn test_openai_response_parsing() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Answer [1]"},"finish_reason":"stop"}],"usage":{"completion_tokens":3}}"#;
        let parsed: OpenAiChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Answer [1]");
    }

    #[test]
    fn test_empty_completion_is_invalid() {
        assert!(matches!(
            non_empty("   ".to_string()),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = with_retry(2, Duration::from_millis(1), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LlmError::Network("connection reset".into()))
            } else {
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(3, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Api("HTTP 401".into()))
        })
        .await;
        assert_eq!(result.unwrap_err(), LlmError::Api("HTTP 401".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(1, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Timeout(100))
        })
        .await;
        assert_eq!(result.unwrap_err(), LlmError::Timeout(100));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
