//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{assessment, endpoints, generation, messages, retrieval, timeouts, web};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Knowledge-base retrieval
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Confidence assessment thresholds
    #[serde(default)]
    pub assessment: AssessmentConfig,

    /// Generator backend
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Web fallback chain
    #[serde(default)]
    pub web: WebConfig,

    /// Answer-quality markers
    #[serde(default)]
    pub quality: QualityConfig,

    /// User-visible notices
    #[serde(default)]
    pub notice: NoticeConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Worst-case time one query can spend in external calls: retrieval, KB
    /// generation, every enabled provider, reformulation and web generation
    pub fn query_budget(&self) -> Duration {
        let providers: u64 = self
            .web
            .providers
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.timeout_ms)
            .sum();
        let reformulation = match self.web.reformulation {
            ReformulationMode::Llm => self.generation.timeout_ms,
            _ => 0,
        };

        Duration::from_millis(self.retrieval.timeout_ms.saturating_add(providers))
            + Duration::from_millis(reformulation)
            + self.generation.call_budget() * 2
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_retrieval()?;
        self.validate_assessment()?;
        self.validate_generation()?;
        self.validate_web()?;
        self.validate_quality()?;

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.request_timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        let budget = self.query_budget();
        if Duration::from_secs(server.request_timeout_seconds) < budget {
            return Err(ConfigError::InvalidValue {
                field: "server.request_timeout_seconds".to_string(),
                message: format!(
                    "Must cover the per-call budgets of one query ({} ms)",
                    budget.as_millis()
                ),
            });
        }

        if self.environment.is_production()
            && server.cors_enabled
            && server.cors_origins.iter().any(|o| o == "*")
        {
            tracing::warn!("Wildcard CORS origin configured in production");
        }

        Ok(())
    }

    fn validate_retrieval(&self) -> Result<(), ConfigError> {
        let r = &self.retrieval;

        if r.top_k == 0 || r.top_k > retrieval::MAX_TOP_K {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.top_k".to_string(),
                message: format!(
                    "Must be between 1 and {}, got {}",
                    retrieval::MAX_TOP_K,
                    r.top_k
                ),
            });
        }

        if r.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.timeout_ms".to_string(),
                message: "Timeout must be greater than 0".to_string(),
            });
        }

        if !Path::new(&r.knowledge_path).exists() {
            if self.environment.is_strict() {
                return Err(ConfigError::FileNotFound(r.knowledge_path.clone()));
            }
            tracing::warn!(
                path = %r.knowledge_path,
                "Knowledge path not found, running in web-only mode"
            );
        }

        Ok(())
    }

    fn validate_assessment(&self) -> Result<(), ConfigError> {
        let a = &self.assessment;

        let unit_fields = [
            ("assessment.relevance_threshold", a.relevance_threshold),
            ("assessment.min_confidence", a.min_confidence),
            ("assessment.top_weight", a.top_weight),
            ("assessment.corroboration_delta", a.corroboration_delta),
            ("assessment.high_confidence_ceiling", a.high_confidence_ceiling),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Must be between 0.0 and 1.0, got {}", value),
                });
            }
        }

        if a.min_confidence > a.relevance_threshold {
            return Err(ConfigError::InvalidValue {
                field: "assessment.min_confidence".to_string(),
                message: format!(
                    "Must not exceed relevance_threshold ({} > {})",
                    a.min_confidence, a.relevance_threshold
                ),
            });
        }

        if a.relevance_threshold > a.high_confidence_ceiling {
            return Err(ConfigError::InvalidValue {
                field: "assessment.high_confidence_ceiling".to_string(),
                message: format!(
                    "Must be at least relevance_threshold ({} < {})",
                    a.high_confidence_ceiling, a.relevance_threshold
                ),
            });
        }

        Ok(())
    }

    fn validate_generation(&self) -> Result<(), ConfigError> {
        let g = &self.generation;

        if !(0.0..=2.0).contains(&g.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "generation.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", g.temperature),
            });
        }

        if g.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "generation.max_tokens".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if g.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "generation.timeout_ms".to_string(),
                message: "Timeout must be greater than 0".to_string(),
            });
        }

        if g.provider.requires_api_key() && g.resolved_api_key().is_none() {
            return Err(ConfigError::MissingField(format!(
                "generation.api_key (or {}) is required for provider '{}'",
                g.provider.api_key_env().unwrap_or_default(),
                g.provider.as_str()
            )));
        }

        Ok(())
    }

    fn validate_web(&self) -> Result<(), ConfigError> {
        let w = &self.web;

        if !w.providers.iter().any(|p| p.enabled) {
            return Err(ConfigError::InvalidValue {
                field: "web.providers".to_string(),
                message: "At least one web provider must be enabled".to_string(),
            });
        }

        for (i, provider) in w.providers.iter().enumerate() {
            if provider.timeout_ms == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("web.providers[{}].timeout_ms", i),
                    message: format!(
                        "Timeout for '{}' must be greater than 0",
                        provider.kind.as_str()
                    ),
                });
            }
        }

        if w.max_results == 0 {
            return Err(ConfigError::InvalidValue {
                field: "web.max_results".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    fn validate_quality(&self) -> Result<(), ConfigError> {
        for (i, marker) in self.quality.insufficient_markers.iter().enumerate() {
            if let Err(e) = regex::Regex::new(marker) {
                return Err(ConfigError::InvalidValue {
                    field: format!("quality.insufficient_markers[{}]", i),
                    message: e.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    timeouts::HTTP_REQUEST_SECS
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Knowledge-base retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// File or directory of pre-chunked knowledge files (JSON/YAML)
    #[serde(default = "default_knowledge_path")]
    pub knowledge_path: String,

    /// Number of candidates retrieved and assessed
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Retriever call timeout
    #[serde(default = "default_retrieval_timeout")]
    pub timeout_ms: u64,
}

fn default_knowledge_path() -> String {
    retrieval::DEFAULT_KNOWLEDGE_PATH.to_string()
}

fn default_top_k() -> usize {
    retrieval::DEFAULT_TOP_K
}

fn default_retrieval_timeout() -> u64 {
    timeouts::RETRIEVAL_MS
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            knowledge_path: default_knowledge_path(),
            top_k: default_top_k(),
            timeout_ms: default_retrieval_timeout(),
        }
    }
}

/// Confidence assessment thresholds
///
/// These are defaults, not invariants; deployments disagree on the right pair
/// (0.55/0.45 vs 0.6/0.5) and should tune them against their own corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Top score must reach this
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,

    /// Floor for the weighted top/mean combination
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,

    /// Weight of the top score in the floor combination
    #[serde(default = "default_top_weight")]
    pub top_weight: f32,

    /// How close another candidate must be to corroborate the top one
    #[serde(default = "default_corroboration_delta")]
    pub corroboration_delta: f32,

    /// A top score at or above this is decisive alone
    #[serde(default = "default_high_confidence_ceiling")]
    pub high_confidence_ceiling: f32,
}

fn default_relevance_threshold() -> f32 {
    assessment::RELEVANCE_THRESHOLD
}

fn default_min_confidence() -> f32 {
    assessment::MIN_CONFIDENCE
}

fn default_top_weight() -> f32 {
    assessment::TOP_WEIGHT
}

fn default_corroboration_delta() -> f32 {
    assessment::CORROBORATION_DELTA
}

fn default_high_confidence_ceiling() -> f32 {
    assessment::HIGH_CONFIDENCE_CEILING
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: default_relevance_threshold(),
            min_confidence: default_min_confidence(),
            top_weight: default_top_weight(),
            corroboration_delta: default_corroboration_delta(),
            high_confidence_ceiling: default_high_confidence_ceiling(),
        }
    }
}

/// Generator backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    #[default]
    Ollama,
    Groq,
    OpenAi,
}

impl GenerationProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Groq => "groq",
            Self::OpenAi => "openai",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// Environment variable consulted when no key is configured
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Ollama => None,
            Self::Groq => Some("GROQ_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Ollama => endpoints::OLLAMA_DEFAULT,
            Self::Groq => endpoints::GROQ_DEFAULT,
            Self::OpenAi => endpoints::OPENAI_DEFAULT,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Ollama => generation::OLLAMA_MODEL,
            Self::Groq => generation::GROQ_MODEL,
            Self::OpenAi => generation::OPENAI_MODEL,
        }
    }
}

/// Generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProvider,

    /// Model name; the provider's default when unset
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL; the provider's default when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key for hosted providers (should be set via DOCQA__GENERATION__API_KEY)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-attempt timeout
    #[serde(default = "default_generation_timeout")]
    pub timeout_ms: u64,

    /// Retries on transient (network / 5xx) failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_temperature() -> f32 {
    generation::TEMPERATURE
}

fn default_max_tokens() -> u32 {
    generation::MAX_TOKENS
}

fn default_generation_timeout() -> u64 {
    timeouts::LLM_REQUEST_MS
}

fn default_max_retries() -> u32 {
    generation::MAX_RETRIES
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            model: None,
            endpoint: None,
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_generation_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl GenerationConfig {
    /// Delay before the first retry
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(generation::INITIAL_BACKOFF_MS)
    }

    /// Bound for one generation call: every attempt plus the backoff sleeps between them
    pub fn call_budget(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let backoff_ms = (0..self.max_retries)
            .map(|retry| generation::INITIAL_BACKOFF_MS.saturating_mul(1u64 << retry.min(20)))
            .fold(0u64, u64::saturating_add);

        Duration::from_millis(
            self.timeout_ms
                .saturating_mul(u64::from(attempts))
                .saturating_add(backoff_ms),
        )
    }

    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn endpoint_url(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_endpoint())
    }

    /// Configured key, falling back to the provider's conventional env var
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.provider
                    .api_key_env()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

/// Web provider kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    DuckDuckGo,
    Wikipedia,
    StackExchange,
    Weather,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuckDuckGo => "duckduckgo",
            Self::Wikipedia => "wikipedia",
            Self::StackExchange => "stackexchange",
            Self::Weather => "weather",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::DuckDuckGo => endpoints::DUCKDUCKGO_DEFAULT,
            Self::Wikipedia => endpoints::WIKIPEDIA_DEFAULT,
            Self::StackExchange => endpoints::STACKEXCHANGE_DEFAULT,
            Self::Weather => endpoints::WTTR_DEFAULT,
        }
    }
}

/// One entry of the ordered provider list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_provider_timeout")]
    pub timeout_ms: u64,

    /// Base URL override
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_provider_timeout() -> u64 {
    timeouts::WEB_PROVIDER_MS
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            enabled: true,
            timeout_ms: default_provider_timeout(),
            endpoint: None,
        }
    }

    pub fn endpoint_url(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.kind.default_endpoint())
    }
}

/// How the question is rewritten before web search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReformulationMode {
    /// Send the question as-is
    None,
    /// Strip question words and the trailing "?"
    #[default]
    Simple,
    /// Ask the generator for a short keyword query
    Llm,
}

/// Web fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Provider order; tried first to last
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default)]
    pub reformulation: ReformulationMode,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new(ProviderKind::DuckDuckGo),
        ProviderConfig::new(ProviderKind::Wikipedia),
        ProviderConfig::new(ProviderKind::StackExchange),
    ]
}

fn default_max_results() -> usize {
    web::MAX_RESULTS
}

fn default_user_agent() -> String {
    web::USER_AGENT.to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            max_results: default_max_results(),
            reformulation: ReformulationMode::default(),
            user_agent: default_user_agent(),
        }
    }
}

impl WebConfig {
    /// Enabled providers, in configured order
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }
}

/// Answer-quality validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Case-insensitive regular expressions
    #[serde(default = "default_insufficient_markers")]
    pub insufficient_markers: Vec<String>,
}

fn default_insufficient_markers() -> Vec<String> {
    messages::INSUFFICIENT_MARKERS
        .iter()
        .map(|m| m.to_string())
        .collect()
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            insufficient_markers: default_insufficient_markers(),
        }
    }
}

/// User-visible notice text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeConfig {
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

fn default_fallback_message() -> String {
    messages::FALLBACK_NOTICE.to_string()
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            fallback_message: default_fallback_message(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from `config/` relative to the working directory
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from files under `dir` plus `DOCQA__*` environment variables
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    let default_path = dir.join("default");
    builder = builder.add_source(File::with_name(&default_path.to_string_lossy()).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        let env_path = dir.join(env_name);
        builder = builder.add_source(File::with_name(&env_path.to_string_lossy()).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("DOCQA")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        environment = ?settings.environment,
        providers = settings.web.enabled_providers().count(),
        "Settings loaded"
    );

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.assessment.relevance_threshold, 0.55);
        assert_eq!(settings.assessment.min_confidence, 0.45);
        assert_eq!(settings.web.reformulation, ReformulationMode::Simple);
        assert_eq!(settings.quality.insufficient_markers.len(), 9);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_default_provider_order() {
        let settings = Settings::default();
        let kinds: Vec<_> = settings.web.providers.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ProviderKind::DuckDuckGo,
                ProviderKind::Wikipedia,
                ProviderKind::StackExchange
            ]
        );
        assert!(settings.web.providers.iter().all(|p| p.timeout_ms == 10_000));
    }

    #[test]
    fn test_assessment_validation() {
        let mut settings = Settings::default();

        settings.assessment.relevance_threshold = 1.5;
        assert!(settings.validate_assessment().is_err());

        // floor above threshold
        settings.assessment.relevance_threshold = 0.5;
        settings.assessment.min_confidence = 0.6;
        assert!(settings.validate_assessment().is_err());

        // ceiling below threshold
        settings.assessment.min_confidence = 0.4;
        settings.assessment.high_confidence_ceiling = 0.45;
        assert!(settings.validate_assessment().is_err());

        settings.assessment.high_confidence_ceiling = 0.9;
        assert!(settings.validate_assessment().is_ok());
    }

    #[test]
    fn test_top_k_bounds() {
        let mut settings = Settings::default();
        settings.retrieval.top_k = 0;
        assert!(settings.validate_retrieval().is_err());
        settings.retrieval.top_k = 51;
        assert!(settings.validate_retrieval().is_err());
        settings.retrieval.top_k = 50;
        assert!(settings.validate_retrieval().is_ok());
    }

    #[test]
    fn test_web_requires_enabled_provider() {
        let mut settings = Settings::default();
        for p in &mut settings.web.providers {
            p.enabled = false;
        }
        assert!(settings.validate_web().is_err());

        settings.web.providers = Vec::new();
        assert!(settings.validate_web().is_err());

        let mut zero = ProviderConfig::new(ProviderKind::Wikipedia);
        zero.timeout_ms = 0;
        settings.web.providers = vec![zero];
        assert!(settings.validate_web().is_err());
    }

    #[test]
    fn test_invalid_marker_rejected() {
        let mut settings = Settings::default();
        settings.quality.insufficient_markers.push("(unclosed".to_string());
        let err = settings.validate_quality().unwrap_err();
        assert!(err.to_string().contains("quality.insufficient_markers[9]"));
    }

    #[test]
    fn test_hosted_provider_needs_key() {
        let mut settings = Settings::default();
        settings.generation.provider = GenerationProvider::OpenAi;
        settings.generation.api_key = Some("sk-test".to_string());
        assert!(settings.validate_generation().is_ok());
        assert_eq!(settings.generation.model_name(), "gpt-4o-mini");
        assert_eq!(settings.generation.endpoint_url(), endpoints::OPENAI_DEFAULT);
    }

    #[test]
    fn test_generation_budget_includes_backoff() {
        let mut generation = GenerationConfig::default();
        generation.timeout_ms = 1_000;
        generation.max_retries = 2;
        // 3 attempts + 250 ms + 500 ms of backoff
        assert_eq!(generation.call_budget(), Duration::from_millis(3_750));

        generation.max_retries = 0;
        assert_eq!(generation.call_budget(), Duration::from_secs(1));
    }

    #[test]
    fn test_request_timeout_must_cover_query_budget() {
        let mut settings = Settings::default();
        let budget = settings.query_budget();
        assert!(Duration::from_secs(settings.server.request_timeout_seconds) >= budget);

        settings.server.request_timeout_seconds = 1;
        let err = settings.validate_server().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "server.request_timeout_seconds"
        ));

        settings.server.request_timeout_seconds = budget.as_secs() + 1;
        assert!(settings.validate_server().is_ok());
    }

    #[test]
    fn test_query_budget_counts_enabled_providers_and_llm_reformulation() {
        let mut settings = Settings::default();
        let base = settings.query_budget();

        settings.web.providers[0].enabled = false;
        assert_eq!(base - settings.query_budget(), Duration::from_secs(10));

        settings.web.reformulation = ReformulationMode::Llm;
        let with_llm = settings.query_budget();
        assert_eq!(
            with_llm - (base - Duration::from_secs(10)),
            Duration::from_millis(settings.generation.timeout_ms)
        );
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
[server]
port = 9090

[assessment]
relevance_threshold = 0.6
min_confidence = 0.5

[[web.providers]]
kind = "wikipedia"
timeout_ms = 2500

[[web.providers]]
kind = "duckduckgo"
enabled = false
"#,
        )
        .unwrap();

        let settings = load_settings_from(dir.path(), None).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.assessment.relevance_threshold, 0.6);
        assert_eq!(settings.web.providers.len(), 2);
        assert_eq!(settings.web.providers[0].kind, ProviderKind::Wikipedia);
        assert_eq!(settings.web.providers[0].timeout_ms, 2500);
        assert_eq!(settings.web.enabled_providers().count(), 1);
    }

    #[test]
    fn test_env_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("default.toml"), "[retrieval]\ntop_k = 3\n").unwrap();
        fs::write(dir.path().join("staging.yaml"), "retrieval:\n  top_k: 8\n").unwrap();

        let settings = load_settings_from(dir.path(), Some("staging")).unwrap();
        assert_eq!(settings.retrieval.top_k, 8);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            "[assessment]\nmin_confidence = 0.9\n",
        )
        .unwrap();

        let err = load_settings_from(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
