//! Configuration management for the document Q&A engine
//!
//! Supports loading configuration from:
//! - TOML/YAML/JSON files (`config/default.*`, `config/{env}.*`)
//! - Environment variables (`DOCQA__` prefix, `__` separator)
//!
//! Every threshold, timeout and the provider order is a configuration value
//! injected into the orchestrator at construction; nothing is read from
//! ambient state at query time.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, AssessmentConfig, GenerationConfig, GenerationProvider,
    NoticeConfig, ObservabilityConfig, ProviderConfig, ProviderKind, QualityConfig,
    ReformulationMode, RetrievalConfig, RuntimeEnvironment, ServerConfig, Settings, WebConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
