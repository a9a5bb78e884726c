//! Web search fallback
//!
//! Features:
//! - Ordered provider chain with per-provider timeouts
//! - DuckDuckGo, Wikipedia and Stack Exchange search providers
//! - wttr.in provider for "current weather in <city>" queries

pub mod chain;
pub mod providers;
mod text;

pub use chain::{ProviderFailure, WebFallbackChain, WebResults};
pub use providers::{
    build_chain, DuckDuckGoProvider, StackExchangeProvider, WeatherProvider, WikipediaProvider,
};

use thiserror::Error;

/// Web search errors
#[derive(Error, Debug, Clone)]
pub enum WebError {
    #[error("No web providers configured")]
    NoProviders,

    #[error("All {} web providers failed", .failures.len())]
    FallbackExhausted { failures: Vec<ProviderFailure> },

    #[error("Web search cancelled")]
    Cancelled { failures: Vec<ProviderFailure> },

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl WebError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoProviders => "no_providers",
            Self::FallbackExhausted { .. } => "fallback_exhausted",
            Self::Cancelled { .. } => "cancelled",
            Self::Client(_) => "client",
        }
    }

    /// Provider failures recorded before the chain stopped
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            Self::FallbackExhausted { failures } | Self::Cancelled { failures } => failures,
            _ => &[],
        }
    }
}
