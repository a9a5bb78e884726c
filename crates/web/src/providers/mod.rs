//! Web search providers
//!
//! All providers implement [`WebProvider`]; the chain only sees trait objects.

mod duckduckgo;
mod http;
mod stackexchange;
mod weather;
mod wikipedia;

pub use duckduckgo::DuckDuckGoProvider;
pub use stackexchange::StackExchangeProvider;
pub use weather::{weather_city, WeatherProvider};
pub use wikipedia::WikipediaProvider;

use std::sync::Arc;
use std::time::Duration;

use docqa_config::{ProviderConfig, ProviderKind, WebConfig};
use docqa_core::WebProvider;

use crate::{WebError, WebFallbackChain};

/// Create the provider described by `config`
pub fn create_provider(
    config: &ProviderConfig,
    user_agent: &str,
) -> Result<Arc<dyn WebProvider>, WebError> {
    let endpoint = config.endpoint_url();
    let timeout = Duration::from_millis(config.timeout_ms);

    let provider: Arc<dyn WebProvider> = match config.kind {
        ProviderKind::DuckDuckGo => {
            Arc::new(DuckDuckGoProvider::new(endpoint, user_agent, timeout)?)
        },
        ProviderKind::Wikipedia => Arc::new(WikipediaProvider::new(endpoint, user_agent, timeout)?),
        ProviderKind::StackExchange => {
            Arc::new(StackExchangeProvider::new(endpoint, user_agent, timeout)?)
        },
        ProviderKind::Weather => Arc::new(WeatherProvider::new(endpoint, user_agent, timeout)?),
    };
    Ok(provider)
}

/// Build the fallback chain from the enabled providers, in configured order
pub fn build_chain(config: &WebConfig) -> Result<WebFallbackChain, WebError> {
    let providers = config
        .enabled_providers()
        .map(|p| {
            let provider = create_provider(p, &config.user_agent)?;
            Ok((provider, Duration::from_millis(p.timeout_ms)))
        })
        .collect::<Result<Vec<_>, WebError>>()?;

    let chain = WebFallbackChain::new(providers, config.max_results)?;
    tracing::info!(providers = ?chain.provider_names(), "Web fallback chain ready");
    Ok(chain)
}
