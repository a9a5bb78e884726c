//! wttr.in current conditions
//!
//! Only answers queries of the form "current weather in <city>". Anything
//! else is reported as not applicable so the chain moves on.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

use docqa_core::{ProviderError, WebProvider, WebSnippet};

use super::http::{build_client, get_text};
use crate::WebError;

const NAME: &str = "weather";

static WEATHER_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)current\s+weather\s+in\s+([^?.!]+)").unwrap());

/// City named by a weather query, if the query is one
pub fn weather_city(query: &str) -> Option<String> {
    WEATHER_QUERY
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|city| !city.is_empty())
}

/// Weather provider
pub struct WeatherProvider {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl WeatherProvider {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self, WebError> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn city_url(&self, city: &str) -> String {
        format!("{}/{}", self.endpoint, city.replace(' ', "+"))
    }
}

#[async_trait]
impl WebProvider for WeatherProvider {
    async fn search(
        &self,
        query: &str,
        _max_results: usize,
    ) -> Result<Vec<WebSnippet>, ProviderError> {
        let city = weather_city(query).ok_or_else(|| {
            ProviderError::NotApplicable("not a current weather query".to_string())
        })?;

        let url = self.city_url(&city);
        let request = self.client.get(&url).query(&[("format", "3")]);
        let report = get_text(request, self.timeout).await?;
        let report = report.trim();
        if report.is_empty() {
            return Err(ProviderError::Empty);
        }

        Ok(vec![WebSnippet::new(
            NAME,
            format!("Current weather in {}", city),
            report,
            url,
        )])
    }

    fn name(&self) -> &str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_config::constants::endpoints::WTTR_DEFAULT;

    #[test]
    fn test_weather_city() {
        assert_eq!(weather_city("current weather in Paris").as_deref(), Some("Paris"));
        assert_eq!(
            weather_city("What is the Current Weather in New York?").as_deref(),
            Some("New York")
        );
        assert_eq!(weather_city("weather tomorrow"), None);
    }

    #[tokio::test]
    async fn test_other_queries_not_applicable() {
        let provider = WeatherProvider::new(WTTR_DEFAULT, "test", Duration::from_secs(1)).unwrap();
        let err = provider.search("rust lifetimes", 5).await.unwrap_err();
        assert_eq!(err.kind(), "not_applicable");
    }

    #[test]
    fn test_city_url() {
        let provider = WeatherProvider::new(WTTR_DEFAULT, "test", Duration::from_secs(1)).unwrap();
        assert_eq!(provider.city_url("New York"), "https://wttr.in/New+York");
    }
}
