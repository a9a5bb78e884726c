//! Wikipedia search API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use docqa_core::{ProviderError, WebProvider, WebSnippet};

use super::http::{build_client, get_json};
use crate::text::clean_html;
use crate::WebError;

const NAME: &str = "wikipedia";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    #[serde(default)]
    snippet: String,
}

/// Wikipedia search provider
pub struct WikipediaProvider {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl WikipediaProvider {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self, WebError> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

fn article_url(endpoint: &str, title: &str) -> String {
    let slug: String = title
        .trim()
        .replace(' ', "_")
        .chars()
        .map(|c| match c {
            '?' => "%3F".to_string(),
            '#' => "%23".to_string(),
            '%' => "%25".to_string(),
            _ => c.to_string(),
        })
        .collect();
    format!("{}/wiki/{}", endpoint, slug)
}

fn parse_response(endpoint: &str, response: SearchResponse, max_results: usize) -> Vec<WebSnippet> {
    response
        .query
        .map(|q| q.search)
        .unwrap_or_default()
        .into_iter()
        .filter(|hit| !hit.title.trim().is_empty())
        .take(max_results)
        .map(|hit| {
            WebSnippet::new(
                NAME,
                hit.title.trim(),
                clean_html(&hit.snippet),
                article_url(endpoint, &hit.title),
            )
        })
        .collect()
}

#[async_trait]
impl WebProvider for WikipediaProvider {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<WebSnippet>, ProviderError> {
        let limit = max_results.to_string();
        let request = self
            .client
            .get(format!("{}/w/api.php", self.endpoint))
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("format", "json"),
                ("utf8", "1"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
            ]);

        let response: SearchResponse = get_json(request, self.timeout).await?;
        let snippets = parse_response(&self.endpoint, response, max_results);
        if snippets.is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(snippets)
    }

    fn name(&self) -> &str {
        NAME
    }
}
