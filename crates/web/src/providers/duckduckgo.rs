//! DuckDuckGo Instant Answer API
//!
//! Uses the abstract (usually a Wikipedia summary) when present, then the
//! related topics, flattening topic groups.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use docqa_core::{ProviderError, WebProvider, WebSnippet};

use super::http::{build_client, get_json};
use crate::WebError;

const NAME: &str = "duckduckgo";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: String,
    #[serde(default, rename = "FirstURL")]
    first_url: String,
    /// Present on topic groups instead of text/url
    #[serde(default)]
    topics: Vec<RelatedTopic>,
}

/// DuckDuckGo search provider
pub struct DuckDuckGoProvider {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl DuckDuckGoProvider {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self, WebError> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            endpoint: endpoint.to_string(),
            timeout,
        })
    }
}

fn topic_title(text: &str) -> String {
    // Related topic text reads "Title - description"
    text.split(" - ").next().unwrap_or(text).trim().to_string()
}

fn flatten_topics(topics: Vec<RelatedTopic>, out: &mut Vec<RelatedTopic>) {
    for topic in topics {
        if topic.topics.is_empty() {
            out.push(topic);
        } else {
            flatten_topics(topic.topics, out);
        }
    }
}

fn parse_answer(answer: InstantAnswer, max_results: usize) -> Vec<WebSnippet> {
    let mut snippets = Vec::new();

    if !answer.abstract_text.trim().is_empty() && !answer.abstract_url.trim().is_empty() {
        snippets.push(WebSnippet::new(
            NAME,
            answer.heading.trim(),
            answer.abstract_text.trim(),
            answer.abstract_url.trim(),
        ));
    }

    let mut topics = Vec::new();
    flatten_topics(answer.related_topics, &mut topics);
    snippets.extend(
        topics
            .into_iter()
            .filter(|t| !t.text.trim().is_empty())
            .map(|t| {
                WebSnippet::new(NAME, topic_title(&t.text), t.text.trim(), t.first_url.trim())
            }),
    );

    snippets.truncate(max_results);
    snippets
}

#[async_trait]
impl WebProvider for DuckDuckGoProvider {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<WebSnippet>, ProviderError> {
        let request = self.client.get(&self.endpoint).query(&[
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ]);

        let answer: InstantAnswer = get_json(request, self.timeout).await?;
        let snippets = parse_answer(answer, max_results);
        if snippets.is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(snippets)
    }

    fn name(&self) -> &str {
        NAME
    }
}
