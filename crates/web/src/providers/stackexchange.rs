//! Stack Exchange excerpt search for technical questions

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use docqa_core::{ProviderError, WebProvider, WebSnippet};

use super::http::{build_client, get_json};
use crate::text::clean_html;
use crate::WebError;

const NAME: &str = "stackexchange";
const SITE: &str = "stackoverflow";

#[derive(Debug, Deserialize)]
struct ExcerptResponse {
    #[serde(default)]
    items: Vec<ExcerptItem>,
}

#[derive(Debug, Deserialize)]
struct ExcerptItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    item_type: String,
    question_id: Option<u64>,
    answer_id: Option<u64>,
}

impl ExcerptItem {
    fn link(&self) -> Option<String> {
        match (self.item_type.as_str(), self.answer_id, self.question_id) {
            ("answer", Some(id), _) => Some(format!("https://{}.com/a/{}", SITE, id)),
            (_, _, Some(id)) => Some(format!("https://{}.com/q/{}", SITE, id)),
            _ => None,
        }
    }
}

/// Stack Overflow search provider
pub struct StackExchangeProvider {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl StackExchangeProvider {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self, WebError> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

fn parse_response(response: ExcerptResponse, max_results: usize) -> Vec<WebSnippet> {
    response
        .items
        .into_iter()
        .filter_map(|item| {
            let url = item.link()?;
            Some(WebSnippet::new(
                NAME,
                clean_html(&item.title),
                clean_html(&item.excerpt),
                url,
            ))
        })
        .take(max_results)
        .collect()
}

#[async_trait]
impl WebProvider for StackExchangeProvider {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<WebSnippet>, ProviderError> {
        let pagesize = max_results.to_string();
        let request = self
            .client
            .get(format!("{}/search/excerpts", self.endpoint))
            .query(&[
                ("order", "desc"),
                ("sort", "relevance"),
                ("q", query),
                ("site", SITE),
                ("pagesize", pagesize.as_str()),
            ]);

        let response: ExcerptResponse = get_json(request, self.timeout).await?;
        let snippets = parse_response(response, max_results);
        if snippets.is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(snippets)
    }

    fn name(&self) -> &str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "items": [
            {"item_type": "question", "question_id": 101, "title": "How do I fix E0502 &amp; friends?",
             "excerpt": "cannot borrow <span class=\"highlight\">as mutable</span>"},
            {"item_type": "answer", "question_id": 101, "answer_id": 202, "title": "How do I fix E0502?",
             "excerpt": "Clone the value first."},
            {"item_type": "question", "title": "No id", "excerpt": "skipped"}
        ],
        "has_more": false
    }"#;

    #[test]
    fn test_parse_items() {
        let response: ExcerptResponse = serde_json::from_str(BODY).unwrap();
        let snippets = parse_response(response, 5);

        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].title, "How do I fix E0502 & friends?");
        assert_eq!(snippets[0].excerpt, "cannot borrow as mutable");
        assert_eq!(snippets[0].url, "https://stackoverflow.com/q/101");
        assert_eq!(snippets[1].url, "https://stackoverflow.com/a/202");
    }
}
