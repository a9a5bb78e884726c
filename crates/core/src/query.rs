//! Query value

use serde::{Deserialize, Serialize};

/// A user question. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

impl Query {
    /// Create a query without a request id
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_id: None,
        }
    }

    /// Create a query tagged with a fresh random request id
    pub fn with_generated_id(text: impl Into<String>) -> Self {
        Self::new(text).with_request_id(uuid::Uuid::new_v4().to_string())
    }

    /// Attach a request/session id
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Derive a query with different text that keeps this query's request id
    pub fn derive(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_id: self.request_id.clone(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// True when the question has no non-whitespace content
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
