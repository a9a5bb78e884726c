//! Evidence types: retrieved knowledge-base chunks and web snippets

use serde::{Deserialize, Serialize};

/// Where a retrieved chunk came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Source document ID
    pub document_id: String,
    /// Page number within the document, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Character offset of the chunk within its page or document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// A retrieved knowledge-base chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    /// Chunk text
    pub text: String,
    /// Similarity score (0.0 - 1.0, higher is more similar)
    pub score: f32,
    /// Source metadata
    pub source: ChunkSource,
}

impl RetrievalCandidate {
    /// Create a new candidate
    pub fn new(text: impl Into<String>, score: f32, document_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score,
            source: ChunkSource {
                document_id: document_id.into(),
                page: None,
                offset: None,
            },
        }
    }

    /// Set page number
    pub fn with_page(mut self, page: u32) -> Self {
        self.source.page = Some(page);
        self
    }

    /// Set offset
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.source.offset = Some(offset);
        self
    }
}

/// A web search result excerpt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSnippet {
    /// Name of the provider that produced it
    pub provider: String,
    pub title: String,
    pub excerpt: String,
    pub url: String,
}

impl WebSnippet {
    pub fn new(
        provider: impl Into<String>,
        title: impl Into<String>,
        excerpt: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            title: title.into(),
            excerpt: excerpt.into(),
            url: url.into(),
        }
    }

    /// A snippet is usable when it links somewhere and says something
    pub fn is_well_formed(&self) -> bool {
        !self.url.trim().is_empty()
            && (!self.title.trim().is_empty() || !self.excerpt.trim().is_empty())
    }
}

/// Which evidence path produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    KnowledgeBase,
    Web,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnowledgeBase => "knowledge_base",
            Self::Web => "web",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The evidence actually used to build an answer.
///
/// The source type of an answer is read from here, so an answer can never
/// claim one path while citing evidence from the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_type", content = "items", rename_all = "snake_case")]
pub enum EvidenceSet {
    KnowledgeBase(Vec<RetrievalCandidate>),
    Web(Vec<WebSnippet>),
}

impl EvidenceSet {
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::KnowledgeBase(_) => SourceType::KnowledgeBase,
            Self::Web(_) => SourceType::Web,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::KnowledgeBase(items) => items.len(),
            Self::Web(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_builder() {
        let c = RetrievalCandidate::new("Warranty lasts two years", 0.82, "manual.pdf")
            .with_page(12)
            .with_offset(340);
        assert_eq!(c.source.document_id, "manual.pdf");
        assert_eq!(c.source.page, Some(12));
        assert_eq!(c.source.offset, Some(340));
    }

    #[test]
    fn test_snippet_well_formed() {
        assert!(WebSnippet::new("wikipedia", "Rust", "", "https://en.wikipedia.org/wiki/Rust")
            .is_well_formed());
        assert!(!WebSnippet::new("wikipedia", "Rust", "text", " ").is_well_formed());
        assert!(!WebSnippet::new("wikipedia", "", "  ", "https://x.test").is_well_formed());
    }

    #[test]
    fn test_evidence_source_type() {
        let kb = EvidenceSet::KnowledgeBase(vec![RetrievalCandidate::new("a", 0.9, "d")]);
        let web = EvidenceSet::Web(Vec::new());
        assert_eq!(kb.source_type(), SourceType::KnowledgeBase);
        assert_eq!(web.source_type(), SourceType::Web);
        assert!(web.is_empty());
        assert_eq!(kb.len(), 1);
    }

    #[test]
    fn test_source_type_serde() {
        let json = serde_json::to_string(&SourceType::KnowledgeBase).unwrap();
        assert_eq!(json, "\"knowledge_base\"");
        assert_eq!(SourceType::Web.to_string(), "web");
    }
}
