//! Citation composition
//!
//! One citation per evidence item, in ranking order. The locator kind follows
//! the evidence kind, so knowledge-base answers only cite pages and web
//! answers only cite URLs.

use docqa_core::{Citation, CitationLocator, EvidenceSet, RetrievalCandidate, WebSnippet};

pub struct CitationComposer;

impl CitationComposer {
    pub fn compose(evidence: &EvidenceSet) -> Vec<Citation> {
        match evidence {
            EvidenceSet::KnowledgeBase(candidates) => candidates
                .iter()
                .enumerate()
                .map(|(i, c)| Self::page_citation(i + 1, c))
                .collect(),
            EvidenceSet::Web(snippets) => snippets
                .iter()
                .enumerate()
                .map(|(i, s)| Self::url_citation(i + 1, s))
                .collect(),
        }
    }

    fn page_citation(index: usize, candidate: &RetrievalCandidate) -> Citation {
        let source = &candidate.source;
        let label = match source.page {
            Some(page) => format!("Page {}", page),
            None => source.document_id.clone(),
        };
        Citation {
            index,
            label,
            locator: CitationLocator::Page {
                document_id: source.document_id.clone(),
                page: source.page,
            },
        }
    }

    fn url_citation(index: usize, snippet: &WebSnippet) -> Citation {
        let title = snippet.title.trim();
        let label = if title.is_empty() {
            snippet.url.clone()
        } else {
            title.to_string()
        };
        Citation {
            index,
            label,
            locator: CitationLocator::Url {
                title: title.to_string(),
                url: snippet.url.clone(),
            },
        }
    }
}
