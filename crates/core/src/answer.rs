//! Answer-side types: confidence verdicts, citations and the final answer record

use serde::{Deserialize, Serialize};

use crate::evidence::SourceType;

/// Why a confidence verdict came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    /// All sufficiency conditions held
    Sufficient,
    /// Nothing was retrieved
    NoCandidates,
    /// Top score below the relevance threshold
    BelowRelevanceThreshold,
    /// Weighted top/mean combination below the minimum-confidence floor
    BelowConfidenceFloor,
    /// A single match below the high-confidence ceiling with nothing close behind it
    Uncorroborated,
}

impl VerdictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sufficient => "sufficient",
            Self::NoCandidates => "no_candidates",
            Self::BelowRelevanceThreshold => "below_relevance_threshold",
            Self::BelowConfidenceFloor => "below_confidence_floor",
            Self::Uncorroborated => "uncorroborated",
        }
    }
}

/// Sufficiency decision over a set of retrieval candidates, plus the signals behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceVerdict {
    pub sufficient: bool,
    /// Highest (clamped) score
    pub top_score: f32,
    /// Mean of the considered top-k scores
    pub mean_score: f32,
    /// Weighted combination of top score and mean, compared against the floor
    pub combined_score: f32,
    /// Top score minus lowest considered score
    pub spread: f32,
    /// Other candidates within the corroboration delta of the top score
    pub supporting: usize,
    /// Scores that were NaN or outside [0, 1] and had to be clamped
    pub clamped: usize,
    pub reason: VerdictReason,
}

impl ConfidenceVerdict {
    /// The verdict for an empty candidate set: insufficient, every signal zeroed
    pub fn empty() -> Self {
        Self {
            sufficient: false,
            top_score: 0.0,
            mean_score: 0.0,
            combined_score: 0.0,
            spread: 0.0,
            supporting: 0,
            clamped: 0,
            reason: VerdictReason::NoCandidates,
        }
    }
}

/// Where a citation points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CitationLocator {
    /// A page of a knowledge-base document
    Page {
        document_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page: Option<u32>,
    },
    /// A web page
    Url { title: String, url: String },
}

/// One rendering-ready citation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based position, in evidence ranking order
    pub index: usize,
    pub label: String,
    pub locator: CitationLocator,
}

impl Citation {
    /// Display form: `[1] Page 12` or `[2] Title - https://...`
    pub fn render(&self) -> String {
        match &self.locator {
            CitationLocator::Page { .. } => format!("[{}] {}", self.index, self.label),
            CitationLocator::Url { url, .. } => {
                format!("[{}] {} - {}", self.index, self.label, url)
            },
        }
    }

    pub fn is_page(&self) -> bool {
        matches!(self.locator, CitationLocator::Page { .. })
    }

    pub fn is_url(&self) -> bool {
        matches!(self.locator, CitationLocator::Url { .. })
    }
}

/// The final answer for one query. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub question: String,
    pub answer: String,
    pub source_type: SourceType,
    pub citations: Vec<Citation>,
    pub elapsed_ms: u64,
    /// Set when the query escalated to web search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    /// Knowledge-base confidence verdict, when retrieval produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceVerdict>,
    /// Web provider whose results were used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Data-quality warnings (e.g. an answer without citations)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AnswerRecord {
    /// Citations rendered one per line
    pub fn rendered_citations(&self) -> String {
        if self.citations.is_empty() {
            return "No sources available.".to_string();
        }
        self.citations
            .iter()
            .map(Citation::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn escalated(&self) -> bool {
        self.notice.is_some()
    }
}
