//! Answer-quality validation
//!
//! Generators asked to answer strictly from context tend to say so when the
//! context does not contain the answer ("I don't have enough information...").
//! A knowledge-base answer that matches one of the configured markers is
//! discarded and the query escalates to web search.

use regex::{RegexSet, RegexSetBuilder};

use docqa_config::Settings;

use crate::RagError;

/// Detects "I don't know" answers
#[derive(Debug, Clone)]
pub struct AnswerQualityValidator {
    markers: RegexSet,
}

impl AnswerQualityValidator {
    /// Compile the markers as case-insensitive regular expressions
    pub fn new<I, S>(markers: I) -> Result<Self, RagError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let markers = RegexSetBuilder::new(markers)
            .case_insensitive(true)
            .build()
            .map_err(|e| RagError::Pattern(e.to_string()))?;

        Ok(Self { markers })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, RagError> {
        Self::new(&settings.quality.insufficient_markers)
    }

    /// True when the answer admits the context did not contain the answer
    pub fn looks_insufficient(&self, answer: &str) -> bool {
        let normalized = normalize_apostrophes(answer);
        let matched = self.markers.is_match(&normalized);
        if matched {
            tracing::debug!(
                markers = ?self.markers.matches(&normalized).into_iter().collect::<Vec<_>>(),
                "Answer matched insufficient-information marker"
            );
        }
        matched
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

impl Default for AnswerQualityValidator {
    fn default() -> Self {
        Self {
            markers: RegexSet::empty(),
        }
    }
}

// Generators frequently emit typographic apostrophes ("don’t")
fn normalize_apostrophes(text: &str) -> std::borrow::Cow<'_, str> {
    if text.contains(['\u{2019}', '\u{2018}']) {
        std::borrow::Cow::Owned(text.replace(['\u{2019}', '\u{2018}'], "'"))
    } else {
        std::borrow::Cow::Borrowed(text)
    }
}
