//! Confidence assessment
//!
//! Turns the retriever's scored candidates into a single sufficiency verdict.
//! Sufficiency requires all of:
//! 1. top score >= relevance threshold
//! 2. `top_weight * top + (1 - top_weight) * mean(top-k)` >= minimum confidence
//! 3. another candidate within `corroboration_delta` of the top score, or a
//!    top score at or above the high-confidence ceiling
//!
//! The assessment is a pure function of its input. Malformed scores are
//! clamped into [0, 1] (NaN becomes 0) and counted on the verdict.

use docqa_config::{AssessmentConfig, Settings};
use docqa_core::{ConfidenceVerdict, RetrievalCandidate, VerdictReason};

/// Decides whether retrieved knowledge-base evidence is good enough to answer from
#[derive(Debug, Clone)]
pub struct ConfidenceAssessor {
    config: AssessmentConfig,
    top_k: usize,
}

impl ConfidenceAssessor {
    /// Create an assessor that considers at most `top_k` candidates
    pub fn new(config: AssessmentConfig, top_k: usize) -> Self {
        Self {
            config,
            top_k: top_k.max(1),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.assessment.clone(), settings.retrieval.top_k)
    }

    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    /// The candidates a verdict is computed over: best first, at most `top_k`
    pub fn rank(&self, mut candidates: Vec<RetrievalCandidate>) -> Vec<RetrievalCandidate> {
        candidates.sort_by(|a, b| clamp_score(b.score).0.total_cmp(&clamp_score(a.score).0));
        candidates.truncate(self.top_k);
        candidates
    }

    /// Assess a candidate set
    ///
    /// Input order is not trusted: scores are sorted descending before the
    /// top-k cut.
    pub fn assess(&self, candidates: &[RetrievalCandidate]) -> ConfidenceVerdict {
        if candidates.is_empty() {
            return ConfidenceVerdict::empty();
        }

        let mut clamped = 0usize;
        let mut scores: Vec<f32> = candidates
            .iter()
            .map(|c| {
                let (score, was_clamped) = clamp_score(c.score);
                if was_clamped {
                    clamped += 1;
                }
                score
            })
            .collect();

        if clamped > 0 {
            tracing::warn!(clamped, total = candidates.len(), "Clamped malformed retrieval scores");
        }

        scores.sort_by(|a, b| b.total_cmp(a));
        scores.truncate(self.top_k);

        let top = scores[0];
        let lowest = scores[scores.len() - 1];
        let mean = scores.iter().sum::<f32>() / scores.len() as f32;
        let combined = self.config.top_weight * top + (1.0 - self.config.top_weight) * mean;
        let supporting = scores[1..]
            .iter()
            .filter(|s| **s >= top - self.config.corroboration_delta)
            .count();

        let reason = if top < self.config.relevance_threshold {
            VerdictReason::BelowRelevanceThreshold
        } else if combined < self.config.min_confidence {
            VerdictReason::BelowConfidenceFloor
        } else if supporting == 0 && top < self.config.high_confidence_ceiling {
            VerdictReason::Uncorroborated
        } else {
            VerdictReason::Sufficient
        };

        let verdict = ConfidenceVerdict {
            sufficient: reason == VerdictReason::Sufficient,
            top_score: top,
            mean_score: mean,
            combined_score: combined,
            spread: top - lowest,
            supporting,
            clamped,
            reason,
        };

        tracing::debug!(
            sufficient = verdict.sufficient,
            top_score = verdict.top_score,
            combined = verdict.combined_score,
            supporting = verdict.supporting,
            reason = ?verdict.reason,
            "Confidence assessed"
        );

        verdict
    }
}

fn clamp_score(score: f32) -> (f32, bool) {
    if score.is_nan() {
        (0.0, true)
    } else if !(0.0..=1.0).contains(&score) {
        (score.clamp(0.0, 1.0), true)
    } else {
        (score, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessor() -> ConfidenceAssessor {
        ConfidenceAssessor::new(AssessmentConfig::default(), 5)
    }

    fn candidates(scores: &[f32]) -> Vec<RetrievalCandidate> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                RetrievalCandidate::new(format!("chunk {}", i), *s, "manual.pdf")
                    .with_page(i as u32 + 1)
            })
            .collect()
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let assessor = ConfidenceAssessor::new(AssessmentConfig::default(), 2);
        let ranked = assessor.rank(candidates(&[0.3, f32::NAN, 0.9, 0.6]));
        let pages: Vec<_> = ranked.iter().map(|c| c.source.page).collect();
        assert_eq!(pages, vec![Some(3), Some(4)]);
    }

    #[test]
    fn test_empty_is_insufficient_and_zeroed() {
        let verdict = assessor().assess(&[]);
        assert_eq!(verdict, ConfidenceVerdict::empty());
    }

    #[test]
    fn test_two_strong_matches_are_sufficient() {
        let verdict = assessor().assess(&candidates(&[0.82, 0.81, 0.3]));
        assert!(verdict.sufficient);
        assert_eq!(verdict.reason, VerdictReason::Sufficient);
        assert_eq!(verdict.top_score, 0.82);
        assert_eq!(verdict.supporting, 1);
        assert!((verdict.spread - 0.52).abs() < 1e-6);
    }

    #[test]
    fn test_weak_single_match_is_insufficient() {
        let verdict = assessor().assess(&candidates(&[0.2]));
        assert!(!verdict.sufficient);
        assert_eq!(verdict.reason, VerdictReason::BelowRelevanceThreshold);
    }

    #[test]
    fn test_below_threshold_insufficient_for_any_k() {
        for k in 1..=8 {
            let scores = vec![0.54; k];
            let verdict = assessor().assess(&candidates(&scores));
            assert!(!verdict.sufficient, "k={} should be insufficient", k);
            assert_eq!(verdict.reason, VerdictReason::BelowRelevanceThreshold);
        }
    }

    #[test]
    fn test_single_excellent_match_is_decisive() {
        let verdict = assessor().assess(&candidates(&[0.9]));
        assert!(verdict.sufficient);
        assert_eq!(verdict.supporting, 0);

        let verdict = assessor().assess(&candidates(&[0.85]));
        assert!(verdict.sufficient);
    }

    #[test]
    fn test_lucky_match_fails_floor() {
        let verdict = assessor().assess(&candidates(&[0.6, 0.05, 0.05, 0.05, 0.05]));
        assert!(!verdict.sufficient);
        assert_eq!(verdict.reason, VerdictReason::BelowConfidenceFloor);
    }

    #[test]
    fn test_uncorroborated_match() {
        let verdict = assessor().assess(&candidates(&[0.7, 0.4]));
        assert!(!verdict.sufficient);
        assert_eq!(verdict.reason, VerdictReason::Uncorroborated);
    }

    #[test]
    fn test_input_order_is_not_trusted() {
        let verdict = assessor().assess(&candidates(&[0.3, 0.81, 0.82]));
        assert!(verdict.sufficient);
        assert_eq!(verdict.top_score, 0.82);
    }

    #[test]
    fn test_malformed_scores_are_clamped() {
        let verdict = assessor().assess(&candidates(&[f32::NAN, 0.9, 1.7]));
        assert_eq!(verdict.clamped, 2);
        assert_eq!(verdict.top_score, 1.0);
        assert!(verdict.sufficient);
        assert_eq!(verdict.spread, 1.0);
    }

    #[test]
    fn test_only_top_k_considered() {
        let assessor = ConfidenceAssessor::new(AssessmentConfig::default(), 2);
        let verdict = assessor.assess(&candidates(&[0.7, 0.68, 0.0, 0.0, 0.0]));
        // The zeros are outside k=2 and do not drag the mean down
        assert!((verdict.mean_score - 0.69).abs() < 1e-6);
        assert!(verdict.sufficient);
    }

    #[test]
    fn test_thresholds_come_from_config() {
        let strict = AssessmentConfig {
            relevance_threshold: 0.6,
            min_confidence: 0.5,
            ..AssessmentConfig::default()
        };
        let assessor = ConfidenceAssessor::new(strict, 5);
        let verdict = assessor.assess(&candidates(&[0.58, 0.57]));
        assert!(!verdict.sufficient);

        let verdict = ConfidenceAssessor::new(AssessmentConfig::default(), 5)
            .assess(&candidates(&[0.58, 0.57]));
        assert!(verdict.sufficient);
    }
}
