//! Cross-session certification gate.
//!
//! [`CertificationProgress`] is the only value that outlives a session. The
//! caller owns persistence; this module only computes the next value.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::scoring::{ProficiencyScore, ScoringConfig};

pub const DEFAULT_REQUIRED_CONSECUTIVE: NonZeroU32 = match NonZeroU32::new(3) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationGateConfig {
    pub required_consecutive: NonZeroU32,
    pub scoring: ScoringConfig,
}

impl Default for CertificationGateConfig {
    fn default() -> Self {
        Self {
            required_consecutive: DEFAULT_REQUIRED_CONSECUTIVE,
            scoring: ScoringConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationProgress {
    pub consecutive_passed: u32,
    pub required_consecutive: u32,
    pub is_certified: bool,
    /// The most recent `required_consecutive` scores, oldest first.
    pub last_scores: Vec<ProficiencyScore>,
}

pub fn create_initial_certification_progress(
    config: &CertificationGateConfig,
) -> CertificationProgress {
    CertificationProgress {
        consecutive_passed: 0,
        required_consecutive: config.required_consecutive.get(),
        is_certified: false,
        last_scores: Vec::new(),
    }
}

/// Fold one more session score into the progress.
///
/// A failed score resets the streak to zero. Certification holds only while
/// the streak is at or above the threshold.
pub fn update_certification_progress(
    prev: &CertificationProgress,
    score: &ProficiencyScore,
    config: &CertificationGateConfig,
) -> CertificationProgress {
    let required = config.required_consecutive.get();
    let consecutive_passed = if score.passed {
        prev.consecutive_passed.saturating_add(1)
    } else {
        0
    };

    let mut last_scores = prev.last_scores.clone();
    last_scores.push(score.clone());
    let keep = required as usize;
    if last_scores.len() > keep {
        last_scores.drain(..last_scores.len() - keep);
    }

    CertificationProgress {
        consecutive_passed,
        required_consecutive: required,
        is_certified: consecutive_passed >= required,
        last_scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::scoring::FailureReason;

    fn score(passed: bool, pick_accuracy: f64) -> ProficiencyScore {
        ProficiencyScore {
            pick_accuracy,
            total_rejected: 0,
            critical_sequence_violations: 0,
            rejected_by_error: ErrorCode::ALL.iter().map(|c| (*c, 0)).collect(),
            passed,
            reasons: if passed {
                vec![]
            } else {
                vec![FailureReason::AccuracyBelowTarget]
            },
        }
    }

    fn gate(required: u32) -> CertificationGateConfig {
        CertificationGateConfig {
            required_consecutive: NonZeroU32::new(required).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_three_passes_certify() {
        let config = gate(3);
        let mut progress = create_initial_certification_progress(&config);
        for _ in 0..3 {
            assert!(!progress.is_certified);
            progress = update_certification_progress(&progress, &score(true, 1.0), &config);
        }
        assert_eq!(progress.consecutive_passed, 3);
        assert!(progress.is_certified);
    }

    #[test]
    fn test_failure_resets_streak() {
        let config = gate(3);
        let mut progress = create_initial_certification_progress(&config);
        progress = update_certification_progress(&progress, &score(true, 1.0), &config);
        progress = update_certification_progress(&progress, &score(false, 0.5), &config);
        assert_eq!(progress.consecutive_passed, 0);
        progress = update_certification_progress(&progress, &score(true, 1.0), &config);
        assert_eq!(progress.consecutive_passed, 1);
        assert!(!progress.is_certified);
    }

    #[test]
    fn test_failure_after_certification_revokes() {
        let config = gate(2);
        let mut progress = create_initial_certification_progress(&config);
        progress = update_certification_progress(&progress, &score(true, 1.0), &config);
        progress = update_certification_progress(&progress, &score(true, 1.0), &config);
        assert!(progress.is_certified);
        progress = update_certification_progress(&progress, &score(false, 0.9), &config);
        assert!(!progress.is_certified);
    }

    #[test]
    fn test_window_keeps_most_recent_scores() {
        let config = gate(3);
        let mut progress = create_initial_certification_progress(&config);
        for accuracy in [0.95, 0.96, 0.97, 0.98] {
            progress = update_certification_progress(&progress, &score(true, accuracy), &config);
        }
        let kept: Vec<f64> = progress.last_scores.iter().map(|s| s.pick_accuracy).collect();
        assert_eq!(kept, vec![0.96, 0.97, 0.98]);
    }

    #[test]
    fn test_single_session_threshold_keeps_one_score() {
        let config = gate(1);
        let mut progress = create_initial_certification_progress(&config);
        assert!(!progress.is_certified);

        progress = update_certification_progress(&progress, &score(true, 0.98), &config);
        progress = update_certification_progress(&progress, &score(true, 0.99), &config);
        assert!(progress.is_certified);
        assert_eq!(progress.last_scores.len(), 1);
        assert_eq!(progress.last_scores[0].pick_accuracy, 0.99);
    }

    #[test]
    fn test_zero_threshold_is_unrepresentable() {
        let err = serde_json::from_value::<CertificationGateConfig>(serde_json::json!({
            "requiredConsecutive": 0,
            "scoring": ScoringConfig::default(),
        }));
        assert!(err.is_err());
    }

    #[test]
    fn test_progress_round_trips_through_json() {
        let config = gate(3);
        let progress = update_certification_progress(
            &create_initial_certification_progress(&config),
            &score(true, 1.0),
            &config,
        );
        let json = serde_json::to_string(&progress).unwrap();
        assert!(json.contains("\"consecutivePassed\":1"));
        let back: CertificationProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, progress);
    }
}
