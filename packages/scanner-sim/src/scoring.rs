//! Proficiency scoring.
//!
//! Computed on demand from a finished event log and never stored on the
//! session.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Event;
use crate::error::ErrorCode;

pub const DEFAULT_ACCURACY_TARGET: f64 = 0.97;
pub const DEFAULT_MAX_CRITICAL_SEQUENCE_VIOLATIONS: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    pub accuracy_target: f64,
    pub max_critical_sequence_violations: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            accuracy_target: DEFAULT_ACCURACY_TARGET,
            max_critical_sequence_violations: DEFAULT_MAX_CRITICAL_SEQUENCE_VIOLATIONS,
        }
    }
}

/// Why a session did not pass. Variants are declared in sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    AccuracyBelowTarget,
    CriticalSequenceViolations,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::AccuracyBelowTarget => "ACCURACY_BELOW_TARGET",
            FailureReason::CriticalSequenceViolations => "CRITICAL_SEQUENCE_VIOLATIONS",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProficiencyScore {
    /// Accepted ÷ attempted over item scan, quantity entry and tote verify.
    /// Zero when nothing was attempted.
    pub pick_accuracy: f64,
    pub total_rejected: u64,
    pub critical_sequence_violations: u64,
    pub rejected_by_error: BTreeMap<ErrorCode, u64>,
    pub passed: bool,
    /// Sorted and deduplicated.
    pub reasons: Vec<FailureReason>,
}

pub fn score_session<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    config: &ScoringConfig,
) -> ProficiencyScore {
    let mut accepted_pick_actions: u64 = 0;
    let mut rejected_pick_actions: u64 = 0;
    let mut total_rejected: u64 = 0;
    let mut critical_sequence_violations: u64 = 0;
    let mut rejected_by_error: BTreeMap<ErrorCode, u64> =
        ErrorCode::ALL.iter().map(|code| (*code, 0)).collect();

    for event in events {
        if event.accepted_type().is_some_and(|t| t.is_pick_action()) {
            accepted_pick_actions += 1;
            continue;
        }

        if !event.is(crate::core::EventType::StepRejected) {
            continue;
        }

        total_rejected += 1;
        if event.rejected_type().is_some_and(|t| t.is_pick_action()) {
            rejected_pick_actions += 1;
        }
        if let Some(code) = event.error_code() {
            *rejected_by_error.entry(code).or_insert(0) += 1;
            if code.is_critical_sequence() {
                critical_sequence_violations += 1;
            }
        }
    }

    let attempts = accepted_pick_actions + rejected_pick_actions;
    let pick_accuracy = if attempts > 0 {
        accepted_pick_actions as f64 / attempts as f64
    } else {
        0.0
    };

    let mut reasons = Vec::new();
    if pick_accuracy < config.accuracy_target {
        reasons.push(FailureReason::AccuracyBelowTarget);
    }
    if critical_sequence_violations > u64::from(config.max_critical_sequence_violations) {
        reasons.push(FailureReason::CriticalSequenceViolations);
    }
    reasons.sort();
    reasons.dedup();

    ProficiencyScore {
        pick_accuracy,
        total_rejected,
        critical_sequence_violations,
        rejected_by_error,
        passed: reasons.is_empty(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{Machine, Transition};
    use crate::pick::{PickConfig, PickMachine, PickState, PickStatus};
    use crate::testing::ActionFactory;

    fn replay(start: PickStatus, actions: Vec<Event>) -> Vec<Event> {
        let mut state = PickState::at(start);
        let mut log = Vec::new();
        for action in actions {
            let Transition { state: next, emitted, .. } =
                PickMachine.reduce(&state, &action, &PickConfig::default());
            state = next;
            log.extend(emitted);
        }
        log
    }

    #[test]
    fn test_no_pick_attempts_scores_zero() {
        let mut f = ActionFactory::new();
        let log = replay(PickStatus::Idle, vec![f.login(), f.menu("1")]);
        let score = score_session(&log, &ScoringConfig::default());
        assert_eq!(score.pick_accuracy, 0.0);
        assert!(!score.passed);
        assert_eq!(score.reasons, vec![FailureReason::AccuracyBelowTarget]);
    }

    #[test]
    fn test_clean_pick_passes() {
        let mut f = ActionFactory::new();
        let log = replay(
            PickStatus::AtLocation,
            vec![f.scan_item("ITEM-1"), f.quantity(1), f.tote_verify("TOTE-1")],
        );
        let score = score_session(&log, &ScoringConfig::default());
        assert_eq!(score.pick_accuracy, 1.0);
        assert_eq!(score.total_rejected, 0);
        assert!(score.passed);
        assert!(score.reasons.is_empty());
    }

    #[test]
    fn test_sequence_violation_fails_both_ways() {
        let mut f = ActionFactory::new();
        let log = replay(
            PickStatus::AtLocation,
            vec![f.scan_item("ITEM-1"), f.quantity(1), f.quantity(1)],
        );
        let score = score_session(&log, &ScoringConfig::default());
        assert!((score.pick_accuracy - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(score.critical_sequence_violations, 1);
        assert_eq!(score.rejected_by_error[&ErrorCode::SequenceQtyMissing], 1);
        assert_eq!(
            score.reasons,
            vec![
                FailureReason::AccuracyBelowTarget,
                FailureReason::CriticalSequenceViolations
            ]
        );
    }

    #[test]
    fn test_non_pick_rejection_counts_but_keeps_accuracy() {
        let mut f = ActionFactory::new();
        let log = replay(
            PickStatus::AtLocation,
            vec![f.scan_item("ITEM-1"), f.ctrl_a(), f.quantity(1), f.tote_verify("TOTE-1")],
        );
        let score = score_session(&log, &ScoringConfig::default());
        assert_eq!(score.pick_accuracy, 1.0);
        assert_eq!(score.total_rejected, 1);
        assert_eq!(score.critical_sequence_violations, 1);
        assert_eq!(score.reasons, vec![FailureReason::CriticalSequenceViolations]);

        let lenient = ScoringConfig {
            max_critical_sequence_violations: 1,
            ..ScoringConfig::default()
        };
        assert!(score_session(&log, &lenient).passed);
    }

    #[test]
    fn test_reason_serialization() {
        let json = serde_json::to_value(FailureReason::CriticalSequenceViolations).unwrap();
        assert_eq!(json, "CRITICAL_SEQUENCE_VIOLATIONS");
    }
}
