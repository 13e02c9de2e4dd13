//! Session metrics folded from the event log.
//!
//! The router recomputes metrics from the whole log after every action. That
//! is linear in the log length per action, which is fine for
//! scenario-bounded sessions; unbounded logs would need windowed or
//! incremental aggregation via [`DerivedMetrics::record`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::{Event, EventType};
use crate::error::ErrorCode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    /// Every event in the log, synthetic echoes included.
    pub total_events: u64,
    /// Raw inputs only. Accept/reject/error echoes are not actions.
    pub total_actions: u64,
    pub total_accepted: u64,
    pub total_rejected: u64,
    /// Rejections per code. Every canonical code is present, zero or not.
    pub rejected_by_error: BTreeMap<ErrorCode, u64>,
}

impl Default for DerivedMetrics {
    fn default() -> Self {
        Self {
            total_events: 0,
            total_actions: 0,
            total_accepted: 0,
            total_rejected: 0,
            rejected_by_error: ErrorCode::ALL.iter().map(|code| (*code, 0)).collect(),
        }
    }
}

impl DerivedMetrics {
    /// Fold one more event into the totals.
    pub fn record(&mut self, event: &Event) {
        self.total_events += 1;
        match event.event_type() {
            EventType::StepAccepted => self.total_accepted += 1,
            EventType::StepRejected => {
                self.total_rejected += 1;
                if let Some(code) = event.error_code() {
                    *self.rejected_by_error.entry(code).or_insert(0) += 1;
                }
            }
            // Already represented by the paired rejection.
            EventType::Error => {}
            _ => self.total_actions += 1,
        }
    }

    pub fn rejections(&self, code: ErrorCode) -> u64 {
        self.rejected_by_error.get(&code).copied().unwrap_or(0)
    }
}

/// Full fold over `events`.
pub fn compute_metrics<'a>(events: impl IntoIterator<Item = &'a Event>) -> DerivedMetrics {
    events
        .into_iter()
        .fold(DerivedMetrics::default(), |mut metrics, event| {
            metrics.record(event);
            metrics
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_cart::{BuildCartConfig, BuildCartMachine, BuildCartState};
    use crate::machine::Machine;
    use crate::testing::ActionFactory;
    use std::num::NonZeroU32;

    #[test]
    fn test_empty_log_has_seeded_histogram() {
        let metrics = compute_metrics(&Vec::<Event>::new());
        assert_eq!(metrics.total_actions, 0);
        assert_eq!(metrics.rejected_by_error.len(), ErrorCode::ALL.len());
        assert!(metrics.rejected_by_error.values().all(|n| *n == 0));
    }

    #[test]
    fn test_counts_actions_not_echoes() {
        let mut f = ActionFactory::new();
        let config = BuildCartConfig::new(NonZeroU32::MIN);
        let mut state = BuildCartState::default();
        let mut log = Vec::new();

        for action in [f.login(), f.ctrl_e(), f.menu("1")] {
            let t = BuildCartMachine.reduce(&state, &action, &config);
            state = t.state;
            log.extend(t.emitted);
        }

        let metrics = compute_metrics(&log);
        assert_eq!(metrics.total_actions, 3);
        assert_eq!(metrics.total_accepted, 2);
        assert_eq!(metrics.total_rejected, 1);
        assert_eq!(metrics.total_events, log.len() as u64);
        assert_eq!(metrics.rejections(ErrorCode::SequenceCtrlETooEarly), 1);
    }
}
