//! Session aggregate root.
//!
//! A [`SessionState`] owns both machine sub-states, the pick cursor, the
//! event log, and the derived metrics. The [`Scenario`] is shared read-only
//! behind an `Arc`. Only the router mutates a session.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::build_cart::{BuildCartConfig, BuildCartState};
use crate::core::{EventLog, SessionIds};
use crate::metrics::DerivedMetrics;
use crate::pick::{PickConfig, PickState};
use crate::scenario::{PickTask, Scenario};

/// Which workflow the router currently dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionMode {
    BuildCart,
    Pick,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::BuildCart => write!(f, "buildCart"),
            SessionMode::Pick => write!(f, "pick"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCartProgress {
    pub state: BuildCartState,
    pub config: BuildCartConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickProgress {
    pub state: PickState,
    pub config: PickConfig,
    /// Index of the task in flight. Never decreases, never exceeds the task
    /// count.
    pub cursor: usize,
    pub active_pick_task_id: Option<String>,
    pub end_of_tote_pending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub(crate) mode: SessionMode,
    #[serde(skip)]
    pub(crate) scenario: Arc<Scenario>,
    pub(crate) scenario_id: String,
    #[serde(flatten)]
    pub(crate) ids: SessionIds,
    pub(crate) build_cart: BuildCartProgress,
    pub(crate) pick: PickProgress,
    pub(crate) event_log: EventLog,
    pub(crate) metrics: DerivedMetrics,
}

impl SessionState {
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    pub fn ids(&self) -> &SessionIds {
        &self.ids
    }

    pub fn build_cart(&self) -> &BuildCartProgress {
        &self.build_cart
    }

    pub fn pick(&self) -> &PickProgress {
        &self.pick
    }

    pub fn cursor(&self) -> usize {
        self.pick.cursor
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn metrics(&self) -> &DerivedMetrics {
        &self.metrics
    }
}

/// Fresh session in build-cart mode with zeroed metrics.
pub fn create_session(scenario: Arc<Scenario>, ids: SessionIds) -> SessionState {
    SessionState {
        mode: SessionMode::BuildCart,
        scenario_id: scenario.id.clone(),
        ids,
        build_cart: BuildCartProgress {
            state: BuildCartState::default(),
            config: scenario.build_cart_config(),
        },
        pick: PickProgress {
            state: PickState::default(),
            config: PickConfig::default(),
            cursor: 0,
            active_pick_task_id: None,
            end_of_tote_pending: false,
        },
        event_log: EventLog::new(),
        metrics: DerivedMetrics::default(),
        scenario,
    }
}

/// The task at the cursor while picking; `None` during cart setup or once
/// every task is done.
pub fn active_pick_task(session: &SessionState) -> Option<&PickTask> {
    match session.mode {
        SessionMode::Pick => session.scenario.task(session.pick.cursor),
        SessionMode::BuildCart => None,
    }
}
