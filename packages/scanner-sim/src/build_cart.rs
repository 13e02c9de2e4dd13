//! Cart setup workflow.
//!
//! ```text
//! IDLE ─login─► LOGGED_IN ─menu 1─► PROGRAM_SELECTED ─menu 2─► PHASE_SELECTED
//!   ─ctrl+T─► TASK_GROUP_MODE ─zone─► ZONE_SELECTED ─menu 1─► MAKE_TOTE_CART_SELECTED
//!   ─cart label─► CART_SCANNED ─tote×N─► READY_TO_START ─ctrl+E─► STARTED
//! ```
//!
//! Anything off the path is rejected with `ERR_SEQUENCE_SETUP_INCOMPLETE`
//! unless a more specific rule fires first.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::core::{Event, EventType, Payload};
use crate::error::ErrorCode;
use crate::machine::{Machine, Signal, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildCartStatus {
    #[serde(rename = "BC_IDLE")]
    Idle,
    #[serde(rename = "BC_LOGGED_IN")]
    LoggedIn,
    #[serde(rename = "BC_PROGRAM_SELECTED")]
    ProgramSelected,
    #[serde(rename = "BC_PHASE_SELECTED")]
    PhaseSelected,
    #[serde(rename = "BC_TASK_GROUP_MODE")]
    TaskGroupMode,
    #[serde(rename = "BC_ZONE_SELECTED")]
    ZoneSelected,
    #[serde(rename = "BC_MAKE_TOTE_CART_SELECTED")]
    MakeToteCartSelected,
    #[serde(rename = "BC_CART_SCANNED")]
    CartScanned,
    #[serde(rename = "BC_TOTES_ASSIGNING")]
    TotesAssigning,
    #[serde(rename = "BC_READY_TO_START")]
    ReadyToStart,
    #[serde(rename = "BC_STARTED")]
    Started,
}

impl BuildCartStatus {
    pub const ALL: [BuildCartStatus; 11] = [
        BuildCartStatus::Idle,
        BuildCartStatus::LoggedIn,
        BuildCartStatus::ProgramSelected,
        BuildCartStatus::PhaseSelected,
        BuildCartStatus::TaskGroupMode,
        BuildCartStatus::ZoneSelected,
        BuildCartStatus::MakeToteCartSelected,
        BuildCartStatus::CartScanned,
        BuildCartStatus::TotesAssigning,
        BuildCartStatus::ReadyToStart,
        BuildCartStatus::Started,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildCartStatus::Idle => "BC_IDLE",
            BuildCartStatus::LoggedIn => "BC_LOGGED_IN",
            BuildCartStatus::ProgramSelected => "BC_PROGRAM_SELECTED",
            BuildCartStatus::PhaseSelected => "BC_PHASE_SELECTED",
            BuildCartStatus::TaskGroupMode => "BC_TASK_GROUP_MODE",
            BuildCartStatus::ZoneSelected => "BC_ZONE_SELECTED",
            BuildCartStatus::MakeToteCartSelected => "BC_MAKE_TOTE_CART_SELECTED",
            BuildCartStatus::CartScanned => "BC_CART_SCANNED",
            BuildCartStatus::TotesAssigning => "BC_TOTES_ASSIGNING",
            BuildCartStatus::ReadyToStart => "BC_READY_TO_START",
            BuildCartStatus::Started => "BC_STARTED",
        }
    }

    /// Tote assignment is legal from these statuses regardless of the main
    /// transition table.
    fn accepts_totes(&self) -> bool {
        matches!(self, BuildCartStatus::CartScanned | BuildCartStatus::TotesAssigning)
    }
}

impl fmt::Display for BuildCartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cart setup progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCartState {
    status: BuildCartStatus,
    assigned_totes: Vec<String>,
}

impl Default for BuildCartState {
    fn default() -> Self {
        Self::at(BuildCartStatus::Idle)
    }
}

impl BuildCartState {
    /// A state at `status` with no totes assigned.
    pub fn at(status: BuildCartStatus) -> Self {
        Self {
            status,
            assigned_totes: Vec::new(),
        }
    }

    pub fn status(&self) -> BuildCartStatus {
        self.status
    }

    /// Tote barcodes in assignment order. Never contains a duplicate.
    pub fn assigned_totes(&self) -> &[String] {
        &self.assigned_totes
    }

    fn with_status(&self, status: BuildCartStatus) -> Self {
        Self {
            status,
            assigned_totes: self.assigned_totes.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCartConfig {
    pub required_tote_count: NonZeroU32,
}

impl BuildCartConfig {
    pub fn new(required_tote_count: NonZeroU32) -> Self {
        Self { required_tote_count }
    }
}

/// Reducer for cart setup.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildCartMachine;

impl BuildCartMachine {
    fn assign_tote(
        &self,
        state: &BuildCartState,
        action: &Event,
        config: &BuildCartConfig,
    ) -> Transition<BuildCartState> {
        if !state.status.accepts_totes() {
            return Transition::reject(
                state.clone(),
                action,
                ErrorCode::SequenceSetupIncomplete,
                None,
            );
        }

        let barcode = action.payload().get_str("barcode").unwrap_or_default();
        if state.assigned_totes.iter().any(|t| t == barcode) {
            return Transition::reject(
                state.clone(),
                action,
                ErrorCode::ToteDuplicateInSetup,
                Some(Payload::new().with("barcode", barcode)),
            );
        }

        let mut assigned_totes = state.assigned_totes.clone();
        assigned_totes.push(barcode.to_string());

        let status = if assigned_totes.len() as u64 >= u64::from(config.required_tote_count.get()) {
            BuildCartStatus::ReadyToStart
        } else {
            BuildCartStatus::TotesAssigning
        };

        Transition::accept(
            BuildCartState {
                status,
                assigned_totes,
            },
            action,
        )
    }
}

fn menu_value(action: &Event) -> Option<&str> {
    if action.is(EventType::RfMenuSelect) {
        action.payload().get_str("value")
    } else {
        None
    }
}

impl Machine for BuildCartMachine {
    type State = BuildCartState;
    type Config = BuildCartConfig;

    const NAME: &'static str = "build_cart";

    fn reduce(
        &self,
        state: &BuildCartState,
        action: &Event,
        config: &BuildCartConfig,
    ) -> Transition<BuildCartState> {
        use BuildCartStatus::*;

        let event_type = action.event_type();

        if event_type == EventType::RfKeyCtrlE && state.status != ReadyToStart {
            return Transition::reject(
                state.clone(),
                action,
                ErrorCode::SequenceCtrlETooEarly,
                None,
            );
        }

        if event_type == EventType::ScanToteAssign {
            return self.assign_tote(state, action, config);
        }

        let next = match state.status {
            Idle => (event_type == EventType::RfLogin).then_some(LoggedIn),
            LoggedIn => (menu_value(action) == Some("1")).then_some(ProgramSelected),
            ProgramSelected => (menu_value(action) == Some("2")).then_some(PhaseSelected),
            PhaseSelected => (event_type == EventType::RfKeyCtrlT).then_some(TaskGroupMode),
            TaskGroupMode => match event_type {
                EventType::RfTaskGroupSet => Some(TaskGroupMode),
                EventType::RfZoneSelected => Some(ZoneSelected),
                _ => None,
            },
            ZoneSelected => (menu_value(action) == Some("1")).then_some(MakeToteCartSelected),
            MakeToteCartSelected => (event_type == EventType::ScanCartLabel).then_some(CartScanned),
            CartScanned | TotesAssigning => None,
            ReadyToStart => (event_type == EventType::RfKeyCtrlE).then_some(Started),
            Started => None,
        };

        match next {
            Some(Started) => {
                Transition::accept(state.with_status(Started), action)
                    .with_signal(Signal::StartPicking)
            }
            Some(status) => Transition::accept(state.with_status(status), action),
            None => Transition::reject(
                state.clone(),
                action,
                ErrorCode::SequenceSetupIncomplete,
                None,
            ),
        }
    }
}
