//! Per-task picking workflow.
//!
//! ```text
//! IDLE ─login─► LOGGED_IN ─menu 1─► PROGRAM_SELECTED ─menu 2─► PHASE_SELECTED
//!   ─assign─► TASK_ACTIVE ─arrive─► AT_LOCATION ─scan item─► ITEM_SCANNED
//!   ─quantity─► QTY_ENTERED ─verify tote─► TOTE_VERIFIED
//!
//! TOTE_VERIFIED ─assign─► TASK_ACTIVE                  (next task)
//! TOTE_VERIFIED ─end of tote─► END_OF_TOTE_PENDING ─ctrl+A─► TOTE_CONFIRMED
//!   ─conveyor─► TOTE_CONVEYED                          (terminal)
//! ```
//!
//! Cross-cutting guards run before the transition table, in priority order:
//!
//! 1. quantity before an item scan → `ERR_SEQUENCE_QTY_BEFORE_ITEM`
//! 2. tote verify before an item scan → `ERR_SEQUENCE_TOTE_BEFORE_ITEM`;
//!    after the scan but before a quantity → `ERR_SEQUENCE_QTY_MISSING`
//! 3. ctrl+A outside end-of-tote pending → `ERR_SEQUENCE_CTRL_A_TOO_EARLY`
//! 4. conveyor placement outside tote confirmed → same code as (3)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Event, EventType};
use crate::error::ErrorCode;
use crate::machine::{Machine, Signal, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickStatus {
    #[serde(rename = "PK_IDLE")]
    Idle,
    #[serde(rename = "PK_LOGGED_IN")]
    LoggedIn,
    #[serde(rename = "PK_PROGRAM_SELECTED")]
    ProgramSelected,
    #[serde(rename = "PK_PHASE_SELECTED")]
    PhaseSelected,
    #[serde(rename = "PK_TASK_ACTIVE")]
    TaskActive,
    #[serde(rename = "PK_AT_LOCATION")]
    AtLocation,
    #[serde(rename = "PK_ITEM_SCANNED")]
    ItemScanned,
    #[serde(rename = "PK_QTY_ENTERED")]
    QtyEntered,
    #[serde(rename = "PK_TOTE_VERIFIED")]
    ToteVerified,
    #[serde(rename = "PK_END_OF_TOTE_PENDING")]
    EndOfTotePending,
    #[serde(rename = "PK_TOTE_CONFIRMED")]
    ToteConfirmed,
    #[serde(rename = "PK_TOTE_CONVEYED")]
    ToteConveyed,
}

impl PickStatus {
    pub const ALL: [PickStatus; 12] = [
        PickStatus::Idle,
        PickStatus::LoggedIn,
        PickStatus::ProgramSelected,
        PickStatus::PhaseSelected,
        PickStatus::TaskActive,
        PickStatus::AtLocation,
        PickStatus::ItemScanned,
        PickStatus::QtyEntered,
        PickStatus::ToteVerified,
        PickStatus::EndOfTotePending,
        PickStatus::ToteConfirmed,
        PickStatus::ToteConveyed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PickStatus::Idle => "PK_IDLE",
            PickStatus::LoggedIn => "PK_LOGGED_IN",
            PickStatus::ProgramSelected => "PK_PROGRAM_SELECTED",
            PickStatus::PhaseSelected => "PK_PHASE_SELECTED",
            PickStatus::TaskActive => "PK_TASK_ACTIVE",
            PickStatus::AtLocation => "PK_AT_LOCATION",
            PickStatus::ItemScanned => "PK_ITEM_SCANNED",
            PickStatus::QtyEntered => "PK_QTY_ENTERED",
            PickStatus::ToteVerified => "PK_TOTE_VERIFIED",
            PickStatus::EndOfTotePending => "PK_END_OF_TOTE_PENDING",
            PickStatus::ToteConfirmed => "PK_TOTE_CONFIRMED",
            PickStatus::ToteConveyed => "PK_TOTE_CONVEYED",
        }
    }

    /// No item has been scanned for the current task yet.
    fn before_item_scan(&self) -> bool {
        matches!(
            self,
            PickStatus::Idle
                | PickStatus::LoggedIn
                | PickStatus::ProgramSelected
                | PickStatus::PhaseSelected
                | PickStatus::TaskActive
                | PickStatus::AtLocation
        )
    }

    /// Code used when an action simply does not fit this status.
    fn mismatch_code(&self) -> ErrorCode {
        match self {
            PickStatus::Idle
            | PickStatus::LoggedIn
            | PickStatus::ProgramSelected
            | PickStatus::PhaseSelected
            | PickStatus::TaskActive
            | PickStatus::AtLocation => ErrorCode::SequenceToteBeforeItem,
            PickStatus::ItemScanned | PickStatus::QtyEntered => ErrorCode::SequenceQtyMissing,
            PickStatus::ToteVerified
            | PickStatus::EndOfTotePending
            | PickStatus::ToteConfirmed
            | PickStatus::ToteConveyed => ErrorCode::SequenceCtrlATooEarly,
        }
    }
}

impl fmt::Display for PickStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress through the task in flight. Carries nothing beyond the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickState {
    status: PickStatus,
}

impl Default for PickState {
    fn default() -> Self {
        Self::at(PickStatus::Idle)
    }
}

impl PickState {
    pub fn at(status: PickStatus) -> Self {
        Self { status }
    }

    pub fn status(&self) -> PickStatus {
        self.status
    }
}

/// The pick workflow has no tunables; the type exists so the router treats
/// both machines uniformly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickConfig {}

#[derive(Debug, Clone, Copy, Default)]
pub struct PickMachine;

impl PickMachine {
    fn guard(&self, status: PickStatus, event_type: EventType) -> Option<ErrorCode> {
        match event_type {
            EventType::EnterQuantity if status.before_item_scan() => {
                Some(ErrorCode::SequenceQtyBeforeItem)
            }
            EventType::ScanToteVerify if status.before_item_scan() => {
                Some(ErrorCode::SequenceToteBeforeItem)
            }
            EventType::ScanToteVerify if status == PickStatus::ItemScanned => {
                Some(ErrorCode::SequenceQtyMissing)
            }
            EventType::RfKeyCtrlA if status != PickStatus::EndOfTotePending => {
                Some(ErrorCode::SequenceCtrlATooEarly)
            }
            // Conveyor placement shares the ctrl+A code; there is no dedicated one.
            EventType::TotePlacedOnConveyor if status != PickStatus::ToteConfirmed => {
                Some(ErrorCode::SequenceCtrlATooEarly)
            }
            _ => None,
        }
    }
}

fn menu_value(action: &Event) -> Option<&str> {
    if action.is(EventType::RfMenuSelect) {
        action.payload().get_str("value")
    } else {
        None
    }
}

impl Machine for PickMachine {
    type State = PickState;
    type Config = PickConfig;

    const NAME: &'static str = "pick";

    fn reduce(
        &self,
        state: &PickState,
        action: &Event,
        _config: &PickConfig,
    ) -> Transition<PickState> {
        use PickStatus::*;

        let event_type = action.event_type();

        if let Some(code) = self.guard(state.status, event_type) {
            return Transition::reject(*state, action, code, None);
        }

        let next = match state.status {
            Idle => (event_type == EventType::RfLogin).then_some(LoggedIn),
            LoggedIn => (menu_value(action) == Some("1")).then_some(ProgramSelected),
            ProgramSelected => (menu_value(action) == Some("2")).then_some(PhaseSelected),
            PhaseSelected => (event_type == EventType::PickAssign).then_some(TaskActive),
            TaskActive => (event_type == EventType::ArriveLocation).then_some(AtLocation),
            AtLocation => (event_type == EventType::ScanItem).then_some(ItemScanned),
            ItemScanned => (event_type == EventType::EnterQuantity).then_some(QtyEntered),
            QtyEntered => (event_type == EventType::ScanToteVerify).then_some(ToteVerified),
            ToteVerified => match event_type {
                EventType::PickAssign => Some(TaskActive),
                EventType::RfEndOfToteShown => Some(EndOfTotePending),
                _ => None,
            },
            EndOfTotePending => (event_type == EventType::RfKeyCtrlA).then_some(ToteConfirmed),
            ToteConfirmed => {
                (event_type == EventType::TotePlacedOnConveyor).then_some(ToteConveyed)
            }
            ToteConveyed => None,
        };

        match next {
            Some(ToteVerified) => {
                Transition::accept(PickState::at(ToteVerified), action)
                    .with_signal(Signal::AdvanceCursor)
            }
            Some(status) => Transition::accept(PickState::at(status), action),
            None => Transition::reject(*state, action, state.status.mismatch_code(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Outcome;
    use crate::testing::{ActionFactory, WorkflowTest};

    fn reduce(status: PickStatus, action: &Event) -> Transition<PickState> {
        PickMachine.reduce(&PickState::at(status), action, &PickConfig::default())
    }

    #[test]
    fn test_happy_path_through_conveyor() {
        let mut f = ActionFactory::new();
        WorkflowTest::new(PickMachine, PickConfig::default())
            .given(f.login())
            .then(f.menu("1"))
            .then(f.menu("2"))
            .then(f.pick_assign())
            .then(f.arrive("LOC-1"))
            .then(f.scan_item("ITEM-1"))
            .then(f.quantity(1))
            .then(f.tote_verify("TOTE-1"))
            .expect_accepted()
            .expect_signal(Some(Signal::AdvanceCursor))
            .then(f.end_of_tote())
            .expect_signal(None)
            .assert_state(|s| s.status() == PickStatus::EndOfTotePending)
            .then(f.ctrl_a())
            .then(f.conveyor())
            .expect_accepted()
            .assert_state(|s| s.status() == PickStatus::ToteConveyed);
    }

    #[test]
    fn test_tote_verified_loops_to_next_task() {
        let mut f = ActionFactory::new();
        let t = reduce(PickStatus::ToteVerified, &f.pick_assign());
        assert!(t.is_accepted());
        assert_eq!(t.state.status(), PickStatus::TaskActive);
    }

    #[test]
    fn test_quantity_before_item() {
        let mut f = ActionFactory::new();
        for status in PickStatus::ALL.iter().filter(|s| s.before_item_scan()) {
            let t = reduce(*status, &f.quantity(1));
            assert_eq!(t.outcome, Outcome::Rejected(ErrorCode::SequenceQtyBeforeItem));
            assert_eq!(t.state.status(), *status);
        }
    }

    #[test]
    fn test_tote_verify_guards() {
        let mut f = ActionFactory::new();
        assert_eq!(
            reduce(PickStatus::AtLocation, &f.tote_verify("TOTE-1")).rejection_code(),
            Some(ErrorCode::SequenceToteBeforeItem)
        );
        assert_eq!(
            reduce(PickStatus::ItemScanned, &f.tote_verify("TOTE-1")).rejection_code(),
            Some(ErrorCode::SequenceQtyMissing)
        );
        assert!(reduce(PickStatus::QtyEntered, &f.tote_verify("TOTE-1")).is_accepted());
    }

    #[test]
    fn test_ctrl_a_and_conveyor_share_code() {
        let mut f = ActionFactory::new();
        for status in PickStatus::ALL {
            let ctrl_a = reduce(status, &f.ctrl_a());
            if status == PickStatus::EndOfTotePending {
                assert!(ctrl_a.is_accepted());
            } else {
                assert_eq!(ctrl_a.rejection_code(), Some(ErrorCode::SequenceCtrlATooEarly));
            }

            let conveyor = reduce(status, &f.conveyor());
            if status == PickStatus::ToteConfirmed {
                assert!(conveyor.is_accepted());
            } else {
                assert_eq!(conveyor.rejection_code(), Some(ErrorCode::SequenceCtrlATooEarly));
            }
        }
    }

    #[test]
    fn test_mismatch_codes_by_phase() {
        let mut f = ActionFactory::new();
        assert_eq!(
            reduce(PickStatus::Idle, &f.scan_item("ITEM-1")).rejection_code(),
            Some(ErrorCode::SequenceToteBeforeItem)
        );
        assert_eq!(
            reduce(PickStatus::QtyEntered, &f.quantity(2)).rejection_code(),
            Some(ErrorCode::SequenceQtyMissing)
        );
        assert_eq!(
            reduce(PickStatus::ToteConveyed, &f.login()).rejection_code(),
            Some(ErrorCode::SequenceCtrlATooEarly)
        );
    }

    #[test]
    fn test_every_status_handles_every_event_type() {
        let mut f = ActionFactory::new();
        for status in PickStatus::ALL {
            for event_type in EventType::ALL {
                let action = f.any(event_type);
                let t = reduce(status, &action);
                assert_eq!(t.emitted[0], action);
                match t.outcome {
                    Outcome::Accepted => {
                        assert_eq!(t.emitted.len(), 2);
                        assert_eq!(
                            t.signal == Some(Signal::AdvanceCursor),
                            t.state.status() == PickStatus::ToteVerified
                        );
                    }
                    Outcome::Rejected(_) => {
                        assert_eq!(t.state.status(), status);
                        assert_eq!(t.signal, None);
                    }
                    Outcome::Observed => panic!("pick never observes"),
                }
            }
        }
    }
}
