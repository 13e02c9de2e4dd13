//! Undo / skip overlay.
//!
//! Runs alongside the workflow machines without touching them:
//!
//! - `RF_KEY_CTRL_W` pops the stable-state stack and reports the state to
//!   resume from. The bottom entry is never popped. Nothing is replayed.
//! - `RF_KEY_CTRL_K` skips ahead in the scenario, raising a short-inventory
//!   exception with its paired `ERR_SHORT_INVENTORY` error.
//! - A `STEP_ACCEPTED` carrying a non-empty `stableState` pushes that state
//!   (unless it is already on top) and is echoed without an acceptance.
//! - Anything else is recorded and accepted.

use serde::Serialize;

use crate::audit::AuditTrail;
use crate::core::{Event, EventType, Payload};
use crate::error::ErrorCode;
use crate::machine::{self, Machine, Outcome, Transition};

/// Error code paired with each exception event type.
pub fn exception_error_code(event_type: EventType) -> Option<ErrorCode> {
    match event_type {
        EventType::ExceptionToteAllocated => Some(ErrorCode::ToteAlreadyAllocated),
        EventType::ExceptionCartAlreadyCreated => Some(ErrorCode::CartAlreadyCreated),
        EventType::ExceptionShortInventory => Some(ErrorCode::ShortInventory),
        EventType::ExceptionDamagedItem => Some(ErrorCode::DamagedItem),
        EventType::ExceptionInvalidItemLast | EventType::ExceptionInvalidItemNotLast => {
            Some(ErrorCode::InvalidItem)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionsState {
    current_stable_state: String,
    stable_history: Vec<String>,
    scenario_pointer: u32,
    history: AuditTrail,
}

impl ExceptionsState {
    /// Start with `initial` as the only (and unpoppable) stable state.
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        Self {
            current_stable_state: initial.clone(),
            stable_history: vec![initial],
            scenario_pointer: 0,
            history: AuditTrail::new(),
        }
    }

    pub fn current_stable_state(&self) -> &str {
        &self.current_stable_state
    }

    /// Stable states, oldest first. Never empty.
    pub fn stable_history(&self) -> &[String] {
        &self.stable_history
    }

    pub fn scenario_pointer(&self) -> u32 {
        self.scenario_pointer
    }

    pub fn history(&self) -> &AuditTrail {
        &self.history
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionsOverlay;

impl ExceptionsOverlay {
    fn undo(&self, state: &ExceptionsState, action: &Event) -> Transition<ExceptionsState> {
        let mut next = state.clone();
        next.history.record(action.clone());
        if next.stable_history.len() > 1 {
            next.stable_history.pop();
        }
        if let Some(top) = next.stable_history.last() {
            next.current_stable_state = top.clone();
        }

        let reverted_to = next.current_stable_state.clone();
        let echo = machine::accepted(
            action,
            Payload::new()
                .with("revertedTo", reverted_to.clone())
                .with("stableState", reverted_to),
        );

        Transition {
            state: next,
            emitted: vec![action.clone(), echo],
            outcome: Outcome::Accepted,
            signal: None,
        }
    }

    fn skip(&self, state: &ExceptionsState, action: &Event) -> Transition<ExceptionsState> {
        let from = state.scenario_pointer;
        let to = from.saturating_add(1);
        let pointers = Payload::new().with("fromPointer", from).with("toPointer", to);

        let exception = action.derive(
            "exception",
            EventType::ExceptionShortInventory,
            pointers.clone(),
        );
        let error = machine::error_event(action, ErrorCode::ShortInventory, Some(pointers));
        let echo = machine::accepted(action, Payload::new().with("scenarioPointer", to));

        let mut next = state.clone();
        next.scenario_pointer = to;
        next.history.record(action.clone());
        next.history.record(exception.clone());

        Transition {
            state: next,
            emitted: vec![action.clone(), exception, error, echo],
            outcome: Outcome::Accepted,
            signal: None,
        }
    }
}

impl Machine for ExceptionsOverlay {
    type State = ExceptionsState;
    type Config = ();

    const NAME: &'static str = "exceptions";

    fn reduce(
        &self,
        state: &ExceptionsState,
        action: &Event,
        _config: &(),
    ) -> Transition<ExceptionsState> {
        match action.event_type() {
            EventType::RfKeyCtrlW => return self.undo(state, action),
            EventType::RfKeyCtrlK => return self.skip(state, action),
            _ => {}
        }

        let mut next = state.clone();
        next.history.record(action.clone());

        let reported = action
            .payload()
            .get_str("stableState")
            .filter(|s| !s.is_empty());

        match reported {
            Some(stable) if action.is(EventType::StepAccepted) => {
                if next.stable_history.last().map(String::as_str) != Some(stable) {
                    next.stable_history.push(stable.to_string());
                }
                next.current_stable_state = stable.to_string();
                Transition {
                    state: next,
                    emitted: vec![action.clone()],
                    outcome: Outcome::Observed,
                    signal: None,
                }
            }
            _ => Transition::accept(next, action),
        }
    }
}
