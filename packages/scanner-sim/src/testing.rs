//! Testing utilities for scanner machines and sessions.
//!
//! This module provides ergonomic helpers for testing the reducers,
//! including a macro for concise outcome tables, a fluent builder for
//! longer workflows, and a factory for schema-valid actions.
//!
//! # Feature Flag
//!
//! This module is only available with the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! scanner-sim = { workspace = true, features = ["testing"] }
//! ```
//!
//! # Quick Start
//!
//! ## Using `assert_workflow!` Macro
//!
//! ```ignore
//! use scanner_sim::testing::{assert_workflow, ActionFactory};
//!
//! let mut f = ActionFactory::new();
//!
//! let state = assert_workflow!(
//!     PickMachine, PickConfig::default(), PickState::default();
//!     f.login() => Outcome::Accepted,
//!     f.quantity(1) => Outcome::Rejected(ErrorCode::SequenceQtyBeforeItem),
//! );
//! ```
//!
//! ## Using Fluent Builder
//!
//! ```ignore
//! use scanner_sim::testing::{ActionFactory, WorkflowTest};
//!
//! let mut f = ActionFactory::new();
//!
//! WorkflowTest::new(BuildCartMachine, config)
//!     .given(f.login())
//!     .expect_accepted()
//!     .then(f.ctrl_e())
//!     .expect_rejected(ErrorCode::SequenceCtrlETooEarly)
//!     .assert_state(|s| s.status() == BuildCartStatus::LoggedIn);
//! ```

use std::num::NonZeroU32;

use chrono::{DateTime, Duration, Utc};

use crate::core::{Event, EventType, Payload, SessionIds};
use crate::error::ErrorCode;
use crate::machine::{Machine, Outcome, Signal, Transition};
use crate::scenario::{BuildCartSetup, PickTask, Scenario, ScenarioMode};

/// Asserts a sequence of action → outcome transitions for a machine and
/// evaluates to the final state.
///
/// # Syntax
///
/// ```ignore
/// let final_state = assert_workflow!(
///     machine, config, initial_state;
///     action1 => expected_outcome1,
///     action2 => expected_outcome2,
/// );
/// ```
///
/// # Panics
///
/// Panics if any transition doesn't produce the expected outcome.
#[macro_export]
macro_rules! assert_workflow {
    ($machine:expr, $config:expr, $state:expr; $($action:expr => $expected:expr),+ $(,)?) => {{
        let mut state = $state;
        $(
            let action = $action;
            let transition = $crate::Machine::reduce(&$machine, &state, &action, &$config);
            assert_eq!(
                transition.outcome, $expected,
                "Unexpected outcome for {}\n  from state: {:?}",
                action.event_type(), state
            );
            state = transition.state;
        )+
        state
    }};
}

pub use assert_workflow;

// =============================================================================
// Workflow Test
// =============================================================================

/// Fluent test builder for machine workflows.
///
/// Threads the state through every `given`/`then` call so assertions always
/// see the result of the most recent action.
pub struct WorkflowTest<M>
where
    M: Machine,
{
    machine: M,
    config: M::Config,
    state: M::State,
    last: Option<Transition<M::State>>,
}

impl<M> WorkflowTest<M>
where
    M: Machine,
    M::State: Default,
{
    /// Create a new workflow test starting from the default state.
    pub fn new(machine: M, config: M::Config) -> Self {
        Self::from_state(machine, config, M::State::default())
    }
}

impl<M> WorkflowTest<M>
where
    M: Machine,
{
    /// Create a workflow test starting from an explicit state.
    pub fn from_state(machine: M, config: M::Config, state: M::State) -> Self {
        Self {
            machine,
            config,
            state,
            last: None,
        }
    }

    /// Reduce the first action.
    pub fn given(self, action: Event) -> Self {
        self.then(action)
    }

    /// Reduce a subsequent action.
    pub fn then(mut self, action: Event) -> Self {
        let transition = self.machine.reduce(&self.state, &action, &self.config);
        self.state = transition.state.clone();
        self.last = Some(transition);
        self
    }

    fn last_outcome(&self) -> Outcome {
        match &self.last {
            Some(transition) => transition.outcome,
            None => panic!("No action reduced yet; call given() first"),
        }
    }

    /// Assert the last action was accepted.
    pub fn expect_accepted(self) -> Self {
        let outcome = self.last_outcome();
        assert_eq!(outcome, Outcome::Accepted, "Expected acceptance");
        self
    }

    /// Assert the last action was rejected with `code`.
    pub fn expect_rejected(self, code: ErrorCode) -> Self {
        let outcome = self.last_outcome();
        assert_eq!(outcome, Outcome::Rejected(code), "Expected rejection");
        self
    }

    /// Assert the signal returned by the last action.
    pub fn expect_signal(self, expected: Option<Signal>) -> Self {
        let actual = self.last.as_ref().and_then(|t| t.signal);
        assert_eq!(actual, expected, "Signal mismatch");
        self
    }

    /// Assert the machine state matches a predicate.
    pub fn assert_state<F>(self, predicate: F) -> Self
    where
        F: FnOnce(&M::State) -> bool,
    {
        assert!(predicate(&self.state), "State predicate failed for {:?}", self.state);
        self
    }

    /// Get the current state for custom assertions.
    pub fn state(&self) -> &M::State {
        &self.state
    }

    /// Get the last transition.
    pub fn last_transition(&self) -> Option<&Transition<M::State>> {
        self.last.as_ref()
    }

    /// Consume the test and return the final state.
    pub fn into_state(self) -> M::State {
        self.state
    }
}

// =============================================================================
// Action Factory
// =============================================================================

/// Builds schema-valid actions with sequential ids and timestamps.
///
/// Ids look like `act-0001` and timestamps advance one second per action, so
/// two factories with the same prefix produce identical streams.
pub struct ActionFactory {
    ids: SessionIds,
    prefix: String,
    base: DateTime<Utc>,
    index: u32,
}

impl Default for ActionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionFactory {
    pub fn new() -> Self {
        Self::with_ids(SessionIds::new("trainee-test", "session-test"), "act")
    }

    pub fn with_ids(ids: SessionIds, prefix: impl Into<String>) -> Self {
        let base = DateTime::parse_from_rfc3339("2026-02-18T12:00:00Z")
            .expect("valid base timestamp")
            .with_timezone(&Utc);
        Self {
            ids,
            prefix: prefix.into(),
            base,
            index: 0,
        }
    }

    pub fn ids(&self) -> &SessionIds {
        &self.ids
    }

    /// Build the next action of `event_type` with `payload`.
    pub fn build(&mut self, event_type: EventType, payload: Payload) -> Event {
        self.index += 1;
        Event::new(
            format!("{}-{:04}", self.prefix, self.index),
            self.base + Duration::seconds(i64::from(self.index)),
            event_type,
            &self.ids,
            payload,
        )
    }

    fn bare(&mut self, event_type: EventType) -> Event {
        self.build(event_type, Payload::new())
    }

    fn scan(&mut self, event_type: EventType, barcode: &str) -> Event {
        self.build(event_type, Payload::new().with("barcode", barcode))
    }

    pub fn login(&mut self) -> Event {
        self.bare(EventType::RfLogin)
    }

    pub fn menu(&mut self, value: &str) -> Event {
        self.build(EventType::RfMenuSelect, Payload::new().with("value", value))
    }

    pub fn ctrl_t(&mut self) -> Event {
        self.bare(EventType::RfKeyCtrlT)
    }

    pub fn task_group_set(&mut self) -> Event {
        self.bare(EventType::RfTaskGroupSet)
    }

    pub fn zone(&mut self, code: &str) -> Event {
        self.build(
            EventType::RfZoneSelected,
            Payload::new().with("zoneOrTaskGroupCode", code),
        )
    }

    pub fn cart_label(&mut self, barcode: &str) -> Event {
        self.scan(EventType::ScanCartLabel, barcode)
    }

    pub fn tote_assign(&mut self, barcode: &str, slot_index: u32) -> Event {
        self.build(
            EventType::ScanToteAssign,
            Payload::new()
                .with("barcode", barcode)
                .with("slotIndex", slot_index),
        )
    }

    pub fn ctrl_e(&mut self) -> Event {
        self.bare(EventType::RfKeyCtrlE)
    }

    pub fn pick_assign(&mut self) -> Event {
        self.bare(EventType::PickAssign)
    }

    pub fn arrive(&mut self, location_code: &str) -> Event {
        self.build(
            EventType::ArriveLocation,
            Payload::new().with("locationCode", location_code),
        )
    }

    pub fn scan_item(&mut self, barcode: &str) -> Event {
        self.scan(EventType::ScanItem, barcode)
    }

    pub fn quantity(&mut self, quantity: u32) -> Event {
        self.build(EventType::EnterQuantity, Payload::new().with("quantity", quantity))
    }

    pub fn tote_verify(&mut self, barcode: &str) -> Event {
        self.scan(EventType::ScanToteVerify, barcode)
    }

    pub fn end_of_tote(&mut self) -> Event {
        self.bare(EventType::RfEndOfToteShown)
    }

    pub fn ctrl_a(&mut self) -> Event {
        self.bare(EventType::RfKeyCtrlA)
    }

    pub fn conveyor(&mut self) -> Event {
        self.bare(EventType::TotePlacedOnConveyor)
    }

    pub fn ctrl_w(&mut self) -> Event {
        self.bare(EventType::RfKeyCtrlW)
    }

    pub fn ctrl_k(&mut self) -> Event {
        self.bare(EventType::RfKeyCtrlK)
    }

    /// A `STEP_ACCEPTED` report carrying a stable state, as fed to the
    /// exceptions overlay.
    pub fn stable_state(&mut self, status: &str) -> Event {
        self.build(
            EventType::StepAccepted,
            Payload::new()
                .with("acceptedType", EventType::StepAccepted.as_str())
                .with("stableState", status),
        )
    }

    /// Any event type with a payload that satisfies the contract.
    pub fn any(&mut self, event_type: EventType) -> Event {
        match event_type {
            EventType::RfMenuSelect => self.menu("1"),
            EventType::RfZoneSelected => self.zone("ZONE-01"),
            EventType::ScanCartLabel => self.cart_label("CART-01"),
            EventType::ScanToteAssign => self.tote_assign("TOTE-01", 1),
            EventType::ArriveLocation => self.arrive("LOC-01"),
            EventType::ScanItem => self.scan_item("ITEM-01"),
            EventType::EnterQuantity => self.quantity(1),
            EventType::ScanToteVerify => self.tote_verify("TOTE-01"),
            EventType::StepAccepted => self.build(
                event_type,
                Payload::new().with("acceptedType", EventType::RfLogin.as_str()),
            ),
            EventType::StepRejected => self.build(
                event_type,
                Payload::new()
                    .with("errorCode", ErrorCode::SequenceSetupIncomplete.as_str())
                    .with("rejectedType", EventType::RfLogin.as_str()),
            ),
            EventType::Error => self.build(
                event_type,
                Payload::new().with("errorCode", ErrorCode::SequenceSetupIncomplete.as_str()),
            ),
            _ => self.bare(event_type),
        }
    }

    /// Cart setup from a fresh login through `RF_KEY_CTRL_E`, one assignment
    /// per tote in slot order.
    pub fn cart_setup(&mut self, cart: &str, totes: &[&str]) -> Vec<Event> {
        let mut actions = vec![
            self.login(),
            self.menu("1"),
            self.menu("2"),
            self.ctrl_t(),
            self.zone("ZONE-01"),
            self.menu("1"),
            self.cart_label(cart),
        ];
        for (slot, tote) in totes.iter().enumerate() {
            actions.push(self.tote_assign(tote, slot as u32 + 1));
        }
        actions.push(self.ctrl_e());
        actions
    }

    /// Pick-mode login and phase selection.
    pub fn pick_login(&mut self) -> Vec<Event> {
        vec![self.login(), self.menu("1"), self.menu("2")]
    }

    /// One task from assignment through tote verification.
    pub fn pick_task(&mut self, task: &PickTask, tote: &str) -> Vec<Event> {
        vec![
            self.pick_assign(),
            self.arrive(&task.location_code),
            self.scan_item(&task.item_barcode),
            self.quantity(task.quantity_required),
            self.tote_verify(tote),
        ]
    }
}

// =============================================================================
// Scenarios
// =============================================================================

/// A scenario with `required_totes` totes and one task per id.
///
/// # Panics
///
/// Panics if `required_totes` is zero.
pub fn scenario_with(required_totes: u32, task_ids: &[&str]) -> Scenario {
    let required_tote_count =
        NonZeroU32::new(required_totes).expect("required_totes must be non-zero");
    Scenario {
        version: "v1".to_string(),
        id: "scenario-test".to_string(),
        mode: ScenarioMode::Guided,
        ruleset_version: None,
        seed: None,
        build_cart: BuildCartSetup { required_tote_count },
        pick_tasks: task_ids
            .iter()
            .enumerate()
            .map(|(i, id)| PickTask {
                pick_task_id: id.to_string(),
                location_code: format!("LOC-{:02}", i + 1),
                item_barcode: format!("ITEM-{:02}", i + 1),
                expected_tote_slot: (i as u32 % required_totes) + 1,
                quantity_required: 1,
                notes: None,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::EventContract;
    use crate::pick::{PickConfig, PickMachine, PickState, PickStatus};

    #[test]
    fn test_every_factory_action_is_contract_valid() {
        let contract = EventContract::shared().unwrap();
        let mut f = ActionFactory::new();
        for event_type in EventType::ALL {
            let action = f.any(event_type);
            assert!(contract.validate_event(&action).is_ok(), "{event_type}");
        }
        assert!(contract.validate_event(&f.stable_state("PK_IDLE")).is_ok());
    }

    #[test]
    fn test_ids_and_timestamps_are_sequential() {
        let mut f = ActionFactory::new();
        let a = f.login();
        let b = f.login();
        assert_eq!(a.id(), "act-0001");
        assert_eq!(b.id(), "act-0002");
        assert!(b.timestamp() > a.timestamp());
    }

    #[test]
    fn test_assert_workflow_macro() {
        let mut f = ActionFactory::new();
        let state = assert_workflow!(
            PickMachine, PickConfig::default(), PickState::default();
            f.login() => Outcome::Accepted,
            f.quantity(1) => Outcome::Rejected(ErrorCode::SequenceQtyBeforeItem),
            f.menu("1") => Outcome::Accepted,
        );
        assert_eq!(state.status(), PickStatus::ProgramSelected);
    }

    #[test]
    fn test_scenario_with_is_schema_valid() {
        let scenario = scenario_with(2, &["PT-1", "PT-2", "PT-3"]);
        let value = serde_json::to_value(&scenario).unwrap();
        assert_eq!(Scenario::from_value(value).unwrap(), scenario);
        assert_eq!(scenario.pick_tasks[2].expected_tote_slot, 1);
    }
}
