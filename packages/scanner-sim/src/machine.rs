//! Machine trait and transition outcomes.
//!
//! Machines are pure reducers that interpret one action against the current
//! state and decide what happens next.
//!
//! # Key Properties
//!
//! - **Pure decisions**: `(state, action, config) -> Transition`. No IO, no
//!   clock, no randomness, nothing hidden in `self`
//! - **Rejection is an outcome**: a wrong step produces a `Transition` with
//!   [`Outcome::Rejected`], never an `Err`
//! - **Explicit signals**: orchestration-relevant facts (start picking,
//!   advance the cursor) are returned as [`Signal`]s instead of being
//!   inferred from emitted payloads

use crate::core::{Event, EventType, Payload};
use crate::error::ErrorCode;

/// A pure state machine over session actions.
///
/// # Example
///
/// ```ignore
/// struct DoorMachine;
///
/// impl Machine for DoorMachine {
///     type State = DoorStatus;
///     type Config = ();
///     const NAME: &'static str = "door";
///
///     fn reduce(&self, state: &DoorStatus, action: &Event, _: &()) -> Transition<DoorStatus> {
///         match (state, action.event_type()) {
///             (DoorStatus::Closed, EventType::RfLogin) => {
///                 Transition::accept(DoorStatus::Open, action)
///             }
///             _ => Transition::reject(*state, action, ErrorCode::SequenceSetupIncomplete, None),
///         }
///     }
/// }
/// ```
pub trait Machine {
    type State: Clone + std::fmt::Debug + PartialEq;
    type Config;

    /// Human-readable name for logs.
    const NAME: &'static str;

    /// Process an action and return the next state plus everything emitted.
    ///
    /// # Guarantees
    ///
    /// - Deterministic: the same inputs always yield an equal `Transition`
    /// - The action itself is always the first emitted event
    fn reduce(
        &self,
        state: &Self::State,
        action: &Event,
        config: &Self::Config,
    ) -> Transition<Self::State>;
}

/// What a machine made of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Rejected(ErrorCode),
    /// Recorded without an acceptance echo (stable-state reports).
    Observed,
}

/// Orchestration signal returned alongside a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Cart setup finished; the session should switch to picking.
    StartPicking,
    /// The current pick task was completed; move to the next one.
    AdvanceCursor,
}

/// Result of a single reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    pub state: S,
    pub emitted: Vec<Event>,
    pub outcome: Outcome,
    pub signal: Option<Signal>,
}

impl<S> Transition<S> {
    /// Accept the action: emit `[action, STEP_ACCEPTED{acceptedType}]`.
    pub fn accept(state: S, action: &Event) -> Self {
        Self {
            state,
            emitted: vec![action.clone(), accepted(action, Payload::new())],
            outcome: Outcome::Accepted,
            signal: None,
        }
    }

    /// Reject the action: emit `[action, STEP_REJECTED, ERROR]`.
    pub fn reject(state: S, action: &Event, code: ErrorCode, details: Option<Payload>) -> Self {
        let [rejected, error] = rejection(action, code, details);
        Self {
            state,
            emitted: vec![action.clone(), rejected, error],
            outcome: Outcome::Rejected(code),
            signal: None,
        }
    }

    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn is_accepted(&self) -> bool {
        self.outcome == Outcome::Accepted
    }

    pub fn rejection_code(&self) -> Option<ErrorCode> {
        match self.outcome {
            Outcome::Rejected(code) => Some(code),
            _ => None,
        }
    }
}

/// `STEP_ACCEPTED` echo. `extra` fields are merged after `acceptedType`.
pub(crate) fn accepted(action: &Event, extra: Payload) -> Event {
    let mut payload = Payload::new().with("acceptedType", action.event_type().as_str());
    for (key, value) in extra.into_iter() {
        payload = payload.with(key, value);
    }
    action.derive("accepted", EventType::StepAccepted, payload)
}

/// `ERROR` event carrying an error code and optional details.
pub(crate) fn error_event(action: &Event, code: ErrorCode, details: Option<Payload>) -> Event {
    let mut payload = Payload::new().with("errorCode", code.as_str());
    if let Some(details) = details {
        payload = payload.with("details", details);
    }
    action.derive("error", EventType::Error, payload)
}

/// `STEP_REJECTED` + `ERROR` pair for a rejected action.
pub(crate) fn rejection(action: &Event, code: ErrorCode, details: Option<Payload>) -> [Event; 2] {
    let rejected = action.derive(
        "rejected",
        EventType::StepRejected,
        Payload::new()
            .with("errorCode", code.as_str())
            .with("rejectedType", action.event_type().as_str()),
    );
    [rejected, error_event(action, code, details)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SessionIds;

    fn action(event_type: EventType) -> Event {
        Event::new(
            "a1",
            "2026-01-01T00:00:00Z".parse().unwrap(),
            event_type,
            &SessionIds::new("t1", "s1"),
            Payload::new().with("barcode", "TOTE-1"),
        )
    }

    #[test]
    fn test_accept_emits_action_then_echo() {
        let t = Transition::accept((), &action(EventType::ScanItem));
        assert!(t.is_accepted());
        assert_eq!(t.emitted.len(), 2);
        assert_eq!(t.emitted[0].id(), "a1");
        assert_eq!(t.emitted[1].id(), "a1:accepted");
        assert_eq!(t.emitted[1].accepted_type(), Some(EventType::ScanItem));
        assert_eq!(t.signal, None);
    }

    #[test]
    fn test_reject_emits_pair_with_details() {
        let t = Transition::reject(
            (),
            &action(EventType::ScanToteAssign),
            ErrorCode::ToteDuplicateInSetup,
            Some(Payload::new().with("barcode", "TOTE-1")),
        );
        assert_eq!(t.rejection_code(), Some(ErrorCode::ToteDuplicateInSetup));

        let ids: Vec<_> = t.emitted.iter().map(Event::id).collect();
        assert_eq!(ids, vec!["a1", "a1:rejected", "a1:error"]);

        let rejected = &t.emitted[1];
        assert_eq!(rejected.rejected_type(), Some(EventType::ScanToteAssign));
        assert_eq!(rejected.error_code(), Some(ErrorCode::ToteDuplicateInSetup));

        let error = &t.emitted[2];
        assert_eq!(error.error_code(), Some(ErrorCode::ToteDuplicateInSetup));
        assert_eq!(error.payload().get("details").unwrap()["barcode"], "TOTE-1");
    }

    #[test]
    fn test_error_without_details_omits_field() {
        let [_, error] = rejection(
            &action(EventType::RfKeyCtrlE),
            ErrorCode::SequenceCtrlETooEarly,
            None,
        );
        assert!(error.payload().get("details").is_none());
    }
}
