//! Session router: the single mutator of [`SessionState`].
//!
//! ```text
//! action ──► validate ──► BuildCartMachine ──┐          (mode = buildCart)
//!                    └──► PickMachine ───────┤          (mode = pick)
//!                                            ▼
//!                               validate emitted batch
//!                                            │
//!                  mode switch / cursor ◄────┤
//!                                            ▼
//!                              append to log, refold metrics
//! ```
//!
//! Submission must be strictly sequential. The router performs no
//! synchronization of its own.

use tracing::{debug, error, info, warn};

use crate::build_cart::{BuildCartMachine, BuildCartStatus};
use crate::contract::EventContract;
use crate::core::Event;
use crate::error::EngineError;
use crate::machine::{Machine, Outcome, Signal, Transition};
use crate::metrics::compute_metrics;
use crate::pick::{PickMachine, PickStatus};
use crate::session::{active_pick_task, SessionMode, SessionState};

/// Apply one action using the process-wide [`EventContract`].
///
/// # Errors
///
/// Every error is fatal for the session. See [`apply_action_with`].
pub fn apply_action(session: SessionState, action: &Event) -> Result<SessionState, EngineError> {
    let contract = EventContract::shared()?;
    apply_action_with(contract, session, action)
}

/// Apply one action against an explicit contract.
///
/// # Errors
///
/// - [`EngineError::InvalidAction`] if `action` fails schema validation
/// - [`EngineError::InvalidEmittedEvent`] if a machine emitted an invalid
///   event; the session is not advanced
pub fn apply_action_with(
    contract: &EventContract,
    mut session: SessionState,
    action: &Event,
) -> Result<SessionState, EngineError> {
    if let Err(errors) = contract.validate_event(action) {
        error!(
            event_id = %action.id(),
            event_type = %action.event_type(),
            %errors,
            "action rejected by contract"
        );
        return Err(EngineError::InvalidAction {
            event_id: action.id().to_string(),
            event_type: action.event_type(),
            errors,
        });
    }

    let emitted = match session.mode {
        SessionMode::BuildCart => {
            let transition = BuildCartMachine.reduce(
                &session.build_cart.state,
                action,
                &session.build_cart.config,
            );
            ensure_valid(contract, &transition)?;
            log_outcome(
                BuildCartMachine::NAME,
                transition.state.status().as_str(),
                action,
                &transition,
            );

            let started = transition.signal == Some(Signal::StartPicking)
                && transition.state.status() == BuildCartStatus::Started;
            session.build_cart.state = transition.state;

            if started {
                session.mode = SessionMode::Pick;
                session.pick.active_pick_task_id = session
                    .scenario
                    .task(session.pick.cursor)
                    .map(|task| task.pick_task_id.clone());
                session.pick.end_of_tote_pending = false;
                info!(
                    session_id = %session.ids.session_id,
                    active_pick_task_id = ?session.pick.active_pick_task_id,
                    "cart setup complete, switching to pick mode"
                );
            }
            transition.emitted
        }
        SessionMode::Pick => {
            let transition = PickMachine.reduce(&session.pick.state, action, &session.pick.config);
            ensure_valid(contract, &transition)?;
            log_outcome(PickMachine::NAME, transition.state.status().as_str(), action, &transition);

            let status = transition.state.status();
            if transition.signal == Some(Signal::AdvanceCursor)
                && status == PickStatus::ToteVerified
            {
                let cursor = (session.pick.cursor + 1).min(session.scenario.pick_tasks.len());
                debug!(from = session.pick.cursor, to = cursor, "advancing pick cursor");
                session.pick.cursor = cursor;
            }

            session.pick.state = transition.state;
            session.pick.active_pick_task_id = session
                .scenario
                .task(session.pick.cursor)
                .map(|task| task.pick_task_id.clone());
            session.pick.end_of_tote_pending = status == PickStatus::EndOfTotePending;
            transition.emitted
        }
    };

    let was_picking = session.mode == SessionMode::Pick;
    session.event_log.extend(emitted);
    session.metrics = compute_metrics(&session.event_log);

    // Second derivation pass: reconcile the stored id with the accessor.
    if was_picking {
        let derived = active_pick_task(&session).map(|task| task.pick_task_id.clone());
        if session.pick.active_pick_task_id != derived {
            warn!(
                stored = ?session.pick.active_pick_task_id,
                derived = ?derived,
                "active pick task re-derived"
            );
            session.pick.active_pick_task_id = derived;
        }
    }

    Ok(session)
}

fn ensure_valid<S>(
    contract: &EventContract,
    transition: &Transition<S>,
) -> Result<(), EngineError> {
    let failures = match contract.validate_batch(&transition.emitted) {
        Ok(()) => return Ok(()),
        Err(failures) => failures,
    };

    for (index, errors) in &failures {
        error!(index, %errors, "machine emitted an invalid event");
    }

    match failures.into_iter().next() {
        Some((index, errors)) => {
            let event = &transition.emitted[index];
            Err(EngineError::InvalidEmittedEvent {
                event_id: event.id().to_string(),
                event_type: event.event_type(),
                errors,
            })
        }
        None => Ok(()),
    }
}

fn log_outcome<S>(machine: &'static str, status: &str, action: &Event, transition: &Transition<S>) {
    match transition.outcome {
        Outcome::Rejected(code) => debug!(
            machine,
            status,
            event_id = %action.id(),
            event_type = %action.event_type(),
            error_code = %code,
            "action rejected"
        ),
        Outcome::Accepted | Outcome::Observed => debug!(
            machine,
            status,
            event_id = %action.id(),
            event_type = %action.event_type(),
            "action accepted"
        ),
    }
}
