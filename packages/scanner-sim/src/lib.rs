//! # Scanner Sim
//!
//! A deterministic validator for warehouse RF-scanner training sessions.
//! A trainee's actions are replayed through pure state machines that accept
//! or reject each step, and the resulting event log is scored for
//! certification.
//!
//! ## Core Concepts
//!
//! - [`Event`] = Facts (an action, or the engine's reaction to one)
//! - [`Machine`] = Pure decisions over one workflow (cart setup, picking)
//! - [`SessionState`] = The aggregate a session's actions are folded into
//!
//! A wrong step is **data**, not an error: it is recorded as a
//! `STEP_REJECTED` + `ERROR` pair in the log. Rust errors are reserved for
//! broken contracts and engine defects.
//!
//! ## Architecture
//!
//! ```text
//! Scenario (JSON) ──► load_scenario_from_file ──► Arc<Scenario>
//!                                                      │
//! actions ──► apply_action ─► EventContract::validate_event
//!                 │
//!                 ├─► BuildCartMachine.reduce() ── StartPicking ──┐
//!                 │                                               ▼
//!                 └─► PickMachine.reduce() ─────── AdvanceCursor ─► cursor
//!                                  │
//!                                  ▼
//!                 EventContract::validate_batch (emitted)
//!                                  │
//!                                  ▼
//!                      EventLog ──► DerivedMetrics
//!                                  │
//!                                  ▼ (session end)
//!             score_session ──► update_certification_progress
//! ```
//!
//! The [`ExceptionsOverlay`] (undo / skip) is a standalone reducer over the
//! same event vocabulary and is not wired into the router.
//!
//! ## Key Invariants
//!
//! 1. **Machines are pure** - Same state, action and config yield an equal transition
//! 2. **The action comes first** - Every emitted batch starts with the action verbatim
//! 3. **The log only grows** - Nothing is removed or rewritten
//! 4. **The cursor only moves forward** - Bounded by the number of pick tasks
//! 5. **Every emitted event satisfies the contract** - Otherwise the call fails
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use scanner_sim::{
//!     apply_action, create_session, load_scenario_from_file, score_session, ScoringConfig,
//!     SessionIds,
//! };
//!
//! let scenario = Arc::new(load_scenario_from_file("scenario.json")?);
//! let mut session = create_session(scenario, SessionIds::new("trainee-1", "session-1"));
//!
//! for action in actions {
//!     session = apply_action(session, &action)?;
//! }
//!
//! let score = score_session(session.event_log(), &ScoringConfig::default());
//! ```

// Core modules
mod build_cart;
mod certification;
mod config;
mod contract;
mod core;
mod error;
mod exceptions;
mod machine;
mod metrics;
mod pick;
mod router;
mod scenario;
mod scoring;
mod session;

// Audit trail used by the exceptions overlay
pub mod audit;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;


// Re-export core types
pub use crate::core::{Correlation, Event, EventLog, EventRole, EventType, Payload, SessionIds};

// Re-export error types
pub use crate::error::{
    ConfigError, ContractError, EngineError, ErrorCategory, ErrorCode, ScenarioError,
    UnknownIdentifier, ValidationErrors,
};

// Re-export contract
pub use crate::contract::EventContract;

// Re-export machines
pub use crate::build_cart::{BuildCartConfig, BuildCartMachine, BuildCartState, BuildCartStatus};
pub use crate::exceptions::{exception_error_code, ExceptionsOverlay, ExceptionsState};
pub use crate::machine::{Machine, Outcome, Signal, Transition};
pub use crate::pick::{PickConfig, PickMachine, PickState, PickStatus};

// Re-export scenario loading
pub use crate::scenario::{
    load_scenario_from_file, validate_scenario, BuildCartSetup, PickTask, Scenario, ScenarioMode,
    ScenarioValidation,
};

// Re-export session and router
pub use crate::router::{apply_action, apply_action_with};
pub use crate::session::{
    active_pick_task, create_session, BuildCartProgress, PickProgress, SessionMode, SessionState,
};

// Re-export metrics, scoring and certification
pub use crate::certification::{
    create_initial_certification_progress, update_certification_progress,
    CertificationGateConfig, CertificationProgress, DEFAULT_REQUIRED_CONSECUTIVE,
};
pub use crate::metrics::{compute_metrics, DerivedMetrics};
pub use crate::scoring::{
    score_session, FailureReason, ProficiencyScore, ScoringConfig, DEFAULT_ACCURACY_TARGET,
    DEFAULT_MAX_CRITICAL_SEQUENCE_VIOLATIONS,
};

// Re-export configuration
pub use crate::config::{
    EngineConfig, ACCURACY_TARGET_VAR, MAX_CRITICAL_VIOLATIONS_VAR, REQUIRED_CONSECUTIVE_VAR,
};
