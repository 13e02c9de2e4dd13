//! Session replay harness.

use std::sync::{Arc, Once};

use scanner_sim::{apply_action, create_session, Event, Scenario, SessionIds, SessionState};

static TRACING: Once = Once::new();

/// Initialize a tracing subscriber that respects `RUST_LOG`.
/// Run tests with: RUST_LOG=debug cargo test -- --nocapture
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Fold `actions` into a fresh session, panicking on any engine error.
pub fn replay(scenario: Arc<Scenario>, ids: &SessionIds, actions: &[Event]) -> SessionState {
    init_tracing();
    actions
        .iter()
        .fold(create_session(scenario, ids.clone()), |session, action| {
            apply_action(session, action).expect("action applies cleanly")
        })
}
