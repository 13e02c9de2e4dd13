//! Scenario fixtures and canned action streams.

use std::path::PathBuf;
use std::sync::Arc;

use scanner_sim::testing::ActionFactory;
use scanner_sim::{load_scenario_from_file, Event, Scenario, SessionIds};

/// Path of a scenario fixture under `tests/fixtures/scenarios`.
pub fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("scenarios")
        .join(name)
}

/// Two totes, two tasks (`PT-H-001`, `PT-H-002`).
pub fn happy_scenario() -> Arc<Scenario> {
    let path = scenario_path("scenario.session.happy.json");
    Arc::new(load_scenario_from_file(path).expect("happy fixture loads"))
}

/// One tote, one task (`PT-M-001`).
pub fn minimal_scenario() -> Arc<Scenario> {
    let path = scenario_path("scenario.minimal.pick.json");
    Arc::new(load_scenario_from_file(path).expect("minimal fixture loads"))
}

pub fn factory(ids: &SessionIds, prefix: &str) -> ActionFactory {
    ActionFactory::with_ids(ids.clone(), prefix)
}

/// Cart setup for `scenario` followed by pick login, ending in
/// `PK_PHASE_SELECTED`.
pub fn to_pick_mode(
    f: &mut ActionFactory,
    scenario: &Scenario,
    cart: &str,
    totes: &[&str],
) -> Vec<Event> {
    assert_eq!(totes.len() as u32, scenario.build_cart.required_tote_count.get());
    let mut actions = f.cart_setup(cart, totes);
    actions.extend(f.pick_login());
    actions
}
