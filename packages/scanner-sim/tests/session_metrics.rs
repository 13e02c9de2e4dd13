//! Metrics derived by the router after every action.

mod common;

use common::*;
use scanner_sim::{compute_metrics, ErrorCode, EventType, SessionIds};

#[test]
fn test_totals_and_rejected_by_error() {
    let scenario = minimal_scenario();
    let ids = SessionIds::new("trainee-metrics-1", "session-metrics-1");
    let mut f = factory(&ids, "sess-metrics");

    let actions = vec![
        f.login(),
        f.menu("1"),
        f.menu("2"),
        f.ctrl_t(),
        f.zone("ZONE-02"),
        f.menu("1"),
        f.cart_label("CART-M-01"),
        f.ctrl_e(),
    ];

    let session = replay(scenario, &ids, &actions);
    let metrics = session.metrics();

    assert_eq!(metrics.total_actions, actions.len() as u64);
    assert_eq!(metrics.total_accepted, 7);
    assert_eq!(metrics.total_rejected, 1);
    assert_eq!(metrics.rejections(ErrorCode::SequenceCtrlETooEarly), 1);
    assert_eq!(metrics.rejected_by_error.len(), ErrorCode::ALL.len());
    assert_eq!(metrics.total_events, session.event_log().len() as u64);
}

#[test]
fn test_metrics_equal_full_fold_of_log() {
    let scenario = happy_scenario();
    let ids = SessionIds::new("trainee-metrics-2", "session-metrics-2");
    let mut f = factory(&ids, "sess-metrics");

    let mut actions = to_pick_mode(&mut f, &scenario, "CART-H-01", &["TOTE-H-01", "TOTE-H-02"]);
    actions.push(f.quantity(1));
    actions.push(f.tote_assign("TOTE-H-03", 3));
    actions.extend(f.pick_task(&scenario.pick_tasks[0], "TOTE-H-01"));

    let session = replay(scenario, &ids, &actions);
    assert_eq!(session.metrics(), &compute_metrics(session.event_log()));

    let errors = session
        .event_log()
        .iter()
        .filter(|e| e.is(EventType::Error))
        .count() as u64;
    assert_eq!(errors, session.metrics().total_rejected);
}
