//! The exported test kit, driven the way a downstream crate uses it.

use scanner_sim::testing::{ActionFactory, WorkflowTest};
use scanner_sim::{ErrorCode, Outcome, PickConfig, PickMachine, PickState, PickStatus};

#[test]
fn test_assert_workflow_from_crate_root() {
    let mut f = ActionFactory::new();

    let state = scanner_sim::assert_workflow!(
        PickMachine, PickConfig::default(), PickState::default();
        f.login() => Outcome::Accepted,
        f.quantity(1) => Outcome::Rejected(ErrorCode::SequenceQtyBeforeItem),
    );

    assert_eq!(state.status(), PickStatus::LoggedIn);
}

#[test]
fn test_assert_workflow_through_testing_module() {
    use scanner_sim::testing::assert_workflow;

    let mut f = ActionFactory::new();

    let state = assert_workflow!(
        PickMachine, PickConfig::default(), PickState::default();
        f.login() => Outcome::Accepted,
        f.menu("1") => Outcome::Accepted,
        f.tote_verify("TOTE-1") => Outcome::Rejected(ErrorCode::SequenceToteBeforeItem),
    );

    assert_eq!(state.status(), PickStatus::ProgramSelected);
}

#[test]
fn test_workflow_builder_from_outside_the_crate() {
    let mut f = ActionFactory::new();

    WorkflowTest::new(PickMachine, PickConfig::default())
        .given(f.login())
        .expect_accepted()
        .then(f.ctrl_a())
        .expect_rejected(ErrorCode::SequenceCtrlATooEarly)
        .assert_state(|s| s.status() == PickStatus::LoggedIn);
}
