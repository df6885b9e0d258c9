mod support;

use console_core::clock::{EventKind, ONE_SEC_MS};
use console_core::collaborators::ActionTaken;
use console_core::config::ConsoleConfig;
use console_core::console::DriverConsole;
use console_core::ecs::{LifecyclePhase, RideId};
use console_core::emergency::{EmergencyPriority, EmergencyRequest, ReassignReason};
use console_core::notifications::{NotificationCategory, Priority};
use console_core::random::{RandomStreams, ScriptedRandom};
use console_core::test_helpers::{test_config, FixedDelayReporter, TEST_SEED};

use support::harness::Harness;

fn vehicle_issue() -> EmergencyRequest {
    EmergencyRequest::new(ReassignReason::VehicleIssue, EmergencyPriority::High)
}

fn console_with_reporter(
    config: ConsoleConfig,
    outcomes: Vec<f64>,
    reporter: FixedDelayReporter,
) -> DriverConsole {
    DriverConsole::builder(config)
        .random_streams(
            RandomStreams::from_seed(TEST_SEED).with_outcomes(ScriptedRandom::new(outcomes)),
        )
        .delay_reporter(reporter)
        .build()
        .expect("console")
}

#[test]
fn accepted_emergency_drives_automatic_handoff() {
    // Desk accepts, first attempt fails, second succeeds.
    let mut h = Harness::with_outcomes(vec![0.1, 0.9, 0.1]);
    h.ride_in_progress();
    h.console.submit_emergency(vehicle_issue());
    assert!(h.console.emergency_desk().is_processing());
    assert_eq!(h.pending_of(&EventKind::EmergencyProcessed), vec![5_000]);

    h.console.run_until(5_000);
    assert!(!h.console.emergency_desk().is_processing());
    assert_eq!(h.console.session().reassignments_requested, 1);
    let requested = h
        .console
        .notifications()
        .latest_of(NotificationCategory::ReassignmentRequested)
        .expect("requested notification");
    assert_eq!(requested.priority, Priority::Emergency);
    assert_eq!(
        requested.message,
        "Your high priority reassignment request has been submitted."
    );
    assert_eq!(h.pending_of(&EventKind::ReassignmentAttempt), vec![11_000]);

    h.console.run_until(14_000);
    let attempts: Vec<u64> = h
        .console
        .log()
        .automatic_attempts()
        .iter()
        .map(|a| a.at)
        .collect();
    assert_eq!(attempts, vec![11_000, 14_000]);
    assert_eq!(h.console.phase(), LifecyclePhase::HandingOff);
    assert_eq!(h.console.session().reassignments_completed, 1);

    h.console.run_until(17_000);
    assert!(h.console.current_ride().is_none());
}

#[test]
fn failed_emergency_frees_the_desk() {
    let mut h = Harness::with_outcomes(vec![0.95, 0.1]);
    h.ride_in_progress();
    h.console.submit_emergency(vehicle_issue());
    h.console.advance_by(ONE_SEC_MS);
    // Still processing: the second submission is dropped.
    h.console.submit_emergency(EmergencyRequest::new(
        ReassignReason::Other,
        EmergencyPriority::Low,
    ));
    assert_eq!(h.pending_of(&EventKind::EmergencyProcessed).len(), 1);

    h.console.run_until(5_000);
    assert_eq!(h.count_titled("Request Failed"), 1);
    assert_eq!(h.console.session().reassignments_requested, 0);
    assert!(!h.console.coordinator().is_active());
    assert!(!h.console.emergency_desk().is_processing());

    h.console.submit_emergency(vehicle_issue());
    assert!(h.console.emergency_desk().is_processing());
    h.console.run_until(7_000);
    assert_eq!(h.console.session().reassignments_requested, 1);
}

#[test]
fn outcome_is_discarded_once_the_ride_is_replaced() {
    let mut config = test_config();
    config.emergency.processing_delay_ms = 10 * ONE_SEC_MS;
    let random = RandomStreams::from_seed(TEST_SEED).with_outcomes(ScriptedRandom::new([0.1]));
    let mut h = Harness::with_config(config, random);
    let first = h.online_with_request();
    h.console.submit_emergency(vehicle_issue());
    h.console.reject();

    h.console.run_until(8_000);
    let second = h.console.current_ride().expect("next request").id;
    assert_ne!(second, first);

    h.console.run_until(13_000);
    assert!(!h.console.emergency_desk().is_processing());
    assert_eq!(h.console.session().reassignments_requested, 0);
    assert_eq!(h.reassignment_notifications(), 0);
    assert!(!h.console.coordinator().is_active());
}

#[test]
fn emergency_without_ride_only_counts_the_request() {
    let mut h = Harness::with_outcomes(vec![0.1]);
    h.console.submit_emergency(vehicle_issue());
    h.console.advance_by(2 * ONE_SEC_MS);

    assert_eq!(h.console.session().reassignments_requested, 1);
    assert!(!h.console.coordinator().is_active());
    assert!(h.console.clock().is_empty());
}

#[test]
fn delay_report_is_shown_but_never_drives_reassignment() {
    let reporter = FixedDelayReporter::new(0.82, ActionTaken::ReassignmentInitiated);
    let mut console = console_with_reporter(test_config(), vec![0.95], reporter.clone());
    console.toggle_online();
    console.advance_by(3 * ONE_SEC_MS);
    console.accept();
    console.submit_emergency(
        EmergencyRequest::new(ReassignReason::RoadBlock, EmergencyPriority::Medium)
            .with_notes("Flooded underpass"),
    );

    let calls = reporter.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, RideId(1));
    assert_eq!(calls[0].1, "DRIVER-000001");
    assert_eq!(calls[0].2, ReassignReason::RoadBlock.label());
    let notice = console
        .notifications()
        .history()
        .find(|n| n.title == "Delay Assessment")
        .expect("assessment notice");
    assert!(notice.message.contains("Risk Score: 82.0%"));
    assert_eq!(notice.priority, Priority::Warning);

    // The desk rejects the request; the assessment alone starts nothing.
    console.advance_by(10 * ONE_SEC_MS);
    assert!(!console.coordinator().is_active());
    assert!(console.log().attempts.is_empty());
}

#[test]
fn delay_report_skipped_without_ride() {
    let reporter = FixedDelayReporter::new(0.1, ActionTaken::MaintainAssignment);
    let mut console = console_with_reporter(test_config(), vec![0.1], reporter.clone());
    console.submit_emergency(vehicle_issue());
    assert!(reporter.calls().is_empty());
}

#[test]
fn support_call_returns_configured_number() {
    let mut config = test_config();
    config.support_number = "+91 80 0000 0000".to_string();
    let mut h = Harness::with_config(config, RandomStreams::from_seed(TEST_SEED));

    assert_eq!(h.console.call_support(), "+91 80 0000 0000");
    let support = h
        .console
        .notifications()
        .latest_of(NotificationCategory::Support)
        .expect("support notification");
    assert_eq!(support.title, "Support Call Initiated");
    assert_eq!(
        support.message,
        "You called Support. Our executive will assist you shortly."
    );
}
