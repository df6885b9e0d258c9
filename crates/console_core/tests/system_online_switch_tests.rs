mod support;

use console_core::clock::{EventKind, ONE_MIN_MS, ONE_SEC_MS};
use console_core::ecs::LifecyclePhase;
use console_core::emergency::{EmergencyPriority, EmergencyRequest, ReassignReason};
use console_core::notifications::NotificationCategory;
use console_core::reassignment::CandidateId;
use console_core::systems::online::OFFLINE_CANCEL_REASON;
use console_core::telemetry::RideOutcome;

use support::harness::{Harness, FIRST_REQUEST_AT};

#[test]
fn going_offline_mid_ride_cancels_and_silences_reassignment() {
    let mut h = Harness::with_outcomes(vec![0.1, 0.1, 0.1]);
    h.ride_in_progress();
    h.console.start_auto_reassignment();
    h.console.advance_by(ONE_SEC_MS);

    assert!(!h.console.toggle_online());
    assert_eq!(h.console.phase(), LifecyclePhase::Idle);
    let record = h.console.log().finished.last().expect("finished record");
    assert_eq!(record.outcome, RideOutcome::Cancelled);
    assert_eq!(record.reason.as_deref(), Some(OFFLINE_CANCEL_REASON));
    let cancelled = h
        .console
        .notifications()
        .latest_of(NotificationCategory::RideCancelled)
        .expect("cancel notification");
    assert!(cancelled.message.ends_with("Reason: Driver went offline"));
    assert!(!h.console.coordinator().is_active());
    assert!(h.console.clock().is_empty());

    h.console.advance_by(ONE_MIN_MS);
    assert_eq!(h.reassignment_notifications(), 0);
    assert!(h.console.log().attempts.is_empty());
    assert!(h.console.current_ride().is_none());
}

#[test]
fn going_offline_withdraws_emergency_being_processed() {
    let mut h = Harness::with_outcomes(vec![0.1, 0.1, 0.1, 0.1]);
    h.ride_in_progress();
    h.console.submit_emergency(EmergencyRequest::new(
        ReassignReason::HealthIssue,
        EmergencyPriority::High,
    ));
    assert!(h.console.emergency_desk().is_processing());
    let before = h.reassignment_notifications();

    h.console.toggle_online();
    assert!(!h.console.emergency_desk().is_processing());
    assert!(h.console.clock().is_empty());

    h.console.advance_by(20 * ONE_SEC_MS);
    assert_eq!(h.reassignment_notifications(), before);
    assert_eq!(h.console.session().reassignments_requested, 0);
    assert!(h.console.log().attempts.is_empty());
}

#[test]
fn emergency_filed_before_offline_never_touches_the_next_ride() {
    let mut h = Harness::with_outcomes(vec![0.1, 0.1, 0.1, 0.1]);
    h.ride_in_progress();
    h.console.submit_emergency(EmergencyRequest::new(
        ReassignReason::VehicleIssue,
        EmergencyPriority::High,
    ));
    h.console.toggle_online();
    h.console.toggle_online();
    h.console.advance_by(FIRST_REQUEST_AT);
    h.console.accept();

    h.console.advance_by(ONE_MIN_MS);
    assert_eq!(h.reassignment_notifications(), 0);
    assert!(!h.console.coordinator().is_active());
    assert_eq!(h.console.session().reassignments_requested, 0);
}

#[test]
fn going_offline_with_manual_request_in_flight_silences_it() {
    let mut h = Harness::with_outcomes(vec![0.1]);
    h.ride_in_progress();
    h.console.assign_to(CandidateId(2));
    let before = h.reassignment_notifications();

    h.console.toggle_online();
    assert!(!h.console.coordinator().is_active());
    assert!(h.console.clock().is_empty());

    h.console.advance_by(20 * ONE_SEC_MS);
    assert_eq!(h.reassignment_notifications(), before);
    assert!(h.console.log().attempts.is_empty());
    assert_eq!(h.console.session().reassignments_requested, 0);
    assert_eq!(h.console.session().reassignments_completed, 0);
}

#[test]
fn going_offline_with_pending_request_withdraws_it_quietly() {
    let mut h = Harness::new();
    h.online_with_request();
    h.console.toggle_online();

    assert_eq!(h.console.log().outcomes(), vec![RideOutcome::Withdrawn]);
    assert_eq!(h.count_of(NotificationCategory::RideCancelled), 0);
    assert!(h.pending_of(&EventKind::CountdownTick).is_empty());
    assert!(h.console.clock().is_empty());
}

#[test]
fn going_offline_before_first_request_cancels_it() {
    let mut h = Harness::new();
    h.console.toggle_online();
    h.console.advance_by(FIRST_REQUEST_AT - 1);
    h.console.toggle_online();

    h.console.advance_by(ONE_MIN_MS);
    assert!(h.console.current_ride().is_none());
    assert!(h.console.log().transitions.is_empty());
}

#[test]
fn coming_back_online_restarts_requests() {
    let mut h = Harness::new();
    h.online_with_request();
    h.console.toggle_online();
    h.console.advance_by(10 * ONE_SEC_MS);

    assert!(h.console.toggle_online());
    let now = h.console.now();
    assert_eq!(h.pending_of(&EventKind::RequestRide), vec![now + FIRST_REQUEST_AT]);
    assert_eq!(h.console.session().online_since, Some(now));
}

#[test]
fn online_label_counts_hours_and_minutes() {
    let mut h = Harness::new();
    assert_eq!(h.console.online_label(), "0h 0m");
    h.console.toggle_online();
    h.console.advance_by(2 * 60 * ONE_MIN_MS + 5 * ONE_MIN_MS + 30 * ONE_SEC_MS);
    assert_eq!(h.console.online_label(), "2h 5m");

    h.console.toggle_online();
    assert_eq!(h.console.online_label(), "0h 0m");
}

#[test]
fn reset_session_keeps_availability_but_zeroes_counters() {
    let mut h = Harness::new();
    h.ride_in_progress();
    h.console.advance_by(ONE_MIN_MS);
    h.console.complete();
    assert_eq!(h.console.session().completed_rides, 1);

    h.console.reset_session();
    let session = h.console.session();
    assert_eq!(session.completed_rides, 0);
    assert_eq!(session.earnings, 0);
    assert!(session.online);
    assert_eq!(session.online_since, Some(0));
}
