mod support;

use std::io::Write;

use console_core::clock::{ONE_MIN_MS, ONE_SEC_MS};
use console_core::config::ConsoleConfig;
use console_core::console::DriverConsole;
use console_core::ecs::RideStatus;
use console_core::emergency::{EmergencyPriority, EmergencyRequest, ReassignReason};
use console_core::telemetry::RideOutcome;
use console_core::test_helpers::{test_config, TEST_SEED};

use support::harness::Harness;

/// Accepts every request and completes rides once they are completable.
fn drive_shift(console: &mut DriverConsole, until_ms: u64) {
    console.toggle_online();
    while console
        .clock()
        .next_event_time()
        .is_some_and(|ts| ts <= until_ms)
    {
        console.step();
        let Some((status, completable)) = console
            .current_ride()
            .map(|r| (r.status, r.is_completable()))
        else {
            continue;
        };
        match status {
            RideStatus::Pending => console.accept(),
            RideStatus::InProgress if completable && !console.coordinator().is_active() => {
                console.complete()
            }
            _ => {}
        }
    }
    console.run_until(until_ms);
}

#[test]
fn same_seed_replays_the_same_shift() {
    let mut first = DriverConsole::new(test_config()).expect("console");
    let mut second = DriverConsole::new(test_config()).expect("console");
    drive_shift(&mut first, 10 * ONE_MIN_MS);
    drive_shift(&mut second, 10 * ONE_MIN_MS);

    assert_eq!(first.summary(), second.summary());
    assert_eq!(first.log().transitions, second.log().transitions);
    assert!(first.session().completed_rides > 0);
}

#[test]
fn different_seeds_fabricate_different_rides() {
    let mut first = DriverConsole::new(test_config()).expect("console");
    let mut second = DriverConsole::new(test_config().with_seed(TEST_SEED + 100)).expect("console");
    drive_shift(&mut first, 10 * ONE_MIN_MS);
    drive_shift(&mut second, 10 * ONE_MIN_MS);

    let fares =
        |c: &DriverConsole| -> Vec<u32> { c.log().finished.iter().map(|r| r.fare).collect() };
    assert_ne!(fares(&first), fares(&second));
}

#[test]
fn rides_occupy_the_slot_one_at_a_time() {
    let mut h = Harness::new();
    drive_shift(&mut h.console, 15 * ONE_MIN_MS);
    let log = h.console.log();

    let mut previous_end = 0;
    for record in &log.finished {
        assert!(record.requested_at >= previous_end, "{record:?} overlaps");
        assert!(record.finished_at >= record.requested_at);
        previous_end = record.finished_at;
    }
    let earned: u64 = log
        .finished
        .iter()
        .filter(|r| r.outcome == RideOutcome::Completed)
        .map(|r| u64::from(r.fare))
        .sum();
    assert_eq!(h.console.session().earnings, earned);
    assert_eq!(
        h.console.session().completed_rides as usize,
        log.count_outcome(RideOutcome::Completed)
    );
}

#[test]
fn shift_with_emergency_keeps_counters_consistent() {
    let mut h = Harness::with_outcomes(vec![0.1, 0.9, 0.9, 0.9]);
    h.ride_in_progress();
    h.console.advance_by(ONE_SEC_MS);
    h.console.submit_emergency(EmergencyRequest::new(
        ReassignReason::HealthIssue,
        EmergencyPriority::High,
    ));
    h.console.advance_by(30 * ONE_SEC_MS);

    // Accepted by the desk, then three failed attempts.
    assert_eq!(h.console.session().reassignments_requested, 1);
    assert_eq!(h.console.session().reassignments_completed, 0);
    assert_eq!(h.console.log().automatic_attempts().len(), 3);
    assert_eq!(h.count_titled("Reassignment Failed"), 1);

    h.console.complete();
    let summary = h.console.summary();
    assert_eq!(summary.completed_rides, 1);
    assert_eq!(summary.handed_off, 0);
    assert!(summary.recent_notifications.len() <= 5);
    assert_eq!(summary.recent_notifications[0].title, "Ride Completed");
}

#[test]
fn config_file_overrides_timings() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{
            "seed": 7,
            "epoch_ms": 0,
            "welcome_notifications": false,
            "timings": {{ "first_request_delay_ms": 1000, "request_countdown_secs": 5 }}
        }}"#
    )
    .expect("write config");

    let config = ConsoleConfig::load(file.path()).expect("config");
    assert_eq!(config.seed, 7);
    assert_eq!(config.timings.progress_interval_ms, 5 * ONE_SEC_MS);

    let mut console = DriverConsole::new(config).expect("console");
    console.toggle_online();
    console.advance_by(ONE_SEC_MS);
    assert_eq!(
        console.current_ride().map(|r| r.countdown_secs_left),
        Some(5)
    );
    console.advance_by(5 * ONE_SEC_MS);
    assert_eq!(console.log().outcomes(), vec![RideOutcome::AutoRejected]);
}

#[test]
fn summary_serializes_to_json() {
    let mut h = Harness::new();
    h.ride_in_progress();
    let json = serde_json::to_value(h.console.summary()).expect("json");

    assert_eq!(json["driver_id"], "DRIVER-000001");
    assert_eq!(json["online"], true);
    assert_eq!(json["current_ride"]["status"], "in_progress");
    assert_eq!(json["recent_notifications"][0]["category"], "ride_accepted");
}
