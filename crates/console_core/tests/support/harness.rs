#![allow(dead_code)]

use console_core::clock::{EventKind, ONE_SEC_MS};
use console_core::config::ConsoleConfig;
use console_core::console::DriverConsole;
use console_core::ecs::RideId;
use console_core::notifications::NotificationCategory;
use console_core::random::{RandomStreams, ScriptedRandom};
use console_core::test_helpers::{test_config, RecordingNotifier, RecordingRouteDisplay, TEST_SEED};

/// Time of the first request after going online at t=0.
pub const FIRST_REQUEST_AT: u64 = 3 * ONE_SEC_MS;

/// Time from acceptance until progress reaches 100% (30% + 7 steps of 10% every 5 s).
pub const FULL_PROGRESS_MS: u64 = 35 * ONE_SEC_MS;

/// A console with recording collaborators; keeps handles to inspect them.
pub struct Harness {
    pub console: DriverConsole,
    pub routes: RecordingRouteDisplay,
    pub alerts: RecordingNotifier,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config(), RandomStreams::from_seed(TEST_SEED))
    }

    /// Scripted outcome draws (reassignment and emergency); rides stay seeded.
    pub fn with_outcomes(outcomes: Vec<f64>) -> Self {
        Self::with_config(
            test_config(),
            RandomStreams::from_seed(TEST_SEED).with_outcomes(ScriptedRandom::new(outcomes)),
        )
    }

    pub fn with_config(config: ConsoleConfig, random: RandomStreams) -> Self {
        let routes = RecordingRouteDisplay::default();
        let alerts = RecordingNotifier::default();
        let console = DriverConsole::builder(config)
            .random_streams(random)
            .route_display(routes.clone())
            .notifier(alerts.clone())
            .build()
            .expect("console");
        Self {
            console,
            routes,
            alerts,
        }
    }

    /// Goes online at the current time and runs until the first request arrives.
    pub fn online_with_request(&mut self) -> RideId {
        assert!(self.console.toggle_online(), "driver should be online");
        self.console.advance_by(FIRST_REQUEST_AT);
        self.console.current_ride().expect("ride request").id
    }

    /// Online, request, accept: the ride is in progress at t=3000.
    pub fn ride_in_progress(&mut self) -> RideId {
        let id = self.online_with_request();
        self.console.accept();
        id
    }

    pub fn titles(&self) -> Vec<String> {
        self.console
            .notifications()
            .history()
            .map(|n| n.title.clone())
            .collect()
    }

    pub fn count_titled(&self, title: &str) -> usize {
        self.console
            .notifications()
            .history()
            .filter(|n| n.title == title)
            .count()
    }

    pub fn reassignment_notifications(&self) -> usize {
        self.console
            .notifications()
            .history()
            .filter(|n| n.category.is_reassignment())
            .count()
    }

    /// Pending timestamps of one event kind, in firing order.
    pub fn pending_of(&self, kind: &EventKind) -> Vec<u64> {
        self.console
            .clock()
            .pending()
            .into_iter()
            .filter(|e| &e.kind == kind)
            .map(|e| e.timestamp)
            .collect()
    }

    pub fn count_of(&self, category: NotificationCategory) -> usize {
        self.console.notifications().count_of(category)
    }
}
