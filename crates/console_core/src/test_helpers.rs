//! Test helpers for common test setup and utilities.
//!
//! Shared by unit tests and the integration tests under `tests/` (via the `test-helpers`
//! feature): a fixed-epoch config, sample rides, and recording collaborators.

use std::sync::{Arc, Mutex};

use bevy_ecs::prelude::World;

use crate::collaborators::{ActionTaken, DelayAssessment, DelayReporter, Notifier, RouteDisplay};
use crate::config::ConsoleConfig;
use crate::console::build_world;
use crate::ecs::{Coordinates, Ride, RideId, RideStatus};
use crate::fabrication::{
    demo_customer, drop_catalog, eta_for_distance, fare_for_distance, pickup_catalog,
};

/// Wall-clock ms used as simulation time 0 in tests.
pub const TEST_EPOCH_MS: i64 = 1_700_000_000_000;

pub const TEST_SEED: u64 = 42;

/// Default config with a fixed epoch and seed, and no welcome notifications.
pub fn test_config() -> ConsoleConfig {
    let mut config = ConsoleConfig::default()
        .with_seed(TEST_SEED)
        .with_epoch(TEST_EPOCH_MS);
    config.welcome_notifications = false;
    config
}

/// A world with every dispatch resource inserted.
pub fn test_world(config: ConsoleConfig) -> World {
    build_world(&config)
}

/// A pending ride from the first catalog pickup to the first catalog drop.
///
/// # Panics
///
/// Panics if the catalogs are empty (they never are).
pub fn sample_ride(id: RideId, distance_km: f64) -> Ride {
    let pickup = pickup_catalog().into_iter().next().expect("pickup catalog");
    let drop = drop_catalog().into_iter().next().expect("drop catalog");
    Ride {
        id,
        pickup,
        drop,
        distance_km,
        fare: fare_for_distance(distance_km),
        eta_mins: eta_for_distance(distance_km),
        customer: demo_customer(),
        status: RideStatus::Pending,
        progress: 0,
        countdown_secs_left: 30,
        requested_at: 0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteCommand {
    Set(Coordinates, Coordinates),
    Clear,
}

/// Records route commands; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingRouteDisplay {
    commands: Arc<Mutex<Vec<RouteCommand>>>,
}

impl RecordingRouteDisplay {
    pub fn commands(&self) -> Vec<RouteCommand> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Whether a route is shown after replaying the commands.
    pub fn has_route(&self) -> bool {
        matches!(self.commands().last(), Some(RouteCommand::Set(..)))
    }
}

impl RouteDisplay for RecordingRouteDisplay {
    fn set_route(&mut self, origin: Coordinates, destination: Coordinates) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(RouteCommand::Set(origin, destination));
        }
    }

    fn clear_routes(&mut self) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(RouteCommand::Clear);
        }
    }
}

/// Records raised alerts as `(title, body)`; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    alerts: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, title: &str, body: &str) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push((title.to_string(), body.to_string()));
        }
    }
}

/// Answers every delay report with the same assessment and remembers the calls.
#[derive(Debug, Clone)]
pub struct FixedDelayReporter {
    assessment: DelayAssessment,
    calls: Arc<Mutex<Vec<(RideId, String, String)>>>,
}

impl FixedDelayReporter {
    pub fn new(risk_score: f64, action_taken: ActionTaken) -> Self {
        Self {
            assessment: DelayAssessment {
                risk_score,
                action_taken,
            },
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(RideId, String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl DelayReporter for FixedDelayReporter {
    fn report_delay(&mut self, ride_id: RideId, driver_id: &str, reason: &str) -> DelayAssessment {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((ride_id, driver_id.to_string(), reason.to_string()));
        }
        self.assessment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_ride_uses_fare_formula() {
        let ride = sample_ride(RideId(3), 5.0);
        assert_eq!(ride.fare, 105);
        assert_eq!(ride.eta_mins, 20);
        assert_eq!(ride.status, RideStatus::Pending);
    }

    #[test]
    fn recording_display_clones_share_log() {
        let display = RecordingRouteDisplay::default();
        let mut handle = display.clone();
        let a = Coordinates { lng: 1.0, lat: 2.0 };
        handle.set_route(a, a);
        assert!(display.has_route());
        handle.clear_routes();
        assert!(!display.has_route());
        assert_eq!(display.commands().len(), 2);
    }
}
