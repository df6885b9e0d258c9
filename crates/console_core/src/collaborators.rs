//! Seams to the systems the dispatch core drives but does not own: the map widget, the
//! out-of-band alert notifier, and the backend delay-report channel.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ecs::{Coordinates, RideId};

/// Routing widget on the map.
pub trait RouteDisplay: Send + Sync + std::fmt::Debug {
    fn set_route(&mut self, origin: Coordinates, destination: Coordinates);
    fn clear_routes(&mut self);
}

/// Discards route commands; used when no map is attached.
#[derive(Debug, Default)]
pub struct NullRouteDisplay;

impl RouteDisplay for NullRouteDisplay {
    fn set_route(&mut self, _origin: Coordinates, _destination: Coordinates) {}

    fn clear_routes(&mut self) {}
}

#[derive(Debug, Resource)]
pub struct MapView(pub Box<dyn RouteDisplay>);

impl Default for MapView {
    fn default() -> Self {
        Self(Box::new(NullRouteDisplay))
    }
}

/// Out-of-band system alert (desktop notification). Fire and forget.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    fn notify(&mut self, title: &str, body: &str);
}

/// Writes alerts to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, title: &str, body: &str) {
        info!(title, body, "system alert");
    }
}

/// Alert notifier plus the permission the host granted for it.
#[derive(Debug, Resource)]
pub struct AlertChannel {
    pub permission_granted: bool,
    notifier: Box<dyn Notifier>,
}

impl AlertChannel {
    pub fn new(permission_granted: bool, notifier: impl Notifier + 'static) -> Self {
        Self::boxed(permission_granted, Box::new(notifier))
    }

    pub fn boxed(permission_granted: bool, notifier: Box<dyn Notifier>) -> Self {
        Self {
            permission_granted,
            notifier,
        }
    }

    /// Forwards to the notifier when permitted. Returns whether the alert went out.
    pub fn raise(&mut self, title: &str, body: &str) -> bool {
        if !self.permission_granted {
            return false;
        }
        self.notifier.notify(title, body);
        true
    }
}

impl Default for AlertChannel {
    fn default() -> Self {
        Self::new(false, LogNotifier)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionTaken {
    ReassignmentInitiated,
    ReassignmentFailed,
    MaintainAssignment,
}

impl ActionTaken {
    pub fn label(self) -> &'static str {
        match self {
            Self::ReassignmentInitiated => "REASSIGNMENT_INITIATED",
            Self::ReassignmentFailed => "REASSIGNMENT_FAILED",
            Self::MaintainAssignment => "MAINTAIN_ASSIGNMENT",
        }
    }
}

/// Backend verdict on a reported delay. Display only; it never drives the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayAssessment {
    /// In `[0, 1]`.
    pub risk_score: f64,
    pub action_taken: ActionTaken,
}

/// Backend reporting channel for delay events.
pub trait DelayReporter: Send + Sync + std::fmt::Debug {
    fn report_delay(&mut self, ride_id: RideId, driver_id: &str, reason: &str) -> DelayAssessment;
}

/// Optional resource; when absent, emergency submissions skip the report.
#[derive(Debug, Resource)]
pub struct DelayReporting(pub Box<dyn DelayReporter>);
