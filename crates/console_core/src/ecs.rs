use std::fmt;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::{TimerId, ONE_HOUR_MS, ONE_MIN_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RideId(pub u64);

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RIDE-{:06}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub coords: Coordinates,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub rating: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ride {
    pub id: RideId,
    pub pickup: Location,
    pub drop: Location,
    /// Kilometres, rounded to one decimal.
    pub distance_km: f64,
    pub fare: u32,
    pub eta_mins: u32,
    pub customer: Customer,
    pub status: RideStatus,
    /// Percent; meaningful once the ride is accepted.
    pub progress: u8,
    /// Seconds left to accept or reject while pending.
    pub countdown_secs_left: u32,
    /// Simulation time when the request was fabricated.
    pub requested_at: u64,
}

impl Ride {
    /// Driver is on the job: route set, progress ticking.
    pub fn is_active(&self) -> bool {
        matches!(self.status, RideStatus::Accepted | RideStatus::InProgress)
    }

    pub fn is_completable(&self) -> bool {
        self.is_active() && self.progress >= 100
    }

    /// Label shown next to the progress bar.
    pub fn progress_label(&self) -> &'static str {
        match self.status {
            RideStatus::Pending => "Awaiting response",
            RideStatus::Completed => "Ride completed",
            RideStatus::Cancelled => "Ride handed off",
            RideStatus::Accepted | RideStatus::InProgress => match self.progress {
                p if p >= 100 => "Ride completed - awaiting confirmation",
                p if p >= 60 => "On the way to drop location",
                p if p >= 50 => "Customer picked up",
                _ => "Heading to pickup location",
            },
        }
    }
}

/// Coarse state of the lifecycle controller, derived from the current ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Idle,
    Requested,
    InProgress,
    /// Ride was handed to another driver and is waiting out the settle delay.
    HandingOff,
}

/// The single current-ride slot. Only the controller's transitions write it.
#[derive(Debug, Default, Resource)]
pub struct CurrentRide {
    ride: Option<Ride>,
    issued: u64,
}

impl CurrentRide {
    pub fn get(&self) -> Option<&Ride> {
        self.ride.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut Ride> {
        self.ride.as_mut()
    }

    pub fn id(&self) -> Option<RideId> {
        self.ride.as_ref().map(|r| r.id)
    }

    pub fn is_current(&self, id: Option<RideId>) -> bool {
        id.is_some() && self.id() == id
    }

    pub fn status(&self) -> Option<RideStatus> {
        self.ride.as_ref().map(|r| r.status)
    }

    pub fn phase(&self) -> LifecyclePhase {
        match self.status() {
            None => LifecyclePhase::Idle,
            Some(RideStatus::Pending) => LifecyclePhase::Requested,
            Some(RideStatus::Accepted | RideStatus::InProgress) => LifecyclePhase::InProgress,
            Some(RideStatus::Completed | RideStatus::Cancelled) => LifecyclePhase::HandingOff,
        }
    }

    /// Next ride id; ids are never reused within a console session.
    pub fn issue_id(&mut self) -> RideId {
        self.issued += 1;
        RideId(self.issued)
    }

    /// Installs a new ride. Returns the ride back if the slot is occupied.
    pub fn install(&mut self, ride: Ride) -> Result<(), Ride> {
        if self.ride.is_some() {
            return Err(ride);
        }
        self.ride = Some(ride);
        Ok(())
    }

    pub fn take(&mut self) -> Option<Ride> {
        self.ride.take()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Resource, Serialize)]
pub struct DriverSession {
    pub online: bool,
    /// Simulation time the driver went online; `None` while offline.
    pub online_since: Option<u64>,
    pub completed_rides: u32,
    pub earnings: u64,
    /// Emergency requests the desk accepted.
    pub reassignments_requested: u32,
    /// Rides handed to another driver.
    pub reassignments_completed: u32,
}

impl DriverSession {
    pub fn online_duration_ms(&self, now: u64) -> u64 {
        self.online_since
            .map(|since| now.saturating_sub(since))
            .unwrap_or(0)
    }

    /// `"{h}h {m}m"` like the console header.
    pub fn online_label(&self, now: u64) -> String {
        let elapsed = self.online_duration_ms(now);
        format!(
            "{}h {}m",
            elapsed / ONE_HOUR_MS,
            (elapsed % ONE_HOUR_MS) / ONE_MIN_MS
        )
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Handles of the controller's own timers.
#[derive(Debug, Default, Resource)]
pub struct RideTimers {
    pub countdown: Option<TimerId>,
    pub progress: Option<TimerId>,
    pub next_request: Option<TimerId>,
    pub handoff: Option<TimerId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_ride;

    #[test]
    fn progress_labels_follow_thresholds() {
        let mut ride = sample_ride(RideId(1), 5.0);
        ride.status = RideStatus::InProgress;
        let label_at = |ride: &mut Ride, progress| {
            ride.progress = progress;
            ride.progress_label()
        };
        assert_eq!(label_at(&mut ride, 30), "Heading to pickup location");
        assert_eq!(label_at(&mut ride, 50), "Customer picked up");
        assert_eq!(label_at(&mut ride, 60), "On the way to drop location");
        assert_eq!(label_at(&mut ride, 90), "On the way to drop location");
        assert_eq!(
            label_at(&mut ride, 100),
            "Ride completed - awaiting confirmation"
        );
        assert!(ride.is_completable());
    }

    #[test]
    fn slot_refuses_second_ride() {
        let mut slot = CurrentRide::default();
        let first = slot.issue_id();
        let second = slot.issue_id();
        assert_ne!(first, second);
        assert!(slot.install(sample_ride(first, 3.0)).is_ok());
        let refused = slot.install(sample_ride(second, 4.0)).expect_err("occupied");
        assert_eq!(refused.id, second);
        assert_eq!(slot.id(), Some(first));
        assert_eq!(slot.phase(), LifecyclePhase::Requested);
    }

    #[test]
    fn online_label_formats_hours_and_minutes() {
        let session = DriverSession {
            online: true,
            online_since: Some(1000),
            ..Default::default()
        };
        assert_eq!(session.online_label(1000 + 2 * ONE_HOUR_MS + 5 * ONE_MIN_MS), "2h 5m");
        assert_eq!(DriverSession::default().online_label(99_999), "0h 0m");
    }

    #[test]
    fn ride_id_display() {
        assert_eq!(RideId(42).to_string(), "RIDE-000042");
    }
}
