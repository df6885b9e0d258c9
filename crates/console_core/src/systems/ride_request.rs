//! RequestRide: fabricate a ride request and start its countdown.

use bevy_ecs::prelude::Res;
use tracing::{debug, info};

use crate::clock::{CurrentEvent, EventKind};
use crate::ecs::RideStatus;
use crate::errors::PreconditionViolation;
use crate::fabrication::fabricate_ride;
use crate::notifications::{NotificationCategory, Priority};
use crate::systems::dispatch::Dispatch;

impl Dispatch<'_> {
    /// Refused, not queued, when offline, when a ride is current, or while reassigning.
    pub fn request_ride(&mut self) -> Result<(), PreconditionViolation> {
        if !self.session.online {
            return Err(PreconditionViolation::Offline);
        }
        if let Some(current) = self.rides.id() {
            return Err(PreconditionViolation::RideAlreadyCurrent(current));
        }
        if let Some(process) = self.coordinator.active.as_ref() {
            return Err(PreconditionViolation::ReassignmentActive(process.ride));
        }

        let now = self.now();
        let id = self.rides.issue_id();
        let countdown_secs = self.config.timings.request_countdown_secs;
        let ride = fabricate_ride(id, now, countdown_secs, self.random.rides.as_mut());
        let message = format!(
            "From {} to {}. Fare: ₹{}. Distance: {} km",
            ride.pickup.name, ride.drop.name, ride.fare, ride.distance_km
        );
        info!(
            ride = %id,
            pickup = %ride.pickup.name,
            drop = %ride.drop.name,
            fare = ride.fare,
            distance_km = ride.distance_km,
            "ride request fabricated"
        );
        if self.rides.install(ride).is_err() {
            return Err(PreconditionViolation::RideAlreadyCurrent(id));
        }
        self.record_transition(id, None, RideStatus::Pending);

        let tick_ms = self.config.timings.countdown_tick_ms;
        let countdown = self
            .clock
            .schedule_every(tick_ms, EventKind::CountdownTick, Some(id));
        self.timers.countdown = Some(countdown);

        self.notify(
            Some(id),
            NotificationCategory::RideRequest,
            "New Ride Request",
            message,
            Priority::Urgent,
        );
        Ok(())
    }
}

pub fn ride_request_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::RequestRide {
        return;
    }
    // This timer has fired; forget its handle before deciding anything.
    if dispatch.timers.next_request == event.0.timer {
        dispatch.timers.next_request = None;
    }
    if let Err(violation) = dispatch.request_ride() {
        debug!(%violation, "ride request skipped");
    }
}
