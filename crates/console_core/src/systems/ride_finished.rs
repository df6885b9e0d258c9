//! Terminal driver actions on an active ride: complete and cancel.

use bevy_ecs::prelude::Res;
use tracing::{debug, info};

use crate::clock::{CurrentEvent, EventKind};
use crate::ecs::RideId;
use crate::errors::PreconditionViolation;
use crate::notifications::{NotificationCategory, Priority};
use crate::systems::dispatch::Dispatch;
use crate::telemetry::RideOutcome;

impl Dispatch<'_> {
    fn require_active(&self) -> Result<RideId, PreconditionViolation> {
        let ride = self.rides.get().ok_or(PreconditionViolation::NoCurrentRide)?;
        if !ride.is_active() {
            return Err(PreconditionViolation::WrongStatus {
                ride: ride.id,
                status: ride.status,
                expected: "accepted or in progress",
            });
        }
        Ok(ride.id)
    }

    pub fn complete_ride(&mut self) -> Result<(), PreconditionViolation> {
        let id = self.require_active()?;
        let (fare, progress) = self
            .rides
            .get()
            .map(|r| (r.fare, r.progress))
            .ok_or(PreconditionViolation::NoCurrentRide)?;
        if self.config.require_full_progress && progress < 100 {
            return Err(PreconditionViolation::ProgressIncomplete(progress));
        }

        self.session.completed_rides += 1;
        self.session.earnings += u64::from(fare);
        self.notify(
            Some(id),
            NotificationCategory::RideCompleted,
            "Ride Completed",
            format!("You completed ride {id}. ₹{fare} added to your earnings."),
            Priority::Success,
        );
        self.finish_ride(RideOutcome::Completed, None);
        info!(
            ride = %id,
            fare,
            earnings = self.session.earnings,
            completed = self.session.completed_rides,
            "ride completed"
        );
        let delay_ms = self.config.timings.post_ride_rerequest_delay_ms;
        self.schedule_request(delay_ms);
        Ok(())
    }

    pub fn cancel_ride(&mut self, reason: &str) -> Result<(), PreconditionViolation> {
        let id = self.require_active()?;
        self.notify(
            Some(id),
            NotificationCategory::RideCancelled,
            "Ride Cancelled",
            format!("Ride {id} was cancelled. Reason: {reason}"),
            Priority::Warning,
        );
        self.finish_ride(RideOutcome::Cancelled, Some(reason.to_string()));
        info!(ride = %id, reason, "ride cancelled");
        let delay_ms = self.config.timings.post_ride_rerequest_delay_ms;
        self.schedule_request(delay_ms);
        Ok(())
    }
}

pub fn complete_ride_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::CompleteRide {
        return;
    }
    if let Err(violation) = dispatch.complete_ride() {
        debug!(%violation, "complete ignored");
    }
}

pub fn cancel_ride_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    let EventKind::CancelRide(reason) = &event.0.kind else {
        return;
    };
    if let Err(violation) = dispatch.cancel_ride(reason) {
        debug!(%violation, "cancel ignored");
    }
}
