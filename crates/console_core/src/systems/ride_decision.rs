//! Driver decision on a pending request: accept starts the ride, reject frees the slot.

use bevy_ecs::prelude::Res;
use tracing::{debug, info};

use crate::clock::{CurrentEvent, EventKind};
use crate::ecs::RideStatus;
use crate::errors::PreconditionViolation;
use crate::notifications::{NotificationCategory, Priority};
use crate::systems::dispatch::Dispatch;
use crate::telemetry::RideOutcome;

impl Dispatch<'_> {
    fn require_pending(&self) -> Result<(), PreconditionViolation> {
        let ride = self.rides.get().ok_or(PreconditionViolation::NoCurrentRide)?;
        if ride.status != RideStatus::Pending {
            return Err(PreconditionViolation::WrongStatus {
                ride: ride.id,
                status: ride.status,
                expected: "pending",
            });
        }
        Ok(())
    }

    pub fn accept_ride(&mut self) -> Result<(), PreconditionViolation> {
        self.require_pending()?;
        self.stop_countdown();
        self.set_status(RideStatus::Accepted);

        let Some(ride) = self.rides.get() else {
            return Err(PreconditionViolation::NoCurrentRide);
        };
        let id = ride.id;
        let (pickup, drop) = (ride.pickup.coords, ride.drop.coords);
        self.map.0.set_route(pickup, drop);
        self.notify(
            Some(id),
            NotificationCategory::RideAccepted,
            "Ride Accepted",
            format!("You accepted ride {id}. Please proceed to pickup location."),
            Priority::Success,
        );

        let start = self.config.timings.progress_start;
        if let Some(ride) = self.rides.get_mut() {
            ride.progress = start;
        }
        self.set_status(RideStatus::InProgress);
        let interval_ms = self.config.timings.progress_interval_ms;
        let ticker = self
            .clock
            .schedule_every(interval_ms, EventKind::ProgressTick, Some(id));
        self.timers.progress = Some(ticker);
        info!(ride = %id, "ride accepted");
        Ok(())
    }

    pub fn reject_ride(&mut self) -> Result<(), PreconditionViolation> {
        self.require_pending()?;
        self.stop_countdown();
        let Some(id) = self.rides.id() else {
            return Err(PreconditionViolation::NoCurrentRide);
        };
        self.notify(
            Some(id),
            NotificationCategory::RideRejected,
            "Ride Rejected",
            format!("You rejected ride {id}."),
            Priority::Info,
        );
        self.finish_ride(RideOutcome::Rejected, None);
        info!(ride = %id, "ride rejected");
        let delay_ms = self.config.timings.reject_rerequest_delay_ms;
        self.schedule_request(delay_ms);
        Ok(())
    }
}

pub fn accept_ride_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::AcceptRide {
        return;
    }
    if let Err(violation) = dispatch.accept_ride() {
        debug!(%violation, "accept ignored");
    }
}

pub fn reject_ride_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::RejectRide {
        return;
    }
    if let Err(violation) = dispatch.reject_ride() {
        debug!(%violation, "reject ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::Schedule;

    use crate::clock::{DispatchClock, Event};
    use crate::ecs::{CurrentRide, RideId};
    use crate::notifications::NotificationQueue;
    use crate::test_helpers::{sample_ride, test_config, test_world};

    #[test]
    fn accept_starts_progress_ticker() {
        let mut world = test_world(test_config());
        {
            let mut rides = world.resource_mut::<CurrentRide>();
            let id = rides.issue_id();
            rides.install(sample_ride(id, 5.0)).expect("empty slot");
        }
        world.insert_resource(CurrentEvent(Event::immediate(0, EventKind::AcceptRide)));

        let mut schedule = Schedule::default();
        schedule.add_systems(accept_ride_system);
        schedule.run(&mut world);

        let ride = world.resource::<CurrentRide>().get().cloned().expect("ride");
        assert_eq!(ride.status, RideStatus::InProgress);
        assert_eq!(ride.progress, 30);

        let tick = world
            .resource_mut::<DispatchClock>()
            .pop_next()
            .expect("progress tick");
        assert_eq!(tick.kind, EventKind::ProgressTick);
        assert_eq!(tick.timestamp, 5000);
        assert_eq!(tick.subject, Some(RideId(1)));

        let latest = world.resource::<NotificationQueue>().latest().cloned().expect("notification");
        assert_eq!(latest.title, "Ride Accepted");
    }

    #[test]
    fn reject_without_ride_is_silent() {
        let mut world = test_world(test_config());
        world.insert_resource(CurrentEvent(Event::immediate(0, EventKind::RejectRide)));

        let mut schedule = Schedule::default();
        schedule.add_systems(reject_ride_system);
        schedule.run(&mut world);

        assert!(world.resource::<NotificationQueue>().is_empty());
        assert!(world.resource::<DispatchClock>().is_empty());
    }
}
