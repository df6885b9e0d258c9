//! CountdownTick: one second of the accept/reject window; auto-rejects at zero.

use bevy_ecs::prelude::Res;
use tracing::info;

use crate::clock::{CurrentEvent, EventKind};
use crate::ecs::RideStatus;
use crate::notifications::{NotificationCategory, Priority};
use crate::systems::dispatch::Dispatch;
use crate::telemetry::RideOutcome;

impl Dispatch<'_> {
    fn auto_reject(&mut self) {
        let Some(id) = self.rides.id() else {
            return;
        };
        self.stop_countdown();
        self.notify(
            Some(id),
            NotificationCategory::System,
            "Ride Auto-Rejected",
            format!("Ride {id} was auto-rejected due to timeout."),
            Priority::Info,
        );
        self.finish_ride(RideOutcome::AutoRejected, Some("timeout".to_string()));
        info!(ride = %id, "ride auto-rejected");
        let delay_ms = self.config.timings.auto_reject_rerequest_delay_ms;
        self.schedule_request(delay_ms);
    }
}

pub fn countdown_tick_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::CountdownTick {
        return;
    }
    if !dispatch.rides.is_current(event.0.subject)
        || dispatch.rides.status() != Some(RideStatus::Pending)
    {
        // Stale tick for a ride that already moved on.
        if let Some(timer) = event.0.timer {
            dispatch.clock.cancel(timer);
        }
        return;
    }

    let expired = match dispatch.rides.get_mut() {
        Some(ride) => {
            ride.countdown_secs_left = ride.countdown_secs_left.saturating_sub(1);
            ride.countdown_secs_left == 0
        }
        None => false,
    };
    if expired {
        dispatch.auto_reject();
    }
}
