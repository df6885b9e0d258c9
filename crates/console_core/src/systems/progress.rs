use bevy_ecs::prelude::Res;
use tracing::info;

use crate::clock::{CurrentEvent, EventKind};
use crate::ecs::RideStatus;
use crate::systems::dispatch::Dispatch;

/// Advances trip progress by one step; at 100% the ticker stops and the ride is completable.
pub fn progress_tick_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::ProgressTick {
        return;
    }
    if !dispatch.rides.is_current(event.0.subject)
        || dispatch.rides.status() != Some(RideStatus::InProgress)
    {
        if let Some(timer) = event.0.timer {
            dispatch.clock.cancel(timer);
        }
        return;
    }

    let step = dispatch.config.timings.progress_step;
    let Some(ride) = dispatch.rides.get_mut() else {
        return;
    };
    ride.progress = ride.progress.saturating_add(step).min(100);
    let (id, progress, label) = (ride.id, ride.progress, ride.progress_label());
    if progress >= 100 {
        dispatch.stop_progress();
        info!(ride = %id, "ride completable");
    } else {
        info!(ride = %id, progress, label, "ride progress");
    }
}
