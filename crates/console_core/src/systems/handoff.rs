//! Hand-off settlement after a successful reassignment.
//!
//! The ride is marked cancelled immediately and stays in the slot for the settle delay so the
//! console can show the hand-off; then the slot clears and a new request is scheduled.

use bevy_ecs::prelude::Res;
use tracing::info;

use crate::clock::{CurrentEvent, EventKind};
use crate::ecs::{LifecyclePhase, RideStatus};
use crate::systems::dispatch::Dispatch;
use crate::telemetry::RideOutcome;

impl Dispatch<'_> {
    pub fn begin_handoff(&mut self) {
        let Some(id) = self.rides.id() else {
            return;
        };
        self.session.reassignments_completed += 1;
        self.stop_progress();
        self.stop_countdown();
        self.teardown_reassignment();
        self.set_status(RideStatus::Cancelled);

        if let Some(previous) = self.timers.handoff.take() {
            self.clock.cancel(previous);
        }
        let settle_ms = self.config.reassignment.handoff_settle_delay_ms;
        let timer = self
            .clock
            .schedule_in(settle_ms, EventKind::HandoffSettled, Some(id));
        self.timers.handoff = Some(timer);
        info!(ride = %id, settle_ms, "ride handed off");
    }
}

pub fn handoff_settled_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::HandoffSettled {
        return;
    }
    if dispatch.timers.handoff == event.0.timer {
        dispatch.timers.handoff = None;
    }
    if !dispatch.rides.is_current(event.0.subject)
        || dispatch.rides.phase() != LifecyclePhase::HandingOff
    {
        return;
    }
    dispatch.finish_ride(RideOutcome::HandedOff, None);
    let delay_ms = dispatch.config.reassignment.post_handoff_rerequest_delay_ms;
    dispatch.schedule_request(delay_ms);
}
