//! Driver online/offline switch.

use bevy_ecs::prelude::Res;
use tracing::{debug, info};

use crate::clock::{CurrentEvent, EventKind};
use crate::ecs::LifecyclePhase;
use crate::notifications::{NotificationCategory, Priority};
use crate::systems::dispatch::Dispatch;
use crate::telemetry::RideOutcome;

pub const OFFLINE_CANCEL_REASON: &str = "Driver went offline";

impl Dispatch<'_> {
    /// Flips the driver's availability. Returns the new state.
    pub fn toggle_online(&mut self) -> bool {
        if self.session.online {
            self.go_offline();
        } else {
            self.go_online();
        }
        self.session.online
    }

    fn go_online(&mut self) {
        let now = self.now();
        self.session.online = true;
        self.session.online_since = Some(now);
        self.notify(
            None,
            NotificationCategory::System,
            "You are now online",
            "You will start receiving ride requests shortly.".to_string(),
            Priority::Info,
        );
        info!(at = now, "driver online");
        let delay_ms = self.config.timings.first_request_delay_ms;
        self.schedule_request(delay_ms);
    }

    fn go_offline(&mut self) {
        let now = self.now();
        let online_ms = self.session.online_duration_ms(now);
        self.session.online = false;
        self.session.online_since = None;
        if let Some(timer) = self.timers.next_request.take() {
            self.clock.cancel(timer);
        }
        self.stop_countdown();

        match self.rides.phase() {
            LifecyclePhase::Requested => {
                self.finish_ride(RideOutcome::Withdrawn, Some(OFFLINE_CANCEL_REASON.to_string()));
            }
            LifecyclePhase::InProgress => {
                // Offline so `cancel_ride` cannot schedule a follow-up request.
                if let Err(violation) = self.cancel_ride(OFFLINE_CANCEL_REASON) {
                    debug!(%violation, "offline cancel skipped");
                }
            }
            LifecyclePhase::HandingOff => {
                self.finish_ride(RideOutcome::HandedOff, None);
            }
            LifecyclePhase::Idle => {}
        }
        self.teardown_reassignment();
        self.withdraw_emergency();

        self.notify(
            None,
            NotificationCategory::System,
            "You are now offline",
            "You will not receive new ride requests.".to_string(),
            Priority::Info,
        );
        info!(at = now, online_ms, "driver offline");
    }
}

pub fn toggle_online_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::ToggleOnline {
        return;
    }
    dispatch.toggle_online();
}
