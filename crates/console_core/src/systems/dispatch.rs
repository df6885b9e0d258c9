//! [Dispatch]: the resources every lifecycle system touches, plus the transitions they share.

use bevy_ecs::prelude::{Res, ResMut};
use bevy_ecs::system::SystemParam;
use tracing::{debug, info};

use crate::clock::{DispatchClock, EventKind};
use crate::collaborators::{AlertChannel, MapView};
use crate::config::ConsoleConfig;
use crate::ecs::{CurrentRide, DriverSession, Ride, RideId, RideStatus, RideTimers};
use crate::emergency::EmergencyDesk;
use crate::notifications::{NotificationCategory, NotificationId, NotificationQueue, Priority};
use crate::random::RandomStreams;
use crate::reassignment::ReassignmentCoordinator;
use crate::telemetry::{FinishedRideRecord, LifecycleLog, RideOutcome, StatusTransition};

#[derive(SystemParam)]
pub struct Dispatch<'w> {
    pub clock: ResMut<'w, DispatchClock>,
    pub config: Res<'w, ConsoleConfig>,
    pub session: ResMut<'w, DriverSession>,
    pub rides: ResMut<'w, CurrentRide>,
    pub timers: ResMut<'w, RideTimers>,
    pub coordinator: ResMut<'w, ReassignmentCoordinator>,
    pub desk: ResMut<'w, EmergencyDesk>,
    pub notifications: ResMut<'w, NotificationQueue>,
    pub random: ResMut<'w, RandomStreams>,
    pub map: ResMut<'w, MapView>,
    pub alerts: ResMut<'w, AlertChannel>,
    pub log: ResMut<'w, LifecycleLog>,
}

impl Dispatch<'_> {
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Pushes a notification; urgent ones also go out as a system alert.
    pub fn notify(
        &mut self,
        ride: Option<RideId>,
        category: NotificationCategory,
        title: &str,
        message: String,
        priority: Priority,
    ) -> NotificationId {
        let now_ms = self.clock.now_real_ms();
        let id = match ride {
            Some(ride) => self
                .notifications
                .push_for_ride(now_ms, ride, category, title, message.as_str(), priority),
            None => self
                .notifications
                .push(now_ms, category, title, message.as_str(), priority),
        };
        if priority == Priority::Urgent && self.alerts.raise(title, &message) {
            debug!(%id, title, "urgent notification raised as system alert");
        }
        id
    }

    pub fn record_transition(&mut self, ride: RideId, from: Option<RideStatus>, to: RideStatus) {
        let at = self.clock.now();
        debug!(%ride, ?from, ?to, at, "ride status transition");
        self.log.transitions.push(StatusTransition { at, ride, from, to });
    }

    /// Moves the current ride to `to`, logging the transition. No-op without a ride.
    pub fn set_status(&mut self, to: RideStatus) {
        let Some(ride) = self.rides.get_mut() else {
            return;
        };
        let (id, from) = (ride.id, ride.status);
        if from == to {
            return;
        }
        ride.status = to;
        self.record_transition(id, Some(from), to);
    }

    /// Schedules the next ride request, replacing any pending one. Does nothing while offline.
    pub fn schedule_request(&mut self, delay_ms: u64) {
        if !self.session.online {
            return;
        }
        if let Some(pending) = self.timers.next_request.take() {
            self.clock.cancel(pending);
        }
        let timer = self.clock.schedule_in(delay_ms, EventKind::RequestRide, None);
        self.timers.next_request = Some(timer);
        debug!(delay_ms, "next ride request scheduled");
    }

    pub fn stop_countdown(&mut self) {
        if let Some(timer) = self.timers.countdown.take() {
            self.clock.cancel(timer);
        }
    }

    pub fn stop_progress(&mut self) {
        if let Some(timer) = self.timers.progress.take() {
            self.clock.cancel(timer);
        }
    }

    /// Ends any reassignment process and cancels its timers.
    pub fn teardown_reassignment(&mut self) {
        let Some(process) = self.coordinator.active.take() else {
            return;
        };
        for timer in process.timers() {
            self.clock.cancel(timer);
        }
        info!(ride = %process.ride, manual = process.is_manual(), "reassignment process torn down");
    }

    /// Drops an emergency submission still being processed.
    pub fn withdraw_emergency(&mut self) {
        let Some(processing) = self.desk.processing.take() else {
            return;
        };
        self.clock.cancel(processing.timer);
        info!(
            reason = processing.request.reason.label(),
            ride = ?processing.ride,
            "emergency request withdrawn"
        );
    }

    /// Clears the current-ride slot and records how the ride ended. Tears down every timer and
    /// process tied to the ride.
    pub fn finish_ride(&mut self, outcome: RideOutcome, reason: Option<String>) -> Option<Ride> {
        let final_status = match outcome {
            RideOutcome::Completed => RideStatus::Completed,
            _ => RideStatus::Cancelled,
        };
        self.set_status(final_status);
        let ride = self.rides.take()?;

        self.stop_countdown();
        self.stop_progress();
        if let Some(timer) = self.timers.handoff.take() {
            self.clock.cancel(timer);
        }
        self.teardown_reassignment();
        if matches!(
            outcome,
            RideOutcome::Completed | RideOutcome::Cancelled | RideOutcome::HandedOff
        ) {
            self.map.0.clear_routes();
        }

        let finished_at = self.clock.now();
        info!(ride = %ride.id, ?outcome, reason = reason.as_deref(), "ride left the slot");
        self.log.finished.push(FinishedRideRecord {
            ride: ride.id,
            outcome,
            fare: ride.fare,
            requested_at: ride.requested_at,
            finished_at,
            reason,
        });
        Some(ride)
    }
}
