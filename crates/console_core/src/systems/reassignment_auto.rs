//! Automatic reassignment: a bounded chain of attempts spaced by a fixed delay.

use bevy_ecs::prelude::Res;
use tracing::{debug, info, warn};

use crate::clock::{CurrentEvent, EventKind};
use crate::ecs::{RideId, RideStatus};
use crate::errors::PreconditionViolation;
use crate::notifications::{NotificationCategory, Priority};
use crate::reassignment::{ReassignmentMode, ReassignmentProcess};
use crate::systems::dispatch::Dispatch;
use crate::telemetry::{AttemptKind, AttemptRecord};

impl Dispatch<'_> {
    /// Starts the attempt chain; the first attempt resolves after `initial_delay_ms`.
    pub fn start_automatic(
        &mut self,
        initial_delay_ms: u64,
    ) -> Result<RideId, PreconditionViolation> {
        let ride = self.rides.id().ok_or(PreconditionViolation::NoCurrentRide)?;
        if let Some(process) = self.coordinator.active.as_ref() {
            return Err(PreconditionViolation::ReassignmentActive(process.ride));
        }
        let timer = self
            .clock
            .schedule_in(initial_delay_ms, EventKind::ReassignmentAttempt, Some(ride));
        let mut process = ReassignmentProcess::automatic(ride);
        process.pending_timer = Some(timer);
        self.coordinator.active = Some(process);
        info!(%ride, initial_delay_ms, "automatic reassignment started");
        Ok(ride)
    }

    pub fn start_auto_reassignment(&mut self) -> Result<RideId, PreconditionViolation> {
        let ride = self.rides.get().ok_or(PreconditionViolation::NoCurrentRide)?;
        if ride.status != RideStatus::InProgress {
            return Err(PreconditionViolation::WrongStatus {
                ride: ride.id,
                status: ride.status,
                expected: "in progress",
            });
        }
        let spacing_ms = self.config.reassignment.auto_attempt_spacing_ms;
        self.start_automatic(spacing_ms)
    }

    fn run_automatic_attempt(&mut self, ride: RideId) {
        let attempt = match self.coordinator.active.as_mut() {
            Some(ReassignmentProcess {
                mode: ReassignmentMode::Automatic { attempts_made },
                pending_timer,
                ..
            }) => {
                *attempts_made += 1;
                *pending_timer = None;
                *attempts_made
            }
            _ => return,
        };
        let policy = self.config.reassignment;
        let success = self.random.outcomes.chance(policy.auto_success_probability);
        let at = self.now();
        self.log.attempts.push(AttemptRecord {
            at,
            ride,
            kind: AttemptKind::Automatic(attempt),
            success,
        });

        if success {
            info!(%ride, attempt, "automatic reassignment succeeded");
            self.notify(
                Some(ride),
                NotificationCategory::ReassignmentSuccess,
                "Ride Auto-Reassigned",
                format!("System automatically reassigned ride {ride} to another driver."),
                Priority::Info,
            );
            self.begin_handoff();
            return;
        }

        if attempt < policy.max_auto_attempts {
            debug!(%ride, attempt, "automatic attempt failed, retrying");
            let timer = self.clock.schedule_in(
                policy.auto_attempt_spacing_ms,
                EventKind::ReassignmentAttempt,
                Some(ride),
            );
            if let Some(process) = self.coordinator.active.as_mut() {
                process.pending_timer = Some(timer);
            }
            return;
        }

        warn!(%ride, attempts = attempt, "automatic reassignment exhausted");
        self.notify(
            Some(ride),
            NotificationCategory::ReassignmentFailed,
            "Reassignment Failed",
            format!(
                "System could not reassign ride {ride} after {} attempts.",
                policy.max_auto_attempts
            ),
            Priority::Warning,
        );
        self.teardown_reassignment();
    }
}

pub fn start_auto_reassignment_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::StartAutoReassignment {
        return;
    }
    if let Err(violation) = dispatch.start_auto_reassignment() {
        debug!(%violation, "automatic reassignment refused");
    }
}

pub fn reassignment_attempt_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::ReassignmentAttempt {
        return;
    }
    let Some(ride) = event.0.subject else {
        return;
    };
    let expected = dispatch
        .coordinator
        .active
        .as_ref()
        .is_some_and(|p| p.ride == ride && !p.is_manual() && p.pending_timer == event.0.timer);
    if !expected || !dispatch.rides.is_current(Some(ride)) {
        debug!(%ride, "stale reassignment attempt discarded");
        return;
    }
    dispatch.run_automatic_attempt(ride);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::clock::{DispatchClock, Event};
    use crate::ecs::CurrentRide;
    use crate::notifications::NotificationQueue;
    use crate::random::{RandomStreams, ScriptedRandom};
    use crate::reassignment::ReassignmentCoordinator;
    use crate::telemetry::LifecycleLog;
    use crate::test_helpers::{sample_ride, test_config, test_world};

    fn world_with_ride_in_progress(outcomes: Vec<f64>) -> World {
        let mut world = test_world(test_config());
        world.insert_resource(
            RandomStreams::from_seed(1).with_outcomes(ScriptedRandom::new(outcomes)),
        );
        {
            let mut rides = world.resource_mut::<CurrentRide>();
            let id = rides.issue_id();
            let mut ride = sample_ride(id, 5.0);
            ride.status = RideStatus::InProgress;
            rides.install(ride).expect("empty slot");
        }
        world
    }

    fn drain(world: &mut World) -> Vec<u64> {
        let mut schedule = Schedule::default();
        schedule.add_systems((start_auto_reassignment_system, reassignment_attempt_system));
        let mut fired = Vec::new();
        loop {
            let Some(event) = world.resource_mut::<DispatchClock>().pop_next() else {
                break;
            };
            if event.kind != EventKind::ReassignmentAttempt {
                continue;
            }
            fired.push(event.timestamp);
            world.insert_resource(CurrentEvent(event));
            schedule.run(world);
        }
        fired
    }

    fn start(world: &mut World) {
        world.insert_resource(CurrentEvent(Event::immediate(0, EventKind::StartAutoReassignment)));
        let mut schedule = Schedule::default();
        schedule.add_systems(start_auto_reassignment_system);
        schedule.run(world);
    }

    #[test]
    fn exhaustion_leaves_ride_in_progress() {
        let mut world = world_with_ride_in_progress(vec![0.9, 0.9, 0.9]);
        start(&mut world);
        let fired = drain(&mut world);

        assert_eq!(fired, vec![3000, 6000, 9000]);
        assert_eq!(world.resource::<CurrentRide>().status(), Some(RideStatus::InProgress));
        assert!(!world.resource::<ReassignmentCoordinator>().is_active());
        let queue = world.resource::<NotificationQueue>();
        assert_eq!(queue.count_of(NotificationCategory::ReassignmentFailed), 1);
        assert_eq!(world.resource::<LifecycleLog>().automatic_attempts().len(), 3);
    }

    #[test]
    fn second_start_is_refused() {
        let mut world = world_with_ride_in_progress(vec![]);
        start(&mut world);
        start(&mut world);
        assert_eq!(world.resource::<DispatchClock>().pending_count(), 1);
    }

    #[test]
    fn start_requires_ride_in_progress() {
        let mut world = test_world(test_config());
        start(&mut world);
        assert!(!world.resource::<ReassignmentCoordinator>().is_active());
    }
}
