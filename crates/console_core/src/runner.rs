//! Console runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step pops the next
//! event from [DispatchClock], inserts it as [CurrentEvent], then runs the schedule. Operator
//! actions skip the queue: they are stamped with the current time and run immediately.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{ExecutorKind, IntoSystemConfigs};

use crate::clock::{CurrentEvent, DispatchClock, Event, EventKind};
use crate::profiling::EventMetrics;
use crate::systems::{
    countdown::countdown_tick_system,
    emergency::{call_support_system, emergency_processed_system, submit_emergency_system},
    handoff::handoff_settled_system,
    notification_actions::notification_action_system,
    online::toggle_online_system,
    progress::progress_tick_system,
    reassignment_auto::{reassignment_attempt_system, start_auto_reassignment_system},
    reassignment_manual::{
        assign_to_candidate_system, candidate_reenabled_system, close_candidates_system,
        manual_assignment_resolved_system,
    },
    ride_decision::{accept_ride_system, reject_ride_system},
    ride_finished::{cancel_ride_system, complete_ride_system},
    ride_request::ride_request_system,
};

fn event_is(event: Option<Res<CurrentEvent>>, matches: fn(&EventKind) -> bool) -> bool {
    event.map(|e| matches(&e.0.kind)).unwrap_or(false)
}

// Condition functions for each event kind
fn is_request_ride(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::RequestRide))
}

fn is_countdown_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::CountdownTick))
}

fn is_progress_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::ProgressTick))
}

fn is_reassignment_attempt(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::ReassignmentAttempt))
}

fn is_manual_assignment_resolved(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::ManualAssignmentResolved(_)))
}

fn is_candidate_reenabled(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::CandidateReenabled(_)))
}

fn is_handoff_settled(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::HandoffSettled))
}

fn is_emergency_processed(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::EmergencyProcessed))
}

fn is_toggle_online(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::ToggleOnline))
}

fn is_accept_ride(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::AcceptRide))
}

fn is_reject_ride(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::RejectRide))
}

fn is_complete_ride(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::CompleteRide))
}

fn is_cancel_ride(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::CancelRide(_)))
}

fn is_start_auto_reassignment(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::StartAutoReassignment))
}

fn is_assign_to_candidate(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::AssignToCandidate(_)))
}

fn is_close_candidates(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::CloseCandidates))
}

fn is_submit_emergency(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::SubmitEmergency(_)))
}

fn is_call_support(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::CallSupport))
}

fn is_notification_action(event: Option<Res<CurrentEvent>>) -> bool {
    event_is(event, |k| matches!(k, EventKind::NotificationAction { .. }))
}

/// Builds the dispatch schedule: one system per event kind, gated on the current event.
///
/// The executor is single-threaded so one event is handled at a time, in registration order.
pub fn dispatch_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);

    // Timer callbacks
    schedule.add_systems((
        ride_request_system.run_if(is_request_ride),
        countdown_tick_system.run_if(is_countdown_tick),
        progress_tick_system.run_if(is_progress_tick),
        reassignment_attempt_system.run_if(is_reassignment_attempt),
        manual_assignment_resolved_system.run_if(is_manual_assignment_resolved),
        candidate_reenabled_system.run_if(is_candidate_reenabled),
        handoff_settled_system.run_if(is_handoff_settled),
        emergency_processed_system.run_if(is_emergency_processed),
    ));

    // Operator actions
    schedule.add_systems((
        toggle_online_system.run_if(is_toggle_online),
        accept_ride_system.run_if(is_accept_ride),
        reject_ride_system.run_if(is_reject_ride),
        complete_ride_system.run_if(is_complete_ride),
        cancel_ride_system.run_if(is_cancel_ride),
        start_auto_reassignment_system.run_if(is_start_auto_reassignment),
        assign_to_candidate_system.run_if(is_assign_to_candidate),
        close_candidates_system.run_if(is_close_candidates),
        submit_emergency_system.run_if(is_submit_emergency),
        call_support_system.run_if(is_call_support),
        notification_action_system.run_if(is_notification_action),
    ));

    schedule
}

fn handle(world: &mut World, schedule: &mut Schedule, event: Event) {
    if let Some(mut metrics) = world.get_resource_mut::<EventMetrics>() {
        metrics.record_event(&event.kind);
    }
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
}

/// Runs one step: pops the next event, inserts it as [CurrentEvent], then runs the schedule.
/// Returns `false` if the clock was empty.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let Some(event) = world.resource_mut::<DispatchClock>().pop_next() else {
        return false;
    };
    handle(world, schedule, event);
    true
}

/// Processes every event due at or before `until_ms`, then moves the clock to `until_ms`.
/// Returns the number of events processed.
pub fn run_until(world: &mut World, schedule: &mut Schedule, until_ms: u64) -> usize {
    let mut steps = 0;
    loop {
        let next = world.resource::<DispatchClock>().next_event_time();
        match next {
            Some(ts) if ts <= until_ms => {
                if !run_next_event(world, schedule) {
                    break;
                }
                steps += 1;
            }
            _ => break,
        }
    }
    world.resource_mut::<DispatchClock>().advance_to(until_ms);
    steps
}

/// Runs steps until the queue is empty or `max_steps` is reached. Returns the steps executed.
///
/// While online the console always has a request or countdown pending, so callers bound this.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Delivers an operator action at the current time without draining the queue.
pub fn apply_action(world: &mut World, schedule: &mut Schedule, kind: EventKind) {
    let now = world.resource::<DispatchClock>().now();
    handle(world, schedule, Event::immediate(now, kind));
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ecs::{CurrentRide, DriverSession, RideStatus};
    use crate::test_helpers::{test_config, test_world};

    #[test]
    fn online_then_first_request_arrives_at_three_seconds() {
        let mut world = test_world(test_config());
        world.insert_resource(EventMetrics::default());
        let mut schedule = dispatch_schedule();

        apply_action(&mut world, &mut schedule, EventKind::ToggleOnline);
        assert!(world.resource::<DriverSession>().online);

        run_until(&mut world, &mut schedule, 2999);
        assert!(world.resource::<CurrentRide>().get().is_none());

        run_until(&mut world, &mut schedule, 3000);
        assert_eq!(world.resource::<CurrentRide>().status(), Some(RideStatus::Pending));
        assert_eq!(world.resource::<DispatchClock>().now(), 3000);

        let metrics = world.resource::<EventMetrics>();
        assert_eq!(metrics.count("toggle_online"), 1);
        assert_eq!(metrics.count("request_ride"), 1);
    }

    #[test]
    fn run_until_advances_idle_clock() {
        let mut world = test_world(test_config());
        let mut schedule = dispatch_schedule();
        assert_eq!(run_until(&mut world, &mut schedule, 10_000), 0);
        assert_eq!(world.resource::<DispatchClock>().now(), 10_000);
        assert_eq!(run_until_empty(&mut world, &mut schedule, 10), 0);
    }
}
