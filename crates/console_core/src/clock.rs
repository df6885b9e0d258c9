//! Discrete-event clock: every delayed or periodic callback in the console is an [Event] here.
//!
//! Time is simulation milliseconds since console start. Events with the same due time pop in the
//! order they were scheduled. Cancelling a [TimerId] removes its pending event, so a cancelled
//! callback never reaches a system even when its deadline has already passed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;

use crate::ecs::RideId;
use crate::emergency::EmergencyRequest;
use crate::notifications::{NotificationAction, NotificationId};
use crate::reassignment::CandidateId;

pub const ONE_SEC_MS: u64 = 1000;
pub const ONE_MIN_MS: u64 = 60 * ONE_SEC_MS;
pub const ONE_HOUR_MS: u64 = 60 * ONE_MIN_MS;

/// Handle returned by the schedule calls; pass it to [DispatchClock::cancel].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    // Timer callbacks.
    RequestRide,
    CountdownTick,
    ProgressTick,
    ReassignmentAttempt,
    ManualAssignmentResolved(CandidateId),
    CandidateReenabled(CandidateId),
    HandoffSettled,
    EmergencyProcessed,
    // Operator actions, delivered at the current time.
    ToggleOnline,
    AcceptRide,
    RejectRide,
    CompleteRide,
    CancelRide(String),
    StartAutoReassignment,
    AssignToCandidate(CandidateId),
    CloseCandidates,
    SubmitEmergency(EmergencyRequest),
    CallSupport,
    NotificationAction {
        id: NotificationId,
        action: NotificationAction,
    },
}

impl EventKind {
    /// Stable name without payload, used for metrics and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestRide => "request_ride",
            Self::CountdownTick => "countdown_tick",
            Self::ProgressTick => "progress_tick",
            Self::ReassignmentAttempt => "reassignment_attempt",
            Self::ManualAssignmentResolved(_) => "manual_assignment_resolved",
            Self::CandidateReenabled(_) => "candidate_reenabled",
            Self::HandoffSettled => "handoff_settled",
            Self::EmergencyProcessed => "emergency_processed",
            Self::ToggleOnline => "toggle_online",
            Self::AcceptRide => "accept_ride",
            Self::RejectRide => "reject_ride",
            Self::CompleteRide => "complete_ride",
            Self::CancelRide(_) => "cancel_ride",
            Self::StartAutoReassignment => "start_auto_reassignment",
            Self::AssignToCandidate(_) => "assign_to_candidate",
            Self::CloseCandidates => "close_candidates",
            Self::SubmitEmergency(_) => "submit_emergency",
            Self::CallSupport => "call_support",
            Self::NotificationAction { .. } => "notification_action",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    /// Ride the callback was scheduled for; systems drop the event if that ride is gone.
    pub subject: Option<RideId>,
    /// `None` for operator actions that never went through the queue.
    pub timer: Option<TimerId>,
}

impl Event {
    /// An operator action stamped with the current time.
    pub fn immediate(now: u64, kind: EventKind) -> Self {
        Self {
            timestamp: now,
            kind,
            subject: None,
            timer: None,
        }
    }
}

/// The event being handled by the current schedule run.
#[derive(Debug, Clone, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug)]
struct Scheduled {
    seq: u64,
    interval_ms: Option<u64>,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.event.timestamp == other.event.timestamp && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by (timestamp, seq).
        other
            .event
            .timestamp
            .cmp(&self.event.timestamp)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default, Resource)]
pub struct DispatchClock {
    now: u64,
    /// Wall-clock milliseconds corresponding to simulation time 0.
    epoch_ms: i64,
    next_seq: u64,
    next_timer: u64,
    events: BinaryHeap<Scheduled>,
}

impl DispatchClock {
    pub fn with_epoch(epoch_ms: i64) -> Self {
        Self {
            epoch_ms,
            ..Self::default()
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn epoch_ms(&self) -> i64 {
        self.epoch_ms
    }

    pub fn sim_to_real_ms(&self, sim_ms: u64) -> i64 {
        self.epoch_ms.saturating_add(sim_ms as i64)
    }

    /// Wall-clock milliseconds for simulation time; `None` if it predates the epoch.
    pub fn real_to_sim_ms(&self, real_ms: i64) -> Option<u64> {
        real_ms
            .checked_sub(self.epoch_ms)
            .and_then(|delta| u64::try_from(delta).ok())
    }

    pub fn now_real_ms(&self) -> i64 {
        self.sim_to_real_ms(self.now)
    }

    pub fn schedule_at(
        &mut self,
        timestamp: u64,
        kind: EventKind,
        subject: Option<RideId>,
    ) -> TimerId {
        debug_assert!(
            timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        self.push(timestamp.max(self.now), kind, subject, None)
    }

    pub fn schedule_in(
        &mut self,
        delay_ms: u64,
        kind: EventKind,
        subject: Option<RideId>,
    ) -> TimerId {
        self.push(self.now + delay_ms, kind, subject, None)
    }

    pub fn schedule_in_secs(
        &mut self,
        secs: u64,
        kind: EventKind,
        subject: Option<RideId>,
    ) -> TimerId {
        self.schedule_in(secs * ONE_SEC_MS, kind, subject)
    }

    /// Fires every `interval_ms` (first time one interval from now) until cancelled.
    pub fn schedule_every(
        &mut self,
        interval_ms: u64,
        kind: EventKind,
        subject: Option<RideId>,
    ) -> TimerId {
        let interval_ms = interval_ms.max(1);
        self.push(self.now + interval_ms, kind, subject, Some(interval_ms))
    }

    /// Removes the timer's pending event. Returns `false` when nothing was pending
    /// (already fired, already cancelled, or never existed).
    pub fn cancel(&mut self, timer: TimerId) -> bool {
        let before = self.events.len();
        self.events.retain(|s| s.event.timer != Some(timer));
        before != self.events.len()
    }

    pub fn is_pending(&self, timer: TimerId) -> bool {
        self.events.iter().any(|s| s.event.timer == Some(timer))
    }

    /// Pops the earliest event and advances `now` to its timestamp. Periodic timers are
    /// re-armed before the event is handed out, so the handler may still cancel them.
    pub fn pop_next(&mut self) -> Option<Event> {
        let scheduled = self.events.pop()?;
        self.now = scheduled.event.timestamp;
        if let Some(interval_ms) = scheduled.interval_ms {
            let mut next = scheduled.event.clone();
            next.timestamp = self.now + interval_ms;
            let seq = self.bump_seq();
            self.events.push(Scheduled {
                seq,
                interval_ms: Some(interval_ms),
                event: next,
            });
        }
        Some(scheduled.event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|s| s.event.timestamp)
    }

    /// Moves time forward without firing anything. Never moves backwards.
    pub fn advance_to(&mut self, timestamp: u64) {
        self.now = self.now.max(timestamp);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }

    /// Pending events in firing order.
    pub fn pending(&self) -> Vec<&Event> {
        let mut pending: Vec<&Scheduled> = self.events.iter().collect();
        pending.sort_by(|a, b| b.cmp(a));
        pending.into_iter().map(|s| &s.event).collect()
    }

    fn push(
        &mut self,
        timestamp: u64,
        kind: EventKind,
        subject: Option<RideId>,
        interval_ms: Option<u64>,
    ) -> TimerId {
        let timer = TimerId(self.next_timer);
        self.next_timer += 1;
        let seq = self.bump_seq();
        self.events.push(Scheduled {
            seq,
            interval_ms,
            event: Event {
                timestamp,
                kind,
                subject,
                timer: Some(timer),
            },
        });
        timer
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
