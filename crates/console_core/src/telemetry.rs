//! Lifecycle telemetry: ride status transitions, finished rides, and reassignment attempts.
//!
//! Renderers subscribe to these records instead of being called from the transitions.

use bevy_ecs::prelude::Resource;
use serde::Serialize;

use crate::ecs::{RideId, RideStatus};
use crate::reassignment::CandidateId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusTransition {
    pub at: u64,
    pub ride: RideId,
    /// `None` when the ride was just fabricated.
    pub from: Option<RideStatus>,
    pub to: RideStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RideOutcome {
    Completed,
    Rejected,
    AutoRejected,
    Cancelled,
    /// Pending request dropped because the driver went offline.
    Withdrawn,
    HandedOff,
}

/// One ride that left the current-ride slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishedRideRecord {
    pub ride: RideId,
    pub outcome: RideOutcome,
    pub fare: u32,
    pub requested_at: u64,
    pub finished_at: u64,
    pub reason: Option<String>,
}

impl FinishedRideRecord {
    /// Time the ride occupied the slot.
    pub fn time_in_slot(&self) -> u64 {
        self.finished_at.saturating_sub(self.requested_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    Manual(CandidateId),
    /// 1-based attempt number.
    Automatic(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub at: u64,
    pub ride: RideId,
    pub kind: AttemptKind,
    pub success: bool,
}

#[derive(Debug, Default, Resource, Serialize)]
pub struct LifecycleLog {
    pub transitions: Vec<StatusTransition>,
    pub finished: Vec<FinishedRideRecord>,
    pub attempts: Vec<AttemptRecord>,
}

impl LifecycleLog {
    pub fn outcomes(&self) -> Vec<RideOutcome> {
        self.finished.iter().map(|r| r.outcome).collect()
    }

    pub fn count_outcome(&self, outcome: RideOutcome) -> usize {
        self.finished.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn transitions_of(&self, ride: RideId) -> Vec<RideStatus> {
        self.transitions
            .iter()
            .filter(|t| t.ride == ride)
            .map(|t| t.to)
            .collect()
    }

    pub fn automatic_attempts(&self) -> Vec<&AttemptRecord> {
        self.attempts
            .iter()
            .filter(|a| matches!(a.kind, AttemptKind::Automatic(_)))
            .collect()
    }
}
