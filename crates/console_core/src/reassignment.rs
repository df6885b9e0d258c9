//! Reassignment coordinator state: candidate roster and the (at most one) active process.

use std::collections::BTreeMap;
use std::fmt;

use bevy_ecs::prelude::Resource;
use serde::Serialize;

use crate::clock::TimerId;
use crate::ecs::RideId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CandidateId(pub u8);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A nearby driver the operator can hand the ride to. Availability is fixed per candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub distance_km: f64,
    pub rating: f32,
    pub available: bool,
}

pub fn default_roster() -> Vec<Candidate> {
    [
        (1, "Rajesh Kumar", 0.8, 4.7, true),
        (2, "Suresh Patel", 1.2, 4.9, true),
        (3, "Amit Sharma", 1.5, 4.5, true),
        (4, "Vikram Singh", 2.1, 4.8, false),
        (5, "Anil Gupta", 2.5, 4.6, true),
    ]
    .into_iter()
    .map(|(id, name, distance_km, rating, available)| Candidate {
        id: CandidateId(id),
        name: name.to_string(),
        distance_km,
        rating,
        available,
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassignmentMode {
    /// Operator picks candidates one at a time.
    Manual {
        /// Candidate whose answer is outstanding.
        pending: Option<CandidateId>,
        /// Declined candidates and the timers that re-enable them.
        declined: BTreeMap<CandidateId, TimerId>,
    },
    /// System retries up to the policy maximum.
    Automatic { attempts_made: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignmentProcess {
    pub ride: RideId,
    pub mode: ReassignmentMode,
    /// Outstanding resolution (manual answer or next automatic attempt).
    pub pending_timer: Option<TimerId>,
}

impl ReassignmentProcess {
    pub fn manual(ride: RideId) -> Self {
        Self {
            ride,
            mode: ReassignmentMode::Manual {
                pending: None,
                declined: BTreeMap::new(),
            },
            pending_timer: None,
        }
    }

    pub fn automatic(ride: RideId) -> Self {
        Self {
            ride,
            mode: ReassignmentMode::Automatic { attempts_made: 0 },
            pending_timer: None,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.mode, ReassignmentMode::Manual { .. })
    }

    /// Every timer this process still owns.
    pub fn timers(&self) -> Vec<TimerId> {
        let mut timers: Vec<TimerId> = self.pending_timer.into_iter().collect();
        if let ReassignmentMode::Manual { declined, .. } = &self.mode {
            timers.extend(declined.values().copied());
        }
        timers
    }
}

/// How a candidate shows up on the nearby-drivers board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Available,
    Busy,
    Requesting,
    Declined,
}

#[derive(Debug, Resource)]
pub struct ReassignmentCoordinator {
    roster: Vec<Candidate>,
    pub active: Option<ReassignmentProcess>,
}

impl Default for ReassignmentCoordinator {
    fn default() -> Self {
        Self::with_roster(default_roster())
    }
}

impl ReassignmentCoordinator {
    pub fn with_roster(roster: Vec<Candidate>) -> Self {
        Self {
            roster,
            active: None,
        }
    }

    pub fn roster(&self) -> &[Candidate] {
        &self.roster
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.roster.iter().find(|c| c.id == id)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_active_for(&self, ride: Option<RideId>) -> bool {
        ride.is_some() && self.active.as_ref().map(|p| p.ride) == ride
    }

    pub fn candidate_status(&self, id: CandidateId) -> Option<CandidateStatus> {
        let candidate = self.candidate(id)?;
        if !candidate.available {
            return Some(CandidateStatus::Busy);
        }
        let status = match self.active.as_ref().map(|p| &p.mode) {
            Some(ReassignmentMode::Manual { pending, .. }) if *pending == Some(id) => {
                CandidateStatus::Requesting
            }
            Some(ReassignmentMode::Manual { declined, .. }) if declined.contains_key(&id) => {
                CandidateStatus::Declined
            }
            _ => CandidateStatus::Available,
        };
        Some(status)
    }

    /// Roster with per-candidate status, in roster order.
    pub fn board(&self) -> Vec<(Candidate, CandidateStatus)> {
        self.roster
            .iter()
            .filter_map(|c| self.candidate_status(c.id).map(|s| (c.clone(), s)))
            .collect()
    }
}
