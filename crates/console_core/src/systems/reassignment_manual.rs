//! Manual reassignment: the operator picks a candidate from the roster, the candidate answers
//! after a short delay. A decline greys the candidate out briefly; there is no automatic retry.

use bevy_ecs::prelude::Res;
use tracing::{debug, info};

use crate::clock::{CurrentEvent, EventKind};
use crate::ecs::{RideId, RideStatus};
use crate::errors::PreconditionViolation;
use crate::notifications::{NotificationCategory, Priority};
use crate::reassignment::{CandidateId, CandidateStatus, ReassignmentMode, ReassignmentProcess};
use crate::systems::dispatch::Dispatch;
use crate::telemetry::{AttemptKind, AttemptRecord};

impl Dispatch<'_> {
    fn require_in_progress(&self) -> Result<RideId, PreconditionViolation> {
        let ride = self.rides.get().ok_or(PreconditionViolation::NoCurrentRide)?;
        if ride.status != RideStatus::InProgress {
            return Err(PreconditionViolation::WrongStatus {
                ride: ride.id,
                status: ride.status,
                expected: "in progress",
            });
        }
        Ok(ride.id)
    }

    pub fn assign_to_candidate(
        &mut self,
        candidate: CandidateId,
    ) -> Result<(), PreconditionViolation> {
        let ride = self.require_in_progress()?;
        match self.coordinator.candidate_status(candidate) {
            None => return Err(PreconditionViolation::UnknownCandidate(candidate)),
            Some(CandidateStatus::Available) => {}
            Some(CandidateStatus::Requesting) => {
                return Err(PreconditionViolation::AssignmentInFlight);
            }
            Some(CandidateStatus::Busy | CandidateStatus::Declined) => {
                return Err(PreconditionViolation::CandidateUnavailable(candidate));
            }
        }
        match self.coordinator.active.as_ref() {
            Some(process) if !process.is_manual() => {
                return Err(PreconditionViolation::ReassignmentActive(process.ride));
            }
            Some(ReassignmentProcess {
                mode: ReassignmentMode::Manual { pending: Some(_), .. },
                ..
            }) => return Err(PreconditionViolation::AssignmentInFlight),
            _ => {}
        }

        let delay_ms = self.config.reassignment.manual_response_delay_ms;
        let timer = self.clock.schedule_in(
            delay_ms,
            EventKind::ManualAssignmentResolved(candidate),
            Some(ride),
        );
        let process = self
            .coordinator
            .active
            .get_or_insert_with(|| ReassignmentProcess::manual(ride));
        if let ReassignmentMode::Manual { pending, .. } = &mut process.mode {
            *pending = Some(candidate);
        }
        process.pending_timer = Some(timer);

        let name = self
            .coordinator
            .candidate(candidate)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        info!(%ride, %candidate, name, "requesting candidate to take the ride");
        Ok(())
    }

    /// Ends a manual session that has no request in flight.
    pub fn close_candidates(&mut self) -> Result<(), PreconditionViolation> {
        match self.coordinator.active.as_ref().map(|p| &p.mode) {
            Some(ReassignmentMode::Manual { pending: None, .. }) => {
                self.teardown_reassignment();
                Ok(())
            }
            Some(ReassignmentMode::Manual { pending: Some(_), .. }) => {
                Err(PreconditionViolation::AssignmentInFlight)
            }
            _ => Err(PreconditionViolation::NoManualReassignment),
        }
    }

    fn resolve_manual_assignment(&mut self, ride: RideId, candidate: CandidateId) {
        let success_p = self.config.reassignment.manual_success_probability;
        let success = self.random.outcomes.chance(success_p);
        let at = self.now();
        self.log.attempts.push(AttemptRecord {
            at,
            ride,
            kind: AttemptKind::Manual(candidate),
            success,
        });
        let name = self
            .coordinator
            .candidate(candidate)
            .map(|c| c.name.clone())
            .unwrap_or_default();

        if success {
            info!(%ride, %candidate, name, "candidate accepted the ride");
            self.notify(
                Some(ride),
                NotificationCategory::ReassignmentSuccess,
                "Ride Reassigned",
                format!("Ride {ride} has been reassigned to {name}."),
                Priority::Success,
            );
            self.begin_handoff();
            return;
        }

        info!(%ride, %candidate, name, "candidate declined the ride");
        let reenable_ms = self.config.reassignment.decline_reenable_delay_ms;
        let timer = self.clock.schedule_in(
            reenable_ms,
            EventKind::CandidateReenabled(candidate),
            Some(ride),
        );
        if let Some(process) = self.coordinator.active.as_mut() {
            process.pending_timer = None;
            if let ReassignmentMode::Manual { pending, declined } = &mut process.mode {
                *pending = None;
                declined.insert(candidate, timer);
            }
        }
    }
}

pub fn assign_to_candidate_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    let EventKind::AssignToCandidate(candidate) = event.0.kind else {
        return;
    };
    if let Err(violation) = dispatch.assign_to_candidate(candidate) {
        debug!(%violation, %candidate, "manual assignment refused");
    }
}

pub fn close_candidates_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::CloseCandidates {
        return;
    }
    if let Err(violation) = dispatch.close_candidates() {
        debug!(%violation, "close candidates ignored");
    }
}

pub fn manual_assignment_resolved_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    let EventKind::ManualAssignmentResolved(candidate) = event.0.kind else {
        return;
    };
    let Some(ride) = event.0.subject else {
        return;
    };
    let in_flight = matches!(
        dispatch.coordinator.active.as_ref(),
        Some(ReassignmentProcess {
            ride: process_ride,
            mode: ReassignmentMode::Manual { pending: Some(pending), .. },
            pending_timer,
        }) if *process_ride == ride && *pending == candidate && *pending_timer == event.0.timer
    );
    if !in_flight || !dispatch.rides.is_current(Some(ride)) {
        debug!(%ride, %candidate, "stale manual assignment outcome discarded");
        return;
    }
    dispatch.resolve_manual_assignment(ride, candidate);
}

pub fn candidate_reenabled_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    let EventKind::CandidateReenabled(candidate) = event.0.kind else {
        return;
    };
    let Some(process) = dispatch.coordinator.active.as_mut() else {
        return;
    };
    if Some(process.ride) != event.0.subject {
        return;
    }
    if let ReassignmentMode::Manual { declined, .. } = &mut process.mode {
        if declined.get(&candidate).copied() == event.0.timer {
            declined.remove(&candidate);
            debug!(%candidate, "candidate available again");
        }
    }
}
