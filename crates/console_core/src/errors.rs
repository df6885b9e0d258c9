use std::path::PathBuf;

use crate::ecs::{RideId, RideStatus};
use crate::reassignment::CandidateId;

/// An operation arrived in a state that does not allow it. These are logged and dropped,
/// never surfaced to the operator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreconditionViolation {
    #[error("no current ride")]
    NoCurrentRide,
    #[error("driver is offline")]
    Offline,
    #[error("ride {ride} is {status:?}, expected {expected}")]
    WrongStatus {
        ride: RideId,
        status: RideStatus,
        expected: &'static str,
    },
    #[error("ride {0} is already current")]
    RideAlreadyCurrent(RideId),
    #[error("a reassignment is already active for ride {0}")]
    ReassignmentActive(RideId),
    #[error("no manual reassignment is active")]
    NoManualReassignment,
    #[error("candidate {0} is unknown")]
    UnknownCandidate(CandidateId),
    #[error("candidate {0} is not available")]
    CandidateUnavailable(CandidateId),
    #[error("an assignment request is already in flight")]
    AssignmentInFlight,
    #[error("ride progress is {0}%, completion requires 100%")]
    ProgressIncomplete(u8),
    #[error("an emergency request is already processing")]
    EmergencyInFlight,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value: {reason}")]
    Invalid { reason: String },
}
