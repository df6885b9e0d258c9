//! Emergency desk: operator-raised reassignment requests.

use std::fmt;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::TimerId;
use crate::ecs::RideId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReassignReason {
    VehicleIssue,
    HealthIssue,
    FamilyEmergency,
    RoadBlock,
    CustomerIssue,
    Other,
}

impl ReassignReason {
    pub fn label(self) -> &'static str {
        match self {
            Self::VehicleIssue => "Vehicle Breakdown",
            Self::HealthIssue => "Health Issue",
            Self::FamilyEmergency => "Family Emergency",
            Self::RoadBlock => "Road Block/Traffic",
            Self::CustomerIssue => "Customer Issue",
            Self::Other => "Other Reason",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyPriority {
    Low,
    Medium,
    #[default]
    High,
}

impl fmt::Display for EmergencyPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyRequest {
    pub reason: ReassignReason,
    #[serde(default)]
    pub priority: EmergencyPriority,
    #[serde(default)]
    pub notes: String,
}

impl EmergencyRequest {
    pub fn new(reason: ReassignReason, priority: EmergencyPriority) -> Self {
        Self {
            reason,
            priority,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingEmergency {
    pub request: EmergencyRequest,
    /// Ride that was current when the request was filed.
    pub ride: Option<RideId>,
    pub timer: TimerId,
}

/// At most one submission is processed at a time.
#[derive(Debug, Default, Resource)]
pub struct EmergencyDesk {
    pub processing: Option<ProcessingEmergency>,
}

impl EmergencyDesk {
    pub fn is_processing(&self) -> bool {
        self.processing.is_some()
    }
}
