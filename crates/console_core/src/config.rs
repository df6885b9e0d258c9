//! Console configuration: timings, retry policy, and probabilities.
//!
//! Every field has a default matching the driver console's behaviour; a JSON file only needs
//! the fields it overrides.

use std::path::Path;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::ONE_SEC_MS;
use crate::errors::ConfigError;

/// Timings of the ride lifecycle (simulation ms unless noted).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchTimings {
    /// Delay from going online to the first request.
    pub first_request_delay_ms: u64,
    /// Seconds a request waits for accept/reject.
    pub request_countdown_secs: u32,
    pub countdown_tick_ms: u64,
    pub reject_rerequest_delay_ms: u64,
    pub auto_reject_rerequest_delay_ms: u64,
    /// Delay after completion or cancellation.
    pub post_ride_rerequest_delay_ms: u64,
    pub progress_interval_ms: u64,
    /// Progress percent right after acceptance.
    pub progress_start: u8,
    pub progress_step: u8,
}

impl Default for DispatchTimings {
    fn default() -> Self {
        Self {
            first_request_delay_ms: 3 * ONE_SEC_MS,
            request_countdown_secs: 30,
            countdown_tick_ms: ONE_SEC_MS,
            reject_rerequest_delay_ms: 5 * ONE_SEC_MS,
            auto_reject_rerequest_delay_ms: 8 * ONE_SEC_MS,
            post_ride_rerequest_delay_ms: 3 * ONE_SEC_MS,
            progress_interval_ms: 5 * ONE_SEC_MS,
            progress_start: 30,
            progress_step: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReassignmentPolicy {
    pub max_auto_attempts: u32,
    pub auto_attempt_spacing_ms: u64,
    pub auto_success_probability: f64,
    pub manual_success_probability: f64,
    /// Time a candidate takes to answer a manual request.
    pub manual_response_delay_ms: u64,
    pub decline_reenable_delay_ms: u64,
    pub handoff_settle_delay_ms: u64,
    pub post_handoff_rerequest_delay_ms: u64,
}

impl Default for ReassignmentPolicy {
    fn default() -> Self {
        Self {
            max_auto_attempts: 3,
            auto_attempt_spacing_ms: 3 * ONE_SEC_MS,
            auto_success_probability: 0.4,
            manual_success_probability: 0.5,
            manual_response_delay_ms: 2 * ONE_SEC_MS,
            decline_reenable_delay_ms: 2 * ONE_SEC_MS,
            handoff_settle_delay_ms: 3 * ONE_SEC_MS,
            post_handoff_rerequest_delay_ms: 5 * ONE_SEC_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyPolicy {
    pub processing_delay_ms: u64,
    pub success_probability: f64,
    /// Time spent looking for drivers before the first automatic attempt is scheduled.
    pub search_delay_ms: u64,
}

impl Default for EmergencyPolicy {
    fn default() -> Self {
        Self {
            processing_delay_ms: 2 * ONE_SEC_MS,
            success_probability: 0.7,
            search_delay_ms: 3 * ONE_SEC_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Seed for both random streams.
    pub seed: u64,
    /// Wall-clock ms at simulation time 0; `None` uses the host clock at startup.
    pub epoch_ms: Option<i64>,
    pub driver_id: String,
    pub support_number: String,
    pub welcome_notifications: bool,
    /// Whether the host granted out-of-band alerts.
    pub alert_permission_granted: bool,
    pub display_window: usize,
    /// Refuse `complete` until progress reaches 100%.
    pub require_full_progress: bool,
    pub timings: DispatchTimings,
    pub reassignment: ReassignmentPolicy,
    pub emergency: EmergencyPolicy,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            epoch_ms: None,
            driver_id: "DRIVER-000001".to_string(),
            support_number: "+91 1800-123-4567".to_string(),
            welcome_notifications: true,
            alert_permission_granted: false,
            display_window: crate::notifications::DEFAULT_DISPLAY_WINDOW,
            require_full_progress: false,
            timings: DispatchTimings::default(),
            reassignment: ReassignmentPolicy::default(),
            emergency: EmergencyPolicy::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_epoch(mut self, epoch_ms: i64) -> Self {
        self.epoch_ms = Some(epoch_ms);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            (
                "reassignment.auto_success_probability",
                self.reassignment.auto_success_probability,
            ),
            (
                "reassignment.manual_success_probability",
                self.reassignment.manual_success_probability,
            ),
            ("emergency.success_probability", self.emergency.success_probability),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} must be within [0, 1], got {p}"),
                });
            }
        }
        if self.timings.progress_interval_ms == 0 || self.timings.countdown_tick_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "timer intervals must be non-zero".to_string(),
            });
        }
        if self.timings.request_countdown_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "timings.request_countdown_secs must be at least 1".to_string(),
            });
        }
        if self.timings.progress_step == 0 || self.timings.progress_start > 100 {
            return Err(ConfigError::Invalid {
                reason: "progress must start at or below 100 and advance by a non-zero step"
                    .to_string(),
            });
        }
        if self.reassignment.max_auto_attempts == 0 {
            return Err(ConfigError::Invalid {
                reason: "reassignment.max_auto_attempts must be at least 1".to_string(),
            });
        }
        if self.display_window == 0 {
            return Err(ConfigError::Invalid {
                reason: "display_window must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
