//! Emergency desk: reassignment requests raised by the driver, delay reports, and support calls.

use bevy_ecs::prelude::{Res, ResMut};
use tracing::{debug, info, warn};

use crate::clock::{CurrentEvent, EventKind};
use crate::collaborators::{ActionTaken, DelayAssessment, DelayReporting};
use crate::ecs::{LifecyclePhase, RideId};
use crate::emergency::{EmergencyRequest, ProcessingEmergency};
use crate::errors::PreconditionViolation;
use crate::notifications::{NotificationCategory, Priority};
use crate::systems::dispatch::Dispatch;

fn assessment_notice(ride: RideId, assessment: &DelayAssessment) -> (String, Priority) {
    let risk = assessment.risk_score * 100.0;
    match assessment.action_taken {
        ActionTaken::ReassignmentInitiated => (
            format!(
                "Ride {ride} has been flagged for reassignment. Risk Score: {risk:.1}%. \
                 The system is finding an alternative driver."
            ),
            Priority::Warning,
        ),
        ActionTaken::ReassignmentFailed => (
            format!(
                "Reassignment of ride {ride} could not be completed. Risk Score: {risk:.1}%. \
                 Please contact support if needed."
            ),
            Priority::Warning,
        ),
        ActionTaken::MaintainAssignment => (
            format!(
                "Your assignment of ride {ride} is maintained. Risk Score: {risk:.1}%. \
                 Continue with caution."
            ),
            Priority::Success,
        ),
    }
}

impl Dispatch<'_> {
    pub fn submit_emergency(
        &mut self,
        reporting: Option<&mut DelayReporting>,
        request: EmergencyRequest,
    ) -> Result<(), PreconditionViolation> {
        if self.desk.is_processing() {
            return Err(PreconditionViolation::EmergencyInFlight);
        }

        let current = self.rides.id();
        if let (Some(reporting), Some(ride)) = (reporting, current) {
            let assessment =
                reporting
                    .0
                    .report_delay(ride, &self.config.driver_id, request.reason.label());
            info!(
                %ride,
                risk_score = assessment.risk_score,
                action = assessment.action_taken.label(),
                "delay reported"
            );
            let (message, priority) = assessment_notice(ride, &assessment);
            self.notify(
                Some(ride),
                NotificationCategory::System,
                "Delay Assessment",
                message,
                priority,
            );
        }

        let delay_ms = self.config.emergency.processing_delay_ms;
        let timer = self
            .clock
            .schedule_in(delay_ms, EventKind::EmergencyProcessed, current);
        info!(
            reason = request.reason.label(),
            priority = %request.priority,
            notes = request.notes.as_str(),
            ride = ?current,
            "emergency request processing"
        );
        self.desk.processing = Some(ProcessingEmergency {
            request,
            ride: current,
            timer,
        });
        Ok(())
    }

    fn emergency_processed(&mut self, processing: ProcessingEmergency) {
        let ProcessingEmergency { request, ride, .. } = processing;
        let policy = self.config.emergency;
        if !self.random.outcomes.chance(policy.success_probability) {
            warn!(reason = request.reason.label(), "emergency request failed");
            self.notify(
                None,
                NotificationCategory::System,
                "Request Failed",
                "We couldn't process your request at the moment. Please try again or call support."
                    .to_string(),
                Priority::Warning,
            );
            return;
        }

        self.session.reassignments_requested += 1;
        self.notify(
            ride,
            NotificationCategory::ReassignmentRequested,
            "Reassignment Requested",
            format!(
                "Your {} priority reassignment request has been submitted.",
                request.priority
            ),
            Priority::Emergency,
        );

        // Only the ride the request was filed for is reassigned.
        if self.rides.is_current(ride)
            && matches!(
                self.rides.phase(),
                LifecyclePhase::Requested | LifecyclePhase::InProgress
            )
        {
            let first_attempt_ms =
                policy.search_delay_ms + self.config.reassignment.auto_attempt_spacing_ms;
            if let Err(violation) = self.start_automatic(first_attempt_ms) {
                debug!(%violation, "emergency did not start automatic reassignment");
            }
        }
    }

    /// Returns the number the driver is connected to.
    pub fn call_support(&mut self) -> String {
        let number = self.config.support_number.clone();
        self.notify(
            None,
            NotificationCategory::Support,
            "Support Call Initiated",
            "You called Support. Our executive will assist you shortly.".to_string(),
            Priority::Info,
        );
        info!(number = number.as_str(), "support call initiated");
        number
    }
}

pub fn submit_emergency_system(
    event: Res<CurrentEvent>,
    mut dispatch: Dispatch,
    mut reporting: Option<ResMut<DelayReporting>>,
) {
    let EventKind::SubmitEmergency(request) = &event.0.kind else {
        return;
    };
    let reporting = reporting.as_deref_mut();
    if let Err(violation) = dispatch.submit_emergency(reporting, request.clone()) {
        debug!(%violation, "emergency request refused");
    }
}

pub fn emergency_processed_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::EmergencyProcessed {
        return;
    }
    let matches_timer = dispatch
        .desk
        .processing
        .as_ref()
        .is_some_and(|p| Some(p.timer) == event.0.timer);
    if !matches_timer {
        return;
    }
    let Some(processing) = dispatch.desk.processing.take() else {
        return;
    };
    if processing.ride.is_some() && !dispatch.rides.is_current(processing.ride) {
        debug!(ride = ?processing.ride, "emergency outcome for a ride that is gone discarded");
        return;
    }
    dispatch.emergency_processed(processing);
}

pub fn call_support_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    if event.0.kind != EventKind::CallSupport {
        return;
    }
    dispatch.call_support();
}
