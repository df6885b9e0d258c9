//! [DriverConsole]: the driver-facing facade over the dispatch world.
//!
//! Owns one [World] and the dispatch schedule. Operator operations are delivered as events at
//! the current simulation time; `advance_by` / `run_until` let timers fire.

use std::time::{SystemTime, UNIX_EPOCH};

use bevy_ecs::prelude::{Schedule, World};
use serde::Serialize;
use tracing::info;

use crate::clock::{DispatchClock, EventKind};
use crate::collaborators::{
    AlertChannel, DelayReporter, DelayReporting, LogNotifier, MapView, Notifier, RouteDisplay,
};
use crate::config::ConsoleConfig;
use crate::ecs::{CurrentRide, DriverSession, LifecyclePhase, Ride, RideTimers};
use crate::emergency::{EmergencyDesk, EmergencyRequest};
use crate::errors::ConfigError;
use crate::notifications::{
    Notification, NotificationAction, NotificationCategory, NotificationId, NotificationQueue,
    Priority,
};
use crate::profiling::EventMetrics;
use crate::random::RandomStreams;
use crate::reassignment::{Candidate, CandidateId, CandidateStatus, ReassignmentCoordinator};
use crate::runner::{apply_action, dispatch_schedule, run_next_event, run_until};
use crate::telemetry::{LifecycleLog, RideOutcome};

fn host_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Inserts every resource the dispatch systems need, with default collaborators.
pub fn build_world(config: &ConsoleConfig) -> World {
    let mut world = World::new();
    let epoch_ms = config.epoch_ms.unwrap_or_else(host_epoch_ms);
    world.insert_resource(DispatchClock::with_epoch(epoch_ms));
    world.insert_resource(DriverSession::default());
    world.insert_resource(CurrentRide::default());
    world.insert_resource(RideTimers::default());
    world.insert_resource(ReassignmentCoordinator::default());
    world.insert_resource(NotificationQueue::with_display_window(config.display_window));
    world.insert_resource(RandomStreams::from_seed(config.seed));
    world.insert_resource(MapView::default());
    world.insert_resource(AlertChannel::new(config.alert_permission_granted, LogNotifier));
    world.insert_resource(LifecycleLog::default());
    world.insert_resource(EmergencyDesk::default());
    world.insert_resource(config.clone());
    world
}

#[derive(Debug)]
pub struct DriverConsoleBuilder {
    config: ConsoleConfig,
    random: Option<RandomStreams>,
    route_display: Option<Box<dyn RouteDisplay>>,
    notifier: Option<Box<dyn Notifier>>,
    delay_reporter: Option<Box<dyn DelayReporter>>,
    roster: Option<Vec<Candidate>>,
    metrics: bool,
}

impl DriverConsoleBuilder {
    pub fn random_streams(mut self, random: RandomStreams) -> Self {
        self.random = Some(random);
        self
    }

    pub fn route_display(mut self, display: impl RouteDisplay + 'static) -> Self {
        self.route_display = Some(Box::new(display));
        self
    }

    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn delay_reporter(mut self, reporter: impl DelayReporter + 'static) -> Self {
        self.delay_reporter = Some(Box::new(reporter));
        self
    }

    pub fn roster(mut self, roster: Vec<Candidate>) -> Self {
        self.roster = Some(roster);
        self
    }

    /// Count processed events per kind in an [EventMetrics] resource.
    pub fn with_metrics(mut self) -> Self {
        self.metrics = true;
        self
    }

    pub fn build(self) -> Result<DriverConsole, ConfigError> {
        self.config.validate()?;
        let mut world = build_world(&self.config);
        if let Some(random) = self.random {
            world.insert_resource(random);
        }
        if let Some(display) = self.route_display {
            world.insert_resource(MapView(display));
        }
        if let Some(notifier) = self.notifier {
            world.insert_resource(AlertChannel::boxed(
                self.config.alert_permission_granted,
                notifier,
            ));
        }
        if let Some(reporter) = self.delay_reporter {
            world.insert_resource(DelayReporting(reporter));
        }
        if let Some(roster) = self.roster {
            world.insert_resource(ReassignmentCoordinator::with_roster(roster));
        }
        if self.metrics {
            world.insert_resource(EventMetrics::default());
        }

        if self.config.welcome_notifications {
            let now_ms = world.resource::<DispatchClock>().now_real_ms();
            let mut queue = world.resource_mut::<NotificationQueue>();
            queue.push(
                now_ms,
                NotificationCategory::System,
                "Welcome to Driver Console",
                "You can go online to start receiving ride requests.",
                Priority::Info,
            );
            queue.push(
                now_ms,
                NotificationCategory::System,
                "Emergency Feature",
                "Use the emergency button to request reassignment in case of issues.",
                Priority::Info,
            );
        }
        info!(driver = self.config.driver_id.as_str(), seed = self.config.seed, "console ready");
        Ok(DriverConsole {
            world,
            schedule: dispatch_schedule(),
        })
    }
}

/// Snapshot of the session for rendering or export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub driver_id: String,
    pub now_ms: u64,
    pub online: bool,
    pub online_label: String,
    pub completed_rides: u32,
    pub earnings: u64,
    pub reassignments_requested: u32,
    pub reassignments_completed: u32,
    pub rejected: usize,
    pub auto_rejected: usize,
    pub cancelled: usize,
    pub handed_off: usize,
    pub unread_notifications: usize,
    pub current_ride: Option<Ride>,
    pub recent_notifications: Vec<Notification>,
}

pub struct DriverConsole {
    world: World,
    schedule: Schedule,
}

impl DriverConsole {
    pub fn builder(config: ConsoleConfig) -> DriverConsoleBuilder {
        DriverConsoleBuilder {
            config,
            random: None,
            route_display: None,
            notifier: None,
            delay_reporter: None,
            roster: None,
            metrics: false,
        }
    }

    pub fn new(config: ConsoleConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    fn act(&mut self, kind: EventKind) {
        apply_action(&mut self.world, &mut self.schedule, kind);
    }

    /// Returns whether the driver is online afterwards.
    pub fn toggle_online(&mut self) -> bool {
        self.act(EventKind::ToggleOnline);
        self.session().online
    }

    pub fn accept(&mut self) {
        self.act(EventKind::AcceptRide);
    }

    pub fn reject(&mut self) {
        self.act(EventKind::RejectRide);
    }

    pub fn complete(&mut self) {
        self.act(EventKind::CompleteRide);
    }

    pub fn cancel(&mut self, reason: impl Into<String>) {
        self.act(EventKind::CancelRide(reason.into()));
    }

    pub fn start_auto_reassignment(&mut self) {
        self.act(EventKind::StartAutoReassignment);
    }

    pub fn assign_to(&mut self, candidate: CandidateId) {
        self.act(EventKind::AssignToCandidate(candidate));
    }

    pub fn close_candidates(&mut self) {
        self.act(EventKind::CloseCandidates);
    }

    pub fn submit_emergency(&mut self, request: EmergencyRequest) {
        self.act(EventKind::SubmitEmergency(request));
    }

    /// Returns the support number the driver is connected to.
    pub fn call_support(&mut self) -> String {
        self.act(EventKind::CallSupport);
        self.config().support_number.clone()
    }

    pub fn dispatch_notification_action(&mut self, id: NotificationId, action: NotificationAction) {
        self.act(EventKind::NotificationAction { id, action });
    }

    pub fn mark_read(&mut self, id: NotificationId) -> bool {
        self.world.resource_mut::<NotificationQueue>().mark_read(id)
    }

    pub fn clear_notifications(&mut self) {
        self.world.resource_mut::<NotificationQueue>().clear_all();
    }

    /// Zeroes the session counters; availability is left as is.
    pub fn reset_session(&mut self) {
        let mut session = self.world.resource_mut::<DriverSession>();
        let (online, online_since) = (session.online, session.online_since);
        session.reset();
        session.online = online;
        session.online_since = online_since;
    }

    /// Fires every timer due in the next `ms`. Returns the events processed.
    pub fn advance_by(&mut self, ms: u64) -> usize {
        let until = self.now() + ms;
        self.run_until(until)
    }

    pub fn run_until(&mut self, until_ms: u64) -> usize {
        run_until(&mut self.world, &mut self.schedule, until_ms)
    }

    /// Processes the next scheduled event, if any.
    pub fn step(&mut self) -> bool {
        run_next_event(&mut self.world, &mut self.schedule)
    }

    pub fn now(&self) -> u64 {
        self.world.resource::<DispatchClock>().now()
    }

    pub fn clock(&self) -> &DispatchClock {
        self.world.resource::<DispatchClock>()
    }

    pub fn config(&self) -> &ConsoleConfig {
        self.world.resource::<ConsoleConfig>()
    }

    pub fn session(&self) -> &DriverSession {
        self.world.resource::<DriverSession>()
    }

    pub fn online_label(&self) -> String {
        self.session().online_label(self.now())
    }

    pub fn current_ride(&self) -> Option<&Ride> {
        self.world.resource::<CurrentRide>().get()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.world.resource::<CurrentRide>().phase()
    }

    pub fn notifications(&self) -> &NotificationQueue {
        self.world.resource::<NotificationQueue>()
    }

    pub fn log(&self) -> &LifecycleLog {
        self.world.resource::<LifecycleLog>()
    }

    pub fn coordinator(&self) -> &ReassignmentCoordinator {
        self.world.resource::<ReassignmentCoordinator>()
    }

    pub fn candidate_board(&self) -> Vec<(Candidate, CandidateStatus)> {
        self.coordinator().board()
    }

    pub fn emergency_desk(&self) -> &EmergencyDesk {
        self.world.resource::<EmergencyDesk>()
    }

    pub fn metrics(&self) -> Option<&EventMetrics> {
        self.world.get_resource::<EventMetrics>()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn summary(&self) -> SessionSummary {
        let session = self.session();
        let log = self.log();
        let notifications = self.notifications();
        SessionSummary {
            driver_id: self.config().driver_id.clone(),
            now_ms: self.now(),
            online: session.online,
            online_label: self.online_label(),
            completed_rides: session.completed_rides,
            earnings: session.earnings,
            reassignments_requested: session.reassignments_requested,
            reassignments_completed: session.reassignments_completed,
            rejected: log.count_outcome(RideOutcome::Rejected),
            auto_rejected: log.count_outcome(RideOutcome::AutoRejected),
            cancelled: log.count_outcome(RideOutcome::Cancelled),
            handed_off: log.count_outcome(RideOutcome::HandedOff),
            unread_notifications: notifications.unread_count(),
            current_ride: self.current_ride().cloned(),
            recent_notifications: notifications.recent().cloned().collect(),
        }
    }
}
