pub mod countdown;
pub mod dispatch;
pub mod emergency;
pub mod handoff;
pub mod notification_actions;
pub mod online;
pub mod progress;
pub mod reassignment_auto;
pub mod reassignment_manual;
pub mod ride_decision;
pub mod ride_finished;
pub mod ride_request;
