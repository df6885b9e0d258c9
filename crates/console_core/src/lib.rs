//! Dispatch core of a ride-hailing driver console.
//!
//! A single driver moves one current ride through request, acceptance, progress and completion,
//! with emergency reassignment on top. Every delayed callback is an event on the
//! [clock::DispatchClock]; the [runner] routes events into bevy_ecs systems one at a time.
//! [console::DriverConsole] wraps the world for hosts that just want to drive it.

pub mod clock;
pub mod collaborators;
pub mod config;
pub mod console;
pub mod ecs;
pub mod emergency;
pub mod errors;
pub mod fabrication;
pub mod notifications;
pub mod profiling;
pub mod random;
pub mod reassignment;
pub mod runner;
pub mod systems;
pub mod telemetry;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
