use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console_core::clock::{ONE_MIN_MS, ONE_SEC_MS};
use console_core::config::ConsoleConfig;
use console_core::console::{DriverConsole, SessionSummary};
use console_core::ecs::{RideId, RideStatus};
use console_core::emergency::{EmergencyPriority, EmergencyRequest, ReassignReason};
use console_core::notifications::time_ago_label;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "driver-console",
    about = "Simulated driver console for the ride dispatch core",
    long_about = "Runs a simulated driver shift against the dispatch core: ride requests,\n\
                  accept/reject decisions, trip progress, and emergency reassignment."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a driver shift and print the session summary
    Run {
        /// Seed for the console's random streams and the operator policy
        #[arg(long, env = "CONSOLE_SEED")]
        seed: Option<u64>,
        /// JSON config file; omitted fields keep their defaults
        #[arg(long)]
        config: Option<PathBuf>,
        /// Length of the shift in simulated minutes
        #[arg(long, default_value_t = 30)]
        minutes: u64,
        /// Probability that the operator accepts a ride request
        #[arg(long, default_value_t = 0.8)]
        accept_probability: f64,
        /// Submit an emergency reassignment request at this many seconds into the shift
        #[arg(long)]
        emergency_at_secs: Option<u64>,
        #[arg(long, value_enum, default_value_t = EmergencyReason::VehicleIssue)]
        emergency_reason: EmergencyReason,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective config as JSON
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EmergencyReason {
    VehicleIssue,
    HealthIssue,
    FamilyEmergency,
    RoadBlock,
    CustomerIssue,
    Other,
}

impl From<EmergencyReason> for ReassignReason {
    fn from(reason: EmergencyReason) -> Self {
        match reason {
            EmergencyReason::VehicleIssue => Self::VehicleIssue,
            EmergencyReason::HealthIssue => Self::HealthIssue,
            EmergencyReason::FamilyEmergency => Self::FamilyEmergency,
            EmergencyReason::RoadBlock => Self::RoadBlock,
            EmergencyReason::CustomerIssue => Self::CustomerIssue,
            EmergencyReason::Other => Self::Other,
        }
    }
}

// ── Shift simulation ───────────────────────────────────────────────

struct OperatorPolicy {
    rng: StdRng,
    accept_probability: f64,
    decided: Option<RideId>,
}

impl OperatorPolicy {
    /// Reacts to the console state after each processed event.
    fn act(&mut self, console: &mut DriverConsole) {
        let Some(ride) = console.current_ride() else {
            return;
        };
        let (id, status, completable) = (ride.id, ride.status, ride.is_completable());
        match status {
            RideStatus::Pending if self.decided != Some(id) => {
                self.decided = Some(id);
                if self.rng.gen_bool(self.accept_probability) {
                    console.accept();
                } else {
                    console.reject();
                }
            }
            RideStatus::InProgress if completable && !console.coordinator().is_active() => {
                console.complete();
            }
            _ => {}
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ConsoleConfig> {
    match path {
        Some(path) => ConsoleConfig::load(path)
            .with_context(|| format!("loading console config from {}", path.display())),
        None => Ok(ConsoleConfig::default()),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_shift(
    seed: Option<u64>,
    config: Option<PathBuf>,
    minutes: u64,
    accept_probability: f64,
    emergency_at_secs: Option<u64>,
    emergency_reason: EmergencyReason,
    json: bool,
) -> Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&accept_probability),
        "--accept-probability must be within [0, 1], got {accept_probability}"
    );
    let mut config = load_config(config.as_ref())?;
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    let policy_seed = config.seed.wrapping_add(2);
    let mut console = DriverConsole::builder(config)
        .with_metrics()
        .build()
        .context("building driver console")?;
    let mut policy = OperatorPolicy {
        rng: StdRng::seed_from_u64(policy_seed),
        accept_probability,
        decided: None,
    };

    let end_ms = minutes * ONE_MIN_MS;
    let emergency_at_ms = emergency_at_secs.map(|s| s * ONE_SEC_MS);
    let mut emergency_sent = false;
    console.toggle_online();
    info!(end_ms, "shift started");

    loop {
        if let Some(at) = emergency_at_ms {
            if !emergency_sent && console.now() >= at {
                emergency_sent = true;
                console.submit_emergency(EmergencyRequest::new(
                    emergency_reason.into(),
                    EmergencyPriority::High,
                ));
            }
        }
        policy.act(&mut console);

        let next = console.clock().next_event_time();
        let horizon = match emergency_at_ms {
            Some(at) if !emergency_sent => end_ms.min(at),
            _ => end_ms,
        };
        match next {
            Some(ts) if ts <= horizon => {
                console.step();
            }
            _ if horizon < end_ms => {
                console.run_until(horizon);
            }
            _ => break,
        }
    }
    console.run_until(end_ms);
    info!(now = console.now(), "shift ended");

    let summary = console.summary();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serializing summary")?
        );
    } else {
        print_summary(&summary, console.clock().now_real_ms());
        if let Some(metrics) = console.metrics() {
            println!();
            for line in metrics.summary_lines() {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn print_summary(summary: &SessionSummary, now_real_ms: i64) {
    println!("=== Driver {} ===", summary.driver_id);
    println!(
        "online: {} ({})",
        if summary.online { "yes" } else { "no" },
        summary.online_label
    );
    println!(
        "completed rides: {} | earnings: ₹{}",
        summary.completed_rides, summary.earnings
    );
    println!(
        "rejected: {} | auto-rejected: {} | cancelled: {} | handed off: {}",
        summary.rejected, summary.auto_rejected, summary.cancelled, summary.handed_off
    );
    println!(
        "reassignments requested: {} | completed: {}",
        summary.reassignments_requested, summary.reassignments_completed
    );
    if let Some(ride) = &summary.current_ride {
        println!(
            "current ride: {} {} -> {} ({:?}, {}%: {})",
            ride.id,
            ride.pickup.name,
            ride.drop.name,
            ride.status,
            ride.progress,
            ride.progress_label()
        );
    }
    println!(
        "\nnotifications ({} unread):",
        summary.unread_notifications
    );
    for notification in &summary.recent_notifications {
        println!(
            "  [{:?}] {}: {} ({})",
            notification.priority,
            notification.title,
            notification.message,
            time_ago_label(notification.created_at_ms, now_real_ms)
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            seed,
            config,
            minutes,
            accept_probability,
            emergency_at_secs,
            emergency_reason,
            json,
        } => run_shift(
            seed,
            config,
            minutes,
            accept_probability,
            emergency_at_secs,
            emergency_reason,
            json,
        ),
        Commands::Config { config } => {
            let config = load_config(config.as_ref())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("serializing config")?
            );
            Ok(())
        }
    }
}
