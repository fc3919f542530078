//! hazard-events-sim binary
//!
//! Loads a scenario, drives the hazard engine along its route with a
//! simulated trainee vehicle and writes every outbound message to stdout as
//! one JSON line.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                                   | Default | Description                        |
//! |---------------------------------------|---------|------------------------------------|
//! | `HAZARD_MAX_CONCURRENT_EVENTS`        | `5`     | Active events before triggers pause|
//! | `HAZARD_EVENT_TRIGGER_CHECK_INTERVAL` | `0.1`   | Seconds between trigger scans      |
//! | `HAZARD_PLAYER_PASSED_MARGIN`         | `0.5`   | Passed-detection hysteresis (m)    |
//! | `HAZARD_ACTIVE_HAZARD_BUFFER`         | `5.0`   | Brake advice radius extension (m)  |
//! | `HAZARD_STOP_SPEED_THRESHOLD_KMH`     | `5.0`   | "Stopped" threshold                |
//! | `HAZARD_COMPLETED_CACHE_CAPACITY`     | `20`    | Completed-event cache size         |
//! | `HAZARD_ENABLE_DEBUG_VISUALIZATION`   | `false` | Log debug zones at start-up        |

use anyhow::{Context, Result};
use clap::Parser;
use hazard_events::{
    runner::{HazardRunner, RunnerConfig},
    scenario::Scenario,
    types::EngineConfig,
};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "hazard-events-sim", about = "Hazard event scenario simulator", version)]
struct Args {
    /// Scenario JSON file
    #[arg(long, env = "HAZARD_SCENARIO", default_value = "scenarios/school_zone.json")]
    scenario: PathBuf,

    /// Engine settings file (TOML, YAML or JSON)
    #[arg(long, env = "HAZARD_CONFIG")]
    config: Option<PathBuf>,

    /// Session name override
    #[arg(long, env = "HAZARD_SESSION")]
    session: Option<String>,

    /// Tick rate (Hz)
    #[arg(long, env = "HAZARD_TICK_RATE_HZ", default_value_t = 30.0)]
    tick_rate_hz: f32,

    /// Simulated seconds to run (defaults to the route duration plus grace)
    #[arg(long, env = "HAZARD_DURATION_SECS")]
    duration_secs: Option<f64>,

    /// Pace ticks against the wall clock
    #[arg(long, env = "HAZARD_REALTIME")]
    realtime: bool,
}

fn load_engine_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let mut builder = config::Config::builder()
        .add_source(config::Config::try_from(&EngineConfig::default())?);
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path.as_path()));
    }
    builder
        .add_source(config::Environment::with_prefix("HAZARD").try_parsing(true))
        .build()
        .context("Failed to assemble engine configuration")?
        .try_deserialize()
        .context("Invalid engine configuration")
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the message stream.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hazard_events=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let engine_config = load_engine_config(args.config.as_ref())?;
    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;

    log::info!(
        "Starting hazard-events-sim (scenario='{}', events={}, tick_rate={}Hz)",
        scenario.name,
        scenario.events.len(),
        args.tick_rate_hz,
    );

    let runner_config = RunnerConfig {
        session: args.session,
        tick_rate_hz: args.tick_rate_hz,
        duration_secs: args.duration_secs,
        realtime: args.realtime,
    };

    let stdout = std::io::stdout().lock();
    let mut runner = HazardRunner::new(scenario, engine_config, runner_config, stdout);

    for zone in runner.engine().debug_zones() {
        log::debug!(
            "Zone '{}' at {} trigger={}m prepare={:?}",
            zone.event_id,
            zone.center,
            zone.trigger_radius,
            zone.prepare_radius
        );
    }

    let summary = runner.run().await?;
    tracing::info!(
        ticks = summary.ticks,
        completed = summary.completed,
        failed = summary.failed,
        interrupted = summary.interrupted,
        "Simulation finished"
    );
    Ok(())
}
