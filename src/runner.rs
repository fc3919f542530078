//! HazardRunner – drives a [`HazardEngine`] through a [`Scenario`].
//!
//! ## Per-step flow
//!
//! 1. spawn actors whose instantiation delay elapsed
//! 2. advance every [`SimActor`] by the step
//! 3. `engine.tick` with the driver's current [`PlayerState`]
//! 4. publish notifications (and changed prepare advice)
//! 5. let the [`PlayerDriver`] obey the advice
//!
//! ## Event contract (outbound)
//!
//! One JSON object per line, `{"subject": …, "session": …, "frame": …, "payload": …}`.
//!
//! | Subject                           | Payload                          |
//! |-----------------------------------|----------------------------------|
//! | `hazard.event.*`                  | [`HazardNotification`]           |
//! | `hazard.player.*`                 | [`HazardNotification`]           |
//! | `hazard.prepare.instruction`      | `Option<PrepareInstruction>`     |
//! | `hazard.stats` (end of run)       | [`EngineStats`]                  |

use crate::engine::HazardEngine;
use crate::prepare::{PrepareInstruction, ZoneStatus};
use crate::protocol::{subjects, HazardEnvelope, HazardNotification};
use crate::scenario::{PlayerDriver, Scenario};
use crate::scene::TrafficSignal;
use crate::sim_actor::{SimActor, SimActors};
use crate::types::{EngineConfig, EngineStats};
use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::io::Write;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Overrides the scenario's session name when set.
    pub session: Option<String>,
    /// Tick rate in Hz.
    pub tick_rate_hz: f32,
    /// Simulated seconds to run; defaults to the route's nominal duration
    /// plus a grace period for braking.
    pub duration_secs: Option<f64>,
    /// Pace ticks against the wall clock instead of running flat out.
    pub realtime: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            session: None,
            tick_rate_hz: 30.0,
            duration_secs: None,
            realtime: false,
        }
    }
}

/// Seconds added to the nominal route duration.
const GRACE_SECS: f64 = 10.0;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub simulated_secs: f64,
    pub completed: usize,
    pub failed: usize,
    pub interrupted: bool,
    pub stats: EngineStats,
}

// ---------------------------------------------------------------------------
// HazardRunner
// ---------------------------------------------------------------------------

pub struct HazardRunner<W: Write> {
    config: RunnerConfig,
    session: String,
    scenario: Scenario,
    engine: HazardEngine,
    driver: PlayerDriver,
    actors: SimActors,
    /// (due time, event id) of actor sets waiting to be instantiated.
    pending_spawns: Vec<(f64, String)>,
    /// Event and zone of the last published advice.
    last_advice: Option<(String, ZoneStatus)>,
    out: W,
    now: f64,
    completed: usize,
    failed: usize,
}

impl<W: Write> HazardRunner<W> {
    /// Build the engine from `engine_config` and register every scenario
    /// event and traffic signal. Rejected definitions are logged and skipped.
    pub fn new(scenario: Scenario, engine_config: EngineConfig, config: RunnerConfig, out: W) -> Self {
        let mut engine = HazardEngine::new(engine_config);
        let accepted = engine.register_events(scenario.events.iter().cloned());
        if accepted < scenario.events.len() {
            warn!(
                "{} of {} events in '{}' were rejected",
                scenario.events.len() - accepted,
                scenario.events.len(),
                scenario.name
            );
        }
        for id in &scenario.traffic_signals {
            engine.register_scene_object(id.clone(), Box::new(TrafficSignal::new(id.clone())));
        }

        let session = config
            .session
            .clone()
            .unwrap_or_else(|| scenario.session.clone());
        let driver = PlayerDriver::new(scenario.route.clone());

        Self {
            config,
            session,
            scenario,
            engine,
            driver,
            actors: SimActors::new(),
            pending_spawns: Vec::new(),
            last_advice: None,
            out,
            now: 0.0,
            completed: 0,
            failed: 0,
        }
    }

    pub fn engine(&self) -> &HazardEngine {
        &self.engine
    }

    pub fn actors(&self) -> &SimActors {
        &self.actors
    }

    pub fn driver(&self) -> &PlayerDriver {
        &self.driver
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn duration(&self) -> f64 {
        self.config
            .duration_secs
            .unwrap_or_else(|| self.scenario.nominal_duration() + GRACE_SECS)
    }

    fn step_secs(&self) -> f64 {
        1.0 / self.config.tick_rate_hz.max(1.0) as f64
    }

    /// Run until the duration elapses (or Ctrl-C when pacing in real time).
    ///
    /// Fails only if the closing stats line cannot be written.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let dt = self.step_secs();
        let duration = self.duration();

        info!(
            "Running scenario '{}' (session '{}') for {:.1}s at {:.0}Hz{}",
            self.scenario.name,
            self.session,
            duration,
            self.config.tick_rate_hz,
            if self.config.realtime { ", realtime" } else { "" }
        );

        let mut timer = self
            .config
            .realtime
            .then(|| tokio::time::interval(std::time::Duration::from_secs_f64(dt)));
        let mut interrupted = false;

        while self.now + dt <= duration + 1e-9 {
            if let Some(timer) = timer.as_mut() {
                tokio::select! {
                    _ = timer.tick() => {}
                    _ = tokio::signal::ctrl_c() => {
                        info!("HazardRunner shutting down (SIGINT)");
                        interrupted = true;
                        break;
                    }
                }
            }
            self.step(dt);
        }

        let stats = self.engine.stats();
        let frame = stats.total_ticks;
        self.write_line(subjects::STATS, frame, &stats)
            .context("Failed to write run statistics")?;
        self.out.flush().context("Failed to flush output")?;

        let summary = RunSummary {
            ticks: stats.total_ticks,
            simulated_secs: self.now,
            completed: self.completed,
            failed: self.failed,
            interrupted,
            stats,
        };
        info!(
            "Scenario '{}' finished: {} ticks, {} completed, {} failed",
            self.scenario.name, summary.ticks, summary.completed, summary.failed
        );
        Ok(summary)
    }

    /// Advance the whole simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.now += dt;
        self.spawn_due_actors();
        self.actors.advance(dt as f32);

        let player = self.driver.state();
        let report = self.engine.tick(dt, self.now, &player, &mut self.actors);
        let frame = report.tick;

        if let Some(event_id) = &report.activated {
            self.pending_spawns
                .push((self.now + self.scenario.actor_spawn_delay, event_id.clone()));
            self.spawn_due_actors();
        }

        for notification in &report.notifications {
            self.publish(notification.subject(), frame, notification);
            match notification {
                HazardNotification::Completed { success: true, .. } => self.completed += 1,
                HazardNotification::Completed { success: false, .. } => self.failed += 1,
                HazardNotification::PlayerPassed { event_id } => {
                    self.engine.validate_player_response(event_id, &player);
                }
                _ => {}
            }
        }

        let advice = advice_key(report.prepare_instruction.as_ref());
        if advice != self.last_advice {
            self.publish(subjects::PREPARE_INSTRUCTION, frame, &report.prepare_instruction);
            self.last_advice = advice;
        }

        self.driver.update(dt as f32, report.prepare_instruction.as_ref());
    }

    fn spawn_due_actors(&mut self) {
        let now = self.now;
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .pending_spawns
            .drain(..)
            .partition(|(at, _)| *at <= now + 1e-9);
        self.pending_spawns = waiting;

        for (_, event_id) in due {
            for spec in self.scenario.actors_of(&event_id) {
                if !self.actors.contains(&spec.id) {
                    self.actors.spawn(SimActor::from_spec(spec));
                }
            }
        }
    }

    /// Serialise `payload` and write it on `subject`.
    ///
    /// Errors are logged and swallowed: a single failed write should not
    /// stop the simulation.
    /// Per-tick publishing: a failed write is logged and the run goes on.
    fn publish<T: Serialize>(&mut self, subject: &'static str, frame: u64, payload: T) {
        if let Err(e) = self.write_line(subject, frame, payload) {
            warn!("Failed to publish {}: {:#}", subject, e);
        }
    }

    fn write_line<T: Serialize>(
        &mut self,
        subject: &'static str,
        frame: u64,
        payload: T,
    ) -> Result<()> {
        let line = OutboundLine {
            subject,
            envelope: HazardEnvelope::new(self.session.as_str(), frame, payload),
        };
        let json = serde_json::to_string(&line)
            .with_context(|| format!("Failed to serialise message for {}", subject))?;
        writeln!(self.out, "{}", json)?;
        Ok(())
    }
}

fn advice_key(instruction: Option<&PrepareInstruction>) -> Option<(String, ZoneStatus)> {
    instruction.map(|i| (i.event_id.clone(), i.zone_status))
}

#[derive(Serialize)]
struct OutboundLine<T> {
    subject: &'static str,
    #[serde(flatten)]
    envelope: HazardEnvelope<T>,
}
