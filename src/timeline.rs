//! TimelineExecutor – schedules an event's actions and dispatches them to
//! actor handles as the shared clock advances.
//!
//! Each scheduled action walks a forward-only state machine:
//!
//! ```text
//! Scheduled ──start reached──► Running ──end reached──► Completed
//!     │                          ▲
//!     └─actor missing─► AwaitingActor ─actor resolvable─┘
//! ```
//!
//! Because phases only move forward, calling [`TimelineExecutor::update_timeline`]
//! any number of times with the same clock never starts or completes an
//! action twice.

use crate::actor::{
    Actor, ActorLookup, AnimationParams, LightParams, LoadState, LoadTicket, MovementParams,
    SoundParams,
};
use crate::context::EventRuntimeContext;
use crate::definition::{ActionKind, EventAction};
use crate::error::{HazardError, Result};
use crate::scene::SceneObjectRegistry;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A named script invoked by `script` actions.
pub type ScriptFn = Arc<dyn Fn(&mut dyn Actor, &EventRuntimeContext) -> Result<()> + Send + Sync>;

// ---------------------------------------------------------------------------
// Scheduled action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    Scheduled,
    /// Start time reached but the actor handle is not resolvable yet.
    AwaitingActor,
    Running,
    Completed,
}

#[derive(Debug, Clone)]
pub struct ScheduledAction {
    pub action: EventAction,
    pub start_time: f64,
    pub end_time: f64,
    pub phase: ActionPhase,
}

impl ScheduledAction {
    fn new(action: &EventAction, activation_time: f64) -> Self {
        let start_time = activation_time + action.time;
        Self {
            action: action.clone(),
            start_time,
            end_time: start_time + action.duration.unwrap_or(0.0),
            phase: ActionPhase::Scheduled,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == ActionPhase::Running
    }

    pub fn is_completed(&self) -> bool {
        self.phase == ActionPhase::Completed
    }

    /// Synthetic id reported when the action completes.
    pub fn completion_id(&self, event_id: &str) -> String {
        format!(
            "{}_{}_{}_{}",
            event_id,
            self.action.actor_id,
            self.action.kind.type_name(),
            self.action.time
        )
    }
}

// ---------------------------------------------------------------------------
// Environment handed in every tick
// ---------------------------------------------------------------------------

/// Live handles for one tick. Never retained by the executor.
pub struct TimelineEnv<'a> {
    pub actors: &'a mut dyn ActorLookup,
    pub scene: &'a mut SceneObjectRegistry,
}

struct PendingLoad {
    actor_id: String,
    ticket: LoadTicket,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct TimelineExecutor {
    timelines: HashMap<String, Vec<ScheduledAction>>,
    pending_loads: HashMap<String, Vec<PendingLoad>>,
    scripts: HashMap<String, ScriptFn>,
}

impl TimelineExecutor {
    pub fn new() -> Self {
        Self {
            timelines: HashMap::new(),
            pending_loads: HashMap::new(),
            scripts: HashMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Scripts
    // -----------------------------------------------------------------------

    pub fn register_script<F>(&mut self, name: impl Into<String>, script: F)
    where
        F: Fn(&mut dyn Actor, &EventRuntimeContext) -> Result<()> + Send + Sync + 'static,
    {
        self.scripts.insert(name.into(), Arc::new(script));
    }

    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Build the flat schedule for an activation. Replaces any previous
    /// schedule for the same event.
    pub fn schedule_actions(&mut self, event_id: &str, actions: &[EventAction], activation_time: f64) {
        let schedule: Vec<_> = actions
            .iter()
            .map(|a| ScheduledAction::new(a, activation_time))
            .collect();
        debug!("Scheduled {} actions for {}", schedule.len(), event_id);
        self.timelines.insert(event_id.to_string(), schedule);
    }

    pub fn cancel_actions(&mut self, event_id: &str) {
        self.timelines.remove(event_id);
        self.pending_loads.remove(event_id);
    }

    pub fn has_timeline(&self, event_id: &str) -> bool {
        self.timelines.contains_key(event_id)
    }

    pub fn scheduled(&self, event_id: &str) -> Option<&[ScheduledAction]> {
        self.timelines.get(event_id).map(Vec::as_slice)
    }

    /// Whether a movement action for `actor_id` has already been handed to
    /// the actor in this activation.
    pub fn movement_dispatched(&self, event_id: &str, actor_id: &str) -> bool {
        self.timelines.get(event_id).is_some_and(|schedule| {
            schedule.iter().any(|s| {
                s.action.actor_id == actor_id
                    && matches!(s.action.kind, ActionKind::Movement { .. })
                    && matches!(s.phase, ActionPhase::Running | ActionPhase::Completed)
            })
        })
    }

    pub fn timeline_count(&self) -> usize {
        self.timelines.len()
    }

    pub fn pending_load_count(&self, event_id: &str) -> usize {
        self.pending_loads.get(event_id).map_or(0, Vec::len)
    }

    /// Completed/total as a 0–1 ratio. Unknown events count as complete.
    pub fn get_progress(&self, event_id: &str) -> f32 {
        match self.timelines.get(event_id) {
            Some(schedule) if !schedule.is_empty() => {
                let done = schedule.iter().filter(|s| s.is_completed()).count();
                done as f32 / schedule.len() as f32
            }
            _ => 1.0,
        }
    }

    pub fn clear(&mut self) {
        self.timelines.clear();
        self.pending_loads.clear();
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance one event's timeline to `now`.
    ///
    /// `on_action_completed` receives the completion id of every action that
    /// finished during this call.
    pub fn update_timeline<F>(
        &mut self,
        event_id: &str,
        now: f64,
        env: &mut TimelineEnv<'_>,
        context: &EventRuntimeContext,
        mut on_action_completed: F,
    ) where
        F: FnMut(String),
    {
        self.poll_loads(event_id);

        let Some(schedule) = self.timelines.get_mut(event_id) else {
            return;
        };

        let mut started_loads = Vec::new();

        for entry in schedule.iter_mut() {
            match entry.phase {
                ActionPhase::Completed | ActionPhase::Running => {}
                ActionPhase::Scheduled | ActionPhase::AwaitingActor => {
                    if now < entry.start_time {
                        continue;
                    }
                    if entry.action.kind.needs_actor()
                        && !env.actors.contains_actor(&entry.action.actor_id)
                    {
                        if entry.phase == ActionPhase::Scheduled {
                            debug!(
                                "Deferring {} action of {}: actor '{}' not available",
                                entry.action.kind.type_name(),
                                event_id,
                                entry.action.actor_id
                            );
                            entry.phase = ActionPhase::AwaitingActor;
                        }
                        continue;
                    }

                    dispatch(
                        event_id,
                        &entry.action,
                        env,
                        context,
                        &self.scripts,
                        &mut started_loads,
                    );
                    entry.phase = ActionPhase::Running;
                }
            }

            if entry.phase == ActionPhase::Running
                && (entry.action.duration.is_none() || now >= entry.end_time)
            {
                entry.phase = ActionPhase::Completed;
                on_action_completed(entry.completion_id(event_id));
            }
        }

        if !started_loads.is_empty() {
            self.pending_loads
                .entry(event_id.to_string())
                .or_default()
                .extend(started_loads);
        }
    }

    /// Consult background load tickets; drop the resolved ones.
    fn poll_loads(&mut self, event_id: &str) {
        let Some(loads) = self.pending_loads.get_mut(event_id) else {
            return;
        };
        loads.retain(|load| match load.ticket.state() {
            LoadState::Pending => true,
            LoadState::Ready => {
                info!("Animations ready for actor '{}' ({})", load.actor_id, event_id);
                false
            }
            LoadState::Failed(reason) => {
                warn!(
                    "Animation preload failed for actor '{}' ({}): {}",
                    load.actor_id, event_id, reason
                );
                false
            }
        });
        if loads.is_empty() {
            self.pending_loads.remove(event_id);
        }
    }
}

impl Default for TimelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// One-shot call into the actor's capability surface.
fn dispatch(
    event_id: &str,
    action: &EventAction,
    env: &mut TimelineEnv<'_>,
    context: &EventRuntimeContext,
    scripts: &HashMap<String, ScriptFn>,
    loads: &mut Vec<PendingLoad>,
) {
    let kind = action.kind.type_name();

    if let ActionKind::SceneObject {
        target_id,
        command,
        params,
    } = &action.kind
    {
        match env.scene.execute(target_id, command, params) {
            Ok(()) => debug!("{}: scene object '{}' <- {}", event_id, target_id, command),
            Err(HazardError::UnknownSceneObject(_)) => {
                warn!("{}: scene object '{}' not found, skipping", event_id, target_id)
            }
            Err(e) => warn!("{}: {}", event_id, e),
        }
        return;
    }

    if let ActionKind::Unknown = action.kind {
        warn!("{}: unknown action type, skipping", event_id);
        return;
    }

    let Some(actor) = env.actors.actor_mut(&action.actor_id) else {
        return;
    };

    match &action.kind {
        ActionKind::Movement {
            path,
            speed,
            looped,
        } => match actor.as_movable() {
            Some(movable) => movable.start_movement(MovementParams {
                path: path.clone(),
                speed: *speed,
                looped: *looped,
            }),
            None => missing_capability(event_id, &action.actor_id, kind),
        },
        ActionKind::Animation {
            name,
            looped,
            fade_in,
            fade_out,
        } => {
            // A pre-posed, paused actor resumes instead of restarting.
            if action.time == 0.0 {
                if let Some(resumable) = actor.as_resumable() {
                    resumable.resume_animation();
                    return;
                }
            }
            match actor.as_animatable() {
                Some(animatable) => animatable.play_animation(AnimationParams {
                    name: name.clone(),
                    looped: *looped,
                    fade_in: *fade_in,
                    fade_out: *fade_out,
                }),
                None => missing_capability(event_id, &action.actor_id, kind),
            }
        }
        ActionKind::Light {
            light_type,
            enabled,
            blink_rate,
        } => match actor.as_lit() {
            Some(lit) => lit.set_light(LightParams {
                light_type: *light_type,
                enabled: *enabled,
                blink_rate: *blink_rate,
            }),
            None => missing_capability(event_id, &action.actor_id, kind),
        },
        ActionKind::Sound {
            url,
            volume,
            looped,
        } => match actor.as_soundable() {
            Some(soundable) => soundable.play_sound(SoundParams {
                url: url.clone(),
                volume: *volume,
                looped: *looped,
            }),
            None => missing_capability(event_id, &action.actor_id, kind),
        },
        ActionKind::Script { name } => match scripts.get(name) {
            Some(script) => run_script(event_id, name, script, actor, context),
            None => warn!("{}: {}", event_id, HazardError::UnknownScript(name.clone())),
        },
        ActionKind::PrepareAnimation { urls } => match actor.as_loader() {
            Some(loader) => {
                let ticket = loader.load_animations(urls);
                loads.push(PendingLoad {
                    actor_id: action.actor_id.clone(),
                    ticket,
                });
            }
            None => missing_capability(event_id, &action.actor_id, kind),
        },
        ActionKind::SceneObject { .. } | ActionKind::Unknown => {}
    }
}

fn run_script(
    event_id: &str,
    name: &str,
    script: &ScriptFn,
    actor: &mut dyn Actor,
    context: &EventRuntimeContext,
) {
    match catch_unwind(AssertUnwindSafe(|| script(actor, context))) {
        Ok(Ok(())) => debug!("{}: script '{}' ran", event_id, name),
        Ok(Err(e)) => warn!("{}: script '{}' failed: {}", event_id, name, e),
        Err(_) => warn!("{}: script '{}' panicked", event_id, name),
    }
}

fn missing_capability(event_id: &str, actor_id: &str, kind: &str) {
    warn!(
        "{}: actor '{}' cannot handle {} actions, skipping",
        event_id, actor_id, kind
    );
}
