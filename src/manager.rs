//! EventManager – registry, trigger scanning, priority arbitration, the
//! per-event completion state machine and the prepare-zone scanner.
//!
//! ## Event lifecycle
//!
//! ```text
//! register ─► pending ──trigger (one per scan)──► active ──criteria met──► completed
//!                ▲                                   │                         │
//!                │                                   └──time limit──► failed ──┤
//!                └────────────────── repeatable: re-armed ◄────────────────────┘
//! ```
//!
//! All mutation of the three id-keyed mappings (registry, pending, active)
//! and of runtime contexts happens behind this type's methods.

use crate::context::{CompletionChecks, EventRuntimeContext, EventState};
use crate::definition::{EventDefinition, ResponseKind, SpeedRange, Trigger};
use crate::error::{HazardError, Result};
use crate::prepare::{PrepareInstruction, ZoneStatus};
use crate::protocol::HazardNotification;
use crate::types::{EngineConfig, PlayerState, Vec3};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Custom trigger predicate over the player snapshot.
pub type PlayerPredicate = Arc<dyn Fn(&PlayerState) -> bool + Send + Sync>;
/// Custom completion predicate over the runtime context.
pub type ContextPredicate = Arc<dyn Fn(&EventRuntimeContext) -> bool + Send + Sync>;
/// Receives every notification synchronously, before it is queued.
pub type NotificationListener = Box<dyn FnMut(&HazardNotification) + Send>;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

struct RegisteredEvent {
    definition: EventDefinition,
    /// Registration order; breaks priority ties.
    seq: u64,
}

/// An activation that closed, successfully or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedEvent {
    pub event_id: String,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DebugZoneState {
    Pending,
    Active,
    Completed,
    Idle,
}

/// Trigger/prepare geometry exposed for debug overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugZone {
    pub event_id: String,
    pub center: Vec3,
    pub trigger_radius: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepare_radius: Option<f32>,
    pub state: DebugZoneState,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

pub struct EventManager {
    config: EngineConfig,
    registry: HashMap<String, RegisteredEvent>,
    pending: HashSet<String>,
    active: HashMap<String, EventRuntimeContext>,
    completed: HashSet<String>,
    conditions: HashMap<String, PlayerPredicate>,
    completion_checks: HashMap<String, ContextPredicate>,
    listener: Option<NotificationListener>,
    notifications: Vec<HazardNotification>,
    closed: Vec<ClosedEvent>,
    /// Handler names already reported missing.
    warned: HashSet<String>,
    last_check: Option<f64>,
    next_seq: u64,
    total_activations: u64,
}

impl EventManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: HashMap::new(),
            pending: HashSet::new(),
            active: HashMap::new(),
            completed: HashSet::new(),
            conditions: HashMap::new(),
            completion_checks: HashMap::new(),
            listener: None,
            notifications: Vec::new(),
            closed: Vec::new(),
            warned: HashSet::new(),
            last_check: None,
            next_seq: 0,
            total_activations: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a definition and arm it. Duplicates are rejected with a
    /// warning and leave the existing definition untouched.
    pub fn register_event(&mut self, definition: EventDefinition) -> Result<()> {
        if let Err(e) = definition.validate() {
            warn!("Rejecting hazard event: {}", e);
            return Err(e);
        }
        if self.registry.contains_key(&definition.id) {
            warn!("Hazard event '{}' already registered, ignoring", definition.id);
            return Err(HazardError::DuplicateEvent(definition.id));
        }

        debug!("Registered hazard event '{}' ({})", definition.id, definition.name);
        let id = definition.id.clone();
        self.registry.insert(
            id.clone(),
            RegisteredEvent {
                definition,
                seq: self.next_seq,
            },
        );
        self.next_seq += 1;
        self.pending.insert(id);
        Ok(())
    }

    /// Remove a definition from every mapping.
    pub fn unregister_event(&mut self, event_id: &str) -> Option<EventDefinition> {
        let entry = self.registry.remove(event_id)?;
        self.pending.remove(event_id);
        self.active.remove(event_id);
        self.completed.remove(event_id);
        Some(entry.definition)
    }

    pub fn register_condition<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&PlayerState) -> bool + Send + Sync + 'static,
    {
        self.conditions.insert(name.into(), Arc::new(predicate));
    }

    pub fn register_completion_check<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&EventRuntimeContext) -> bool + Send + Sync + 'static,
    {
        self.completion_checks.insert(name.into(), Arc::new(predicate));
    }

    pub fn set_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&HazardNotification) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    // -----------------------------------------------------------------------
    // Trigger scanning
    // -----------------------------------------------------------------------

    /// Throttled trigger scan. Activates at most one event, the
    /// highest-priority pending event whose trigger holds (registration order
    /// breaks ties), and returns its id.
    pub fn check_triggers(&mut self, player: &PlayerState, now: f64) -> Option<String> {
        if let Some(last) = self.last_check {
            if now - last < self.config.event_trigger_check_interval {
                return None;
            }
        }
        self.last_check = Some(now);

        if self.active.len() >= self.config.max_concurrent_events {
            return None;
        }

        let candidates = self.pending_by_priority();
        let winner = candidates.into_iter().find(|id| self.should_trigger(id, player))?;

        self.activate_event(&winner, player, now);
        Some(winner)
    }

    /// Whether `event_id`'s trigger holds for `player` right now.
    pub fn should_trigger(&mut self, event_id: &str, player: &PlayerState) -> bool {
        let Some(entry) = self.registry.get(event_id) else {
            return false;
        };
        trigger_holds(
            &entry.definition,
            player,
            &self.conditions,
            &mut self.warned,
        )
    }

    /// Activate a pending event immediately, bypassing throttle, trigger and
    /// priority. Completed non-repeatable events stay excluded.
    pub fn force_trigger(&mut self, event_id: &str, player: &PlayerState, now: f64) -> Result<()> {
        if !self.registry.contains_key(event_id) {
            return Err(HazardError::UnknownEvent(event_id.to_string()));
        }
        if !self.pending.contains(event_id) {
            warn!("Hazard event '{}' is not armed, cannot force it", event_id);
            return Err(HazardError::UnknownEvent(event_id.to_string()));
        }
        self.activate_event(event_id, player, now);
        Ok(())
    }

    fn activate_event(&mut self, event_id: &str, player: &PlayerState, now: f64) {
        let Some(entry) = self.registry.get(event_id) else {
            return;
        };
        let definition = &entry.definition;

        let actor_ids: HashSet<String> = definition
            .actors
            .iter()
            .map(|a| a.id.clone())
            .chain(
                definition
                    .actions
                    .iter()
                    .filter(|a| !a.actor_id.is_empty())
                    .map(|a| a.actor_id.clone()),
            )
            .collect();
        let context = EventRuntimeContext::new(event_id, now, *player, actor_ids);
        let name = definition.name.clone();
        let response = definition.required_player_response.clone();

        self.pending.remove(event_id);
        self.active.insert(event_id.to_string(), context);
        self.total_activations += 1;

        info!(
            "Activated hazard event '{}' ({}) at t={:.2}, player {}",
            event_id, name, now, player.position
        );
        self.notify(HazardNotification::Triggered {
            event_id: event_id.to_string(),
        });
        self.notify(HazardNotification::Activated {
            event_id: event_id.to_string(),
            name,
        });
        if let Some(response) = response {
            self.notify(HazardNotification::PlayerResponseRequired {
                event_id: event_id.to_string(),
                response,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Active events
    // -----------------------------------------------------------------------

    /// Refresh every active context, close the events whose criteria are met
    /// and fail the ones that ran out of response time.
    pub fn update_active_events(&mut self, _delta: f64, now: f64, player: &PlayerState) {
        let mut passed = Vec::new();
        let mut to_complete = Vec::new();
        let mut to_fail = Vec::new();

        for event_id in self.sorted_by_registration(self.active.keys()) {
            let Some(entry) = self.registry.get(&event_id) else {
                continue;
            };
            let Some(context) = self.active.get_mut(&event_id) else {
                continue;
            };
            let definition = &entry.definition;

            context.player = *player;
            let verdict = evaluate_completion(
                definition,
                context,
                &self.config,
                &self.completion_checks,
                &mut self.warned,
            );
            if verdict.passed_now {
                passed.push(event_id.clone());
            }
            if verdict.met {
                to_complete.push(event_id);
                continue;
            }

            let limit = definition
                .required_player_response
                .as_ref()
                .and_then(|r| r.time_limit);
            if let Some(limit) = limit {
                if context.elapsed(now) > limit {
                    to_fail.push(event_id);
                }
            }
        }

        for event_id in passed {
            info!("Player passed hazard '{}'", event_id);
            self.notify(HazardNotification::PlayerPassed { event_id });
        }
        for event_id in to_complete {
            let _ = self.complete_event(&event_id, true);
        }
        for event_id in to_fail {
            let _ = self.fail_event(&event_id, "Time limit exceeded");
        }
    }

    /// Evaluate an active event's completion criteria without closing it.
    pub fn check_completion_criteria(&mut self, event_id: &str) -> Option<CompletionChecks> {
        let entry = self.registry.get(event_id)?;
        let context = self.active.get_mut(event_id)?;
        evaluate_completion(
            &entry.definition,
            context,
            &self.config,
            &self.completion_checks,
            &mut self.warned,
        );
        Some(context.last_checks)
    }

    /// Close an active event. Repeatable events are re-armed.
    pub fn complete_event(&mut self, event_id: &str, success: bool) -> Result<()> {
        let Some(mut context) = self.active.remove(event_id) else {
            warn!("Cannot complete '{}': not active", event_id);
            return Err(HazardError::UnknownEvent(event_id.to_string()));
        };
        context.state = if success {
            EventState::Completed
        } else {
            EventState::Failed
        };

        self.completed.insert(event_id.to_string());
        info!(
            "Hazard event '{}' closed ({:?}) after {} completed actions",
            event_id,
            context.state,
            context.completed_action_count
        );
        self.closed.push(ClosedEvent {
            event_id: event_id.to_string(),
            success,
        });
        self.notify(HazardNotification::Completed {
            event_id: event_id.to_string(),
            success,
        });

        let repeatable = self
            .registry
            .get(event_id)
            .is_some_and(|e| e.definition.repeatable);
        if repeatable {
            self.completed.remove(event_id);
            self.pending.insert(event_id.to_string());
            debug!("Re-armed repeatable hazard event '{}'", event_id);
        }
        Ok(())
    }

    pub fn fail_event(&mut self, event_id: &str, reason: &str) -> Result<()> {
        if !self.active.contains_key(event_id) {
            warn!("Cannot fail '{}': not active", event_id);
            return Err(HazardError::UnknownEvent(event_id.to_string()));
        }
        warn!("Hazard event '{}' failed: {}", event_id, reason);
        self.notify(HazardNotification::Failed {
            event_id: event_id.to_string(),
            reason: reason.to_string(),
        });
        self.complete_event(event_id, false)
    }

    /// Score the player's current behaviour against the event's required
    /// response. Does not affect completion. `None` when the event is unknown
    /// or requires no response.
    pub fn validate_player_response(&mut self, event_id: &str, player: &PlayerState) -> Option<bool> {
        let entry = self.registry.get(event_id)?;
        let response = entry.definition.required_player_response.as_ref()?;
        let speed_kmh = player.speed_kmh();

        let correct = match response.kind {
            ResponseKind::Decelerate => match response.target_speed {
                Some(target) => (speed_kmh - target).abs() <= response.speed_tolerance,
                None => self
                    .active
                    .get(event_id)
                    .is_some_and(|ctx| player.speed < ctx.activation_player.speed),
            },
            ResponseKind::Stop => speed_kmh < self.config.stop_speed_threshold_kmh,
            ResponseKind::ChangeLane | ResponseKind::Avoid | ResponseKind::None => true,
        };

        debug!(
            "Response check for '{}': {:?} at {:.1} km/h -> {}",
            event_id, response.kind, speed_kmh, correct
        );
        self.notify(HazardNotification::PlayerResponseValidated {
            event_id: event_id.to_string(),
            correct,
        });
        Some(correct)
    }

    /// Record that an actor reached the end of its movement path.
    pub fn mark_actor_path_completed(&mut self, event_id: &str, actor_id: &str) -> bool {
        match self.active.get_mut(event_id) {
            Some(context) => {
                context.actor_paths_completed.insert(actor_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Record one completed timeline entry for an active event. Called once
    /// per entry; `action_id` need not be unique across entries.
    pub fn record_action_completed(&mut self, event_id: &str, action_id: String) -> bool {
        match self.active.get_mut(event_id) {
            Some(context) => {
                context.completed_action_count += 1;
                context.completed_actions.insert(action_id);
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Prepare zone
    // -----------------------------------------------------------------------

    /// Highest-priority auto-pilot advice for this tick, if any.
    ///
    /// Pending candidates are evaluated before active ones and a candidate
    /// replaces the running best only with strictly higher priority.
    pub fn check_prepare_zone(&self, player: &PlayerState) -> Option<PrepareInstruction> {
        if !player.is_cruising {
            return None;
        }

        let mut best: Option<PrepareInstruction> = None;
        let mut consider = |candidate: PrepareInstruction| {
            if best.as_ref().map_or(true, |b| candidate.priority > b.priority) {
                best = Some(candidate);
            }
        };

        for event_id in self.sorted_by_registration(self.pending.iter()) {
            let Some(entry) = self.registry.get(&event_id) else {
                continue;
            };
            let definition = &entry.definition;
            let (Some(config), Some(position), Some(radius)) = (
                definition.prepare_config.as_ref(),
                definition.trigger_position(),
                definition.trigger_radius(),
            ) else {
                continue;
            };

            let distance = position.distance(player.position);
            let status = if distance <= radius {
                ZoneStatus::InsideTrigger
            } else if distance <= config.prepare_radius {
                ZoneStatus::InPrepareZone
            } else if config.fast_zone_radius.is_some_and(|r| distance <= r) {
                ZoneStatus::InFastZone
            } else {
                continue;
            };

            let instruction = PrepareInstruction::from_config(
                &event_id,
                &definition.name,
                position,
                definition.priority,
                config,
                status,
                distance,
            );
            consider(if status == ZoneStatus::InFastZone {
                instruction.slow_down(config.fast_zone_speed_factor)
            } else {
                instruction
            });
        }

        for event_id in self.sorted_by_registration(self.active.keys()) {
            let (Some(entry), Some(context)) =
                (self.registry.get(&event_id), self.active.get(&event_id))
            else {
                continue;
            };
            let definition = &entry.definition;
            let (Some(config), Some(position), Some(radius)) = (
                definition.prepare_config.as_ref(),
                definition.trigger_position(),
                definition.trigger_radius(),
            ) else {
                continue;
            };

            let distance = position.distance(player.position);
            let braking = config.should_brake || config.should_stop;
            let instruction = if braking && distance <= radius + self.config.active_hazard_buffer {
                PrepareInstruction::from_config(
                    &event_id,
                    &definition.name,
                    position,
                    definition.priority,
                    config,
                    ZoneStatus::InsideTrigger,
                    distance,
                )
            } else if config.lane_offset != 0.0
                && config.offset_hold_distance > 0.0
                && context.distance_travelled(player.position) <= config.offset_hold_distance
            {
                PrepareInstruction::from_config(
                    &event_id,
                    &definition.name,
                    position,
                    definition.priority,
                    config,
                    ZoneStatus::Outside,
                    distance,
                )
                .recovery()
            } else {
                continue;
            };
            consider(instruction);
        }

        best
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn definition(&self, event_id: &str) -> Option<&EventDefinition> {
        self.registry.get(event_id).map(|e| &e.definition)
    }

    pub fn context(&self, event_id: &str) -> Option<&EventRuntimeContext> {
        self.active.get(event_id)
    }

    pub fn last_checks(&self, event_id: &str) -> Option<CompletionChecks> {
        self.active.get(event_id).map(|c| c.last_checks)
    }

    pub fn is_registered(&self, event_id: &str) -> bool {
        self.registry.contains_key(event_id)
    }

    pub fn is_pending(&self, event_id: &str) -> bool {
        self.pending.contains(event_id)
    }

    pub fn is_active(&self, event_id: &str) -> bool {
        self.active.contains_key(event_id)
    }

    pub fn is_completed(&self, event_id: &str) -> bool {
        self.completed.contains(event_id)
    }

    /// Active ids in registration order.
    pub fn active_ids(&self) -> Vec<String> {
        self.sorted_by_registration(self.active.keys())
    }

    /// Pending ids in registration order.
    pub fn pending_ids(&self) -> Vec<String> {
        self.sorted_by_registration(self.pending.iter())
    }

    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn total_activations(&self) -> u64 {
        self.total_activations
    }

    /// Trigger geometry for overlays; empty unless debug visualization is on.
    pub fn debug_zones(&self) -> Vec<DebugZone> {
        if !self.config.enable_debug_visualization {
            return Vec::new();
        }
        self.sorted_by_registration(self.registry.keys())
            .into_iter()
            .filter_map(|event_id| {
                let definition = &self.registry.get(&event_id)?.definition;
                let state = if self.active.contains_key(&event_id) {
                    DebugZoneState::Active
                } else if self.pending.contains(&event_id) {
                    DebugZoneState::Pending
                } else if self.completed.contains(&event_id) {
                    DebugZoneState::Completed
                } else {
                    DebugZoneState::Idle
                };
                Some(DebugZone {
                    center: definition.trigger_position()?,
                    trigger_radius: definition.trigger_radius()?,
                    prepare_radius: definition.prepare_config.as_ref().map(|p| p.prepare_radius),
                    state,
                    event_id,
                })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Outbound queues
    // -----------------------------------------------------------------------

    pub fn drain_notifications(&mut self) -> Vec<HazardNotification> {
        std::mem::take(&mut self.notifications)
    }

    /// Events closed since the last call, in closing order.
    pub fn take_closed(&mut self) -> Vec<ClosedEvent> {
        std::mem::take(&mut self.closed)
    }

    fn notify(&mut self, notification: HazardNotification) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&notification);
        }
        self.notifications.push(notification);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Drop all runtime state and re-arm every registered event.
    pub fn reset(&mut self) {
        self.active.clear();
        self.completed.clear();
        self.notifications.clear();
        self.closed.clear();
        self.warned.clear();
        self.last_check = None;
        self.pending = self.registry.keys().cloned().collect();
    }

    /// Drop everything, definitions and handlers included.
    pub fn dispose(&mut self) {
        self.registry.clear();
        self.conditions.clear();
        self.completion_checks.clear();
        self.listener = None;
        self.reset();
        self.total_activations = 0;
    }

    // -----------------------------------------------------------------------
    // Ordering helpers
    // -----------------------------------------------------------------------

    fn seq_of(&self, event_id: &str) -> u64 {
        self.registry.get(event_id).map_or(u64::MAX, |e| e.seq)
    }

    fn sorted_by_registration<'a>(&self, ids: impl Iterator<Item = &'a String>) -> Vec<String> {
        let mut ids: Vec<String> = ids.cloned().collect();
        ids.sort_by_key(|id| self.seq_of(id));
        ids
    }

    /// Pending ids, descending priority, registration order on ties.
    fn pending_by_priority(&self) -> Vec<String> {
        let mut ids = self.sorted_by_registration(self.pending.iter());
        ids.sort_by_key(|id| {
            std::cmp::Reverse(self.registry.get(id).map_or(i32::MIN, |e| e.definition.priority))
        });
        ids
    }
}

// ---------------------------------------------------------------------------
// Trigger evaluation
// ---------------------------------------------------------------------------

fn trigger_holds(
    definition: &EventDefinition,
    player: &PlayerState,
    conditions: &HashMap<String, PlayerPredicate>,
    warned: &mut HashSet<String>,
) -> bool {
    match &definition.trigger {
        Trigger::Proximity {
            position,
            radius,
            required_speed,
        } => {
            let (Some(position), Some(radius)) = (position, radius) else {
                if warned.insert(format!("trigger:{}", definition.id)) {
                    warn!(
                        "Hazard event '{}' has a proximity trigger without position/radius",
                        definition.id
                    );
                }
                return false;
            };
            if position.distance(player.position) > *radius {
                return false;
            }
            required_speed
                .as_ref()
                .map_or(true, |range| range.contains(player.speed_kmh()))
        }
        Trigger::Time { .. } => false,
        Trigger::Condition { name } => match conditions.get(name) {
            Some(predicate) => predicate(player),
            None => {
                if warned.insert(format!("condition:{}", name)) {
                    warn!(
                        "Hazard event '{}' references unknown condition '{}'",
                        definition.id, name
                    );
                }
                false
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Completion evaluation
// ---------------------------------------------------------------------------

struct CompletionVerdict {
    met: bool,
    /// The player-passed check became true for the first time this call.
    passed_now: bool,
}

fn evaluate_completion(
    definition: &EventDefinition,
    context: &mut EventRuntimeContext,
    config: &EngineConfig,
    completion_checks: &HashMap<String, ContextPredicate>,
    warned: &mut HashSet<String>,
) -> CompletionVerdict {
    let mut checks = CompletionChecks::default();
    let mut passed_now = false;

    match &definition.completion_criteria {
        None => {
            checks.all_actions = Some(context.completed_action_count >= definition.actions.len());
        }
        Some(criteria) => {
            if criteria.actor_paths_completed {
                checks.actor_paths = Some(
                    definition
                        .movement_actor_ids()
                        .all(|id| context.actor_paths_completed.contains(id)),
                );
            }

            if criteria.player_passed {
                let passed = match (definition.trigger_position(), definition.trigger_radius()) {
                    (Some(position), Some(radius)) => {
                        let distance = position.distance(context.player.position);
                        track_passage(context, distance, radius, config.player_passed_margin)
                    }
                    _ => false,
                };
                if passed && !context.player_passed_notified {
                    context.player_passed_notified = true;
                    passed_now = true;
                }
                checks.player_passed = Some(passed);

                if passed && (criteria.min_speed.is_some() || criteria.max_speed.is_some()) {
                    let band = SpeedRange {
                        min: criteria.min_speed,
                        max: criteria.max_speed,
                    };
                    checks.speed_ok = Some(band.contains(context.player.speed_kmh()));
                }
            }

            if let Some(name) = &criteria.custom {
                checks.custom = Some(match completion_checks.get(name) {
                    Some(predicate) => predicate(context),
                    None => {
                        if warned.insert(format!("completion:{}", name)) {
                            warn!(
                                "Hazard event '{}' references unknown completion check '{}'",
                                definition.id, name
                            );
                        }
                        false
                    }
                });
            }
        }
    }

    context.last_checks = checks;
    CompletionVerdict {
        met: checks.all_met(),
        passed_now,
    }
}

/// Hysteresis-based "has the player passed the hazard" tracking.
///
/// Passed requires: the player was once inside the trigger radius, is now
/// moving away, and is more than `margin` beyond the closest approach. Once
/// declared it stays declared for the activation.
fn track_passage(context: &mut EventRuntimeContext, distance: f32, radius: f32, margin: f32) -> bool {
    context.min_distance_reached = context.min_distance_reached.min(distance);
    let moving_away = context.previous_distance.is_some_and(|prev| distance > prev);
    context.previous_distance = Some(distance);

    if context.player_passed_notified {
        return true;
    }
    context.min_distance_reached <= radius
        && moving_away
        && distance - context.min_distance_reached > margin
}
