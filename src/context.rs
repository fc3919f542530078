//! Per-activation runtime state.

use crate::types::{PlayerState, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    Active,
    Completed,
    Failed,
}

/// Outcome of the most recent completion evaluation.
///
/// `None` means the check is not configured for the event. `speed_ok` only
/// becomes `Some(false)` after the player has passed; it keeps the event open
/// and is surfaced here so the caller can apply a penalty.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionChecks {
    pub all_actions: Option<bool>,
    pub actor_paths: Option<bool>,
    pub player_passed: Option<bool>,
    pub speed_ok: Option<bool>,
    pub custom: Option<bool>,
}

impl CompletionChecks {
    pub fn all_met(&self) -> bool {
        [
            self.all_actions,
            self.actor_paths,
            self.player_passed,
            self.speed_ok,
            self.custom,
        ]
        .iter()
        .all(|check| check.unwrap_or(true))
    }
}

/// Mutable state of one activation. Exists exactly while the event is active.
#[derive(Debug, Clone)]
pub struct EventRuntimeContext {
    pub event_id: String,
    pub state: EventState,
    pub activated_at: f64,
    /// Player snapshot at activation; never updated afterwards.
    pub activation_player: PlayerState,
    /// Latest player snapshot, refreshed every update.
    pub player: PlayerState,
    pub active_actors: HashSet<String>,
    pub completed_actions: HashSet<String>,
    /// Timeline entries completed so far. Entries sharing a completion id
    /// each count once.
    pub completed_action_count: usize,
    pub previous_distance: Option<f32>,
    /// Closest approach to the trigger point; never increases.
    pub min_distance_reached: f32,
    pub actor_paths_completed: HashSet<String>,
    pub player_passed_notified: bool,
    pub last_checks: CompletionChecks,
}

impl EventRuntimeContext {
    pub fn new(
        event_id: impl Into<String>,
        now: f64,
        player: PlayerState,
        actor_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            state: EventState::Active,
            activated_at: now,
            activation_player: player,
            player,
            active_actors: actor_ids.into_iter().collect(),
            completed_actions: HashSet::new(),
            completed_action_count: 0,
            previous_distance: None,
            min_distance_reached: f32::INFINITY,
            actor_paths_completed: HashSet::new(),
            player_passed_notified: false,
            last_checks: CompletionChecks::default(),
        }
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        now - self.activated_at
    }

    /// Straight-line distance covered since activation.
    pub fn distance_travelled(&self, current: Vec3) -> f32 {
        self.activation_player.position.distance(current)
    }
}
