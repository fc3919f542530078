//! Declarative hazard event definitions.
//!
//! This is the authoring surface for scenario designers, so every type here
//! is plain data with snake_case JSON. Live behaviour (custom trigger
//! predicates, completion checks, scripts) is referenced by name and
//! resolved against handlers registered on the engine.

use crate::error::{HazardError, Result};
use crate::types::Vec3;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// Speed gate in km/h. Either bound may be omitted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SpeedRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f32>,
}

impl SpeedRange {
    pub fn contains(&self, speed_kmh: f32) -> bool {
        if let Some(min) = self.min {
            if speed_kmh < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if speed_kmh > max {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires when the player is within `radius` of `position`.
    ///
    /// Both fields are optional on the wire so a malformed definition still
    /// loads; it simply never fires.
    Proximity {
        #[serde(default)]
        position: Option<Vec3>,
        #[serde(default)]
        radius: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        required_speed: Option<SpeedRange>,
    },
    /// Absolute-clock trigger. Reserved: never fires.
    Time { at: f64 },
    /// Delegates to a player-state predicate registered under `name`.
    Condition { name: String },
}

impl Trigger {
    pub fn proximity(position: Vec3, radius: f32) -> Self {
        Trigger::Proximity {
            position: Some(position),
            radius: Some(radius),
            required_speed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

/// Identity and asset references of an orchestrated entity. The assets are
/// owned by the rendering layer; the engine only carries the references.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActorSpec {
    pub id: String,
    /// Game-defined archetype string (e.g. "pedestrian", "vehicle/truck").
    #[serde(default)]
    pub archetype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,
    #[serde(default)]
    pub animation_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_position: Option<Vec3>,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LightType {
    Headlights,
    Brake,
    Hazard,
    TurnLeft,
    TurnRight,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Movement {
        path: Vec<Vec3>,
        speed: f32,
        #[serde(rename = "loop", default)]
        looped: bool,
    },
    Animation {
        name: String,
        #[serde(rename = "loop", default)]
        looped: bool,
        #[serde(default)]
        fade_in: f32,
        #[serde(default)]
        fade_out: f32,
    },
    Light {
        light_type: LightType,
        enabled: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        blink_rate: Option<f32>,
    },
    Sound {
        url: String,
        #[serde(default = "default_volume")]
        volume: f32,
        #[serde(rename = "loop", default)]
        looped: bool,
    },
    Script {
        name: String,
    },
    PrepareAnimation {
        urls: Vec<String>,
    },
    SceneObject {
        target_id: String,
        command: String,
        #[serde(default)]
        params: serde_json::Value,
    },
    /// Any `type` this engine does not know; skipped at dispatch.
    #[serde(other)]
    Unknown,
}

fn default_volume() -> f32 {
    1.0
}

impl ActionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ActionKind::Movement { .. } => "movement",
            ActionKind::Animation { .. } => "animation",
            ActionKind::Light { .. } => "light",
            ActionKind::Sound { .. } => "sound",
            ActionKind::Script { .. } => "script",
            ActionKind::PrepareAnimation { .. } => "prepare_animation",
            ActionKind::SceneObject { .. } => "scene_object",
            ActionKind::Unknown => "unknown",
        }
    }

    /// Scene-object commands address the registry, not an actor handle.
    pub fn needs_actor(&self) -> bool {
        !matches!(self, ActionKind::SceneObject { .. } | ActionKind::Unknown)
    }
}

/// One entry of an event's timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventAction {
    #[serde(default)]
    pub actor_id: String,
    /// Start offset in seconds relative to activation.
    #[serde(default)]
    pub time: f64,
    /// Seconds until the action counts as completed. Absent means the action
    /// completes as soon as it starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl EventAction {
    pub fn new(actor_id: impl Into<String>, time: f64, kind: ActionKind) -> Self {
        Self {
            actor_id: actor_id.into(),
            time,
            duration: None,
            kind,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

// ---------------------------------------------------------------------------
// Player response & completion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Decelerate,
    Stop,
    ChangeLane,
    Avoid,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequiredPlayerResponse {
    pub kind: ResponseKind,
    /// Target speed (km/h) for `decelerate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_speed: Option<f32>,
    /// Half-width (km/h) of the accepted band around `target_speed`.
    #[serde(default = "default_speed_tolerance")]
    pub speed_tolerance: f32,
    /// Seconds after activation before the event fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<f64>,
}

fn default_speed_tolerance() -> f32 {
    5.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionCriteria {
    /// Every movement action's actor must have finished its path.
    pub actor_paths_completed: bool,
    /// The player must have approached and then left the trigger zone.
    pub player_passed: bool,
    /// Speed bounds (km/h) applied once the player has passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f32>,
    /// Name of a registered context predicate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

// ---------------------------------------------------------------------------
// Prepare zone
// ---------------------------------------------------------------------------

/// Anticipatory auto-pilot advice issued before the hazard fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrepareConfig {
    /// Radius around the trigger position where advice starts.
    pub prepare_radius: f32,
    pub should_brake: bool,
    pub should_stop: bool,
    /// Seconds the brake is expected to be held.
    pub brake_duration: f32,
    /// Fraction of cruise speed to aim for while braking.
    pub target_speed_factor: f32,
    /// Lateral lane offset in metres (positive = right).
    pub lane_offset: f32,
    /// Distance travelled after activation during which the offset is held.
    pub offset_hold_distance: f32,
    /// Seconds the trainee has to click/confirm the reaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_deadline: Option<f32>,
    /// Optional outer ring where only a speed reduction is advised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_zone_radius: Option<f32>,
    pub fast_zone_speed_factor: f32,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            prepare_radius: 40.0,
            should_brake: false,
            should_stop: false,
            brake_duration: 0.0,
            target_speed_factor: 1.0,
            lane_offset: 0.0,
            offset_hold_distance: 0.0,
            click_deadline: None,
            fast_zone_radius: None,
            fast_zone_speed_factor: 0.8,
        }
    }
}

// ---------------------------------------------------------------------------
// Event definition
// ---------------------------------------------------------------------------

/// Immutable description of a hazard event. Created once at registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub trigger: Trigger,
    #[serde(default)]
    pub actors: Vec<ActorSpec>,
    #[serde(default)]
    pub actions: Vec<EventAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_player_response: Option<RequiredPlayerResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_criteria: Option<CompletionCriteria>,
    /// Higher wins.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepare_config: Option<PrepareConfig>,
}

impl EventDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            trigger,
            actors: Vec::new(),
            actions: Vec::new(),
            required_player_response: None,
            completion_criteria: None,
            priority: 0,
            repeatable: false,
            prepare_config: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_action(mut self, action: EventAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_actor(mut self, actor: ActorSpec) -> Self {
        self.actors.push(actor);
        self
    }

    pub fn with_completion(mut self, criteria: CompletionCriteria) -> Self {
        self.completion_criteria = Some(criteria);
        self
    }

    pub fn with_response(mut self, response: RequiredPlayerResponse) -> Self {
        self.required_player_response = Some(response);
        self
    }

    pub fn with_prepare(mut self, prepare: PrepareConfig) -> Self {
        self.prepare_config = Some(prepare);
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// Trigger position, for proximity triggers that carry one.
    pub fn trigger_position(&self) -> Option<Vec3> {
        match &self.trigger {
            Trigger::Proximity { position, .. } => *position,
            _ => None,
        }
    }

    pub fn trigger_radius(&self) -> Option<f32> {
        match &self.trigger {
            Trigger::Proximity { radius, .. } => *radius,
            _ => None,
        }
    }

    /// Actor ids of every movement action, in timeline order.
    pub fn movement_actor_ids(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().filter_map(|a| match a.kind {
            ActionKind::Movement { .. } => Some(a.actor_id.as_str()),
            _ => None,
        })
    }

    /// Structural checks applied at registration.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(HazardError::InvalidDefinition {
                id: self.id.clone(),
                reason: "empty id".into(),
            });
        }
        for action in &self.actions {
            if !action.time.is_finite() || action.time < 0.0 {
                return Err(HazardError::InvalidDefinition {
                    id: self.id.clone(),
                    reason: format!("action start offset {} is negative", action.time),
                });
            }
            if matches!(action.duration, Some(d) if !d.is_finite() || d < 0.0) {
                return Err(HazardError::InvalidDefinition {
                    id: self.id.clone(),
                    reason: format!("{} action has a negative duration", action.kind.type_name()),
                });
            }
            if action.kind.needs_actor() && action.actor_id.is_empty() {
                return Err(HazardError::InvalidDefinition {
                    id: self.id.clone(),
                    reason: format!("{} action has no actor", action.kind.type_name()),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
