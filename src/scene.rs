//! Scene object subsystem: controllable world objects (traffic signals,
//! barriers, gates …) and the registry that names them.

use crate::error::{HazardError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A world object driven through a generic string command interface.
pub trait SceneObject {
    fn execute_command(&mut self, command: &str, params: &Value) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds every controllable scene object, keyed by id.
///
/// Constructed explicitly and owned by the engine; there is no global
/// instance.
pub struct SceneObjectRegistry {
    objects: HashMap<String, Box<dyn SceneObject>>,
}

impl SceneObjectRegistry {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: impl Into<String>, object: Box<dyn SceneObject>) {
        self.objects.insert(id.into(), object);
    }

    pub fn remove(&mut self, id: &str) -> Option<Box<dyn SceneObject>> {
        self.objects.remove(id)
    }

    pub fn get_object(&mut self, id: &str) -> Option<&mut dyn SceneObject> {
        self.objects
            .get_mut(id)
            .map(|object| object.as_mut() as &mut dyn SceneObject)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Resolve `id` and run `command` on it.
    pub fn execute(&mut self, id: &str, command: &str, params: &Value) -> Result<()> {
        let object = self
            .get_object(id)
            .ok_or_else(|| HazardError::UnknownSceneObject(id.to_string()))?;
        object.execute_command(command, params)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

impl Default for SceneObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Traffic signal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignalState {
    Red,
    Yellow,
    Green,
    Off,
}

/// Stock scene object: a traffic signal head.
///
/// Commands:
/// - `set_state` `{ "state": "red" | "yellow" | "green" | "off" }`
/// - `blink` `{ "enabled": bool, "rate": f32 }`
#[derive(Debug, Clone)]
pub struct TrafficSignal {
    pub id: String,
    pub state: SignalState,
    pub blinking: bool,
    /// Blinks per second while `blinking`.
    pub blink_rate: f32,
}

impl TrafficSignal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: SignalState::Off,
            blinking: false,
            blink_rate: 1.0,
        }
    }

    fn reject(&self, command: &str, reason: impl Into<String>) -> HazardError {
        HazardError::SceneCommand {
            id: self.id.clone(),
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}

impl SceneObject for TrafficSignal {
    fn execute_command(&mut self, command: &str, params: &Value) -> Result<()> {
        match command {
            "set_state" => {
                let raw = params
                    .get("state")
                    .cloned()
                    .ok_or_else(|| self.reject(command, "missing 'state'"))?;
                self.state = serde_json::from_value(raw)
                    .map_err(|e| self.reject(command, e.to_string()))?;
                debug!("Signal {} -> {:?}", self.id, self.state);
                Ok(())
            }
            "blink" => {
                self.blinking = params
                    .get("enabled")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                if let Some(rate) = params.get("rate").and_then(Value::as_f64) {
                    self.blink_rate = rate as f32;
                }
                Ok(())
            }
            other => Err(self.reject(other, "unknown command")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_executes_on_named_object() {
        let mut registry = SceneObjectRegistry::new();
        registry.insert("signal_1", Box::new(TrafficSignal::new("signal_1")));
        assert_eq!(registry.len(), 1);

        registry
            .execute("signal_1", "set_state", &json!({ "state": "red" }))
            .unwrap();
        assert!(registry.contains("signal_1"));
    }

    #[test]
    fn unknown_object_is_an_error() {
        let mut registry = SceneObjectRegistry::default();
        let err = registry
            .execute("nope", "set_state", &json!({}))
            .unwrap_err();
        assert!(matches!(err, HazardError::UnknownSceneObject(id) if id == "nope"));
    }

    #[test]
    fn signal_accepts_state_and_blink() {
        let mut signal = TrafficSignal::new("s");
        signal
            .execute_command("set_state", &json!({ "state": "yellow" }))
            .unwrap();
        assert_eq!(signal.state, SignalState::Yellow);

        signal
            .execute_command("blink", &json!({ "enabled": true, "rate": 2.0 }))
            .unwrap();
        assert!(signal.blinking);
        assert!((signal.blink_rate - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn signal_rejects_bad_commands() {
        let mut signal = TrafficSignal::new("s");
        assert!(signal.execute_command("explode", &Value::Null).is_err());
        assert!(signal
            .execute_command("set_state", &json!({ "state": "purple" }))
            .is_err());
        assert_eq!(signal.state, SignalState::Off);
    }
}
