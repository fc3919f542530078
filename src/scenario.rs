//! Scenario files and the route-following player driver.
//!
//! A scenario is a JSON document describing one training drive: the route
//! the trainee's vehicle cruises along, the scene objects placed on it and
//! the hazard events to orchestrate.
//!
//! ```json
//! {
//!   "name": "school zone",
//!   "session": "demo",
//!   "route": { "start": {"x":0,"y":0,"z":0}, "end": {"x":0,"y":0,"z":-300}, "cruise_speed": 13.9 },
//!   "traffic_signals": ["signal_main"],
//!   "events": [ ... ]
//! }
//! ```

use crate::definition::{ActorSpec, EventDefinition};
use crate::error::Result;
use crate::prepare::PrepareInstruction;
use crate::types::{PlayerState, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub start: Vec3,
    pub end: Vec3,
    /// Metres per second.
    pub cruise_speed: f32,
}

impl Route {
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    pub fn direction(&self) -> Vec3 {
        self.end.sub(self.start).normalized()
    }

    /// Horizontal unit vector to the right of travel (Y up).
    pub fn lateral(&self) -> Vec3 {
        let d = self.direction();
        Vec3::new(-d.z, 0.0, d.x).normalized()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default = "default_session")]
    pub session: String,
    pub route: Route,
    /// Seconds between an event's activation and its actors becoming
    /// resolvable, emulating asset instantiation.
    #[serde(default)]
    pub actor_spawn_delay: f64,
    #[serde(default)]
    pub traffic_signals: Vec<String>,
    #[serde(default)]
    pub events: Vec<EventDefinition>,
}

fn default_session() -> String {
    "default".into()
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Actors declared by `event_id`.
    pub fn actors_of(&self, event_id: &str) -> &[ActorSpec] {
        self.events
            .iter()
            .find(|e| e.id == event_id)
            .map_or(&[], |e| e.actors.as_slice())
    }

    /// Seconds needed to drive the whole route at cruise speed.
    pub fn nominal_duration(&self) -> f64 {
        if self.route.cruise_speed <= 0.0 {
            return 0.0;
        }
        (self.route.length() / self.route.cruise_speed) as f64
    }
}

// ---------------------------------------------------------------------------
// Player driver
// ---------------------------------------------------------------------------

/// Auto-pilot stand-in: cruises the route and obeys prepare instructions.
#[derive(Debug, Clone)]
pub struct PlayerDriver {
    route: Route,
    travelled: f32,
    speed: f32,
    lane_offset: f32,
    /// m/s² when speeding back up.
    pub acceleration: f32,
    /// m/s² when braking.
    pub deceleration: f32,
    /// m/s of sideways drift towards the requested lane offset.
    pub lateral_speed: f32,
}

impl PlayerDriver {
    pub fn new(route: Route) -> Self {
        let speed = route.cruise_speed;
        Self {
            route,
            travelled: 0.0,
            speed,
            lane_offset: 0.0,
            acceleration: 2.5,
            deceleration: 6.0,
            lateral_speed: 1.5,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn lane_offset(&self) -> f32 {
        self.lane_offset
    }

    pub fn travelled(&self) -> f32 {
        self.travelled
    }

    pub fn finished(&self) -> bool {
        self.travelled >= self.route.length()
    }

    pub fn state(&self) -> PlayerState {
        let position = self
            .route
            .start
            .add(self.route.direction().scale(self.travelled))
            .add(self.route.lateral().scale(self.lane_offset));
        let d = self.route.direction();
        PlayerState {
            position,
            speed: self.speed,
            heading: d.x.atan2(d.z),
            is_cruising: true,
        }
    }

    /// Drive for `dt` seconds under the given advice.
    pub fn update(&mut self, dt: f32, instruction: Option<&PrepareInstruction>) {
        let cruise = self.route.cruise_speed;
        let target_speed = match instruction {
            Some(i) if i.should_stop => 0.0,
            Some(i) => cruise * i.target_speed_factor,
            None => cruise,
        };
        let target_offset = instruction.map_or(0.0, |i| i.lane_offset);

        self.speed = if self.speed > target_speed {
            (self.speed - self.deceleration * dt).max(target_speed)
        } else {
            (self.speed + self.acceleration * dt).min(target_speed)
        };
        self.lane_offset = approach(self.lane_offset, target_offset, self.lateral_speed * dt);
        self.travelled = (self.travelled + self.speed * dt).min(self.route.length());
    }
}

fn approach(current: f32, target: f32, step: f32) -> f32 {
    if (target - current).abs() <= step {
        target
    } else if target > current {
        current + step
    } else {
        current - step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::PrepareConfig;
    use crate::prepare::ZoneStatus;

    fn straight() -> Route {
        Route {
            start: Vec3::zero(),
            end: Vec3::new(0.0, 0.0, -100.0),
            cruise_speed: 10.0,
        }
    }

    fn advice(config: PrepareConfig) -> PrepareInstruction {
        PrepareInstruction::from_config(
            "e",
            "E",
            Vec3::zero(),
            0,
            &config,
            ZoneStatus::InPrepareZone,
            10.0,
        )
    }

    #[test]
    fn cruises_to_the_end_of_the_route() {
        let mut driver = PlayerDriver::new(straight());
        for _ in 0..120 {
            driver.update(0.1, None);
        }
        assert!(driver.finished());
        assert_eq!(driver.state().position, Vec3::new(0.0, 0.0, -100.0));
        assert!(driver.state().is_cruising);
    }

    #[test]
    fn stops_when_told_to() {
        let mut driver = PlayerDriver::new(straight());
        let stop = advice(PrepareConfig {
            should_stop: true,
            ..Default::default()
        });
        for _ in 0..30 {
            driver.update(0.1, Some(&stop));
        }
        assert_eq!(driver.speed(), 0.0);
        let parked = driver.travelled();
        driver.update(0.1, Some(&stop));
        assert_eq!(driver.travelled(), parked);
    }

    #[test]
    fn drifts_towards_lane_offset_and_back() {
        let mut driver = PlayerDriver::new(straight());
        let offset = advice(PrepareConfig {
            lane_offset: 1.5,
            ..Default::default()
        });
        for _ in 0..20 {
            driver.update(0.1, Some(&offset));
        }
        assert_eq!(driver.lane_offset(), 1.5);
        for _ in 0..20 {
            driver.update(0.1, None);
        }
        assert_eq!(driver.lane_offset(), 0.0);
    }

    #[test]
    fn parses_minimal_scenario() {
        let json = r#"{
            "name": "empty road",
            "route": { "start": {"x":0,"y":0,"z":0}, "end": {"x":0,"y":0,"z":-50}, "cruise_speed": 10 }
        }"#;
        let scenario = Scenario::from_json(json).unwrap();
        assert_eq!(scenario.session, "default");
        assert!(scenario.events.is_empty());
        assert!((scenario.nominal_duration() - 5.0).abs() < 1e-6);
        assert!(scenario.actors_of("missing").is_empty());
    }
}
