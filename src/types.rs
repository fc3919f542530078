//! Core types shared across all modules.

use serde::{Deserialize, Serialize};

/// Conversion factor from metres per second to kilometres per hour.
pub const MS_TO_KMH: f32 = 3.6;

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f32 {
        self.sub(other).length()
    }

    /// Unit vector in the same direction, or zero for a zero-length vector.
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len <= f32::EPSILON {
            Vec3::zero()
        } else {
            self.scale(1.0 / len)
        }
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Player state
// ---------------------------------------------------------------------------

/// Read-only kinematic snapshot of the trainee vehicle, supplied every tick
/// by the driving/camera layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    pub position: Vec3,
    /// Scalar speed in m/s.
    pub speed: f32,
    /// Heading in radians around the vertical axis.
    pub heading: f32,
    /// True while the auto-pilot cruise mode is driving the vehicle.
    pub is_cruising: bool,
}

impl PlayerState {
    pub fn new(position: Vec3, speed: f32) -> Self {
        Self {
            position,
            speed,
            heading: 0.0,
            is_cruising: false,
        }
    }

    pub fn cruising(mut self) -> Self {
        self.is_cruising = true;
        self
    }

    pub fn speed_kmh(&self) -> f32 {
        self.speed * MS_TO_KMH
    }
}

// ---------------------------------------------------------------------------
// Stats & config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub registered: usize,
    pub pending: usize,
    pub active: usize,
    pub completed_cached: usize,
    pub total_ticks: u64,
    pub total_activations: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Expose trigger/prepare radii through `debug_zones`.
    pub enable_debug_visualization: bool,
    /// No new activation happens while this many events are active.
    pub max_concurrent_events: usize,
    /// Minimum seconds between two trigger scans.
    pub event_trigger_check_interval: f64,
    /// Recession beyond the closest approach required before the player
    /// counts as having passed a hazard.
    pub player_passed_margin: f32,
    /// Extra radius around an active hazard inside which brake/stop
    /// instructions keep being issued.
    pub active_hazard_buffer: f32,
    /// Below this speed the player counts as stopped.
    pub stop_speed_threshold_kmh: f32,
    /// Capacity of the completed-event cache.
    pub completed_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_debug_visualization: false,
            max_concurrent_events: 5,
            event_trigger_check_interval: 0.1,
            player_passed_margin: 0.5,
            active_hazard_buffer: 5.0,
            stop_speed_threshold_kmh: 5.0,
            completed_cache_capacity: 20,
        }
    }
}
