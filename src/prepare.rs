//! Prepare-zone instructions handed to the auto-pilot.

use crate::definition::PrepareConfig;
use crate::types::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    InPrepareZone,
    InsideTrigger,
    InFastZone,
    /// Past the hazard; only the lane offset recovery still applies.
    Outside,
}

/// Advisory derived for the current tick from the best-priority candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareInstruction {
    pub event_id: String,
    pub event_name: String,
    pub trigger_position: Vec3,
    pub priority: i32,
    pub should_brake: bool,
    pub should_stop: bool,
    pub brake_duration: f32,
    /// Fraction of cruise speed to hold (1.0 = full speed).
    pub target_speed_factor: f32,
    pub lane_offset: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_deadline: Option<f32>,
    pub zone_status: ZoneStatus,
    /// Player distance to the trigger position.
    pub distance: f32,
}

impl PrepareInstruction {
    /// Full advice from a prepare config.
    pub(crate) fn from_config(
        event_id: &str,
        event_name: &str,
        trigger_position: Vec3,
        priority: i32,
        config: &PrepareConfig,
        zone_status: ZoneStatus,
        distance: f32,
    ) -> Self {
        Self {
            event_id: event_id.to_string(),
            event_name: event_name.to_string(),
            trigger_position,
            priority,
            should_brake: config.should_brake,
            should_stop: config.should_stop,
            brake_duration: config.brake_duration,
            target_speed_factor: config.target_speed_factor,
            lane_offset: config.lane_offset,
            click_deadline: config.click_deadline,
            zone_status,
            distance,
        }
    }

    /// Speed reduction only: no brake, stop or offset.
    pub(crate) fn slow_down(mut self, factor: f32) -> Self {
        self.should_brake = false;
        self.should_stop = false;
        self.brake_duration = 0.0;
        self.lane_offset = 0.0;
        self.click_deadline = None;
        self.target_speed_factor = factor;
        self
    }

    /// Full speed with the lane offset held, so the vehicle re-centres
    /// gradually once the hold distance runs out.
    pub(crate) fn recovery(mut self) -> Self {
        self.should_brake = false;
        self.should_stop = false;
        self.brake_duration = 0.0;
        self.click_deadline = None;
        self.target_speed_factor = 1.0;
        self
    }
}
