//! `hazard.*` outbound protocol.
//!
//! This module owns **every message the engine reports to its host**: the
//! lifecycle notifications raised while orchestrating events, and the
//! envelope used when they are published outside the process.
//!
//! ## Design rules
//!
//! 1. Every type is `Serialize + Deserialize` with snake_case JSON.
//! 2. No live handles (actors, scene objects, closures) appear here.
//! 3. Every published message carries `frame: u64` and `session: String`.

use crate::definition::RequiredPlayerResponse;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Common envelope
// ---------------------------------------------------------------------------

/// Every published message is wrapped in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardEnvelope<T> {
    pub session: String,
    pub frame: u64,
    pub payload: T,
}

impl<T> HazardEnvelope<T> {
    pub fn new(session: impl Into<String>, frame: u64, payload: T) -> Self {
        Self {
            session: session.into(),
            frame,
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle notifications
// ---------------------------------------------------------------------------

/// Raised by the event manager, in order, as things happen during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HazardNotification {
    Triggered {
        event_id: String,
    },
    Activated {
        event_id: String,
        name: String,
    },
    Completed {
        event_id: String,
        success: bool,
    },
    Failed {
        event_id: String,
        reason: String,
    },
    PlayerPassed {
        event_id: String,
    },
    PlayerResponseRequired {
        event_id: String,
        response: RequiredPlayerResponse,
    },
    PlayerResponseValidated {
        event_id: String,
        correct: bool,
    },
}

impl HazardNotification {
    pub fn event_id(&self) -> &str {
        match self {
            HazardNotification::Triggered { event_id }
            | HazardNotification::Activated { event_id, .. }
            | HazardNotification::Completed { event_id, .. }
            | HazardNotification::Failed { event_id, .. }
            | HazardNotification::PlayerPassed { event_id }
            | HazardNotification::PlayerResponseRequired { event_id, .. }
            | HazardNotification::PlayerResponseValidated { event_id, .. } => event_id,
        }
    }

    /// Subject this notification is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            HazardNotification::Triggered { .. } => subjects::EVENT_TRIGGERED,
            HazardNotification::Activated { .. } => subjects::EVENT_ACTIVATED,
            HazardNotification::Completed { .. } => subjects::EVENT_COMPLETED,
            HazardNotification::Failed { .. } => subjects::EVENT_FAILED,
            HazardNotification::PlayerPassed { .. } => subjects::PLAYER_PASSED,
            HazardNotification::PlayerResponseRequired { .. } => subjects::RESPONSE_REQUIRED,
            HazardNotification::PlayerResponseValidated { .. } => subjects::RESPONSE_VALIDATED,
        }
    }
}

// ---------------------------------------------------------------------------
// Subject helpers
// ---------------------------------------------------------------------------

/// All subjects used by the hazard protocol, as constants.
pub mod subjects {
    pub const EVENT_TRIGGERED: &str = "hazard.event.triggered";
    pub const EVENT_ACTIVATED: &str = "hazard.event.activated";
    pub const EVENT_COMPLETED: &str = "hazard.event.completed";
    pub const EVENT_FAILED: &str = "hazard.event.failed";

    pub const PLAYER_PASSED: &str = "hazard.player.passed";
    pub const RESPONSE_REQUIRED: &str = "hazard.player.response_required";
    pub const RESPONSE_VALIDATED: &str = "hazard.player.response_validated";

    pub const PREPARE_INSTRUCTION: &str = "hazard.prepare.instruction";
    pub const STATS: &str = "hazard.stats";
}
