//! Error type shared by every fallible engine operation.
//!
//! None of these ever escape a tick: the engine logs them and moves on to the
//! next event. They are returned from the registration and lookup APIs so
//! callers (and tests) can observe what was rejected.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HazardError>;

#[derive(Debug, Error)]
pub enum HazardError {
    #[error("event '{0}' is already registered")]
    DuplicateEvent(String),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("event '{id}' has an invalid definition: {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("no script registered under '{0}'")]
    UnknownScript(String),

    #[error("script '{name}' failed: {reason}")]
    ScriptFailed { name: String, reason: String },

    #[error("no scene object registered under '{0}'")]
    UnknownSceneObject(String),

    #[error("scene object '{id}' rejected command '{command}': {reason}")]
    SceneCommand {
        id: String,
        command: String,
        reason: String,
    },

    #[error("scenario I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}
