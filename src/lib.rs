//! Hazard Events
//!
//! Orchestrates scripted traffic hazards (a pedestrian stepping out, a
//! braking truck, a signal turning red) for driving-simulation trainers.
//!
//! ## Architecture
//!
//! ```text
//! HazardRunner  (runner.rs)              ← paced tick loop, JSON-line output
//!   └── HazardEngine  (engine.rs)        ← per-tick control flow
//!         ├── EventManager       (manager.rs)  ← registry, triggers, completion,
//!         │                                       prepare zones
//!         ├── TimelineExecutor   (timeline.rs) ← timed actor commands
//!         ├── CompletedEventCache(cache.rs)    ← bounded completion history
//!         └── SceneObjectRegistry(scene.rs)    ← named world objects
//! ```
//!
//! Definitions are plain data ([`definition`]); everything live (actors,
//! scene objects, scripts, condition predicates) is registered on the
//! engine or lent to it for a single tick.

// Core engine – always available, no async runtime needed.
pub mod actor;
pub mod cache;
pub mod context;
pub mod definition;
pub mod engine;
pub mod error;
pub mod manager;
pub mod prepare;
pub mod protocol;
pub mod scenario;
pub mod scene;
pub mod sim_actor;
pub mod timeline;
pub mod types;

// Real-time runner requires the `server` feature.
#[cfg(feature = "server")]
pub mod runner;

// Convenience re-exports
pub use actor::{Actor, ActorLookup, LoadState, LoadTicket};
pub use cache::{CacheStats, CompletedEventCache, CompletedEventRecord};
pub use context::{CompletionChecks, EventRuntimeContext, EventState};
pub use definition::{
    ActionKind, ActorSpec, CompletionCriteria, EventAction, EventDefinition, PrepareConfig,
    RequiredPlayerResponse, ResponseKind, SpeedRange, Trigger,
};
pub use engine::{HazardEngine, TickReport};
pub use error::{HazardError, Result};
pub use manager::{ClosedEvent, DebugZone, EventManager};
pub use prepare::{PrepareInstruction, ZoneStatus};
pub use protocol::{HazardEnvelope, HazardNotification};
#[cfg(feature = "server")]
pub use runner::{HazardRunner, RunSummary, RunnerConfig};
pub use scenario::{PlayerDriver, Scenario};
pub use scene::{SceneObject, SceneObjectRegistry, SignalState, TrafficSignal};
pub use sim_actor::{SimActor, SimActors};
pub use timeline::TimelineExecutor;
pub use types::{EngineConfig, EngineStats, PlayerState, Vec3};
