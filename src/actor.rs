//! Actor capability surface.
//!
//! An actor is a renderable entity (pedestrian, vehicle, cyclist…) owned by
//! the rendering layer. The engine commands it but never owns or retains it:
//! a fresh [`ActorLookup`] is handed to the timeline every tick.
//!
//! Capabilities are narrow traits implemented à la carte. [`Actor`] exposes
//! each one through an `as_*` accessor returning `None` by default, so
//! dispatch is a type-checked capability probe.

use crate::definition::LightType;
use crate::types::Vec3;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Command parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MovementParams {
    pub path: Vec<Vec3>,
    /// Metres per second along the path.
    pub speed: f32,
    pub looped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationParams {
    pub name: String,
    pub looped: bool,
    pub fade_in: f32,
    pub fade_out: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightParams {
    pub light_type: LightType,
    pub enabled: bool,
    pub blink_rate: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundParams {
    pub url: String,
    pub volume: f32,
    pub looped: bool,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

pub trait Movable {
    fn start_movement(&mut self, params: MovementParams);

    /// True once a non-looping path has been fully travelled.
    fn movement_finished(&self) -> bool {
        false
    }
}

pub trait Animatable {
    fn play_animation(&mut self, params: AnimationParams);
}

/// Actors that can be spawned in a paused pose and resumed later.
pub trait PoseResumable {
    fn resume_animation(&mut self);
}

pub trait Lit {
    fn set_light(&mut self, params: LightParams);
}

pub trait Soundable {
    fn play_sound(&mut self, params: SoundParams);
}

pub trait AnimationLoader {
    /// Start loading animation assets in the background.
    ///
    /// Must return immediately; completion is reported through the ticket.
    fn load_animations(&mut self, urls: &[String]) -> LoadTicket;
}

/// An orchestrated entity. Every capability is optional.
pub trait Actor {
    fn id(&self) -> &str;

    fn position(&self) -> Option<Vec3> {
        None
    }

    /// Yaw in radians.
    fn rotation(&self) -> Option<f32> {
        None
    }

    fn as_movable(&mut self) -> Option<&mut dyn Movable> {
        None
    }

    fn as_animatable(&mut self) -> Option<&mut dyn Animatable> {
        None
    }

    fn as_resumable(&mut self) -> Option<&mut dyn PoseResumable> {
        None
    }

    fn as_lit(&mut self) -> Option<&mut dyn Lit> {
        None
    }

    fn as_soundable(&mut self) -> Option<&mut dyn Soundable> {
        None
    }

    fn as_loader(&mut self) -> Option<&mut dyn AnimationLoader> {
        None
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Resolves actor ids to currently available handles.
///
/// An id that is not (yet) resolvable is normal: the actor may still be
/// loading.
pub trait ActorLookup {
    fn actor_mut(&mut self, id: &str) -> Option<&mut dyn Actor>;

    fn contains_actor(&mut self, id: &str) -> bool {
        self.actor_mut(id).is_some()
    }
}

impl ActorLookup for HashMap<String, Box<dyn Actor>> {
    fn actor_mut(&mut self, id: &str) -> Option<&mut dyn Actor> {
        self.get_mut(id).map(|actor| actor.as_mut() as &mut dyn Actor)
    }
}

/// Lookup that never resolves anything, for ticks without a scene.
pub struct NoActors;

impl ActorLookup for NoActors {
    fn actor_mut(&mut self, _id: &str) -> Option<&mut dyn Actor> {
        None
    }
}

// ---------------------------------------------------------------------------
// Background load tickets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Ready,
    Failed(String),
}

/// Completion flag shared between an asset loader and the timeline.
///
/// The loader resolves it from wherever the load runs; the timeline only
/// polls it at the start of each tick and never waits on it.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    state: Arc<Mutex<LoadState>>,
}

impl LoadTicket {
    pub fn pending() -> Self {
        Self {
            state: Arc::new(Mutex::new(LoadState::Pending)),
        }
    }

    /// A ticket for a load that finished synchronously.
    pub fn ready() -> Self {
        Self {
            state: Arc::new(Mutex::new(LoadState::Ready)),
        }
    }

    pub fn complete(&self) {
        *self.state.lock() = LoadState::Ready;
    }

    pub fn fail(&self, reason: impl Into<String>) {
        *self.state.lock() = LoadState::Failed(reason.into());
    }

    pub fn state(&self) -> LoadState {
        self.state.lock().clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), LoadState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cone {
        id: String,
    }

    impl Actor for Cone {
        fn id(&self) -> &str {
            &self.id
        }
    }

    #[test]
    fn actor_without_capabilities_probes_to_none() {
        let mut cone = Cone { id: "cone".into() };
        assert!(cone.as_movable().is_none());
        assert!(cone.as_animatable().is_none());
        assert!(cone.as_lit().is_none());
        assert!(cone.as_loader().is_none());
        assert!(cone.position().is_none());
    }

    #[test]
    fn hash_map_lookup_resolves_registered_actors() {
        let mut actors: HashMap<String, Box<dyn Actor>> = HashMap::new();
        actors.insert("cone".into(), Box::new(Cone { id: "cone".into() }));

        assert!(actors.contains_actor("cone"));
        assert!(!actors.contains_actor("truck"));
        assert_eq!(actors.actor_mut("cone").map(|a| a.id().to_string()), Some("cone".into()));
        assert!(!NoActors.contains_actor("cone"));
    }

    #[test]
    fn ticket_clones_share_state() {
        let ticket = LoadTicket::pending();
        let loader_side = ticket.clone();
        assert!(ticket.is_pending());

        loader_side.complete();
        assert_eq!(ticket.state(), LoadState::Ready);

        loader_side.fail("404");
        assert_eq!(ticket.state(), LoadState::Failed("404".into()));
    }
}
