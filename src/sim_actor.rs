//! `SimActor` – headless actor implementing every capability.
//!
//! Used by the simulation runner and the tests in place of a rendered
//! entity: it walks its movement path as time advances, remembers what it
//! was told to play, and resolves asset loads after a simulated latency.

use crate::actor::{
    Actor, ActorLookup, Animatable, AnimationLoader, AnimationParams, LightParams, Lit,
    LoadTicket, Movable, MovementParams, PoseResumable, SoundParams, Soundable,
};
use crate::definition::{ActorSpec, LightType};
use crate::types::Vec3;
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightStatus {
    pub enabled: bool,
    pub blink_rate: Option<f32>,
}

struct InFlightLoad {
    ticket: LoadTicket,
    remaining: f32,
}

pub struct SimActor {
    id: String,
    archetype: String,
    position: Vec3,
    rotation: f32,

    path: Vec<Vec3>,
    path_index: usize,
    speed: f32,
    looped: bool,
    moving: bool,
    path_finished: bool,

    animation: Option<AnimationParams>,
    /// Spawned in a frozen pose, waiting for `resume_animation`.
    paused: bool,
    lights: HashMap<LightType, LightStatus>,
    sounds: Vec<SoundParams>,

    load_latency: f32,
    fail_loads: bool,
    loads: Vec<InFlightLoad>,
    loaded_urls: Vec<String>,
}

impl SimActor {
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            archetype: String::new(),
            position,
            rotation: 0.0,
            path: Vec::new(),
            path_index: 0,
            speed: 0.0,
            looped: false,
            moving: false,
            path_finished: false,
            animation: None,
            paused: false,
            lights: HashMap::new(),
            sounds: Vec::new(),
            load_latency: 0.0,
            fail_loads: false,
            loads: Vec::new(),
            loaded_urls: Vec::new(),
        }
    }

    pub fn from_spec(spec: &ActorSpec) -> Self {
        let mut actor = Self::new(spec.id.clone(), spec.initial_position.unwrap_or_default());
        actor.archetype = spec.archetype.clone();
        actor
    }

    /// Loads resolve this many seconds of `advance` after they start.
    pub fn with_load_latency(mut self, seconds: f32) -> Self {
        self.load_latency = seconds;
        self
    }

    /// Every load resolves as failed.
    pub fn with_failing_loads(mut self) -> Self {
        self.fail_loads = true;
        self
    }

    /// Spawn frozen in its first pose; the first time-zero animation
    /// resumes it.
    pub fn paused(mut self) -> Self {
        self.paused = true;
        self
    }

    pub fn archetype(&self) -> &str {
        &self.archetype
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn current_animation(&self) -> Option<&AnimationParams> {
        self.animation.as_ref()
    }

    pub fn light(&self, light_type: LightType) -> Option<LightStatus> {
        self.lights.get(&light_type).copied()
    }

    pub fn sounds(&self) -> &[SoundParams] {
        &self.sounds
    }

    pub fn loaded_urls(&self) -> &[String] {
        &self.loaded_urls
    }

    pub fn pending_loads(&self) -> usize {
        self.loads.len()
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Advance movement and in-flight loads by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.advance_loads(dt);
        if self.moving {
            self.advance_along_path(self.speed * dt);
        }
    }

    fn advance_loads(&mut self, dt: f32) {
        let fail = self.fail_loads;
        let id = &self.id;
        self.loads.retain_mut(|load| {
            load.remaining -= dt;
            if load.remaining > 0.0 {
                return true;
            }
            if fail {
                load.ticket.fail("simulated load failure");
            } else {
                debug!("{}: animation load finished", id);
                load.ticket.complete();
            }
            false
        });
    }

    fn advance_along_path(&mut self, mut budget: f32) {
        // A looped path of coincident points would otherwise spin forever.
        let mut hops = 0;
        while budget > 0.0 && self.moving && hops <= self.path.len() * 2 {
            let Some(&target) = self.path.get(self.path_index) else {
                self.finish_path();
                break;
            };
            let to_target = target.sub(self.position);
            let remaining = to_target.length();

            if remaining <= budget {
                self.position = target;
                budget -= remaining;
                self.path_index += 1;
                hops += 1;
                if self.path_index >= self.path.len() {
                    if self.looped {
                        self.path_index = 0;
                    } else {
                        self.finish_path();
                    }
                }
            } else {
                self.position = self.position.add(to_target.normalized().scale(budget));
                budget = 0.0;
            }

            if remaining > f32::EPSILON {
                self.rotation = to_target.x.atan2(to_target.z);
            }
        }
    }

    fn finish_path(&mut self) {
        self.moving = false;
        self.path_finished = true;
        debug!("{}: reached end of path at {}", self.id, self.position);
    }
}

impl Actor for SimActor {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Option<Vec3> {
        Some(self.position)
    }

    fn rotation(&self) -> Option<f32> {
        Some(self.rotation)
    }

    fn as_movable(&mut self) -> Option<&mut dyn Movable> {
        Some(self)
    }

    fn as_animatable(&mut self) -> Option<&mut dyn Animatable> {
        Some(self)
    }

    fn as_resumable(&mut self) -> Option<&mut dyn PoseResumable> {
        if self.paused {
            Some(self)
        } else {
            None
        }
    }

    fn as_lit(&mut self) -> Option<&mut dyn Lit> {
        Some(self)
    }

    fn as_soundable(&mut self) -> Option<&mut dyn Soundable> {
        Some(self)
    }

    fn as_loader(&mut self) -> Option<&mut dyn AnimationLoader> {
        Some(self)
    }
}

impl Movable for SimActor {
    fn start_movement(&mut self, params: MovementParams) {
        self.path_finished = false;
        self.path_index = 0;
        self.moving = !params.path.is_empty();
        self.path = params.path;
        self.speed = params.speed;
        self.looped = params.looped;
        if !self.moving {
            self.path_finished = true;
        }
    }

    fn movement_finished(&self) -> bool {
        self.path_finished
    }
}

impl Animatable for SimActor {
    fn play_animation(&mut self, params: AnimationParams) {
        self.paused = false;
        self.animation = Some(params);
    }
}

impl PoseResumable for SimActor {
    fn resume_animation(&mut self) {
        self.paused = false;
    }
}

impl Lit for SimActor {
    fn set_light(&mut self, params: LightParams) {
        self.lights.insert(
            params.light_type,
            LightStatus {
                enabled: params.enabled,
                blink_rate: params.blink_rate,
            },
        );
    }
}

impl Soundable for SimActor {
    fn play_sound(&mut self, params: SoundParams) {
        self.sounds.push(params);
    }
}

impl AnimationLoader for SimActor {
    fn load_animations(&mut self, urls: &[String]) -> LoadTicket {
        self.loaded_urls.extend(urls.iter().cloned());
        if self.load_latency <= 0.0 && !self.fail_loads {
            return LoadTicket::ready();
        }
        let ticket = LoadTicket::pending();
        self.loads.push(InFlightLoad {
            ticket: ticket.clone(),
            remaining: self.load_latency,
        });
        ticket
    }
}

// ---------------------------------------------------------------------------
// Cast
// ---------------------------------------------------------------------------

/// Every spawned [`SimActor`], resolvable by id.
#[derive(Default)]
pub struct SimActors {
    actors: HashMap<String, SimActor>,
}

impl SimActors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, actor: SimActor) {
        debug!("Spawned sim actor '{}' at {}", actor.id, actor.position);
        self.actors.insert(actor.id.clone(), actor);
    }

    pub fn get(&self, id: &str) -> Option<&SimActor> {
        self.actors.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn advance(&mut self, dt: f32) {
        for actor in self.actors.values_mut() {
            actor.advance(dt);
        }
    }

    pub fn clear(&mut self) {
        self.actors.clear();
    }
}

impl ActorLookup for SimActors {
    fn actor_mut(&mut self, id: &str) -> Option<&mut dyn Actor> {
        self.actors.get_mut(id).map(|a| a as &mut dyn Actor)
    }

    fn contains_actor(&mut self, id: &str) -> bool {
        self.actors.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::LoadState;

    fn walk(path: Vec<Vec3>, speed: f32, looped: bool) -> MovementParams {
        MovementParams {
            path,
            speed,
            looped,
        }
    }

    #[test]
    fn follows_path_and_reports_finish() {
        let mut actor = SimActor::new("ped", Vec3::zero());
        actor.start_movement(walk(vec![Vec3::new(0.0, 0.0, 4.0), Vec3::new(4.0, 0.0, 4.0)], 2.0, false));

        actor.advance(1.0);
        assert!((actor.position.z - 2.0).abs() < 1e-4);
        assert!(!actor.movement_finished());

        actor.advance(1.0);
        actor.advance(2.0);
        assert_eq!(actor.position, Vec3::new(4.0, 0.0, 4.0));
        assert!(actor.movement_finished());
        assert!(!actor.is_moving());
    }

    #[test]
    fn looped_path_never_finishes() {
        let mut actor = SimActor::new("car", Vec3::zero());
        actor.start_movement(walk(vec![Vec3::new(1.0, 0.0, 0.0), Vec3::zero()], 10.0, true));
        for _ in 0..10 {
            actor.advance(0.5);
        }
        assert!(actor.is_moving());
        assert!(!actor.movement_finished());
    }

    #[test]
    fn degenerate_looped_path_terminates() {
        let mut actor = SimActor::new("stuck", Vec3::zero());
        actor.start_movement(walk(vec![Vec3::zero(), Vec3::zero()], 5.0, true));
        actor.advance(1.0);
        assert_eq!(actor.position, Vec3::zero());
    }

    #[test]
    fn loads_resolve_after_latency() {
        let mut actor = SimActor::new("ped", Vec3::zero()).with_load_latency(0.5);
        let ticket = actor.load_animations(&["walk.glb".into()]);
        assert!(ticket.is_pending());

        actor.advance(0.25);
        assert!(ticket.is_pending());
        actor.advance(0.3);
        assert_eq!(ticket.state(), LoadState::Ready);
        assert_eq!(actor.pending_loads(), 0);
    }

    #[test]
    fn failing_loads_report_failure() {
        let mut actor = SimActor::new("ped", Vec3::zero()).with_failing_loads();
        let ticket = actor.load_animations(&["walk.glb".into()]);
        actor.advance(0.1);
        assert!(matches!(ticket.state(), LoadState::Failed(_)));
    }

    #[test]
    fn paused_actor_is_resumable_until_it_plays() {
        let mut actor = SimActor::new("ped", Vec3::zero()).paused();
        assert!(actor.as_resumable().is_some());
        if let Some(r) = actor.as_resumable() {
            r.resume_animation();
        }
        assert!(!actor.is_paused());
        assert!(actor.as_resumable().is_none());
    }
}
