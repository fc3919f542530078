//! HazardEngine – one `tick` per rendered frame.
//!
//! ```text
//! tick(delta, now, player, actors)
//!   1. throttled trigger scan          → at most one activation
//!   2. schedule the activated timeline
//!   3. advance every active timeline   → completed actions, finished paths
//!   4. update active events            → completion / time limit
//!   5. cancel timelines of closed events, record them in the cache
//!   6. prepare-zone scan               → auto-pilot advice
//! ```
//!
//! The engine never owns actors; the host lends a fresh [`ActorLookup`] for
//! the duration of each call.

use crate::actor::{Actor, ActorLookup};
use crate::cache::{CacheStats, CompletedEventCache};
use crate::context::{CompletionChecks, EventRuntimeContext};
use crate::definition::EventDefinition;
use crate::error::Result;
use crate::manager::{ClosedEvent, DebugZone, EventManager};
use crate::prepare::PrepareInstruction;
use crate::protocol::HazardNotification;
use crate::scene::{SceneObject, SceneObjectRegistry};
use crate::timeline::{TimelineEnv, TimelineExecutor};
use crate::types::{EngineConfig, EngineStats, PlayerState};
use log::{debug, info};

// ---------------------------------------------------------------------------
// Tick result
// ---------------------------------------------------------------------------

/// Everything a single [`HazardEngine::tick`] produced.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// The tick counter that produced this report.
    pub tick: u64,
    /// Event activated by this tick's trigger scan.
    pub activated: Option<String>,
    /// Events closed during this tick, in closing order.
    pub closed: Vec<ClosedEvent>,
    /// Notifications raised since the previous report, in order.
    pub notifications: Vec<HazardNotification>,
    pub prepare_instruction: Option<PrepareInstruction>,
}

pub struct HazardEngine {
    manager: EventManager,
    timeline: TimelineExecutor,
    cache: CompletedEventCache,
    scene: SceneObjectRegistry,
    tick_count: u64,
    /// `now` of the most recent tick.
    clock: f64,
}

impl HazardEngine {
    pub fn new(config: EngineConfig) -> Self {
        let cache = CompletedEventCache::new(config.completed_cache_capacity);
        Self {
            manager: EventManager::new(config),
            timeline: TimelineExecutor::new(),
            cache,
            scene: SceneObjectRegistry::new(),
            tick_count: 0,
            clock: 0.0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.manager.config()
    }

    pub fn manager(&self) -> &EventManager {
        &self.manager
    }

    pub fn timeline(&self) -> &TimelineExecutor {
        &self.timeline
    }

    pub fn cache(&self) -> &CompletedEventCache {
        &self.cache
    }

    pub fn scene_mut(&mut self) -> &mut SceneObjectRegistry {
        &mut self.scene
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub fn register_event(&mut self, definition: EventDefinition) -> Result<()> {
        self.manager.register_event(definition)
    }

    /// Register a batch, skipping (and logging) rejected definitions.
    /// Returns how many were accepted.
    pub fn register_events(&mut self, definitions: impl IntoIterator<Item = EventDefinition>) -> usize {
        definitions
            .into_iter()
            .map(|d| self.manager.register_event(d))
            .filter(Result::is_ok)
            .count()
    }

    pub fn unregister_event(&mut self, event_id: &str) -> Option<EventDefinition> {
        self.timeline.cancel_actions(event_id);
        self.cache.remove(event_id);
        self.manager.unregister_event(event_id)
    }

    pub fn register_script<F>(&mut self, name: impl Into<String>, script: F)
    where
        F: Fn(&mut dyn Actor, &EventRuntimeContext) -> Result<()> + Send + Sync + 'static,
    {
        self.timeline.register_script(name, script);
    }

    pub fn register_condition<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&PlayerState) -> bool + Send + Sync + 'static,
    {
        self.manager.register_condition(name, predicate);
    }

    pub fn register_completion_check<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&EventRuntimeContext) -> bool + Send + Sync + 'static,
    {
        self.manager.register_completion_check(name, predicate);
    }

    pub fn register_scene_object(&mut self, id: impl Into<String>, object: Box<dyn SceneObject>) {
        self.scene.insert(id, object);
    }

    pub fn set_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&HazardNotification) + Send + 'static,
    {
        self.manager.set_listener(listener);
    }

    // -----------------------------------------------------------------------
    // Main tick
    // -----------------------------------------------------------------------

    /// Advance the engine to `now` (seconds, monotonic).
    pub fn tick(
        &mut self,
        delta: f64,
        now: f64,
        player: &PlayerState,
        actors: &mut dyn ActorLookup,
    ) -> TickReport {
        self.tick_count += 1;
        self.clock = now;

        let activated = self.manager.check_triggers(player, now);
        if let Some(event_id) = &activated {
            self.schedule(event_id, now);
        }

        self.advance_timelines(now, actors);
        self.manager.update_active_events(delta, now, player);
        let closed = self.settle_closed(now);

        TickReport {
            tick: self.tick_count,
            activated,
            closed,
            notifications: self.manager.drain_notifications(),
            prepare_instruction: self.manager.check_prepare_zone(player),
        }
    }

    fn schedule(&mut self, event_id: &str, now: f64) {
        if let Some(definition) = self.manager.definition(event_id) {
            self.timeline
                .schedule_actions(event_id, &definition.actions, now);
        }
    }

    fn advance_timelines(&mut self, now: f64, actors: &mut dyn ActorLookup) {
        for event_id in self.manager.active_ids() {
            let mut completed = Vec::new();
            if let Some(context) = self.manager.context(&event_id) {
                let mut env = TimelineEnv {
                    actors: &mut *actors,
                    scene: &mut self.scene,
                };
                self.timeline
                    .update_timeline(&event_id, now, &mut env, context, |id| completed.push(id));
            }
            for action_id in completed {
                debug!("{}: action {} completed", event_id, action_id);
                self.manager.record_action_completed(&event_id, action_id);
            }

            let movers: Vec<String> = self
                .manager
                .definition(&event_id)
                .map(|d| d.movement_actor_ids().map(str::to_string).collect())
                .unwrap_or_default();
            for actor_id in movers {
                if !self.timeline.movement_dispatched(&event_id, &actor_id) {
                    continue;
                }
                let finished = actors
                    .actor_mut(&actor_id)
                    .and_then(|actor| actor.as_movable())
                    .is_some_and(|movable| movable.movement_finished());
                if finished {
                    self.manager.mark_actor_path_completed(&event_id, &actor_id);
                }
            }
        }
    }

    /// Cancel the timelines of every closed event and record them.
    fn settle_closed(&mut self, now: f64) -> Vec<ClosedEvent> {
        let closed = self.manager.take_closed();
        for event in &closed {
            self.timeline.cancel_actions(&event.event_id);
            self.cache.add(event.event_id.as_str(), now, event.success);
        }
        closed
    }

    // -----------------------------------------------------------------------
    // Manual control
    // -----------------------------------------------------------------------

    /// Activate an armed event now, regardless of its trigger.
    pub fn force_trigger(&mut self, event_id: &str, player: &PlayerState, now: f64) -> Result<()> {
        self.manager.force_trigger(event_id, player, now)?;
        self.schedule(event_id, now);
        info!("Forced hazard event '{}'", event_id);
        Ok(())
    }

    pub fn complete_event(&mut self, event_id: &str, success: bool) -> Result<()> {
        self.manager.complete_event(event_id, success)?;
        self.settle_closed(self.clock);
        Ok(())
    }

    pub fn fail_event(&mut self, event_id: &str, reason: &str) -> Result<()> {
        self.manager.fail_event(event_id, reason)?;
        self.settle_closed(self.clock);
        Ok(())
    }

    pub fn mark_actor_path_completed(&mut self, event_id: &str, actor_id: &str) -> bool {
        self.manager.mark_actor_path_completed(event_id, actor_id)
    }

    pub fn validate_player_response(&mut self, event_id: &str, player: &PlayerState) -> Option<bool> {
        self.manager.validate_player_response(event_id, player)
    }

    pub fn check_completion_criteria(&mut self, event_id: &str) -> Option<CompletionChecks> {
        self.manager.check_completion_criteria(event_id)
    }

    /// Notifications raised outside of a tick (manual control, response
    /// validation) that have not been reported yet.
    pub fn drain_notifications(&mut self) -> Vec<HazardNotification> {
        self.manager.drain_notifications()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_active(&self, event_id: &str) -> bool {
        self.manager.is_active(event_id)
    }

    /// Recently completed, according to the bounded cache.
    pub fn was_completed(&self, event_id: &str) -> bool {
        self.cache.has(event_id)
    }

    pub fn get_progress(&self, event_id: &str) -> f32 {
        self.timeline.get_progress(event_id)
    }

    pub fn debug_zones(&self) -> Vec<DebugZone> {
        self.manager.debug_zones()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            registered: self.manager.registered_count(),
            pending: self.manager.pending_count(),
            active: self.manager.active_count(),
            completed_cached: self.cache.len(),
            total_ticks: self.tick_count,
            total_activations: self.manager.total_activations(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Clear all runtime state and re-arm every registered event.
    pub fn reset(&mut self) {
        self.manager.reset();
        self.timeline.clear();
        self.cache.clear();
        info!("Hazard engine reset, {} events armed", self.manager.pending_count());
    }

    /// Clear everything, definitions, handlers and scene objects included.
    pub fn dispose(&mut self) {
        self.manager.dispose();
        self.timeline = TimelineExecutor::new();
        self.cache.clear();
        self.scene.clear();
        self.tick_count = 0;
        self.clock = 0.0;
        info!("Hazard engine disposed");
    }
}
