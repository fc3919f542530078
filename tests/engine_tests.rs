//! HazardEngine tests: the full per-tick control flow.

#[cfg(test)]
mod tests {
    use hazard_events::{
        actor::NoActors,
        definition::{
            ActionKind, CompletionCriteria, EventAction, EventDefinition, LightType, Trigger,
        },
        engine::HazardEngine,
        error::Result,
        protocol::HazardNotification,
        scene::SceneObject,
        sim_actor::{SimActor, SimActors},
        types::{EngineConfig, PlayerState, Vec3},
    };
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    const DT: f64 = 0.1;

    fn engine() -> HazardEngine {
        HazardEngine::new(EngineConfig::default())
    }

    fn player_at(z: f32) -> PlayerState {
        PlayerState::new(Vec3::new(0.0, 0.0, z), 10.0)
    }

    fn zone(id: &str, z: f32, radius: f32) -> EventDefinition {
        EventDefinition::new(id, id, Trigger::proximity(Vec3::new(0.0, 0.0, z), radius))
    }

    fn crossing() -> EventDefinition {
        zone("crossing", -20.0, 10.0)
            .with_action(EventAction::new(
                "ped",
                0.0,
                ActionKind::Movement {
                    path: vec![Vec3::new(-4.0, 0.0, -20.0), Vec3::new(4.0, 0.0, -20.0)],
                    speed: 4.0,
                    looped: false,
                },
            ))
            .with_completion(CompletionCriteria {
                actor_paths_completed: true,
                ..Default::default()
            })
    }

    struct SignalLog(Arc<Mutex<Vec<String>>>);

    impl SceneObject for SignalLog {
        fn execute_command(&mut self, command: &str, params: &Value) -> Result<()> {
            self.0.lock().push(format!("{} {}", command, params));
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn activation_schedules_and_completion_caches() {
        let mut engine = engine();
        engine.register_event(crossing()).unwrap();
        let mut actors = SimActors::new();
        actors.spawn(SimActor::new("ped", Vec3::new(-6.0, 0.0, -20.0)));

        // Out of range: nothing happens.
        let report = engine.tick(DT, 0.0, &player_at(0.0), &mut actors);
        assert_eq!(report.tick, 1);
        assert!(report.activated.is_none());
        assert!(report.notifications.is_empty());

        let report = engine.tick(DT, 0.1, &player_at(-12.0), &mut actors);
        assert_eq!(report.activated.as_deref(), Some("crossing"));
        assert!(engine.timeline().has_timeline("crossing"));
        assert!(actors.get("ped").is_some_and(|p| p.is_moving()));

        // 10 m at 4 m/s.
        let mut now = 0.1;
        let mut closed = Vec::new();
        while now < 5.0 && closed.is_empty() {
            now += DT;
            actors.advance(DT as f32);
            closed = engine.tick(DT, now, &player_at(-12.0), &mut actors).closed;
        }
        assert_eq!(closed.len(), 1);
        assert!(closed[0].success);
        assert!(now > 2.4 && now < 3.0, "closed at {}", now);

        assert!(!engine.is_active("crossing"));
        assert!(!engine.timeline().has_timeline("crossing"));
        assert!(engine.was_completed("crossing"));
        let record = engine.cache().get("crossing").unwrap();
        assert!((record.completed_at - now).abs() < 1e-9);
    }

    #[test]
    fn notifications_arrive_in_lifecycle_order() {
        let mut engine = engine();
        engine.register_event(zone("flash", -5.0, 10.0)).unwrap();
        let report = engine.tick(DT, 0.0, &player_at(0.0), &mut NoActors);

        let kinds: Vec<&str> = report
            .notifications
            .iter()
            .map(|n| match n {
                HazardNotification::Triggered { .. } => "triggered",
                HazardNotification::Activated { .. } => "activated",
                HazardNotification::Completed { .. } => "completed",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["triggered", "activated", "completed"]);
        assert_eq!(report.closed.len(), 1);
    }

    #[test]
    fn actions_sharing_a_completion_id_all_count() {
        let light = |light_type| ActionKind::Light {
            light_type,
            enabled: true,
            blink_rate: None,
        };
        let mut engine = engine();
        engine
            .register_event(
                zone("truck", -5.0, 10.0)
                    .with_action(EventAction::new("car", 0.0, light(LightType::Hazard)))
                    .with_action(EventAction::new("car", 0.0, light(LightType::Brake))),
            )
            .unwrap();
        let mut actors = SimActors::new();
        actors.spawn(SimActor::new("car", Vec3::zero()));

        let report = engine.tick(DT, 0.0, &player_at(0.0), &mut actors);
        assert_eq!(report.activated.as_deref(), Some("truck"));
        assert_eq!(report.closed.len(), 1);
        assert!(report.closed[0].success);
        assert!(!engine.is_active("truck"));

        let car = actors.get("car").unwrap();
        assert!(car.light(LightType::Hazard).is_some_and(|l| l.enabled));
        assert!(car.light(LightType::Brake).is_some_and(|l| l.enabled));
    }

    #[test]
    fn late_actor_still_gets_its_commands() {
        let mut engine = engine();
        engine.register_event(crossing()).unwrap();
        let mut actors = SimActors::new();

        engine.tick(DT, 0.0, &player_at(-15.0), &mut actors);
        assert!(engine.is_active("crossing"));
        engine.tick(DT, 0.1, &player_at(-15.0), &mut actors);
        assert_eq!(engine.get_progress("crossing"), 0.0);

        actors.spawn(SimActor::new("ped", Vec3::new(-4.0, 0.0, -20.0)));
        engine.tick(DT, 0.2, &player_at(-15.0), &mut actors);
        assert!(actors.get("ped").is_some_and(|p| p.is_moving()));
        assert_eq!(engine.get_progress("crossing"), 1.0);
    }

    #[test]
    fn scene_object_commands_flow_through_the_engine() {
        let mut engine = engine();
        let log = Arc::new(Mutex::new(Vec::new()));
        engine.register_scene_object("signal", Box::new(SignalLog(log.clone())));
        engine
            .register_event(zone("red_light", -10.0, 15.0).with_action(EventAction::new(
                "",
                0.5,
                ActionKind::SceneObject {
                    target_id: "signal".into(),
                    command: "set_state".into(),
                    params: json!({ "state": "red" }),
                },
            )))
            .unwrap();

        engine.tick(DT, 0.0, &player_at(0.0), &mut NoActors);
        assert!(log.lock().is_empty());
        engine.tick(DT, 0.5, &player_at(-5.0), &mut NoActors);
        assert_eq!(log.lock().as_slice(), &[r#"set_state {"state":"red"}"#.to_string()]);
        assert!(engine.was_completed("red_light"));
    }

    #[test]
    fn prepare_instruction_is_reported_each_tick() {
        let mut engine = engine();
        engine
            .register_event(zone("truck", -60.0, 10.0).with_prepare(Default::default()))
            .unwrap();

        let cruising = player_at(-30.0).cruising();
        let report = engine.tick(DT, 0.0, &cruising, &mut NoActors);
        let advice = report.prepare_instruction.unwrap();
        assert_eq!(advice.event_id, "truck");
        assert!((advice.distance - 30.0).abs() < 1e-4);

        let report = engine.tick(DT, 0.1, &player_at(-30.0), &mut NoActors);
        assert!(report.prepare_instruction.is_none());
    }

    // -----------------------------------------------------------------------
    // Manual control
    // -----------------------------------------------------------------------

    #[test]
    fn forced_and_manually_completed_events() {
        let mut engine = engine();
        engine.register_event(crossing()).unwrap();
        let far = player_at(500.0);

        engine.force_trigger("crossing", &far, 1.0).unwrap();
        assert!(engine.is_active("crossing"));
        assert!(engine.timeline().has_timeline("crossing"));

        engine.fail_event("crossing", "aborted").unwrap();
        assert!(!engine.timeline().has_timeline("crossing"));
        let record = engine.cache().get("crossing").unwrap();
        assert!(!record.success);

        let notes = engine.drain_notifications();
        assert!(notes.contains(&HazardNotification::Failed {
            event_id: "crossing".into(),
            reason: "aborted".into()
        }));
        assert!(engine.force_trigger("crossing", &far, 2.0).is_err());
        assert!(engine.force_trigger("missing", &far, 2.0).is_err());
    }

    #[test]
    fn scripts_and_conditions_register_on_the_engine() {
        let mut engine = engine();
        let ran = Arc::new(Mutex::new(0));
        let counter = ran.clone();
        engine.register_script("honk", move |_actor, _ctx| {
            *counter.lock() += 1;
            Ok(())
        });
        engine.register_condition("always", |_| true);
        engine
            .register_event(
                EventDefinition::new("horn", "Horn", Trigger::Condition { name: "always".into() })
                    .with_action(EventAction::new("car", 0.0, ActionKind::Script { name: "honk".into() })),
            )
            .unwrap();

        let mut actors = SimActors::new();
        actors.spawn(SimActor::new("car", Vec3::zero()));
        let report = engine.tick(DT, 0.0, &player_at(0.0), &mut actors);

        assert_eq!(*ran.lock(), 1);
        assert_eq!(report.closed.len(), 1);
    }

    #[test]
    fn unregister_cancels_running_timeline() {
        let mut engine = engine();
        engine.register_event(crossing()).unwrap();
        engine.force_trigger("crossing", &player_at(0.0), 0.0).unwrap();

        assert!(engine.unregister_event("crossing").is_some());
        assert!(!engine.timeline().has_timeline("crossing"));
        assert_eq!(engine.stats().registered, 0);
    }

    // -----------------------------------------------------------------------
    // Cache bound / stats / lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn completed_cache_stays_bounded() {
        let mut engine = engine();
        let capacity = engine.config().completed_cache_capacity;
        let total = capacity + 5;
        for i in 0..total {
            engine
                .register_event(zone(&format!("e{}", i), 1000.0, 1.0))
                .unwrap();
        }

        let player = player_at(0.0);
        for i in 0..total {
            let id = format!("e{}", i);
            engine.force_trigger(&id, &player, i as f64).unwrap();
            engine.tick(DT, i as f64, &player, &mut NoActors);
        }

        let stats = engine.cache_stats();
        assert_eq!(stats.size, capacity);
        assert_eq!(stats.oldest_timestamp, Some(5.0));
        assert_eq!(stats.newest_timestamp, Some((total - 1) as f64));
        assert!(!engine.was_completed("e0"));
        assert!(engine.was_completed(&format!("e{}", total - 1)));
        assert_eq!(engine.stats().completed_cached, capacity);
    }

    #[test]
    fn stats_track_ticks_and_activations() {
        let mut engine = engine();
        engine.register_event(zone("a", 0.0, 5.0)).unwrap();
        engine.register_event(zone("b", 100.0, 5.0)).unwrap();

        for i in 0..3 {
            engine.tick(DT, i as f64, &player_at(0.0), &mut NoActors);
        }
        let stats = engine.stats();
        assert_eq!(stats.registered, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.active, 0);
        assert_eq!(stats.total_ticks, 3);
        assert_eq!(stats.total_activations, 1);
        assert_eq!(stats.completed_cached, 1);
    }

    #[test]
    fn reset_rearms_and_dispose_forgets() {
        let mut engine = engine();
        engine.register_event(zone("a", 0.0, 5.0)).unwrap();
        engine.tick(DT, 0.0, &player_at(0.0), &mut NoActors);
        assert!(engine.was_completed("a"));

        engine.reset();
        assert!(!engine.was_completed("a"));
        assert_eq!(engine.stats().pending, 1);
        let report = engine.tick(DT, 0.0, &player_at(0.0), &mut NoActors);
        assert_eq!(report.activated.as_deref(), Some("a"));

        engine.dispose();
        let stats = engine.stats();
        assert_eq!(stats.registered, 0);
        assert_eq!(stats.total_ticks, 0);
        assert_eq!(engine.cache().len(), 0);
    }

    #[test]
    fn listener_observes_engine_notifications() {
        let mut engine = engine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        engine.set_listener(move |n| sink.lock().push(n.subject()));
        engine.register_event(zone("a", 0.0, 5.0)).unwrap();
        engine.tick(DT, 0.0, &player_at(0.0), &mut NoActors);

        assert_eq!(
            seen.lock().as_slice(),
            &[
                "hazard.event.triggered",
                "hazard.event.activated",
                "hazard.event.completed"
            ]
        );
    }
}
