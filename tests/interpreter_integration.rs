//! Interpreter integration tests: table loading, resolution and evaluation of
//! whole node graphs through the public API.

use glam::Vec2;

use actiongraph::behavior::dispatch::{KeyBindingDispatcher, KeySnapshot};
use actiongraph::behavior::engine::{Interpreter, Outcome};
use actiongraph::behavior::error::{LoadError, RuntimeFault};
use actiongraph::behavior::graph::NodeGraph;
use actiongraph::behavior::node::Namespace;
use actiongraph::behavior::physics::JumpProfile;
use actiongraph::behavior::services::{
    InstantAnimation, MapContext, Outbox, PointerSnapshot, Request, StaticCollision,
};
use actiongraph::behavior::table::GameTables;
use actiongraph::behavior::value::Value;
use actiongraph::behavior::variables::VariableStore;
use actiongraph::components::actor::{ActorId, ActorInstance};

const DT: f32 = 1.0 / 60.0;
const EPSILON: f32 = 1e-3;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn load(json: &str) -> NodeGraph {
    NodeGraph::load(&GameTables::from_json_str(json).unwrap()).unwrap()
}

/// Collaborator stand-ins for one actor.
struct Stage {
    map: VariableStore,
    animation: InstantAnimation,
    outbox: Outbox,
    collision: StaticCollision,
    pointer: PointerSnapshot,
}

impl Stage {
    fn new() -> Self {
        Self {
            map: VariableStore::new(),
            animation: InstantAnimation::default(),
            outbox: Outbox::default(),
            collision: StaticCollision::default(),
            pointer: PointerSnapshot::default(),
        }
    }

    fn ctx(&mut self) -> MapContext<'_> {
        MapContext {
            variables: &mut self.map,
            animation: &mut self.animation,
            host: &mut self.outbox,
            collision: &self.collision,
            pointer: &self.pointer,
        }
    }
}

// ==================== LOADING ====================

#[test]
fn load_reports_every_problem_at_once() {
    let tables = GameTables::from_json_str(
        r#"{
            "map_events": [
                { "name": "Dup", "kind": "move" },
                { "name": "Dup", "kind": "move" },
                { "name": "Odd", "kind": "teleport" },
                { "name": "Lost", "kind": "multi", "properties": [ { "name": "1", "value": "Nowhere" } ] },
                { "name": "Ping", "kind": "multi", "properties": [ { "name": "1", "value": "Pong" } ] },
                { "name": "Pong", "kind": "multi", "properties": [ { "name": "1", "value": "Ping" } ] },
                { "name": "Keys", "kind": "multi", "properties": [ { "name": "first", "value": "Dup" } ] }
            ]
        }"#,
    )
    .unwrap();
    let errors = NodeGraph::load(&tables).unwrap_err();

    assert!(errors.0.iter().any(|e| matches!(e, LoadError::DuplicateName { name, .. } if name == "Dup")));
    assert!(errors.0.iter().any(|e| matches!(e, LoadError::UnknownKind { name, .. } if name == "Odd")));
    assert!(errors.0.iter().any(|e| matches!(e, LoadError::Unresolved { target, .. } if target == "Nowhere")));
    assert!(errors.0.iter().any(|e| matches!(e, LoadError::Cycle(_))));
    assert!(errors.0.iter().any(|e| matches!(e, LoadError::InvalidChildKey { key, .. } if key == "first")));

    let names = errors.offending_names();
    assert!(names.contains(&"Nowhere".to_string()));
    assert!(errors.to_string().contains("load error(s)"));
}

#[test]
fn cycle_through_test_branches_is_rejected() {
    let tables = GameTables::from_json_str(
        r#"{
            "map_events": [
                { "name": "Check", "kind": "compare", "properties": [
                    { "name": "VAL1", "type": "int", "value": 1 }, { "name": "VAL2", "type": "int", "value": 1 },
                    { "name": "==", "type": "bool", "value": true },
                    { "name": "SUCCESS", "value": "Retry" }, { "name": "FAILURE", "value": "Give up" } ] },
                { "name": "Retry", "kind": "multi", "properties": [ { "name": "1", "value": "Check" } ] },
                { "name": "Give up", "kind": "quit" }
            ]
        }"#,
    )
    .unwrap();
    let errors = NodeGraph::load(&tables).unwrap_err();
    assert_eq!(errors.0.len(), 1);
    let LoadError::Cycle(path) = &errors.0[0] else {
        panic!("expected a cycle, got {:?}", errors.0[0]);
    };
    assert!(path.contains(&"Check".to_string()));
    assert!(path.contains(&"Retry".to_string()));
}

#[test]
fn shared_sub_events_load_and_run_twice() {
    let graph = load(
        r#"{
            "map_events": [
                { "name": "Root", "kind": "multi", "properties": [
                    { "name": "1", "value": "Left" }, { "name": "2", "value": "Right" } ] },
                { "name": "Left", "kind": "multi", "properties": [ { "name": "1", "value": "Shared" } ] },
                { "name": "Right", "kind": "multi", "properties": [ { "name": "1", "value": "Shared" } ] },
                { "name": "Shared", "kind": "set-global-var", "properties": [
                    { "name": "VAL_NAME", "value": "Hits" }, { "name": "VALUE", "type": "int", "value": 1 },
                    { "name": "+=", "type": "bool", "value": true } ] }
            ],
            "actors": [ { "name": "Hero" } ]
        }"#,
    );
    let mut stage = Stage::new();
    let mut actor = ActorInstance::new(ActorId(0), "Hero", Vec2::ZERO);
    let outcome = Interpreter::new(&graph).tick(&mut actor, "Root", &mut stage.ctx(), DT);
    assert_eq!(outcome, Outcome::Success);
    assert_eq!(stage.map.get("Hits").unwrap(), &Value::Int(2));
}

#[test]
fn actor_events_shadow_map_events() {
    let graph = load(
        r#"{
            "map_events": [
                { "name": "Greet", "kind": "sound", "properties": [ { "name": "PATH", "value": "map.wav" } ] },
                { "name": "Relay", "kind": "engine-wrapper", "properties": [ { "name": "EVENT", "value": "Greet" } ] }
            ],
            "actors": [ {
                "name": "Hero",
                "events": [
                    { "name": "Greet", "kind": "sound", "properties": [ { "name": "PATH", "value": "hero.wav" } ] },
                    { "name": "Wrapped", "kind": "AeGeWrapper", "properties": [ { "name": "EVENT", "value": "Greet" } ] }
                ]
            }, { "name": "Slime" } ]
        }"#,
    );
    let interpreter = Interpreter::new(&graph);
    let mut stage = Stage::new();

    let mut hero = ActorInstance::new(ActorId(0), "Hero", Vec2::ZERO);
    interpreter.tick(&mut hero, "Greet", &mut stage.ctx(), DT);
    interpreter.tick(&mut hero, "Wrapped", &mut stage.ctx(), DT);
    let mut slime = ActorInstance::new(ActorId(1), "Slime", Vec2::ZERO);
    interpreter.tick(&mut slime, "Greet", &mut stage.ctx(), DT);

    assert_eq!(
        stage.outbox.requests,
        vec![
            Request::PlaySound("hero.wav".into()),
            Request::PlaySound("map.wav".into()),
            Request::PlaySound("map.wav".into()),
        ]
    );
    assert!(graph.lookup(&Namespace::Actor("Slime".into()), "Greet").is_err());
    assert!(graph.lookup(&Namespace::Map, "Greet").is_ok());
}

// ==================== SCENARIOS ====================

#[test]
fn jump_takeoff_speed_matches_formula() {
    for (height, duration) in [(300.0_f32, 0.8_f32), (1000.0, 1.6)] {
        let graph = load(&format!(
            r#"{{
                "map_events": [ {{ "name": "Hop", "kind": "AeJump", "properties": [
                    {{ "name": "JUMP_HEIGHT", "type": "float", "value": {height} }},
                    {{ "name": "JUMP_DURATION", "type": "float", "value": {duration} }} ] }} ],
                "actors": [ {{ "name": "Hero" }} ]
            }}"#
        ));
        let mut stage = Stage::new();
        let mut actor = ActorInstance::new(ActorId(0), "Hero", Vec2::ZERO);
        Interpreter::new(&graph).tick(&mut actor, "Hop", &mut stage.ctx(), DT);

        let expected = 2.0 * height / duration;
        assert!(approx_eq(-actor.velocity.y, expected));
        let profile = JumpProfile::new(height, duration, 0.0).unwrap();
        assert!(approx_eq(profile.initial_speed, expected));
    }
}

#[test]
fn jump_duration_from_variable_must_be_positive() {
    let graph = load(
        r#"{
            "map_events": [ { "name": "Hop", "kind": "jump", "properties": [
                { "name": "JUMP_DURATION", "value": "*AirTime" } ] } ],
            "actors": [ { "name": "Hero" } ]
        }"#,
    );
    let mut stage = Stage::new();
    stage.map.set("AirTime", Value::Float(0.0), false).unwrap();
    let mut actor = ActorInstance::new(ActorId(0), "Hero", Vec2::ZERO);
    let eval = Interpreter::new(&graph).evaluate("Hop", &mut actor, &mut stage.ctx(), DT);
    assert_eq!(eval.outcome, Outcome::Failure);
    assert!(matches!(eval.faults[0].fault, RuntimeFault::InvalidParameter { .. }));
    assert_eq!(actor.velocity.y, 0.0);
}

#[test]
fn sustained_binding_ten_ticks_then_one_stop_action() {
    let graph = load(
        r#"{
            "actors": [ {
                "name": "Hero",
                "events": [
                    { "name": "Walk", "kind": "accelerate", "properties": [
                        { "name": "XFACTOR", "type": "float", "value": 60 } ] },
                    { "name": "Brake", "kind": "set-var", "properties": [
                        { "name": "VAL_NAME", "value": "__XSPEED" }, { "name": "VALUE", "type": "float", "value": 0 } ] }
                ],
                "bindings": [ { "key": "Right", "properties": [
                    { "name": "EVENT", "value": "Walk" },
                    { "name": "SUSTAINED", "type": "bool", "value": true },
                    { "name": "STOP_EVENT", "value": "Brake" } ] } ]
            } ]
        }"#,
    );
    let template = graph.template("Hero").unwrap();
    let dispatcher = KeyBindingDispatcher::new(Interpreter::new(&graph));
    let mut stage = Stage::new();
    let mut actor = ActorInstance::new(ActorId(0), "Hero", Vec2::ZERO);
    let mut keys = KeySnapshot::default();

    let mut walks = 0;
    let mut stops = 0;
    for tick in 0..12 {
        keys.clear();
        match tick {
            0 => {
                keys.press("RIGHT");
            }
            1..=9 => {
                keys.hold("RIGHT");
            }
            10 => {
                keys.release("RIGHT");
            }
            _ => {}
        }
        let report = dispatcher.dispatch(template, &mut actor, &keys, &mut stage.ctx(), DT);
        walks += report
            .invoked
            .iter()
            .filter(|id| graph.node(**id).name == "Walk")
            .count();
        stops += report.stop_actions.len();
        if tick == 9 {
            assert!(approx_eq(actor.velocity.x, 10.0));
        }
    }
    assert_eq!(walks, 10);
    assert_eq!(stops, 1);
    assert_eq!(actor.velocity.x, 0.0);
}
