//! Key binding dispatch: turns key transitions into root-event invocations.
//!
//! Edge-triggered bindings (`DOWN`/`UP`) fire on the tick the edge happens.
//! Sustained bindings are tracked per actor in [`SustainedActions`] and
//! re-invoked every tick while the key stays held. When several sustained
//! actions drive the same physics axis, the higher-ranked one wins it for the
//! tick; ranks are priority first, then most recent press.

use std::fmt;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use super::engine::Interpreter;
use super::error::NodeFault;
use super::graph::{ActorTemplate, KeyBinding};
use super::node::{NodeId, Priority};
use super::services::MapContext;
use super::signal::AxisLocks;
use crate::components::actor::ActorInstance;

/// Case-insensitive physical key name (`W`, `SPACE`, `RIGHT ALT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(String);

impl KeyCode {
    pub fn new(name: &str) -> Self {
        KeyCode(name.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of one key this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyEdge {
    /// Whether the key is held.
    pub active: bool,
    pub just_pressed: bool,
    pub just_released: bool,
}

/// Source of per-tick key state.
pub trait KeyStates {
    fn key(&self, code: &KeyCode) -> KeyEdge;
}

/// Key states for one tick, filled in by hand. Unlisted keys are up.
#[derive(Debug, Clone, Default)]
pub struct KeySnapshot {
    keys: FxHashMap<KeyCode, KeyEdge>,
}

impl KeySnapshot {
    pub fn set(&mut self, code: &str, edge: KeyEdge) -> &mut Self {
        self.keys.insert(KeyCode::new(code), edge);
        self
    }

    pub fn press(&mut self, code: &str) -> &mut Self {
        self.set(
            code,
            KeyEdge {
                active: true,
                just_pressed: true,
                just_released: false,
            },
        )
    }

    pub fn hold(&mut self, code: &str) -> &mut Self {
        self.set(
            code,
            KeyEdge {
                active: true,
                ..Default::default()
            },
        )
    }

    pub fn release(&mut self, code: &str) -> &mut Self {
        self.set(
            code,
            KeyEdge {
                just_released: true,
                ..Default::default()
            },
        )
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

impl KeyStates for KeySnapshot {
    fn key(&self, code: &KeyCode) -> KeyEdge {
        self.keys.get(code).copied().unwrap_or_default()
    }
}

/// A held sustained binding.
#[derive(Debug, Clone, PartialEq)]
pub struct SustainedAction {
    pub event: NodeId,
    pub priority: Priority,
    /// Press order; higher was pressed later.
    pub seq: u64,
    pub stop_event: Option<NodeId>,
}

/// Sustained actions active for one actor, keyed by originating key.
#[derive(Debug, Clone, Default)]
pub struct SustainedActions {
    active: FxHashMap<KeyCode, SustainedAction>,
    next_seq: u64,
}

impl SustainedActions {
    pub fn is_active(&self, key: &KeyCode) -> bool {
        self.active.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    fn activate(&mut self, key: KeyCode, binding: &KeyBinding, event: NodeId) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.active.insert(
            key,
            SustainedAction {
                event,
                priority: binding.priority,
                seq,
                stop_event: binding.stop_event,
            },
        );
    }

    fn remove(&mut self, key: &KeyCode) -> Option<SustainedAction> {
        self.active.remove(key)
    }

    /// Active actions in evaluation order: priority descending, then latest
    /// press first.
    pub fn ranked(&self) -> Vec<(KeyCode, SustainedAction)> {
        let mut ranked: Vec<_> = self
            .active
            .iter()
            .map(|(k, a)| (k.clone(), a.clone()))
            .collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.priority.cmp(&a.priority).then(b.seq.cmp(&a.seq))
        });
        ranked
    }
}

/// What one dispatch pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Root events evaluated, in order. Stop events included.
    pub invoked: Vec<NodeId>,
    /// Sustained keys released this tick.
    pub stop_actions: Vec<KeyCode>,
    /// Sustained actions cancelled by a STOP signal.
    pub cancelled: Vec<KeyCode>,
    pub faults: Vec<NodeFault>,
}

/// Runs an actor template's key bindings against the current key state.
pub struct KeyBindingDispatcher<'g> {
    interpreter: Interpreter<'g>,
}

impl<'g> KeyBindingDispatcher<'g> {
    pub fn new(interpreter: Interpreter<'g>) -> Self {
        Self { interpreter }
    }

    pub fn dispatch(
        &self,
        template: &ActorTemplate,
        actor: &mut ActorInstance,
        keys: &dyn KeyStates,
        ctx: &mut MapContext<'_>,
        dt: f32,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        // Pressed and released within this tick: run once, then release.
        let mut taps: Vec<&KeyBinding> = Vec::new();

        for binding in &template.bindings {
            let Some(event) = binding.event else {
                trace!("Skipping placeholder binding for key {}", binding.key);
                continue;
            };
            let edge = keys.key(&binding.key);

            if binding.sustained {
                if edge.just_pressed && !actor.sustained.is_active(&binding.key) {
                    debug!("Sustained action on {} started", binding.key);
                    actor.sustained.activate(binding.key.clone(), binding, event);
                }
                if edge.just_pressed && edge.just_released {
                    taps.push(binding);
                } else if edge.just_released {
                    self.release(binding, actor, ctx, dt, &mut report);
                }
                continue;
            }

            let fire = (binding.down && edge.just_pressed) || (binding.up && edge.just_released);
            if fire {
                self.invoke(event, actor, ctx, dt, &mut AxisLocks::default(), &mut report);
            }
        }

        let mut locks = AxisLocks::default();
        for (key, action) in actor.sustained.ranked() {
            let stopped = self.invoke(action.event, actor, ctx, dt, &mut locks, &mut report);
            if stopped {
                debug!("Sustained action on {} cancelled by STOP", key);
                actor.sustained.remove(&key);
                report.cancelled.push(key);
            }
        }
        for binding in taps {
            self.release(binding, actor, ctx, dt, &mut report);
        }

        report
    }

    fn release(
        &self,
        binding: &KeyBinding,
        actor: &mut ActorInstance,
        ctx: &mut MapContext<'_>,
        dt: f32,
        report: &mut DispatchReport,
    ) {
        let Some(action) = actor.sustained.remove(&binding.key) else {
            return;
        };
        debug!("Sustained action on {} released", binding.key);
        report.stop_actions.push(binding.key.clone());
        if let Some(stop) = action.stop_event {
            self.invoke(stop, actor, ctx, dt, &mut AxisLocks::default(), report);
        }
    }

    /// Evaluate one root event; returns whether it raised STOP.
    fn invoke(
        &self,
        event: NodeId,
        actor: &mut ActorInstance,
        ctx: &mut MapContext<'_>,
        dt: f32,
        locks: &mut AxisLocks,
        report: &mut DispatchReport,
    ) -> bool {
        let eval = self.interpreter.evaluate_node(event, actor, ctx, dt, locks);
        report.invoked.push(event);
        report.faults.extend(eval.faults);
        eval.stop_raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::graph::NodeGraph;
    use crate::behavior::services::{InstantAnimation, Outbox, PointerSnapshot, StaticCollision};
    use crate::behavior::table::GameTables;
    use crate::behavior::value::Value;
    use crate::behavior::variables::VariableStore;
    use crate::components::actor::ActorId;
    use glam::Vec2;

    const DT: f32 = 1.0 / 60.0;

    fn graph(json: &str) -> NodeGraph {
        NodeGraph::load(&GameTables::from_json_str(json).unwrap()).unwrap()
    }

    fn run(graph: &NodeGraph, actor: &mut ActorInstance, keys: &KeySnapshot) -> DispatchReport {
        let mut map = VariableStore::new();
        let mut animation = InstantAnimation::default();
        let mut outbox = Outbox::default();
        let collision = StaticCollision::default();
        let pointer = PointerSnapshot::default();
        let mut ctx = MapContext {
            variables: &mut map,
            animation: &mut animation,
            host: &mut outbox,
            collision: &collision,
            pointer: &pointer,
        };
        let template = graph.template(&actor.template).unwrap();
        KeyBindingDispatcher::new(Interpreter::new(graph)).dispatch(template, actor, keys, &mut ctx, DT)
    }

    const WALKER: &str = r#"{
        "actors": [ {
            "name": "Hero",
            "events": [
                { "name": "Count", "kind": "set-var", "properties": [
                    { "name": "VAL_NAME", "value": "Ticks" }, { "name": "VALUE", "type": "int", "value": 1 },
                    { "name": "+=", "type": "bool", "value": true } ] },
                { "name": "Halt", "kind": "set-var", "properties": [
                    { "name": "VAL_NAME", "value": "Stops" }, { "name": "VALUE", "type": "int", "value": 1 },
                    { "name": "+=", "type": "bool", "value": true } ] },
                { "name": "Right", "kind": "accelerate", "properties": [
                    { "name": "XFACTOR", "type": "float", "value": 600 } ] },
                { "name": "Left", "kind": "accelerate", "properties": [
                    { "name": "XFACTOR", "type": "float", "value": -600 } ] },
                { "name": "Hop", "kind": "set-var", "properties": [
                    { "name": "VAL_NAME", "value": "Hops" }, { "name": "VALUE", "type": "int", "value": 1 },
                    { "name": "+=", "type": "bool", "value": true } ] }
            ],
            "bindings": [
                { "key": "W", "properties": [
                    { "name": "EVENT", "value": "Count" }, { "name": "SUSTAINED", "type": "bool", "value": true },
                    { "name": "STOP_EVENT", "value": "Halt" } ] },
                { "key": "D", "properties": [
                    { "name": "EVENT", "value": "Right" }, { "name": "SUSTAINED", "type": "bool", "value": true },
                    { "name": "PRIORITY", "value": "HIGH" } ] },
                { "key": "A", "properties": [
                    { "name": "EVENT", "value": "Left" }, { "name": "SUSTAINED", "type": "bool", "value": true } ] },
                { "key": "Space", "properties": [ { "name": "EVENT", "value": "Hop" } ] },
                { "key": "Q", "properties": [ { "name": "EVENT", "value": "" } ] }
            ]
        } ]
    }"#;

    fn hero() -> ActorInstance {
        ActorInstance::new(ActorId(1), "Hero", Vec2::ZERO)
    }

    fn int(actor: &ActorInstance, name: &str) -> i32 {
        actor.variables.get(name).ok().and_then(Value::as_i32).unwrap_or(0)
    }

    #[test]
    fn test_key_code_is_case_insensitive() {
        assert_eq!(KeyCode::new(" space "), KeyCode::new("SPACE"));
        assert_eq!(KeyCode::new("Right Alt").to_string(), "RIGHT ALT");
        assert!(KeyCode::new("  ").is_empty());
    }

    #[test]
    fn test_sustained_held_ten_ticks() {
        let g = graph(WALKER);
        let mut actor = hero();
        let mut keys = KeySnapshot::default();

        keys.press("w");
        run(&g, &mut actor, &keys);
        keys.clear();
        keys.hold("w");
        for _ in 0..9 {
            run(&g, &mut actor, &keys);
        }
        assert_eq!(int(&actor, "Ticks"), 10);

        keys.clear();
        keys.release("w");
        let report = run(&g, &mut actor, &keys);
        assert_eq!(report.stop_actions, vec![KeyCode::new("W")]);
        assert_eq!(int(&actor, "Ticks"), 10);
        assert_eq!(int(&actor, "Stops"), 1);
        assert!(actor.sustained.is_empty());

        keys.clear();
        run(&g, &mut actor, &keys);
        assert_eq!(int(&actor, "Stops"), 1);
    }

    #[test]
    fn test_tap_within_one_tick_runs_then_stops() {
        let g = graph(WALKER);
        let mut actor = hero();
        let mut keys = KeySnapshot::default();
        keys.set(
            "W",
            KeyEdge {
                active: false,
                just_pressed: true,
                just_released: true,
            },
        );
        let report = run(&g, &mut actor, &keys);
        assert_eq!(int(&actor, "Ticks"), 1);
        assert_eq!(int(&actor, "Stops"), 1);
        assert_eq!(report.stop_actions, vec![KeyCode::new("W")]);
        assert!(actor.sustained.is_empty());
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let g = graph(WALKER);
        let mut actor = hero();
        let mut keys = KeySnapshot::default();
        keys.release("W");
        let report = run(&g, &mut actor, &keys);
        assert!(report.stop_actions.is_empty());
        assert_eq!(int(&actor, "Stops"), 0);
    }

    #[test]
    fn test_down_edge_fires_once() {
        let g = graph(WALKER);
        let mut actor = hero();
        let mut keys = KeySnapshot::default();
        keys.press("SPACE");
        run(&g, &mut actor, &keys);
        keys.clear();
        keys.hold("SPACE");
        run(&g, &mut actor, &keys);
        keys.clear();
        keys.release("SPACE");
        run(&g, &mut actor, &keys);
        assert_eq!(int(&actor, "Hops"), 1);
    }

    #[test]
    fn test_placeholder_binding_is_skipped() {
        let g = graph(WALKER);
        let mut actor = hero();
        let mut keys = KeySnapshot::default();
        keys.press("Q");
        let report = run(&g, &mut actor, &keys);
        assert!(report.invoked.is_empty());
    }

    #[test]
    fn test_higher_priority_wins_axis() {
        let g = graph(WALKER);
        let mut actor = hero();
        let mut keys = KeySnapshot::default();

        keys.press("D");
        run(&g, &mut actor, &keys);
        keys.clear();
        keys.hold("D").press("A");
        run(&g, &mut actor, &keys);

        // Both ticks pushed right; the later, lower-priority press lost x.
        assert!((actor.velocity.x - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_equal_priority_goes_to_latest_press() {
        let binding = KeyBinding {
            key: KeyCode::new("A"),
            event: Some(NodeId(0)),
            down: false,
            up: false,
            sustained: true,
            priority: Priority::MEDIUM,
            stop_event: None,
        };
        let mut actions = SustainedActions::default();
        actions.activate(KeyCode::new("A"), &binding, NodeId(0));
        actions.activate(KeyCode::new("D"), &binding, NodeId(1));
        let ranked = actions.ranked();
        assert_eq!(ranked[0].0, KeyCode::new("D"));
        assert_eq!(ranked[1].0, KeyCode::new("A"));
    }

    #[test]
    fn test_high_priority_overrides_earlier_press() {
        let g = graph(WALKER);
        let mut actor = hero();
        let mut keys = KeySnapshot::default();

        keys.press("A");
        run(&g, &mut actor, &keys);
        assert!((actor.velocity.x + 10.0).abs() < 1e-3);
        keys.clear();
        keys.hold("A").press("D");
        run(&g, &mut actor, &keys);
        assert!(actor.velocity.x.abs() < 1e-3);
    }

    #[test]
    fn test_stop_signal_cancels_sustained_action() {
        let g = graph(
            r#"{ "actors": [ {
                "name": "Hero",
                "events": [ { "name": "Once", "kind": "move", "properties": [
                    { "name": "SIGNAL", "value": "STOP" } ] } ],
                "bindings": [ { "key": "X", "properties": [
                    { "name": "EVENT", "value": "Once" },
                    { "name": "SUSTAINED", "type": "bool", "value": true } ] } ]
            } ] }"#,
        );
        let mut actor = hero();
        let mut keys = KeySnapshot::default();
        keys.press("X");
        let report = run(&g, &mut actor, &keys);
        assert_eq!(report.cancelled, vec![KeyCode::new("X")]);

        keys.clear();
        keys.hold("X");
        let report = run(&g, &mut actor, &keys);
        assert!(report.invoked.is_empty());

        keys.clear();
        keys.release("X");
        let report = run(&g, &mut actor, &keys);
        assert!(report.stop_actions.is_empty());
    }
}
