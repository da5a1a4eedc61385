//! Node definitions: the closed set of node kinds and their typed parameters.
//!
//! A [`NodeDefinition`] is generic over its child reference type. The registry
//! produces definitions holding [`ChildRef`] (names as written in the table);
//! the resolver turns those into [`Edge`]s pointing straight at other nodes.
//!
//! Children come in two shapes:
//! - numbered children (`"1"`, `"2"`, ...) kept sorted by their integer key
//! - role children (`SUCCESS`, `FAILURE`, `EVENT`/`EVENT_NAME`)

use std::fmt;

use smallvec::SmallVec;

use super::value::{Color, Param, Value};
use crate::components::animation::{AnimationType, Direction};

/// Scope in which node names are unique and resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Map-global events, visible to every actor.
    Map,
    /// Events private to one actor template.
    Actor(String),
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Map => f.write_str("map namespace"),
            Namespace::Actor(template) => write!(f, "actor namespace '{template}'"),
        }
    }
}

/// Index of a node inside a loaded graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Signal a node emits after succeeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Stop,
    Next,
}

impl Signal {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "STOP" => Some(Signal::Stop),
            "NEXT" => Some(Signal::Next),
            _ => None,
        }
    }
}

/// Ordering weight for competing sustained actions. Higher wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(pub i32);

impl Priority {
    pub const LOW: Priority = Priority(0);
    pub const MEDIUM: Priority = Priority(1);
    pub const HIGH: Priority = Priority(2);

    /// Accepts `LOW`, `MEDIUM`, `HIGH` or a plain integer.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(Priority::LOW),
            "MEDIUM" => Some(Priority::MEDIUM),
            "HIGH" => Some(Priority::HIGH),
            other => other.parse().ok().map(Priority),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(Priority(*v)),
            Value::Str(s) => Priority::parse(s),
            _ => None,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::MEDIUM
    }
}

/// A child reference as written in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildRef {
    Named(String),
    /// `*Var`: the variable's string value names the node at evaluation time.
    Indirect(String),
}

impl ChildRef {
    pub fn parse(text: &str) -> Self {
        match text.strip_prefix('*') {
            Some(var) => ChildRef::Indirect(var.to_string()),
            None => ChildRef::Named(text.to_string()),
        }
    }
}

/// A resolved child reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edge {
    Node(NodeId),
    Indirect(String),
}

/// Child references of a node, grouped by role.
#[derive(Debug, Clone, PartialEq)]
pub struct Children<R> {
    /// Numbered children, sorted by ascending key.
    pub ordered: SmallVec<[(i64, R); 4]>,
    pub success: Option<R>,
    pub failure: Option<R>,
    pub event: Option<R>,
}

impl<R> Default for Children<R> {
    fn default() -> Self {
        Self {
            ordered: SmallVec::new(),
            success: None,
            failure: None,
            event: None,
        }
    }
}

impl<R> Children<R> {
    /// Insert a numbered child keeping ascending key order.
    pub fn insert_ordered(&mut self, key: i64, child: R) {
        let at = self.ordered.partition_point(|(k, _)| *k <= key);
        self.ordered.insert(at, (key, child));
    }

    /// Every child reference with its role label, numbered children first.
    pub fn iter(&self) -> impl Iterator<Item = (ChildRole, &R)> {
        self.ordered
            .iter()
            .map(|(k, r)| (ChildRole::Ordered(*k), r))
            .chain(self.success.iter().map(|r| (ChildRole::Success, r)))
            .chain(self.failure.iter().map(|r| (ChildRole::Failure, r)))
            .chain(self.event.iter().map(|r| (ChildRole::Event, r)))
    }

    pub fn map<S, E>(
        &self,
        mut f: impl FnMut(ChildRole, &R) -> Result<S, E>,
    ) -> Result<Children<S>, Vec<E>> {
        let mut errors = Vec::new();
        let mut out = Children::default();
        for (key, child) in &self.ordered {
            match f(ChildRole::Ordered(*key), child) {
                Ok(s) => out.ordered.push((*key, s)),
                Err(e) => errors.push(e),
            }
        }
        let mut single = |role, child: &Option<R>| match child.as_ref().map(|c| f(role, c)) {
            Some(Ok(s)) => Some(s),
            Some(Err(e)) => {
                errors.push(e);
                None
            }
            None => None,
        };
        out.success = single(ChildRole::Success, &self.success);
        out.failure = single(ChildRole::Failure, &self.failure);
        out.event = single(ChildRole::Event, &self.event);
        if errors.is_empty() {
            Ok(out)
        } else {
            Err(errors)
        }
    }
}

/// Which slot a child occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRole {
    Ordered(i64),
    Success,
    Failure,
    Event,
}

/// How `set-var` combines the new value with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Assign,
    Add,
    Multiply,
}

/// Condition combination for `switch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchMode {
    /// First succeeding condition takes the SUCCESS branch.
    Any,
    /// Every condition must succeed; the first failure takes FAILURE.
    All,
}

/// Relations accepted by the compare test. Any enabled relation that holds
/// makes the test succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareOps {
    pub eq: bool,
    pub ne: bool,
    pub lt: bool,
    pub gt: bool,
}

/// Pointer-button conditions; any enabled one that holds succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonQuery {
    pub button: u8,
    pub pressed: bool,
    pub released: bool,
    pub down: bool,
}

/// Length of an animation run requested by `animate`.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSpec {
    /// Completes immediately after switching the animation.
    Once,
    GameFrames(Param<i32>),
    Cycles(Param<i32>),
    AnimationFrames(Param<i32>),
    /// Hint only; never completes.
    Continuous,
}

/// Text overlay parameters for `spawn-text`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

/// The closed set of node kinds with their typed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Accelerate {
        x_factor: Param<f32>,
        y_factor: Param<f32>,
        x_max: Option<Param<f32>>,
        y_max: Option<Param<f32>>,
    },
    Decelerate {
        x_factor: Param<f32>,
        y_factor: Param<f32>,
    },
    Move,
    Fall {
        acceleration: Param<f32>,
        max_speed: Param<f32>,
        animation: AnimationType,
    },
    Jump {
        height: Param<f32>,
        duration: Param<f32>,
        slow_factor: Param<f32>,
        animation: AnimationType,
    },
    Multi,
    SetVar {
        name: String,
        value: Param<Value>,
        op: SetOp,
        global: bool,
    },
    Animate {
        animation: AnimationType,
        direction: Direction,
        frames: FrameSpec,
    },
    Sound {
        path: Param<String>,
    },
    /// `repetitions` below zero loops forever.
    PlayMusic {
        path: Param<String>,
        repetitions: Param<i32>,
        fade_in_ms: Param<i32>,
    },
    Rotate {
        degrees: Param<f32>,
        absolute: bool,
    },
    SpawnText {
        text: Param<String>,
        layer: String,
        style: TextStyle,
    },
    EraseSelf,
    /// Spawn an actor of template `template` at the actor's position plus
    /// the offset.
    SpawnActor {
        template: String,
        layer: String,
        x_offset: Param<f32>,
        y_offset: Param<f32>,
        name: Option<String>,
    },
    SetAnimFrame {
        animation: AnimationType,
        direction: Direction,
        frame: Param<i32>,
    },
    EngineWrapper,
    OnGround {
        tolerance: Param<f32>,
    },
    Switch {
        mode: SwitchMode,
    },
    SingleGuard,
    Collision {
        my_hitbox: String,
        other_hitbox: String,
        other_name: Option<String>,
    },
    MouseButton(ButtonQuery),
    Compare {
        left: Param<Value>,
        right: Param<Value>,
        ops: CompareOps,
    },
    LayerState {
        layer: Param<String>,
        hidden: bool,
    },
    TemplateLayer {
        source: String,
        destination: String,
    },
    ChangeMap {
        path: Param<String>,
        preserve: bool,
    },
    CloseMap,
    Quit,
}

impl NodeKind {
    /// Descriptive tag used in diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Accelerate { .. } => "accelerate",
            NodeKind::Decelerate { .. } => "decelerate",
            NodeKind::Move => "move",
            NodeKind::Fall { .. } => "fall",
            NodeKind::Jump { .. } => "jump",
            NodeKind::Multi => "multi",
            NodeKind::SetVar { .. } => "set-var",
            NodeKind::Animate { .. } => "animate",
            NodeKind::Sound { .. } => "sound",
            NodeKind::PlayMusic { .. } => "play-music",
            NodeKind::Rotate { .. } => "rotate",
            NodeKind::SpawnText { .. } => "spawn-text",
            NodeKind::EraseSelf => "erase-self",
            NodeKind::SpawnActor { .. } => "spawn-actor",
            NodeKind::SetAnimFrame { .. } => "set-anim-frame",
            NodeKind::EngineWrapper => "engine-wrapper",
            NodeKind::OnGround { .. } => "on-ground",
            NodeKind::Switch { .. } => "switch",
            NodeKind::SingleGuard => "single-guard",
            NodeKind::Collision { .. } => "collision",
            NodeKind::MouseButton(_) => "mouse-button",
            NodeKind::Compare { .. } => "compare",
            NodeKind::LayerState { .. } => "layer-state",
            NodeKind::TemplateLayer { .. } => "template-layer",
            NodeKind::ChangeMap { .. } => "change-map",
            NodeKind::CloseMap => "close-map",
            NodeKind::Quit => "quit",
        }
    }

    /// Test kinds decide between SUCCESS and FAILURE branches.
    pub fn is_test(&self) -> bool {
        matches!(
            self,
            NodeKind::OnGround { .. }
                | NodeKind::Switch { .. }
                | NodeKind::Collision { .. }
                | NodeKind::MouseButton(_)
                | NodeKind::Compare { .. }
        )
    }
}

/// A loaded node. `R` is [`ChildRef`] before resolution and [`Edge`] after.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefinition<R> {
    pub name: String,
    pub namespace: Namespace,
    pub kind: NodeKind,
    pub signal: Option<Signal>,
    pub priority: Option<Priority>,
    pub children: Children<R>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_children_sort_by_integer_key() {
        let mut children: Children<&str> = Children::default();
        children.insert_ordered(10, "ten");
        children.insert_ordered(2, "two");
        children.insert_ordered(1, "one");
        let keys: Vec<i64> = children.ordered.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2, 10]);
    }

    #[test]
    fn test_child_ref_parse_indirect() {
        assert_eq!(ChildRef::parse("*Target"), ChildRef::Indirect("Target".into()));
        assert_eq!(ChildRef::parse("Jump"), ChildRef::Named("Jump".into()));
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(Priority::parse("high"), Some(Priority::HIGH));
        assert_eq!(Priority::parse("LOW"), Some(Priority::LOW));
        assert_eq!(Priority::parse("7"), Some(Priority(7)));
        assert_eq!(Priority::parse("urgent"), None);
        assert!(Priority::HIGH > Priority::MEDIUM);
    }

    #[test]
    fn test_children_map_collects_all_errors() {
        let mut children: Children<&str> = Children::default();
        children.insert_ordered(1, "a");
        children.insert_ordered(2, "b");
        children.success = Some("c");
        let result: Result<Children<u8>, Vec<String>> =
            children.map(|_, name| Err(format!("bad {name}")));
        assert_eq!(result.unwrap_err().len(), 3);
    }

    #[test]
    fn test_namespace_display() {
        assert_eq!(Namespace::Map.to_string(), "map namespace");
        assert_eq!(
            Namespace::Actor("Hero".into()).to_string(),
            "actor namespace 'Hero'"
        );
    }
}
