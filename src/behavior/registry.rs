//! Node registry: raw tables to typed node definitions.
//!
//! Each raw node is checked for a name, a known kind and a property bag the
//! kind accepts. Every problem is collected so one load reports all of them.
//! References between nodes stay as names here; see
//! [`resolver`](super::resolver) for the pass that links them.

use glam::Vec2;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use super::dispatch::KeyCode;
use super::error::{LoadError, LoadErrors, LookupError};
use super::node::{
    ButtonQuery, ChildRef, Children, CompareOps, FrameSpec, Namespace, NodeDefinition, NodeId,
    NodeKind, Priority, SetOp, Signal, SwitchMode, TextStyle,
};
use super::table::{GameTables, RawBinding, RawNode, RawTemplate};
use super::value::{Color, FromValue, Param, PropertyValue, Value};
use crate::components::animation::{AnimationType, Direction};
use crate::components::hitbox::Hitbox;

/// Template responses the host drives.
pub const RESPONSES: [&str; 3] = ["ON_SPAWN", "ON_ALWAYS", "ON_COLLISION"];

/// A key binding before its event names are linked.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingDecl {
    pub key: KeyCode,
    /// `None` for placeholder bindings with an empty EVENT.
    pub event: Option<ChildRef>,
    pub down: bool,
    pub up: bool,
    pub sustained: bool,
    pub priority: Option<Priority>,
    pub stop_event: Option<ChildRef>,
}

/// An actor template before its event names are linked.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDecl {
    pub name: String,
    pub bindings: Vec<BindingDecl>,
    pub responses: Vec<(String, ChildRef)>,
    pub hitboxes: Vec<Hitbox>,
}

impl TemplateDecl {
    pub fn namespace(&self) -> Namespace {
        Namespace::Actor(self.name.clone())
    }
}

/// Every node definition of a table document, keyed by namespace and name.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: Vec<NodeDefinition<ChildRef>>,
    index: FxHashMap<Namespace, FxHashMap<String, NodeId>>,
    /// Names declared with errors; references to them are not reported again.
    broken: FxHashSet<(Namespace, String)>,
    templates: Vec<TemplateDecl>,
}

impl NodeRegistry {
    /// Build the registry, failing with every problem found.
    pub fn load(tables: &GameTables) -> Result<Self, LoadErrors> {
        let (registry, errors) = Self::build(tables);
        if errors.is_empty() {
            Ok(registry)
        } else {
            Err(LoadErrors(errors))
        }
    }

    /// Build as much of the registry as possible and return the problems
    /// alongside it.
    pub fn build(tables: &GameTables) -> (Self, Vec<LoadError>) {
        let mut registry = Self::default();
        let mut errors = Vec::new();

        for raw in &tables.map_events {
            registry.add_node(raw, &Namespace::Map, &mut errors);
        }

        let mut seen_templates = FxHashSet::default();
        for raw in &tables.actors {
            if !seen_templates.insert(raw.name.clone()) {
                errors.push(LoadError::DuplicateTemplate(raw.name.clone()));
                continue;
            }
            let namespace = Namespace::Actor(raw.name.clone());
            // Make the namespace known even when the template has no events.
            registry.index.entry(namespace.clone()).or_default();
            for node in &raw.events {
                registry.add_node(node, &namespace, &mut errors);
            }
            let template = parse_template(raw, &mut errors);
            registry.templates.push(template);
        }
        registry.check_spawned_templates(&mut errors);

        debug!(
            "Registry built: {} nodes, {} templates, {} errors",
            registry.nodes.len(),
            registry.templates.len(),
            errors.len()
        );
        (registry, errors)
    }

    /// Every `spawn-actor` must name a declared template.
    fn check_spawned_templates(&self, errors: &mut Vec<LoadError>) {
        for def in &self.nodes {
            let NodeKind::SpawnActor { template, .. } = &def.kind else {
                continue;
            };
            if !self.templates.iter().any(|t| &t.name == template) {
                errors.push(LoadError::UnknownTemplate {
                    name: def.name.clone(),
                    template: template.clone(),
                });
            }
        }
    }

    fn add_node(&mut self, raw: &RawNode, namespace: &Namespace, errors: &mut Vec<LoadError>) {
        if raw.name.trim().is_empty() {
            errors.push(LoadError::MissingName {
                namespace: namespace.clone(),
            });
            return;
        }
        let names = self.index.entry(namespace.clone()).or_default();
        let key = (namespace.clone(), raw.name.clone());
        if names.contains_key(&raw.name) || self.broken.contains(&key) {
            errors.push(LoadError::DuplicateName {
                namespace: namespace.clone(),
                name: raw.name.clone(),
            });
            return;
        }
        match parse_node(raw, namespace) {
            Ok(def) => {
                let id = NodeId(self.nodes.len() as u32);
                names.insert(raw.name.clone(), id);
                self.nodes.push(def);
            }
            Err(mut problems) => {
                self.broken.insert(key);
                errors.append(&mut problems);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeDefinition<ChildRef>] {
        &self.nodes
    }

    pub fn templates(&self) -> &[TemplateDecl] {
        &self.templates
    }

    /// Id of `name` declared directly in `namespace`.
    pub fn find(&self, namespace: &Namespace, name: &str) -> Option<NodeId> {
        self.index.get(namespace)?.get(name).copied()
    }

    pub fn is_broken(&self, namespace: &Namespace, name: &str) -> bool {
        self.broken
            .contains(&(namespace.clone(), name.to_string()))
    }

    pub fn lookup(
        &self,
        namespace: &Namespace,
        name: &str,
    ) -> Result<&NodeDefinition<ChildRef>, LookupError> {
        self.find(namespace, name)
            .map(|id| &self.nodes[id.index()])
            .ok_or_else(|| LookupError::NameNotFound {
                namespace: namespace.clone(),
                name: name.to_string(),
            })
    }

    pub(crate) fn index(&self) -> &FxHashMap<Namespace, FxHashMap<String, NodeId>> {
        &self.index
    }
}

/// Kind tags: descriptive names plus the table type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KindTag {
    Accelerate,
    Decelerate,
    Move,
    Fall,
    Jump,
    Multi,
    SetVar { global: bool },
    Animate,
    Sound,
    PlayMusic,
    Rotate,
    SpawnText,
    EraseSelf,
    SpawnActor,
    SetAnimFrame,
    EngineWrapper,
    OnGround,
    Switch,
    SingleGuard,
    Collision,
    MouseButton,
    Compare,
    LayerState,
    TemplateLayer,
    ChangeMap,
    CloseMap,
    Quit,
}

impl KindTag {
    fn parse(text: &str) -> Option<Self> {
        let tag = match text.trim().to_ascii_lowercase().as_str() {
            "accelerate" | "aeaccelerate" => KindTag::Accelerate,
            "decelerate" | "aedecelerate" => KindTag::Decelerate,
            "move" | "aemove" => KindTag::Move,
            "fall" | "aefall" => KindTag::Fall,
            "jump" | "aejump" => KindTag::Jump,
            "multi" | "aemulti" => KindTag::Multi,
            "set-var" | "aesetvar" => KindTag::SetVar { global: false },
            "set-global-var" | "mesetvar" | "gesetvar" => KindTag::SetVar { global: true },
            "animate" | "aeanimate" => KindTag::Animate,
            "sound" | "aesound" => KindTag::Sound,
            "rotate" | "aerotate" => KindTag::Rotate,
            "spawn-text" | "aespawntext" | "mespawntext" => KindTag::SpawnText,
            "erase-self" | "aeeraseself" | "meeraseactor" => KindTag::EraseSelf,
            "play-music" | "meplaymusic" => KindTag::PlayMusic,
            "spawn-actor" | "aespawnactor" => KindTag::SpawnActor,
            "set-anim-frame" | "aesetanimframe" => KindTag::SetAnimFrame,
            "engine-wrapper" | "aegewrapper" | "aemewrapper" | "megewrapper" => {
                KindTag::EngineWrapper
            }
            "on-ground" | "ateonground" => KindTag::OnGround,
            "switch" | "ateswitch" => KindTag::Switch,
            "single-guard" | "atesingle" => KindTag::SingleGuard,
            "collision" | "atecollision" => KindTag::Collision,
            "mouse-button" | "atemousebuttons" => KindTag::MouseButton,
            "compare" | "atemath" => KindTag::Compare,
            "layer-state" | "melayerstate" => KindTag::LayerState,
            "template-layer" | "metemplatelayer" => KindTag::TemplateLayer,
            "change-map" | "gechangemap" => KindTag::ChangeMap,
            "close-map" | "geclosemap" => KindTag::CloseMap,
            "quit" | "gequit" => KindTag::Quit,
            _ => return None,
        };
        Some(tag)
    }

    fn takes_ordered_children(self) -> bool {
        matches!(self, KindTag::Multi | KindTag::Switch)
    }

    fn is_test(self) -> bool {
        matches!(
            self,
            KindTag::OnGround
                | KindTag::Switch
                | KindTag::Collision
                | KindTag::MouseButton
                | KindTag::Compare
        )
    }
}

/// Property bag being consumed by a kind parser. Keys match case-insensitively.
struct Props {
    node: String,
    entries: Vec<(String, PropertyValue)>,
    taken: Vec<bool>,
    errors: Vec<LoadError>,
}

impl Props {
    fn new(node: &str, raw: &RawNode) -> Self {
        let mut errors = Vec::new();
        let mut entries = Vec::with_capacity(raw.properties.len());
        for prop in &raw.properties {
            match prop.to_property_value() {
                Ok(value) => entries.push((prop.name.trim().to_string(), value)),
                Err(reason) => errors.push(LoadError::InvalidProperty {
                    name: node.to_string(),
                    property: prop.name.clone(),
                    reason,
                }),
            }
        }
        let taken = vec![false; entries.len()];
        Self {
            node: node.to_string(),
            entries,
            taken,
            errors,
        }
    }

    fn take(&mut self, key: &str) -> Option<PropertyValue> {
        let at = self
            .entries
            .iter()
            .enumerate()
            .position(|(i, (k, _))| !self.taken[i] && k.eq_ignore_ascii_case(key))?;
        self.taken[at] = true;
        Some(self.entries[at].1.clone())
    }

    fn invalid(&mut self, key: &str, reason: impl Into<String>) {
        self.errors.push(LoadError::InvalidProperty {
            name: self.node.clone(),
            property: key.to_string(),
            reason: reason.into(),
        });
    }

    fn missing(&mut self, key: &str) {
        self.errors.push(LoadError::MissingProperty {
            name: self.node.clone(),
            property: key.to_string(),
        });
    }

    fn param<T: FromValue + Clone>(&mut self, key: &str) -> Option<Param<T>> {
        let value = self.take(key)?;
        match Param::from_property(&value) {
            Ok(p) => Some(p),
            Err(reason) => {
                self.invalid(key, reason);
                None
            }
        }
    }

    fn param_or<T: FromValue + Clone>(&mut self, key: &str, default: T) -> Param<T> {
        self.param(key).unwrap_or(Param::Literal(default))
    }

    fn required<T: FromValue + Clone>(&mut self, key: &str, fallback: T) -> Param<T> {
        let present = self
            .entries
            .iter()
            .enumerate()
            .any(|(i, (k, _))| !self.taken[i] && k.eq_ignore_ascii_case(key));
        if !present {
            self.missing(key);
        }
        self.param_or(key, fallback)
    }

    /// A property that shapes the node itself; it must be a literal.
    fn literal<T: FromValue>(&mut self, key: &str) -> Option<T> {
        match self.take(key)? {
            PropertyValue::Literal(v) => match T::from_value(&v) {
                Some(t) => Some(t),
                None => {
                    self.invalid(
                        key,
                        format!("expected {}, found {}", T::EXPECTED, v.type_name()),
                    );
                    None
                }
            },
            PropertyValue::Indirect(_) => {
                self.invalid(key, "must be a literal value");
                None
            }
        }
    }

    fn priority(&mut self) -> Option<Priority> {
        match self.take("PRIORITY")? {
            PropertyValue::Literal(value) => Priority::from_value(&value).or_else(|| {
                self.invalid("PRIORITY", format!("unknown priority '{value}'"));
                None
            }),
            PropertyValue::Indirect(_) => {
                self.invalid("PRIORITY", "must be a literal value");
                None
            }
        }
    }

    fn flag(&mut self, key: &str, default: bool) -> bool {
        self.literal(key).unwrap_or(default)
    }

    fn required_text(&mut self, key: &str) -> String {
        match self.literal::<String>(key) {
            Some(s) if !s.is_empty() => s,
            _ => {
                self.missing(key);
                String::new()
            }
        }
    }

    fn animation(&mut self, key: &str, default: AnimationType) -> AnimationType {
        match self.literal::<String>(key) {
            Some(s) => AnimationType::parse(&s).unwrap_or_else(|| {
                self.invalid(key, format!("unknown animation type '{s}'"));
                default
            }),
            None => default,
        }
    }

    fn direction(&mut self, key: &str) -> Direction {
        match self.literal::<String>(key) {
            Some(s) => Direction::parse(&s).unwrap_or_else(|| {
                self.invalid(key, format!("unknown direction '{s}'"));
                Direction::Current
            }),
            None => Direction::Current,
        }
    }

    fn child(&mut self, key: &str) -> Option<ChildRef> {
        match self.take(key)? {
            PropertyValue::Indirect(var) => Some(ChildRef::Indirect(var)),
            PropertyValue::Literal(Value::Str(name)) if !name.trim().is_empty() => {
                Some(ChildRef::Named(name))
            }
            PropertyValue::Literal(Value::Str(_)) => None,
            PropertyValue::Literal(other) => {
                self.invalid(key, format!("expected node name, found {}", other.type_name()));
                None
            }
        }
    }

    fn required_child(&mut self, key: &str) -> Option<ChildRef> {
        let child = self.child(key);
        if child.is_none() {
            self.missing(key);
        }
        child
    }

    /// Remaining entries: numbered children for multi/switch, errors otherwise.
    fn finish(mut self, ordered: bool, children: &mut Children<ChildRef>) -> Vec<LoadError> {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if self.taken[i] {
                continue;
            }
            if !ordered {
                self.errors.push(LoadError::UnknownProperty {
                    name: self.node.clone(),
                    property: key.clone(),
                });
                continue;
            }
            let Ok(index) = key.parse::<i64>() else {
                self.errors.push(LoadError::InvalidChildKey {
                    name: self.node.clone(),
                    key: key.clone(),
                });
                continue;
            };
            // "1" and "01" name the same slot.
            if children.ordered.iter().any(|(k, _)| *k == index) {
                self.errors.push(LoadError::InvalidChildKey {
                    name: self.node.clone(),
                    key: key.clone(),
                });
                continue;
            }
            match value {
                PropertyValue::Indirect(var) => {
                    children.insert_ordered(index, ChildRef::Indirect(var.clone()))
                }
                PropertyValue::Literal(Value::Str(name)) => {
                    children.insert_ordered(index, ChildRef::Named(name.clone()))
                }
                PropertyValue::Literal(other) => self.errors.push(LoadError::InvalidProperty {
                    name: self.node.clone(),
                    property: key.clone(),
                    reason: format!("expected node name, found {}", other.type_name()),
                }),
            }
        }
        self.errors
    }
}

fn parse_node(
    raw: &RawNode,
    namespace: &Namespace,
) -> Result<NodeDefinition<ChildRef>, Vec<LoadError>> {
    let Some(tag) = KindTag::parse(&raw.kind) else {
        return Err(vec![LoadError::UnknownKind {
            name: raw.name.clone(),
            kind: raw.kind.clone(),
        }]);
    };

    let mut props = Props::new(&raw.name, raw);
    // NAME may be repeated inside the property list.
    props.take("NAME");

    let signal = props.literal::<String>("SIGNAL").and_then(|s| {
        Signal::parse(&s).or_else(|| {
            props.invalid("SIGNAL", format!("unknown signal '{s}'"));
            None
        })
    });
    let priority = props.priority();

    let mut children = Children::default();
    if tag.is_test() {
        children.success = props.child("SUCCESS");
        children.failure = props.child("FAILURE");
    }

    let kind = parse_kind(tag, &mut props, &mut children);
    let errors = props.finish(tag.takes_ordered_children(), &mut children);
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NodeDefinition {
        name: raw.name.clone(),
        namespace: namespace.clone(),
        kind,
        signal,
        priority,
        children,
    })
}

fn parse_kind(tag: KindTag, props: &mut Props, children: &mut Children<ChildRef>) -> NodeKind {
    match tag {
        KindTag::Accelerate => NodeKind::Accelerate {
            x_factor: props.param_or("XFACTOR", 0.0),
            y_factor: props.param_or("YFACTOR", 0.0),
            x_max: props.param("XMAX_SPEED"),
            y_max: props.param("YMAX_SPEED"),
        },
        KindTag::Decelerate => NodeKind::Decelerate {
            x_factor: props.param_or("XFACTOR", 0.0),
            y_factor: props.param_or("YFACTOR", 0.0),
        },
        KindTag::Move => NodeKind::Move,
        KindTag::Fall => {
            let acceleration = props.param_or("ACCELERATION", 500.0);
            let max_speed = match props.param("MAX_SPEED") {
                Some(p) => p,
                None => props.param_or("MAX_VELOCITY", 1000.0),
            };
            NodeKind::Fall {
                acceleration,
                max_speed,
                animation: props.animation("ANIMATION_TYPE", AnimationType::Fall),
            }
        }
        KindTag::Jump => {
            let height = props.param_or("JUMP_HEIGHT", 400.0);
            let duration = props.param_or("JUMP_DURATION", 0.5);
            let slow_factor = props.param_or("SLOW_FACTOR", 0.0);
            if let Param::Literal(d) = duration {
                if d <= 0.0 {
                    props.invalid("JUMP_DURATION", "must be positive");
                }
            }
            if let Param::Literal(s) = slow_factor {
                if !(0.0..1.0).contains(&s) {
                    props.invalid("SLOW_FACTOR", "must be in [0, 1)");
                }
            }
            NodeKind::Jump {
                height,
                duration,
                slow_factor,
                animation: props.animation("ANIMATION_TYPE", AnimationType::Jump),
            }
        }
        KindTag::Multi => NodeKind::Multi,
        KindTag::SetVar { global } => {
            let name = props.required_text("VAL_NAME");
            let value = props.required("VALUE", Value::Int(0));
            let add = props.flag("+=", false);
            let mul = props.flag("*=", false);
            if add && mul {
                props.invalid("*=", "cannot be combined with +=");
            }
            let op = match (add, mul) {
                (true, _) => SetOp::Add,
                (false, true) => SetOp::Multiply,
                _ => SetOp::Assign,
            };
            NodeKind::SetVar {
                name,
                value,
                op,
                global: props.flag("GLOBAL", global),
            }
        }
        KindTag::Animate => {
            let animation = props.animation("ANIMATION_TYPE", AnimationType::Idle);
            let direction = props.direction("DIRECTION");
            let counts = [
                ("GAME_FRAMES", props.param::<i32>("GAME_FRAMES")),
                ("CYCLES", props.param::<i32>("CYCLES")),
                ("ANIMATION_FRAMES", props.param::<i32>("ANIMATION_FRAMES")),
            ];
            let given: Vec<_> = counts.into_iter().filter_map(|(k, p)| Some((k, p?))).collect();
            if given.len() > 1 {
                props.invalid(given[1].0, "only one of GAME_FRAMES, CYCLES, ANIMATION_FRAMES");
            }
            let frames = match given.into_iter().next() {
                Some(("GAME_FRAMES", p)) => FrameSpec::GameFrames(p),
                Some(("CYCLES", p)) => FrameSpec::Cycles(p),
                Some((_, p)) => FrameSpec::AnimationFrames(p),
                None => FrameSpec::Once,
            };
            NodeKind::Animate {
                animation,
                direction,
                frames,
            }
        }
        KindTag::Sound => NodeKind::Sound {
            path: props.required("PATH", String::new()),
        },
        KindTag::PlayMusic => {
            let repetitions = match props.param("REPETITIONS") {
                Some(p) => p,
                None => props.param_or("REPITITIONS", -1),
            };
            let fade_in_ms = props.param_or("FADE IN", 0);
            if matches!(fade_in_ms, Param::Literal(ms) if ms < 0) {
                props.invalid("FADE IN", "must not be negative");
            }
            NodeKind::PlayMusic {
                path: props.required("PATH", String::new()),
                repetitions,
                fade_in_ms,
            }
        }
        KindTag::Rotate => {
            let degrees = props.param_or("DEGREE", 0.0);
            let absolute = props.flag("ABSOLUTE", false);
            let relative = props.flag("RELATIVE", !absolute);
            if absolute && relative {
                props.invalid("RELATIVE", "cannot be combined with ABSOLUTE");
            }
            NodeKind::Rotate { degrees, absolute }
        }
        KindTag::SpawnText => NodeKind::SpawnText {
            text: props.required("TEXT", String::new()),
            layer: props.required_text("LAYER_NAME"),
            style: TextStyle {
                color: props.literal::<Color>("COLOR").unwrap_or(Color::BLACK),
                bold: props.flag("BOLD", false),
                italic: props.flag("ITALIC", false),
                underline: props.flag("UNDERLINE", false),
            },
        },
        KindTag::EraseSelf => NodeKind::EraseSelf,
        KindTag::SpawnActor => NodeKind::SpawnActor {
            template: props.required_text("ACTOR_NAME"),
            layer: props.literal::<String>("LAYER_NAME").unwrap_or_default(),
            x_offset: props.param_or("X_POS", 0.0),
            y_offset: props.param_or("Y_POS", 0.0),
            name: props.literal::<String>("SPAWN_NAME").filter(|s| !s.is_empty()),
        },
        KindTag::SetAnimFrame => {
            let frame = props.param_or("ANIMATION_FRAME", 0);
            if matches!(frame, Param::Literal(n) if n < 0) {
                props.invalid("ANIMATION_FRAME", "must not be negative");
            }
            NodeKind::SetAnimFrame {
                animation: props.animation("ANIMATION_TYPE", AnimationType::Current),
                direction: props.direction("DIRECTION"),
                frame,
            }
        }
        KindTag::EngineWrapper => {
            children.event = props.required_child("EVENT");
            NodeKind::EngineWrapper
        }
        KindTag::OnGround => NodeKind::OnGround {
            tolerance: props.param_or("TOLERANCE", 0.0),
        },
        KindTag::Switch => {
            let and = props.flag("AND", false);
            let or = props.flag("OR", false);
            if and && or {
                props.invalid("OR", "cannot be combined with AND");
            }
            NodeKind::Switch {
                mode: if and { SwitchMode::All } else { SwitchMode::Any },
            }
        }
        KindTag::SingleGuard => {
            children.event = match props.child("EVENT_NAME") {
                Some(c) => Some(c),
                None => props.required_child("EVENT"),
            };
            NodeKind::SingleGuard
        }
        KindTag::Collision => NodeKind::Collision {
            my_hitbox: props.required_text("MY_HITBOX"),
            other_hitbox: props.required_text("OTHER_HITBOX"),
            other_name: props.literal::<String>("OTHER_NAME").filter(|s| !s.is_empty()),
        },
        KindTag::MouseButton => {
            let button = props.literal::<i32>("MOUSE_BUTTON_INDEX").unwrap_or(1);
            if !(1..=5).contains(&button) {
                props.invalid("MOUSE_BUTTON_INDEX", "must be between 1 and 5");
            }
            NodeKind::MouseButton(ButtonQuery {
                button: button.clamp(1, 5) as u8,
                pressed: props.flag("PRESSED", true),
                released: props.flag("RELEASED", false),
                down: props.flag("DOWN", false),
            })
        }
        KindTag::Compare => {
            let left = props.required("VAL1", Value::Int(0));
            let right = props.required("VAL2", Value::Int(0));
            let ops = CompareOps {
                eq: props.flag("==", false),
                ne: props.flag("!=", false),
                lt: props.flag("<", false),
                gt: props.flag(">", false),
            };
            if !(ops.eq || ops.ne || ops.lt || ops.gt) {
                props.invalid("==", "at least one comparison operator is required");
            }
            if ops.ne && (ops.lt || ops.gt) {
                props.invalid("!=", "cannot be combined with < or >");
            }
            NodeKind::Compare { left, right, ops }
        }
        KindTag::LayerState => {
            let layer = props.required("LAYER_NAME", String::new());
            let hide = props.flag("HIDE", false);
            let unhide = props.flag("UNHIDE", false);
            if hide == unhide {
                props.invalid("HIDE", "exactly one of HIDE and UNHIDE must be set");
            }
            NodeKind::LayerState {
                layer,
                hidden: hide,
            }
        }
        KindTag::TemplateLayer => NodeKind::TemplateLayer {
            source: props.required_text("SOURCE"),
            destination: props.required_text("DESTINATION"),
        },
        KindTag::ChangeMap => NodeKind::ChangeMap {
            path: props.required("PATH", String::new()),
            preserve: props.flag("PRESERVE", false),
        },
        KindTag::CloseMap => NodeKind::CloseMap,
        KindTag::Quit => NodeKind::Quit,
    }
}

fn parse_template(raw: &RawTemplate, errors: &mut Vec<LoadError>) -> TemplateDecl {
    let bindings = raw
        .bindings
        .iter()
        .filter_map(|b| parse_binding(&raw.name, b, errors))
        .collect();

    let mut responses = Vec::new();
    for (key, target) in &raw.responses {
        let key = key.trim().to_ascii_uppercase();
        if !RESPONSES.contains(&key.as_str()) {
            errors.push(LoadError::InvalidProperty {
                name: raw.name.clone(),
                property: key,
                reason: "unknown response".to_string(),
            });
            continue;
        }
        if target.trim().is_empty() {
            continue;
        }
        responses.push((key, ChildRef::parse(target)));
    }

    let hitboxes = raw
        .hitboxes
        .iter()
        .map(|h| Hitbox::new(h.name.clone(), h.width, h.height).with_offset(Vec2::new(h.x, h.y)))
        .collect();

    TemplateDecl {
        name: raw.name.clone(),
        bindings,
        responses,
        hitboxes,
    }
}

fn parse_binding(
    template: &str,
    raw: &RawBinding,
    errors: &mut Vec<LoadError>,
) -> Option<BindingDecl> {
    let key = KeyCode::new(&raw.key);
    let fail = |reason: String| LoadError::InvalidBinding {
        template: template.to_string(),
        key: raw.key.clone(),
        reason,
    };
    if key.is_empty() {
        errors.push(fail("empty key code".to_string()));
        return None;
    }

    let node = RawNode {
        name: raw.key.clone(),
        kind: String::new(),
        properties: raw.properties.clone(),
    };
    let mut props = Props::new(&raw.key, &node);
    let event = props.child("EVENT");
    let stop_event = props.child("STOP_EVENT");
    let sustained = props.flag("SUSTAINED", false);
    let mut down = props.flag("DOWN", false);
    let up = props.flag("UP", false);
    let priority = props.priority();
    let problems = props.finish(false, &mut Children::default());

    let before = errors.len();
    for problem in problems {
        errors.push(fail(problem.to_string()));
    }
    if sustained && (down || up) {
        errors.push(fail("SUSTAINED cannot be combined with UP or DOWN".to_string()));
    }
    if stop_event.is_some() && !sustained {
        errors.push(fail("STOP_EVENT requires SUSTAINED".to_string()));
    }
    if errors.len() > before {
        return None;
    }
    if !sustained && !up {
        down = true;
    }

    Some(BindingDecl {
        key,
        event,
        down,
        up,
        sustained,
        priority,
        stop_event,
    })
}
