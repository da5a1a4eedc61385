//! The resolved, read-only node graph shared by every actor.

use rustc_hash::FxHashMap;

use super::dispatch::KeyCode;
use super::error::{LoadErrors, LookupError};
use super::node::{Edge, Namespace, NodeDefinition, NodeId, Priority};
use super::registry::NodeRegistry;
use super::resolver::Resolver;
use super::table::GameTables;
use crate::components::hitbox::Hitbox;

/// Physical key to root event with its trigger flags.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBinding {
    pub key: KeyCode,
    /// `None` for placeholder bindings; the dispatcher skips them.
    pub event: Option<NodeId>,
    pub down: bool,
    pub up: bool,
    pub sustained: bool,
    pub priority: Priority,
    /// Evaluated once when a sustained binding is released.
    pub stop_event: Option<NodeId>,
}

/// Root events the host runs without input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Responses {
    pub on_spawn: Option<NodeId>,
    pub on_always: Option<NodeId>,
    pub on_collision: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActorTemplate {
    pub name: String,
    pub bindings: Vec<KeyBinding>,
    pub responses: Responses,
    pub hitboxes: Vec<Hitbox>,
}

impl ActorTemplate {
    pub fn namespace(&self) -> Namespace {
        Namespace::Actor(self.name.clone())
    }
}

type NameIndex = FxHashMap<Namespace, FxHashMap<String, NodeId>>;

/// Immutable graph of resolved nodes and actor templates.
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    pub(crate) nodes: Vec<NodeDefinition<Edge>>,
    pub(crate) index: NameIndex,
    pub(crate) templates: FxHashMap<String, ActorTemplate>,
}

impl NodeGraph {
    /// Parse, validate and link the tables. Every problem is reported at once.
    pub fn load(tables: &GameTables) -> Result<Self, LoadErrors> {
        let (registry, mut errors) = NodeRegistry::build(tables);
        let resolver = Resolver::new(&registry);
        errors.extend(resolver.validate());
        if !errors.is_empty() {
            return Err(LoadErrors(errors));
        }
        resolver.resolve()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &NodeDefinition<Edge> {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeDefinition<Edge>> {
        self.nodes.get(id.index())
    }

    /// Node declared directly in `namespace`.
    pub fn lookup(&self, namespace: &Namespace, name: &str) -> Result<NodeId, LookupError> {
        self.index
            .get(namespace)
            .and_then(|names| names.get(name))
            .copied()
            .ok_or_else(|| LookupError::NameNotFound {
                namespace: namespace.clone(),
                name: name.to_string(),
            })
    }

    /// Resolve `name` as seen from `scope`: the actor namespace first, then
    /// map-global. `map_only` skips the actor namespace.
    pub fn resolve_name(&self, scope: &Namespace, name: &str, map_only: bool) -> Option<NodeId> {
        find_scoped(&self.index, scope, name, map_only)
    }

    pub fn template(&self, name: &str) -> Result<&ActorTemplate, LookupError> {
        self.templates
            .get(name)
            .ok_or_else(|| LookupError::TemplateNotFound(name.to_string()))
    }

    pub fn templates(&self) -> impl Iterator<Item = &ActorTemplate> {
        self.templates.values()
    }
}

pub(crate) fn find_scoped(
    index: &NameIndex,
    scope: &Namespace,
    name: &str,
    map_only: bool,
) -> Option<NodeId> {
    let local = match scope {
        Namespace::Actor(_) if !map_only => index.get(scope).and_then(|n| n.get(name)),
        _ => None,
    };
    local
        .or_else(|| index.get(&Namespace::Map).and_then(|n| n.get(name)))
        .copied()
}
