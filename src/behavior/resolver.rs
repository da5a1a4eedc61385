//! Resolver: links child names into direct edges and validates the graph.
//!
//! Scope rules:
//! - actor nodes look in their own namespace, then map-global
//! - an engine-wrapper's EVENT looks only in map-global
//! - map nodes look only in map-global
//! - template bindings and responses look in the template, then map-global
//!
//! Static references must resolve and must not form a cycle. Dynamic `*Var`
//! references are left for evaluation time.

use log::debug;
use rustc_hash::FxHashMap;

use super::error::{LoadError, LoadErrors};
use super::graph::{find_scoped, ActorTemplate, KeyBinding, NodeGraph, Responses};
use super::node::{ChildRef, ChildRole, Edge, Namespace, NodeDefinition, NodeId, NodeKind};
use super::registry::{NodeRegistry, TemplateDecl};

pub struct Resolver<'a> {
    registry: &'a NodeRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self { registry }
    }

    fn find(&self, scope: &Namespace, name: &str, map_only: bool) -> Option<NodeId> {
        find_scoped(self.registry.index(), scope, name, map_only)
    }

    /// A reference to a node that failed to parse was already reported.
    fn known_broken(&self, scope: &Namespace, name: &str, map_only: bool) -> bool {
        (!map_only && self.registry.is_broken(scope, name))
            || self.registry.is_broken(&Namespace::Map, name)
    }

    fn link(
        &self,
        def: &NodeDefinition<ChildRef>,
        role: ChildRole,
        child: &ChildRef,
    ) -> Result<Edge, Option<LoadError>> {
        let map_only = role == ChildRole::Event && def.kind == NodeKind::EngineWrapper;
        match child {
            ChildRef::Indirect(var) => Ok(Edge::Indirect(var.clone())),
            ChildRef::Named(name) => match self.find(&def.namespace, name, map_only) {
                Some(id) => Ok(Edge::Node(id)),
                None if self.known_broken(&def.namespace, name, map_only) => Err(None),
                None => Err(Some(LoadError::Unresolved {
                    namespace: def.namespace.clone(),
                    from: def.name.clone(),
                    target: name.clone(),
                })),
            },
        }
    }

    fn link_template_ref(
        &self,
        template: &TemplateDecl,
        from: String,
        child: &ChildRef,
    ) -> Result<NodeId, Option<LoadError>> {
        let namespace = template.namespace();
        match child {
            ChildRef::Indirect(var) => Err(Some(LoadError::InvalidProperty {
                name: template.name.clone(),
                property: from,
                reason: format!("dynamic reference '*{var}' is not allowed here"),
            })),
            ChildRef::Named(name) => match self.find(&namespace, name, false) {
                Some(id) => Ok(id),
                None if self.known_broken(&namespace, name, false) => Err(None),
                None => Err(Some(LoadError::Unresolved {
                    namespace,
                    from,
                    target: name.clone(),
                })),
            },
        }
    }

    /// Unresolved references and cycles, all of them.
    pub fn validate(&self) -> Vec<LoadError> {
        let mut errors = Vec::new();
        let mut edges: Vec<Vec<NodeId>> = vec![Vec::new(); self.registry.len()];

        for (i, def) in self.registry.nodes().iter().enumerate() {
            for (role, child) in def.children.iter() {
                match self.link(def, role, child) {
                    Ok(Edge::Node(id)) => edges[i].push(id),
                    Ok(Edge::Indirect(_)) => {}
                    Err(Some(e)) => errors.push(e),
                    Err(None) => {}
                }
            }
        }

        for template in self.registry.templates() {
            if let Err(mut problems) = self.link_template(template) {
                errors.append(&mut problems);
            }
        }

        for cycle in find_cycles(&edges) {
            let names = cycle
                .iter()
                .map(|id| self.registry.nodes()[id.index()].name.clone())
                .collect();
            errors.push(LoadError::Cycle(names));
        }
        errors
    }

    /// Validate and produce the linked graph.
    pub fn resolve(&self) -> Result<NodeGraph, LoadErrors> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(LoadErrors(errors));
        }

        let mut nodes = Vec::with_capacity(self.registry.len());
        let mut errors = Vec::new();
        for def in self.registry.nodes() {
            match def.children.map(|role, child| self.link(def, role, child)) {
                Ok(children) => nodes.push(NodeDefinition {
                    name: def.name.clone(),
                    namespace: def.namespace.clone(),
                    kind: def.kind.clone(),
                    signal: def.signal,
                    priority: def.priority,
                    children,
                }),
                Err(problems) => errors.extend(problems.into_iter().flatten()),
            }
        }

        let mut templates = FxHashMap::default();
        for decl in self.registry.templates() {
            match self.link_template(decl) {
                Ok(template) => {
                    templates.insert(decl.name.clone(), template);
                }
                Err(mut problems) => errors.append(&mut problems),
            }
        }
        if !errors.is_empty() {
            return Err(LoadErrors(errors));
        }

        debug!(
            "Resolved graph: {} nodes, {} templates",
            nodes.len(),
            templates.len()
        );
        Ok(NodeGraph {
            nodes,
            index: self.registry.index().clone(),
            templates,
        })
    }

    fn link_template(&self, decl: &TemplateDecl) -> Result<ActorTemplate, Vec<LoadError>> {
        let mut errors = Vec::new();
        let mut bindings = Vec::with_capacity(decl.bindings.len());
        for binding in &decl.bindings {
            let from = format!("binding {}", binding.key);
            let event = match &binding.event {
                Some(child) => match self.link_template_ref(decl, from.clone(), child) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        errors.extend(e);
                        continue;
                    }
                },
                None => None,
            };
            let stop_event = match &binding.stop_event {
                Some(child) => match self.link_template_ref(decl, from, child) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        errors.extend(e);
                        continue;
                    }
                },
                None => None,
            };
            let node_priority =
                event.and_then(|id| self.registry.nodes()[id.index()].priority);
            bindings.push(KeyBinding {
                key: binding.key.clone(),
                event,
                down: binding.down,
                up: binding.up,
                sustained: binding.sustained,
                priority: binding.priority.or(node_priority).unwrap_or_default(),
                stop_event,
            });
        }

        let mut responses = Responses::default();
        for (key, child) in &decl.responses {
            match self.link_template_ref(decl, key.clone(), child) {
                Ok(id) => match key.as_str() {
                    "ON_SPAWN" => responses.on_spawn = Some(id),
                    "ON_ALWAYS" => responses.on_always = Some(id),
                    _ => responses.on_collision = Some(id),
                },
                Err(e) => errors.extend(e),
            }
        }

        if errors.is_empty() {
            Ok(ActorTemplate {
                name: decl.name.clone(),
                bindings,
                responses,
                hitboxes: decl.hitboxes.clone(),
            })
        } else {
            Err(errors)
        }
    }
}

/// Every cycle reachable through static edges, one per back edge. Each cycle
/// lists its nodes starting and ending with the same node.
fn find_cycles(edges: &[Vec<NodeId>]) -> Vec<Vec<NodeId>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; edges.len()];
    let mut cycles = Vec::new();

    for start in 0..edges.len() {
        if marks[start] != Mark::New {
            continue;
        }
        // (node, next edge index)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        marks[start] = Mark::Active;
        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            if let Some(target) = edges[node].get(next) {
                top.1 += 1;
                let t = target.index();
                match marks[t] {
                    Mark::New => {
                        marks[t] = Mark::Active;
                        stack.push((t, 0));
                    }
                    Mark::Active => {
                        let from = stack.iter().position(|(n, _)| *n == t).unwrap_or(0);
                        let mut cycle: Vec<NodeId> =
                            stack[from..].iter().map(|(n, _)| NodeId(*n as u32)).collect();
                        cycle.push(NodeId(t as u32));
                        cycles.push(cycle);
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }
    cycles
}
