//! The loaded node graph as a read-only world resource.

use bevy_ecs::prelude::Resource;

use crate::behavior::engine::{DEFAULT_MAX_DEPTH, Interpreter};
use crate::behavior::graph::NodeGraph;

#[derive(Resource, Debug, Clone)]
pub struct BehaviorGraph {
    pub graph: NodeGraph,
    pub max_depth: usize,
}

impl BehaviorGraph {
    pub fn new(graph: NodeGraph) -> Self {
        Self {
            graph,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn interpreter(&self) -> Interpreter<'_> {
        Interpreter::new(&self.graph).with_max_depth(self.max_depth)
    }
}
