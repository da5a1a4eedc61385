//! Runtime state of one spawned actor.
//!
//! The interpreter mutates an [`ActorInstance`] while evaluating that actor's
//! root events. In the ECS host it is a component on the actor entity.

use bevy_ecs::prelude::Component;
use glam::Vec2;
use rustc_hash::FxHashSet;

use crate::behavior::dispatch::SustainedActions;
use crate::behavior::node::{Namespace, NodeId};
use crate::behavior::variables::VariableStore;
use crate::components::animation::{AnimationState, Direction};

/// Spawn-ordered actor identifier. Lower ids were spawned earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u64);

#[derive(Component, Debug, Clone)]
pub struct ActorInstance {
    pub id: ActorId,
    /// Template the actor was spawned from; also its event namespace.
    pub template: String,
    /// Instance name given by `spawn-actor`, if any.
    pub name: Option<String>,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Render rotation in degrees.
    pub rotation: f32,
    pub animation: AnimationState,
    pub variables: VariableStore,
    pub sustained: SustainedActions,
    /// One-shot guards that already fired.
    pub guards: FxHashSet<NodeId>,
    /// Set by `erase-self`; the host despawns the actor at end of tick.
    pub pending_removal: bool,
    /// Whether the spawn response already ran.
    pub spawned: bool,
}

impl ActorInstance {
    pub fn new(id: ActorId, template: impl Into<String>, position: Vec2) -> Self {
        Self {
            id,
            template: template.into(),
            name: None,
            position,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            animation: AnimationState::default(),
            variables: VariableStore::new(),
            sustained: SustainedActions::default(),
            guards: FxHashSet::default(),
            pending_removal: false,
            spawned: false,
        }
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::Actor(self.template.clone())
    }

    pub fn facing(&self) -> Direction {
        self.animation.direction
    }
}
