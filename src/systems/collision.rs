use bevy_ecs::prelude::*;

use crate::components::actor::ActorInstance;
use crate::components::hitbox::Hitboxes;
use crate::resources::collisionworld::{ActorBody, CollisionWorld};

/// Copy actor positions and hitboxes into the [`CollisionWorld`] snapshot.
pub fn collision_snapshot(
    query: Query<(&ActorInstance, Option<&Hitboxes>)>,
    mut collision: ResMut<CollisionWorld>,
) {
    let bodies = query
        .iter()
        .filter(|(actor, _)| !actor.pending_removal)
        .map(|(actor, hitboxes)| ActorBody {
            id: actor.id,
            template: actor.template.clone(),
            position: actor.position,
            hitboxes: hitboxes.cloned().unwrap_or_default(),
        })
        .collect();
    collision.set_bodies(bodies);
}
