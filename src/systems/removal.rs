use bevy_ecs::prelude::*;
use log::debug;

use crate::components::actor::ActorInstance;
use crate::resources::animationruns::AnimationRuns;

/// Despawn actors flagged by `erase-self`. Runs at the end of the tick.
pub fn remove_pending_actors(
    mut commands: Commands,
    query: Query<(Entity, &ActorInstance)>,
    mut runs: ResMut<AnimationRuns>,
) {
    for (entity, actor) in query.iter() {
        if actor.pending_removal {
            debug!("Despawning actor {:?} ({})", actor.id, actor.template);
            runs.forget_actor(actor.id);
            commands.entity(entity).despawn();
        }
    }
}
