use bevy_ecs::prelude::*;
use log::{info, warn};

use crate::components::actor::ActorInstance;
use crate::components::hitbox::Hitboxes;
use crate::events::map::MapCmd;
use crate::resources::actorids::ActorIds;
use crate::resources::behaviorgraph::BehaviorGraph;

/// Spawn the actors requested by `spawn-actor` this tick. They run their
/// spawn response on the next tick.
pub fn spawn_requested_actors(
    mut commands: Commands,
    mut reader: MessageReader<MapCmd>,
    graph: Res<BehaviorGraph>,
    mut ids: ResMut<ActorIds>,
) {
    for cmd in reader.read() {
        let MapCmd::SpawnActor(request) = cmd else {
            continue;
        };
        let template = match graph.graph.template(&request.template) {
            Ok(template) => template,
            Err(e) => {
                warn!("Dropping spawn request: {}", e);
                continue;
            }
        };
        let id = ids.allocate();
        info!(
            "Spawning actor {:?} from template '{}' on layer '{}'",
            id, request.template, request.layer
        );
        let mut actor = ActorInstance::new(id, request.template.clone(), request.position);
        actor.name = request.name.clone();
        commands.spawn((actor, Hitboxes(template.hitboxes.iter().cloned().collect())));
    }
}
