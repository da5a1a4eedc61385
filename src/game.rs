//! World setup, schedule construction and the headless tick loop.
//!
//! [`setup_world`] loads the node graph into a fresh [`World`] together with
//! every resource and message queue the systems need. [`build_schedule`]
//! orders the systems for one tick, and [`run_ticks`] drives the loop the way
//! the binary does.

use bevy_ecs::prelude::*;
use glam::Vec2;
use log::info;

use crate::behavior::error::{LoadErrors, LookupError};
use crate::behavior::graph::NodeGraph;
use crate::behavior::table::GameTables;
use crate::components::actor::ActorInstance;
use crate::components::hitbox::Hitboxes;
use crate::events::audio::AudioCmd;
use crate::events::layer::LayerCmd;
use crate::events::map::MapCmd;
use crate::resources::actorids::ActorIds;
use crate::resources::animationruns::AnimationRuns;
use crate::resources::audio::AudioLog;
use crate::resources::behaviorgraph::BehaviorGraph;
use crate::resources::collisionworld::{CollisionWorld, Solid};
use crate::resources::gameconfig::GameConfig;
use crate::resources::input::{InputState, ScriptedInput};
use crate::resources::mapstate::MapState;
use crate::resources::worldtime::WorldTime;
use crate::systems::audio::{play_audio_cmds, update_bevy_audio_cmds};
use crate::systems::behavior::behavior_system;
use crate::systems::collision::collision_snapshot;
use crate::systems::input::update_input_state;
use crate::systems::map::{apply_layer_cmds, apply_map_cmds, update_layer_cmds, update_map_cmds};
use crate::systems::removal::remove_pending_actors;
use crate::systems::spawn::spawn_requested_actors;
use crate::systems::time::update_world_time;

/// Load the graph from `tables` and insert every resource into `world`.
pub fn setup_world(
    world: &mut World,
    config: &GameConfig,
    tables: &GameTables,
) -> Result<(), LoadErrors> {
    let graph = NodeGraph::load(tables)?;
    info!(
        "Loaded {} nodes and {} actor templates",
        graph.len(),
        graph.templates().count()
    );

    world.insert_resource(config.clone());
    world.insert_resource(WorldTime::default());
    world.insert_resource(InputState::default());
    world.init_resource::<ScriptedInput>();
    world.insert_resource(MapState::default());
    world.insert_resource(CollisionWorld::with_solids(
        tables.solids.iter().map(Solid::from).collect(),
    ));
    world.insert_resource(AnimationRuns::new(
        config.frames_per_cycle,
        config.ticks_per_frame,
    ));
    world.insert_resource(BehaviorGraph::new(graph).with_max_depth(config.max_depth));
    world.insert_resource(AudioLog::default());
    world.insert_resource(ActorIds::default());

    world.init_resource::<Messages<AudioCmd>>();
    world.init_resource::<Messages<MapCmd>>();
    world.init_resource::<Messages<LayerCmd>>();
    Ok(())
}

/// Systems of one tick, in order.
pub fn build_schedule() -> Schedule {
    let mut update = Schedule::default();
    update.add_systems(
        (
            update_input_state,
            collision_snapshot,
            behavior_system,
            (
                apply_map_cmds,
                apply_layer_cmds,
                play_audio_cmds,
                spawn_requested_actors,
            ),
            remove_pending_actors,
            (update_map_cmds, update_layer_cmds, update_bevy_audio_cmds),
        )
            .chain(),
    );
    update
}

/// Spawn an actor of `template` at `position`. Returns the new entity.
pub fn spawn_actor(
    world: &mut World,
    template: &str,
    position: Vec2,
) -> Result<Entity, LookupError> {
    let hitboxes = {
        let graph = world.resource::<BehaviorGraph>();
        let template = graph.graph.template(template)?;
        Hitboxes(template.hitboxes.iter().cloned().collect())
    };
    let id = world.resource_mut::<ActorIds>().allocate();
    info!("Spawning actor {:?} from template '{}'", id, template);
    Ok(world
        .spawn((ActorInstance::new(id, template, position), hitboxes))
        .id())
}

/// Run up to `ticks` ticks of `dt` seconds. Stops early when an actor asked
/// to quit or close the map. Returns the number of ticks run.
pub fn run_ticks(world: &mut World, schedule: &mut Schedule, ticks: u64, dt: f32) -> u64 {
    for tick in 0..ticks {
        update_world_time(world, dt);
        schedule.run(world);
        world.clear_trackers();

        let pending = world.resource_mut::<MapState>().take_pending();
        if let Some(pending) = pending {
            world.resource_mut::<AnimationRuns>().clear();
            info!(
                "Switched to map '{}' (variables preserved: {})",
                pending.path, pending.preserve
            );
        }
        if world.resource::<MapState>().should_stop() {
            info!("Stopping after tick {}", tick + 1);
            return tick + 1;
        }
    }
    ticks
}
