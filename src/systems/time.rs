//! Clock update, run by the host loop before each schedule pass.
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Start the next tick on the [`WorldTime`] resource.
pub fn update_world_time(world: &mut World, dt: f32) {
    world.resource_mut::<WorldTime>().advance(dt);
}
