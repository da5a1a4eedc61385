use bevy_ecs::prelude::Resource;

use crate::components::actor::ActorId;

/// Hands out spawn-ordered actor ids.
#[derive(Resource, Debug, Default)]
pub struct ActorIds {
    next: u64,
}

impl ActorIds {
    pub fn allocate(&mut self) -> ActorId {
        let id = ActorId(self.next);
        self.next += 1;
        id
    }
}
