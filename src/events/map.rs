//! Map lifecycle requests issued by actors.
use bevy_ecs::message::Message;

use crate::behavior::services::SpawnRequest;

#[derive(Message, Debug, Clone, PartialEq)]
pub enum MapCmd {
    /// Switch to the map at `path`, keeping map variables when `preserve`.
    Change { path: String, preserve: bool },
    Close,
    Quit,
    /// Copy the layer template `source` into layer `destination`.
    InstantiateTemplate { source: String, destination: String },
    SpawnActor(SpawnRequest),
}
