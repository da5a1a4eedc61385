use bevy_ecs::message::Message;

use crate::behavior::services::TextRequest;

/// Layer changes issued by actors.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum LayerCmd {
    SetHidden { layer: String, hidden: bool },
    SpawnText(TextRequest),
}
