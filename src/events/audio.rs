use bevy_ecs::message::Message;

use crate::behavior::services::MusicRequest;

/// Commands sent *to* the audio backend.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub enum AudioCmd {
    PlayFx { path: String },
    PlayMusic(MusicRequest),
}
