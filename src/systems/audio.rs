//! Audio command handling for headless runs.
//!
//! [`play_audio_cmds`] consumes [`AudioCmd`] messages written by the behavior
//! system and records them in the [`AudioLog`]. [`update_bevy_audio_cmds`]
//! advances the message queue once per tick.

use bevy_ecs::prelude::{MessageReader, Messages, ResMut};
use log::info;

use crate::events::audio::AudioCmd;
use crate::resources::audio::AudioLog;

pub fn play_audio_cmds(mut reader: MessageReader<AudioCmd>, mut log: ResMut<AudioLog>) {
    for cmd in reader.read() {
        match cmd {
            AudioCmd::PlayFx { path } => {
                info!("Playing sound {}", path);
                log.played.push(path.clone());
            }
            AudioCmd::PlayMusic(music) => {
                info!(
                    "Playing music {} (repetitions={}, fade in {} ms)",
                    music.path, music.repetitions, music.fade_in_ms
                );
                log.music.push(music.clone());
            }
        }
    }
}

/// Advance the ECS message queue for [`AudioCmd`].
pub fn update_bevy_audio_cmds(mut msgs: ResMut<Messages<AudioCmd>>) {
    msgs.update();
}
