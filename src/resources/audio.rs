//! Headless audio sink.
//!
//! There is no audio device in headless runs. Played effects and music are
//! recorded in [`AudioLog`] in request order so runs and tests can inspect
//! them.

use bevy_ecs::prelude::Resource;

use crate::behavior::services::MusicRequest;

#[derive(Resource, Debug, Clone, Default)]
pub struct AudioLog {
    pub played: Vec<String>,
    pub music: Vec<MusicRequest>,
}

impl AudioLog {
    pub fn count(&self, path: &str) -> usize {
        self.played.iter().filter(|p| p.as_str() == path).count()
    }
}
