//! Input update system.
use bevy_ecs::prelude::*;

use crate::resources::input::{InputState, ScriptedInput};
use crate::resources::worldtime::WorldTime;

/// Feed the scripted key holds for the current tick into [`InputState`].
///
/// Runs first in the tick so every actor sees the same key edges.
pub fn update_input_state(
    time: Res<WorldTime>,
    script: Res<ScriptedInput>,
    mut input: ResMut<InputState>,
) {
    let down = script.keys_down(time.tick);
    input.update_keys(&down);
}
