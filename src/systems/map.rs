//! Map and layer request handling.
//!
//! Applies the [`MapCmd`] and [`LayerCmd`] messages of this tick to the
//! [`MapState`] resource. The host loop acts on the pending map switch and the
//! stop flags after the schedule has run.

use bevy_ecs::prelude::*;
use log::info;

use crate::events::layer::LayerCmd;
use crate::events::map::MapCmd;
use crate::resources::mapstate::{MapState, PendingMap};

pub fn apply_map_cmds(mut reader: MessageReader<MapCmd>, mut map: ResMut<MapState>) {
    for cmd in reader.read() {
        match cmd {
            MapCmd::Change { path, preserve } => {
                info!("Map change requested: {} (preserve={})", path, preserve);
                map.pending_map = Some(PendingMap {
                    path: path.clone(),
                    preserve: *preserve,
                });
            }
            MapCmd::Close => {
                info!("Map close requested");
                map.close_requested = true;
            }
            MapCmd::Quit => {
                info!("Quit requested");
                map.quit_requested = true;
            }
            MapCmd::InstantiateTemplate {
                source,
                destination,
            } => {
                map.instantiated.push((source.clone(), destination.clone()));
            }
            MapCmd::SpawnActor(_) => {}
        }
    }
}

pub fn apply_layer_cmds(mut reader: MessageReader<LayerCmd>, mut map: ResMut<MapState>) {
    for cmd in reader.read() {
        match cmd {
            LayerCmd::SetHidden { layer, hidden } => map.set_hidden(layer.clone(), *hidden),
            LayerCmd::SpawnText(text) => map.texts.push(text.clone()),
        }
    }
}

pub fn update_map_cmds(mut msgs: ResMut<Messages<MapCmd>>) {
    msgs.update();
}

pub fn update_layer_cmds(mut msgs: ResMut<Messages<LayerCmd>>) {
    msgs.update();
}
