//! Map-level state resource.
//!
//! The [`MapState`] resource owns everything shared by the actors of the
//! current map: the map variable store, layer visibility, spawned text
//! overlays and the lifecycle requests issued by `change-map`, `close-map`
//! and `quit`. Requests are stored here and acted upon by the host loop.

use bevy_ecs::prelude::Resource;
use rustc_hash::FxHashSet;

use crate::behavior::services::TextRequest;
use crate::behavior::variables::VariableStore;

/// A requested map switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMap {
    pub path: String,
    /// Keep map variables across the switch.
    pub preserve: bool,
}

#[derive(Debug, Clone, Default, Resource)]
pub struct MapState {
    /// Map-global variables.
    pub variables: VariableStore,
    pub current_map: Option<String>,
    pub pending_map: Option<PendingMap>,
    pub hidden_layers: FxHashSet<String>,
    /// Text overlays in spawn order.
    pub texts: Vec<TextRequest>,
    /// `(source, destination)` layer template copies in request order.
    pub instantiated: Vec<(String, String)>,
    pub close_requested: bool,
    pub quit_requested: bool,
}

impl MapState {
    pub fn new(map: impl Into<String>) -> Self {
        Self {
            current_map: Some(map.into()),
            ..Default::default()
        }
    }

    pub fn is_hidden(&self, layer: &str) -> bool {
        self.hidden_layers.contains(layer)
    }

    pub fn set_hidden(&mut self, layer: impl Into<String>, hidden: bool) {
        let layer = layer.into();
        if hidden {
            self.hidden_layers.insert(layer);
        } else {
            self.hidden_layers.remove(&layer);
        }
    }

    /// Switch to the pending map, if any. Layer state is reset; variables are
    /// cleared unless the request asked to preserve them.
    pub fn take_pending(&mut self) -> Option<PendingMap> {
        let pending = self.pending_map.take()?;
        if !pending.preserve {
            self.variables.clear();
        }
        self.hidden_layers.clear();
        self.texts.clear();
        self.instantiated.clear();
        self.current_map = Some(pending.path.clone());
        Some(pending)
    }

    /// Whether the host loop should stop.
    pub fn should_stop(&self) -> bool {
        self.quit_requested || self.close_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::value::Value;

    #[test]
    fn test_layer_visibility() {
        let mut map = MapState::default();
        map.set_hidden("Secret", true);
        assert!(map.is_hidden("Secret"));
        map.set_hidden("Secret", false);
        assert!(!map.is_hidden("Secret"));
    }

    #[test]
    fn test_change_map_clears_variables_unless_preserved() {
        let mut map = MapState::new("one.tmx");
        map.variables.set("Coins", Value::Int(3), false).unwrap();
        map.set_hidden("Door", true);

        map.pending_map = Some(PendingMap {
            path: "two.tmx".into(),
            preserve: true,
        });
        map.take_pending().unwrap();
        assert_eq!(map.current_map.as_deref(), Some("two.tmx"));
        assert!(map.variables.contains("Coins"));
        assert!(!map.is_hidden("Door"));

        map.pending_map = Some(PendingMap {
            path: "three.tmx".into(),
            preserve: false,
        });
        map.take_pending().unwrap();
        assert!(map.variables.is_empty());
        assert!(map.take_pending().is_none());
    }
}
