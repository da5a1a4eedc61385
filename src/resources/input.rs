//! Per-tick key and pointer input resources.
//!
//! [`InputState`] holds the edge-detected state of every key seen this tick and
//! is what the behavior system reads. Headless runs fill it from a
//! [`ScriptedInput`] timeline of key holds; pointer buttons are addressed as
//! the pseudo keys `MOUSE1` to `MOUSE5`.
use bevy_ecs::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::behavior::dispatch::{KeyCode, KeyEdge, KeyStates};
use crate::behavior::services::{ButtonState, PointerState};

/// Pseudo key prefix for pointer buttons.
pub const MOUSE_PREFIX: &str = "MOUSE";

/// Resource capturing the per-tick key state relevant to the actors.
#[derive(Resource, Debug, Clone, Default)]
pub struct InputState {
    keys: FxHashMap<KeyCode, KeyEdge>,
    buttons: [ButtonState; 5],
}

impl InputState {
    /// Replace the held key set, deriving press and release edges from the
    /// previous tick. Keys that stay up are dropped.
    pub fn update_keys(&mut self, down: &FxHashSet<KeyCode>) {
        let mut next = FxHashMap::default();
        for (code, edge) in &self.keys {
            if edge.active && !down.contains(code) {
                next.insert(
                    code.clone(),
                    KeyEdge {
                        active: false,
                        just_pressed: false,
                        just_released: true,
                    },
                );
            }
        }
        for code in down {
            let was_down = self.keys.get(code).is_some_and(|e| e.active);
            next.insert(
                code.clone(),
                KeyEdge {
                    active: true,
                    just_pressed: !was_down,
                    just_released: false,
                },
            );
        }
        self.keys = next;

        for (i, button) in self.buttons.iter_mut().enumerate() {
            let edge = self
                .keys
                .get(&KeyCode::new(&format!("{MOUSE_PREFIX}{}", i + 1)))
                .copied()
                .unwrap_or_default();
            *button = ButtonState {
                pressed: edge.just_pressed,
                released: edge.just_released,
                down: edge.active,
            };
        }
    }

    pub fn is_down(&self, code: &KeyCode) -> bool {
        self.keys.get(code).is_some_and(|e| e.active)
    }
}

impl KeyStates for InputState {
    fn key(&self, code: &KeyCode) -> KeyEdge {
        self.keys.get(code).copied().unwrap_or_default()
    }
}

impl PointerState for InputState {
    fn button(&self, index: u8) -> ButtonState {
        index
            .checked_sub(1)
            .and_then(|i| self.buttons.get(i as usize))
            .copied()
            .unwrap_or_default()
    }
}

/// One key held from tick `from` through tick `to`, both inclusive and 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHold {
    pub key: KeyCode,
    pub from: u64,
    pub to: u64,
}

impl KeyHold {
    /// Parse `KEY:FROM:TO`, e.g. `D:1:10`.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut parts = text.rsplitn(3, ':');
        let to = parts.next();
        let from = parts.next();
        let key = parts.next();
        let (Some(key), Some(from), Some(to)) = (key, from, to) else {
            return Err(format!("expected KEY:FROM:TO, got '{}'", text));
        };
        let from: u64 = from
            .trim()
            .parse()
            .map_err(|e| format!("invalid start tick '{}': {}", from, e))?;
        let to: u64 = to
            .trim()
            .parse()
            .map_err(|e| format!("invalid end tick '{}': {}", to, e))?;
        let key = KeyCode::new(key);
        if key.is_empty() {
            return Err(format!("missing key name in '{}'", text));
        }
        if to < from {
            return Err(format!("end tick {} is before start tick {}", to, from));
        }
        Ok(Self { key, from, to })
    }

    pub fn covers(&self, tick: u64) -> bool {
        (self.from..=self.to).contains(&tick)
    }
}

/// Timeline of key holds for headless runs.
#[derive(Resource, Debug, Clone, Default)]
pub struct ScriptedInput {
    pub holds: Vec<KeyHold>,
}

impl ScriptedInput {
    pub fn new(holds: Vec<KeyHold>) -> Self {
        Self { holds }
    }

    /// Keys held during `tick`.
    pub fn keys_down(&self, tick: u64) -> FxHashSet<KeyCode> {
        self.holds
            .iter()
            .filter(|h| h.covers(tick))
            .map(|h| h.key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(keys: &[&str]) -> FxHashSet<KeyCode> {
        keys.iter().map(|k| KeyCode::new(k)).collect()
    }

    #[test]
    fn test_edges_across_ticks() {
        let mut input = InputState::default();
        let w = KeyCode::new("W");

        input.update_keys(&down(&["w"]));
        assert_eq!(
            input.key(&w),
            KeyEdge {
                active: true,
                just_pressed: true,
                just_released: false
            }
        );

        input.update_keys(&down(&["W"]));
        assert!(input.key(&w).active);
        assert!(!input.key(&w).just_pressed);

        input.update_keys(&down(&[]));
        assert!(input.key(&w).just_released);
        assert!(!input.key(&w).active);

        input.update_keys(&down(&[]));
        assert_eq!(input.key(&w), KeyEdge::default());
    }

    #[test]
    fn test_mouse_pseudo_keys() {
        let mut input = InputState::default();
        input.update_keys(&down(&["mouse1"]));
        assert!(input.button(1).pressed);
        assert!(input.button(1).down);
        assert!(!input.button(2).down);
        assert_eq!(input.button(0), ButtonState::default());
        assert_eq!(input.button(9), ButtonState::default());
    }

    #[test]
    fn test_key_hold_parse() {
        let hold = KeyHold::parse("Right Alt:3:7").unwrap();
        assert_eq!(hold.key, KeyCode::new("RIGHT ALT"));
        assert!(hold.covers(3) && hold.covers(7));
        assert!(!hold.covers(8));

        assert!(KeyHold::parse("D:5").is_err());
        assert!(KeyHold::parse("D:9:2").is_err());
        assert!(KeyHold::parse(":1:2").is_err());
        assert!(KeyHold::parse("D:x:2").is_err());
    }

    #[test]
    fn test_scripted_keys_down() {
        let script = ScriptedInput::new(vec![
            KeyHold::parse("D:1:3").unwrap(),
            KeyHold::parse("SPACE:2:2").unwrap(),
        ]);
        assert_eq!(script.keys_down(1), down(&["D"]));
        assert_eq!(script.keys_down(2), down(&["D", "SPACE"]));
        assert!(script.keys_down(4).is_empty());
    }
}
