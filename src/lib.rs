//! actiongraph library.
//!
//! A behavior graph interpreter for 2D platformer actors, plus the ECS host
//! that ticks them. The interpreter lives in [`behavior`]; the remaining
//! modules expose the components, resources, systems and messages of the host
//! for use by the binary and in integration tests.

pub mod behavior;
pub mod components;
pub mod events;
pub mod game;
pub mod resources;
pub mod systems;
