//! Simulation systems.
//!
//! Submodules overview
//! - [`audio`] – record sound requests and advance the audio message queue
//! - [`behavior`] – run key bindings and response events for every actor
//! - [`collision`] – build the per-tick collision snapshot
//! - [`input`] – feed scripted key holds into [`crate::resources::input::InputState`]
//! - [`map`] – apply map and layer requests to [`crate::resources::mapstate::MapState`]
//! - [`removal`] – despawn actors flagged by `erase-self`
//! - [`spawn`] – create actors requested by `spawn-actor`
//! - [`time`] – update simulation time, delta and tick counter
pub mod audio;
pub mod behavior;
pub mod collision;
pub mod input;
pub mod map;
pub mod removal;
pub mod spawn;
pub mod time;
