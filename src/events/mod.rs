//! Messages carrying collaborator requests out of the behavior system.
//!
//! Submodules:
//! - [`audio`] – sound effect playback
//! - [`layer`] – layer visibility and text overlays
//! - [`map`] – map switches, close and quit
pub mod audio;
pub mod layer;
pub mod map;
