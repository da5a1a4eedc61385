//! ECS components for actors.
//!
//! Submodules overview:
//! - [`actor`] – runtime state of one spawned actor, mutated by the interpreter
//! - [`animation`] – animation type, facing direction and the current state
//! - [`hitbox`] – named axis-aligned hitboxes for collision tests

pub mod actor;
pub mod animation;
pub mod hitbox;
