//! The behavior graph interpreter.
//!
//! Tables are loaded into a [`registry::NodeRegistry`], checked and linked by
//! the [`resolver::Resolver`] into an immutable [`graph::NodeGraph`], then
//! evaluated per actor and tick by the [`engine::Interpreter`]. Key input
//! reaches the interpreter through the [`dispatch::KeyBindingDispatcher`].
//!
//! Submodules:
//! - [`error`] – load, lookup, variable and runtime error types
//! - [`value`] – typed property values and indirect parameters
//! - [`node`] – node kinds, signals, priorities and child references
//! - [`table`] – serde model of the JSON table document
//! - [`registry`] – per-namespace node storage and property validation
//! - [`resolver`] – name resolution and cycle detection
//! - [`graph`] – the resolved graph and actor templates
//! - [`variables`] – actor and map variable stores
//! - [`physics`] – velocity and jump kinematics
//! - [`signal`] – STOP flag and axis locks
//! - [`services`] – collaborator traits and in-memory stand-ins
//! - [`engine`] – node evaluation
//! - [`dispatch`] – key binding dispatch and sustained actions
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod graph;
pub mod node;
pub mod physics;
pub mod registry;
pub mod resolver;
pub mod services;
pub mod signal;
pub mod table;
pub mod value;
pub mod variables;
