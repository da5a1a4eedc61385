//! ECS resources made available to systems.
//!
//! Overview
//! - `actorids` – spawn-ordered actor id allocation
//! - `animationruns` – tick-counting controller for timed animation runs
//! - `audio` – headless record of played sound effects
//! - `behaviorgraph` – the loaded, read-only node graph
//! - `collisionworld` – per-tick snapshot of actor hitboxes and level solids
//! - `gameconfig` – INI-backed simulation settings
//! - `input` – per-tick key state and the scripted key timeline
//! - `mapstate` – map variables, layer state and lifecycle requests
//! - `worldtime` – simulation time, delta and tick counter
pub mod actorids;
pub mod animationruns;
pub mod audio;
pub mod behaviorgraph;
pub mod collisionworld;
pub mod gameconfig;
pub mod input;
pub mod mapstate;
pub mod worldtime;
