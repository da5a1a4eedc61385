//! Simulation configuration resource.
//!
//! Settings are loaded from an INI file. Every value has a safe default so a
//! missing or partial file still yields a usable configuration.
//!
//! # Configuration File Format
//!
//! ```ini
//! [tables]
//! path = ./assets/tables.json
//!
//! [simulation]
//! tick_rate = 60
//!
//! [animation]
//! frames_per_cycle = 4
//! ticks_per_frame = 6
//!
//! [interpreter]
//! max_depth = 64
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::behavior::engine::DEFAULT_MAX_DEPTH;

/// Default safe values for startup
const DEFAULT_TABLES_PATH: &str = "./assets/tables.json";
const DEFAULT_TICK_RATE: u32 = 60;
const DEFAULT_FRAMES_PER_CYCLE: u32 = 4;
const DEFAULT_TICKS_PER_FRAME: u32 = 6;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// JSON table document to load.
    pub tables_path: PathBuf,
    /// Fixed simulation ticks per second.
    pub tick_rate: u32,
    /// Frames in one animation cycle, used by `CYCLES` requests.
    pub frames_per_cycle: u32,
    /// Game ticks each animation frame stays on screen.
    pub ticks_per_frame: u32,
    /// Bound on nested node evaluation.
    pub max_depth: usize,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GameConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            tables_path: PathBuf::from(DEFAULT_TABLES_PATH),
            tick_rate: DEFAULT_TICK_RATE,
            frames_per_cycle: DEFAULT_FRAMES_PER_CYCLE,
            ticks_per_frame: DEFAULT_TICKS_PER_FRAME,
            max_depth: DEFAULT_MAX_DEPTH,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Seconds per simulation tick.
    pub fn tick_delta(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;

        // [tables] section
        if let Some(path) = config.get("tables", "path") {
            self.tables_path = PathBuf::from(path);
        }

        // [simulation] section
        if let Some(rate) = config.getuint("simulation", "tick_rate").ok().flatten() {
            self.tick_rate = (rate as u32).max(1);
        }

        // [animation] section
        if let Some(frames) = config.getuint("animation", "frames_per_cycle").ok().flatten() {
            self.frames_per_cycle = frames as u32;
        }
        if let Some(ticks) = config.getuint("animation", "ticks_per_frame").ok().flatten() {
            self.ticks_per_frame = ticks as u32;
        }

        // [interpreter] section
        if let Some(depth) = config.getuint("interpreter", "max_depth").ok().flatten() {
            self.max_depth = depth as usize;
        }

        info!(
            "Loaded config: tables={:?}, tick_rate={}, animation={}x{}, max_depth={}",
            self.tables_path,
            self.tick_rate,
            self.frames_per_cycle,
            self.ticks_per_frame,
            self.max_depth
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        config.set(
            "tables",
            "path",
            Some(self.tables_path.display().to_string()),
        );
        config.set("simulation", "tick_rate", Some(self.tick_rate.to_string()));
        config.set(
            "animation",
            "frames_per_cycle",
            Some(self.frames_per_cycle.to_string()),
        );
        config.set(
            "animation",
            "ticks_per_frame",
            Some(self.ticks_per_frame.to_string()),
        );
        config.set("interpreter", "max_depth", Some(self.max_depth.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("actiongraph-{}-{}.ini", name, std::process::id()))
    }

    #[test]
    fn test_defaults() {
        let config = GameConfig::new();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.max_depth, 64);
        assert!((config.tick_delta() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_is_error_and_keeps_defaults() {
        let mut config = GameConfig::with_path(temp_path("missing"));
        assert!(config.load_from_file().is_err());
        assert_eq!(config, GameConfig::with_path(temp_path("missing")));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let path = temp_path("partial");
        std::fs::write(&path, "[simulation]\ntick_rate = 30\n").unwrap();
        let mut config = GameConfig::with_path(&path);
        config.load_from_file().unwrap();
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.ticks_per_frame, DEFAULT_TICKS_PER_FRAME);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("saved");
        let mut saved = GameConfig::with_path(&path);
        saved.max_depth = 16;
        saved.frames_per_cycle = 8;
        saved.tables_path = PathBuf::from("levels/one.json");
        saved.save_to_file().unwrap();

        let mut loaded = GameConfig::with_path(&path);
        loaded.load_from_file().unwrap();
        assert_eq!(loaded, saved);
        std::fs::remove_file(&path).ok();
    }
}
