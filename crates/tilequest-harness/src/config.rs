//! Harness configuration.
//!
//! Read from a TOML file. Missing or broken files fall back to defaults so a
//! bare `tilequest` invocation still runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tilequest_sim::WorldOptions;
use tracing::{info, warn};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "tilequest.toml";

/// Headless run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Tiled JSON map to load
    pub map_path: PathBuf,
    /// RON input script; idle input when absent
    pub script_path: Option<PathBuf>,
    /// Frames to simulate
    pub frames: u32,
    /// Fixed timestep in seconds
    pub timestep: f32,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Where to write the final snapshot; stdout when absent
    pub snapshot_path: Option<PathBuf>,
    /// Log drained events every frame
    pub log_events: bool,
    /// World construction options
    pub world: WorldOptions,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            map_path: PathBuf::from("assets/maps/world.json"),
            script_path: None,
            frames: 600,
            timestep: 1.0 / 60.0,
            log_filter: "tilequest=info".to_string(),
            snapshot_path: None,
            log_events: true,
            world: WorldOptions::default(),
        }
    }
}

impl HarnessConfig {
    /// Loads from `path`, falling back to defaults when the file is missing
    /// or invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Writes pretty TOML to `path`, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        self.frames = self.frames.clamp(1, 1_000_000);
        if !self.timestep.is_finite() {
            self.timestep = 1.0 / 60.0;
        }
        self.timestep = self.timestep.clamp(1.0 / 240.0, 0.1);
        if self.log_filter.trim().is_empty() {
            self.log_filter = "tilequest=info".to_string();
        }

        let world = &mut self.world;
        world.viewport_width = world.viewport_width.clamp(160.0, 7680.0);
        world.viewport_height = world.viewport_height.clamp(120.0, 4320.0);
        world.zoom = world.zoom.clamp(0.25, 4.0);
        world.tile_size = world.tile_size.clamp(8, 512);
        world.event_capacity = world.event_capacity.clamp(16, 1 << 20);
    }

    /// Seconds covered by the run.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.frames as f32 * self.timestep
    }
}
