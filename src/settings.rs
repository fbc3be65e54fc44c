//! Demo settings with persistence
//!
//! Settings are read from `~/.config/tessera/settings.toml`

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tessera_ecs::EcsConfig;
use tracing::{info, warn};

/// All demo settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ecs: EcsConfig,
    pub simulation: SimulationSettings,
}

impl Settings {
    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tessera").join("settings.toml"))
    }

    /// Load settings from disk, or return defaults if not found or invalid
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Parse and validate settings from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.ecs.validate()?;
        if settings.simulation.fixed_timestep <= 0.0 {
            anyhow::bail!("simulation.fixed_timestep must be positive");
        }
        Ok(settings)
    }
}

/// Parameters of the headless simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Number of frames to run
    pub frames: u32,
    /// Seconds per frame
    pub fixed_timestep: f32,
    /// Entities spawned before the first frame
    pub initial_entities: u32,
    /// Entities spawned by the spawner each frame
    pub spawn_per_frame: u32,
    /// Lifetime range of spawned entities, in seconds
    pub min_lifetime: f32,
    pub max_lifetime: f32,
    /// Seed for the spawner's random source
    pub seed: u64,
    /// Log a population summary every N frames (0 = never)
    pub report_every: u32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            frames: 600,
            fixed_timestep: 1.0 / 60.0,
            initial_entities: 200,
            spawn_per_frame: 4,
            min_lifetime: 1.0,
            max_lifetime: 4.0,
            seed: 7,
            report_every: 60,
        }
    }
}
