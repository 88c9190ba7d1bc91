//! Server configuration.
//!
//! Read from an optional JSON file. Any field left out takes its default, and
//! a missing file means an all-default configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{error, info};
use serde::{Deserialize, Serialize};

use mud_shared::{SPAWN_CHECK_INTERVAL_SECS, TICK_INTERVAL_MS};

use crate::error::ConfigError;

/// Default config file, looked up in the working directory
pub const CONFIG_FILE: &str = "server_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Milliseconds between world ticks
    pub tick_interval_ms: u64,
    /// Seconds between respawn checks
    pub spawn_check_interval_secs: u64,
    /// Fixed dice seed for reproducible runs (None = random)
    pub rng_seed: Option<u64>,
    /// Capacity of the narration channel
    pub event_buffer: usize,
    /// Hand new characters the starter kit
    pub starter_kit: bool,
    /// Populate the world with NPCs at startup
    pub initial_spawn: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL_MS,
            spawn_check_interval_secs: SPAWN_CHECK_INTERVAL_SECS,
            rng_seed: None,
            event_buffer: 256,
            starter_kit: true,
            initial_spawn: true,
        }
    }
}

impl ServerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn spawn_check_interval(&self) -> Duration {
        Duration::from_secs(self.spawn_check_interval_secs)
    }

    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load `path` if it exists. Missing or broken files fall back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No {} found, using default configuration", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                error!("{}; using default configuration", e);
                Self::default()
            }
        }
    }
}
