//! Error types for configuration and population control.

use thiserror::Error;

/// A configuration value that cannot be used
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("spawn configuration is missing a species id")]
    MissingSpeciesId,

    #[error("species {0} has no room patterns")]
    NoRoomPatterns(String),

    #[error("species {species}: invalid room pattern {pattern:?}: {source}")]
    InvalidPattern {
        species: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("species {species}: min level {min} exceeds max level {max}")]
    LevelRange { species: String, min: u32, max: u32 },

    #[error("species {species}: spawn chance {chance} is outside [0, 1]")]
    SpawnChance { species: String, chance: f64 },

    #[error("species {species}: respawn interval {secs}s is invalid (use -1 for never)")]
    RespawnInterval { species: String, secs: i32 },

    #[error("species {0} is already registered")]
    DuplicateSpecies(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a spawn request produced no NPC
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("unknown NPC species: {0}")]
    UnknownSpecies(String),

    #[error("level {level} is outside {min}..={max} for {species}")]
    LevelOutOfRange {
        species: String,
        level: u32,
        min: u32,
        max: u32,
    },

    #[error("{species} is already at its cap of {max} instances")]
    AtCapacity { species: String, max: u32 },

    #[error("no room matches the spawn patterns for {0}")]
    NoSpawnRoom(String),

    #[error("factory for {0} panicked while creating an instance")]
    FactoryPanicked(String),
}
