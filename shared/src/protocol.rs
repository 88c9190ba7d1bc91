//! Outbound event vocabulary and world tuning constants.

use std::fmt;

use serde::{Deserialize, Serialize};

/// World tick period in milliseconds
pub const TICK_INTERVAL_MS: u64 = 1000;

/// How often the spawner evaluates respawns, in seconds
pub const SPAWN_CHECK_INTERVAL_SECS: u64 = 60;

/// Attack cooldown at speed 50, in milliseconds
pub const BASE_ATTACK_COOLDOWN_MS: u64 = 2000;

/// Idle time after which combat is considered stale, in milliseconds
pub const COMBAT_TIMEOUT_MS: u64 = 10_000;

/// Starting credits for a new character
pub const STARTING_CREDITS: u32 = 100;

/// Starting and maximum energy for a new character
pub const STARTING_ENERGY: u32 = 100;

/// Default number of inventory slots for players
pub const PLAYER_INVENTORY_SLOTS: usize = 20;

/// Default number of inventory slots for NPCs
pub const NPC_INVENTORY_SLOTS: usize = 50;

/// Who an event is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Everyone in a room (target is the room name)
    Room,
    /// A single player (target is the player ID)
    Player,
    /// Everyone online (target is empty)
    System,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Player => "player",
            Self::System => "system",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single narration event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: EventKind,
    pub target: String,
    pub message: String,
}

impl GameEvent {
    pub fn new(kind: EventKind, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            message: message.into(),
        }
    }

    /// Channel name a transport would publish this event on
    pub fn channel(&self) -> String {
        match self.kind {
            EventKind::System => "system".to_string(),
            _ => format!("{}:{}", self.kind, self.target),
        }
    }
}
