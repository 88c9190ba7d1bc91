//! MUD combat and world simulation core.
//!
//! The binary in `main.rs` wires these pieces into a console server; the
//! library keeps them free of any particular front end.

pub mod combat;
pub mod commands;
pub mod config;
pub mod dice;
pub mod entities;
pub mod error;
pub mod events;
pub mod npc;
pub mod persistence;
pub mod tick;
pub mod world;
