//! NPC species behaviors.
//!
//! A behavior never touches other entities directly. It reads a snapshot of
//! its surroundings from [`TickContext`] and returns [`NpcAction`]s, which the
//! tick scheduler carries out once the NPC's own lock has been released.

mod drone;
mod enemy;
mod security_bot;

pub use drone::{DroneBehavior, MaintenanceDroneFactory};
pub use enemy::{EnemyBehavior, HostileRoutine, StreetThugFactory};
pub use security_bot::{SecurityBotBehavior, SecurityBotFactory};

use std::time::Instant;

use mud_shared::Direction;

use crate::combat::AttackOutcome;
use crate::dice::Dice;
use crate::entities::{EntityId, NpcBody, Player};

/// What an NPC can see during one tick
#[derive(Debug, Clone)]
pub struct TickContext<'a> {
    pub now: Instant,
    pub room_name: &'a str,
    /// Living players in the NPC's room
    pub players: &'a [EntityId],
    /// Exits out of the NPC's room
    pub exits: &'a [Direction],
}

impl<'a> TickContext<'a> {
    /// A room with nobody in it and no way out
    pub fn empty(room_name: &'a str) -> Self {
        Self {
            now: Instant::now(),
            room_name,
            players: &[],
            exits: &[],
        }
    }
}

/// Something an NPC wants done after its tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NpcAction {
    /// Attack an entity in the same room
    Attack(EntityId),
    /// Narrate to the NPC's room
    Say(String),
    /// Walk through an exit
    Move(Direction),
}

/// Per-species logic plugged into an [`Npc`](crate::entities::Npc)
pub trait NpcBehavior: Send {
    /// Called once per world tick while the NPC is alive
    fn on_tick(&mut self, body: &mut NpcBody, ctx: &TickContext<'_>, dice: &mut dyn Dice) -> Vec<NpcAction>;

    /// Species-specific action. `None` falls through to the response table.
    fn interact(&mut self, _body: &mut NpcBody, _player: EntityId, _action: &str) -> Option<String> {
        None
    }

    /// Answer a trigger registered as [`Response::Computed`](crate::entities::Response::Computed)
    fn computed_response(&mut self, _body: &mut NpcBody, _trigger: &str) -> Option<String> {
        None
    }

    /// Told how an [`NpcAction::Attack`] this NPC asked for turned out
    fn on_attack_outcome(&mut self, _body: &mut NpcBody, _outcome: &AttackOutcome) {}

    /// Called once when the NPC dies; returns room narration
    fn on_death(&mut self, _body: &mut NpcBody, _killer: Option<&mut Player>, _dice: &mut dyn Dice) -> Vec<String> {
        Vec::new()
    }
}
