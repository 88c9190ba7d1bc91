//! Server-side NPC entity.
//!
//! An NPC is a plain data body plus a species behavior. The body carries
//! stats and state, the behavior decides what the NPC does with them.

use std::collections::BTreeMap;
use std::fmt;

use mud_shared::NPC_INVENTORY_SLOTS;

use crate::combat::AttackOutcome;
use crate::dice::Dice;
use crate::npc::{NpcAction, NpcBehavior, TickContext};

use super::{CombatEntity, EntityId, Inventory, Player};

/// Coarse NPC state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcState {
    Idle,
    Hostile,
    Busy,
    Moving,
    Dead,
}

/// What role an NPC plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcType {
    Enemy,
    Merchant,
    Ambient,
}

impl NpcType {
    /// Whether players may start a fight with this kind of NPC
    pub fn is_combatant(&self) -> bool {
        matches!(self, NpcType::Enemy)
    }
}

/// Reply registered for a conversation trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Static(String),
    /// Answered by the species behavior at the time of asking
    Computed,
}

/// Stats and state of an NPC
#[derive(Debug, Clone)]
pub struct NpcBody {
    pub entity: CombatEntity,
    /// Species id this NPC was spawned as
    pub species: String,
    pub description: String,
    pub kind: NpcType,
    pub hostile: bool,
    pub state: NpcState,
    pub inventory: Inventory,
    responses: BTreeMap<String, Response>,
}

impl NpcBody {
    pub fn new(entity: CombatEntity, species: impl Into<String>, description: impl Into<String>, kind: NpcType, hostile: bool) -> Self {
        Self {
            entity,
            species: species.into(),
            description: description.into(),
            kind,
            hostile,
            state: if hostile { NpcState::Hostile } else { NpcState::Idle },
            inventory: Inventory::new(NPC_INVENTORY_SLOTS),
            responses: BTreeMap::new(),
        }
    }

    /// Register a reply; triggers are matched case-insensitively
    pub fn add_response(&mut self, trigger: &str, response: Response) {
        self.responses.insert(trigger.to_lowercase(), response);
    }

    pub fn response(&self, trigger: &str) -> Option<&Response> {
        self.responses.get(&trigger.to_lowercase())
    }

    pub fn set_hostile(&mut self, hostile: bool) {
        self.hostile = hostile;
    }

    /// One-line summary, e.g. "Security Bot MK-12 [Level 3 Enemy] (160/160 HP) [Idle]"
    pub fn status_line(&self) -> String {
        format!(
            "{} [Level {} {:?}] ({}/{} HP) [{:?}]",
            self.entity.name,
            self.entity.level,
            self.kind,
            self.entity.health(),
            self.entity.max_health(),
            self.state
        )
    }
}

/// A non-player character
pub struct Npc {
    pub body: NpcBody,
    behavior: Box<dyn NpcBehavior>,
}

impl fmt::Debug for Npc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Npc")
            .field("id", &self.body.entity.id)
            .field("name", &self.body.entity.name)
            .field("species", &self.body.species)
            .field("state", &self.body.state)
            .finish()
    }
}

impl Npc {
    pub fn new(body: NpcBody, behavior: Box<dyn NpcBehavior>) -> Self {
        Self { body, behavior }
    }

    pub fn id(&self) -> EntityId {
        self.body.entity.id
    }

    pub fn name(&self) -> &str {
        &self.body.entity.name
    }

    pub fn is_dead(&self) -> bool {
        self.body.entity.is_dead()
    }

    /// Advance the NPC one tick. Dead NPCs do nothing.
    pub fn on_tick(&mut self, ctx: &TickContext<'_>, dice: &mut dyn Dice) -> Vec<NpcAction> {
        if self.is_dead() {
            return Vec::new();
        }
        self.behavior.on_tick(&mut self.body, ctx, dice)
    }

    /// A player tries an action on this NPC; species actions come first,
    /// then the response table.
    pub fn interact(&mut self, player: EntityId, action: &str) -> String {
        let action = action.trim().to_lowercase();
        if let Some(reply) = self.behavior.interact(&mut self.body, player, &action) {
            return reply;
        }
        self.respond(&action)
    }

    /// Look up the reply for a conversation trigger
    pub fn respond(&mut self, trigger: &str) -> String {
        match self.body.response(trigger).cloned() {
            Some(Response::Static(text)) => text,
            Some(Response::Computed) => self
                .behavior
                .computed_response(&mut self.body, &trigger.to_lowercase())
                .unwrap_or_else(|| self.default_response()),
            None => self.default_response(),
        }
    }

    fn default_response(&self) -> String {
        format!("The {} doesn't seem interested in that.", self.body.entity.name)
    }

    /// Report how a requested attack went
    pub fn attack_resolved(&mut self, outcome: &AttackOutcome) {
        self.behavior.on_attack_outcome(&mut self.body, outcome);
    }

    /// Runs once when the NPC is killed. Returns room narration.
    pub fn on_death(&mut self, killer: Option<&mut Player>, dice: &mut dyn Dice) -> Vec<String> {
        self.body.state = NpcState::Dead;
        self.body.hostile = false;
        self.behavior.on_death(&mut self.body, killer, dice)
    }
}
