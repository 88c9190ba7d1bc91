//! Combat entities: the shared stat and health model plus the player and NPC variants.

pub mod item;
pub mod npc;
pub mod player;

pub use item::{Equipment, Inventory, ItemStack};
pub use npc::{Npc, NpcBody, NpcState, NpcType, Response};
pub use player::Player;

use std::sync::atomic::{AtomicU64, Ordering};

use mud_shared::{Attribute, Attributes, EquipmentSlot, ItemDef};

use crate::combat::CombatState;
use crate::world::RoomId;

/// Identifier shared by players and NPCs
pub type EntityId = u64;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique entity id
pub fn next_entity_id() -> EntityId {
    NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed)
}

/// Stats, health and combat session common to every combatant
#[derive(Debug, Clone)]
pub struct CombatEntity {
    pub id: EntityId,
    pub name: String,
    pub level: u32,
    health: u32,
    max_health: u32,
    attributes: Attributes,
    pub combat: CombatState,
    /// Room the entity currently stands in
    pub room: Option<RoomId>,
}

impl CombatEntity {
    pub fn new(id: EntityId, name: impl Into<String>, level: u32, max_health: u32, attributes: Attributes) -> Self {
        let max_health = max_health.max(1);
        let mut combat = CombatState::new();
        combat.update_attack_cooldown(attributes.get(Attribute::Speed));
        Self {
            id,
            name: name.into(),
            level,
            health: max_health,
            max_health,
            attributes,
            combat,
            room: None,
        }
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    /// Health as a whole percentage of maximum
    pub fn health_percent(&self) -> u32 {
        self.health * 100 / self.max_health
    }

    pub fn set_health(&mut self, health: u32) {
        self.health = health.min(self.max_health);
    }

    /// Change maximum health; current health is clamped to the new maximum
    pub fn set_max_health(&mut self, max_health: u32) {
        self.max_health = max_health.max(1);
        self.health = self.health.min(self.max_health);
    }

    /// Restore health up to the maximum, returning how much was restored
    pub fn heal(&mut self, amount: u32) -> u32 {
        let before = self.health;
        self.health = self.health.saturating_add(amount).min(self.max_health);
        self.health - before
    }

    /// Subtract already-mitigated damage. Returns true only when this hit
    /// took the entity from alive to dead.
    pub fn apply_damage(&mut self, amount: u32) -> bool {
        if self.is_dead() {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        self.is_dead()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, attr: Attribute) -> i32 {
        self.attributes.get(attr)
    }

    /// Set an attribute; a speed change recomputes the attack cooldown
    pub fn set_attribute(&mut self, attr: Attribute, value: i32) {
        self.attributes.set(attr, value);
        if attr == Attribute::Speed {
            self.combat.update_attack_cooldown(value);
        }
    }
}

/// Result of pushing damage through an entity's mitigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageResult {
    /// Health actually removed
    pub dealt: u32,
    /// This hit was the killing blow
    pub died: bool,
}

/// Any combatant living in the world
#[derive(Debug)]
pub enum Actor {
    Player(Player),
    Npc(Npc),
}

impl Actor {
    pub fn entity(&self) -> &CombatEntity {
        match self {
            Actor::Player(p) => &p.entity,
            Actor::Npc(n) => &n.body.entity,
        }
    }

    pub fn entity_mut(&mut self) -> &mut CombatEntity {
        match self {
            Actor::Player(p) => &mut p.entity,
            Actor::Npc(n) => &mut n.body.entity,
        }
    }

    pub fn id(&self) -> EntityId {
        self.entity().id
    }

    pub fn name(&self) -> &str {
        &self.entity().name
    }

    pub fn is_player(&self) -> bool {
        matches!(self, Actor::Player(_))
    }

    pub fn as_player(&self) -> Option<&Player> {
        match self {
            Actor::Player(p) => Some(p),
            Actor::Npc(_) => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match self {
            Actor::Player(p) => Some(p),
            Actor::Npc(_) => None,
        }
    }

    pub fn as_npc(&self) -> Option<&Npc> {
        match self {
            Actor::Npc(n) => Some(n),
            Actor::Player(_) => None,
        }
    }

    pub fn as_npc_mut(&mut self) -> Option<&mut Npc> {
        match self {
            Actor::Npc(n) => Some(n),
            Actor::Player(_) => None,
        }
    }

    /// Weapon in the main hand. NPCs fight with what they are born with.
    pub fn equipped_weapon(&self) -> Option<&ItemDef> {
        match self {
            Actor::Player(p) => p.equipment.at(EquipmentSlot::MainHand).filter(|i| i.damage_range().is_some()),
            Actor::Npc(_) => None,
        }
    }

    /// Flat reduction applied to every incoming hit
    pub fn damage_reduction(&self) -> u32 {
        let constitution = self.entity().attribute(Attribute::Constitution).max(0) as u32;
        let armor = match self {
            Actor::Player(p) => p.equipment.total_defense(),
            Actor::Npc(_) => 0,
        };
        constitution / 5 + armor
    }

    /// Take a raw hit. Any positive amount removes at least one point of health.
    pub fn damage(&mut self, amount: u32) -> DamageResult {
        if amount == 0 || self.entity().is_dead() {
            return DamageResult { dealt: 0, died: false };
        }
        let final_damage = amount.saturating_sub(self.damage_reduction()).max(1);
        let before = self.entity().health();
        let died = self.entity_mut().apply_damage(final_damage);
        DamageResult {
            dealt: before - self.entity().health(),
            died,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_shared::{find_item_definition, CharacterClass, Race, COMPOSITE_HELMET, PADDED_JACKET};

    fn player_with_con(con: i32) -> Actor {
        let mut player = Player::new(1, "Kaito", Race::Human, CharacterClass::Medic);
        player.entity.set_attribute(Attribute::Constitution, con);
        Actor::Player(player)
    }

    #[test]
    fn test_health_is_clamped() {
        let mut entity = CombatEntity::new(1, "dummy", 1, 50, Attributes::new());
        assert_eq!(entity.heal(20), 0);
        assert_eq!(entity.health(), 50);

        entity.set_health(500);
        assert_eq!(entity.health(), 50);

        assert!(entity.apply_damage(80));
        assert_eq!(entity.health(), 0);
        // Already dead: no second death
        assert!(!entity.apply_damage(5));

        entity.heal(500);
        assert_eq!(entity.health(), 50);

        entity.set_max_health(30);
        assert_eq!(entity.health(), 30);
    }

    #[test]
    fn test_minimum_one_damage_through_armor() {
        let mut actor = player_with_con(40);
        if let Some(player) = actor.as_player_mut() {
            player.equip(find_item_definition(PADDED_JACKET).unwrap()).unwrap();
            player.equip(find_item_definition(COMPOSITE_HELMET).unwrap()).unwrap();
        }
        assert_eq!(actor.damage_reduction(), 8 + 3);

        let before = actor.entity().health();
        let result = actor.damage(1);
        assert_eq!(result.dealt, 1);
        assert_eq!(actor.entity().health(), before - 1);
    }

    #[test]
    fn test_zero_damage_is_a_no_op() {
        let mut actor = player_with_con(10);
        let before = actor.entity().health();
        assert_eq!(actor.damage(0), DamageResult { dealt: 0, died: false });
        assert_eq!(actor.entity().health(), before);
    }

    #[test]
    fn test_killing_blow_reported_once() {
        let mut actor = player_with_con(10);
        let max = actor.entity().max_health();
        let first = actor.damage(max * 2);
        assert!(first.died);
        assert_eq!(first.dealt, max);
        assert_eq!(actor.damage(10), DamageResult { dealt: 0, died: false });
    }

    #[test]
    fn test_speed_change_updates_cooldown() {
        let mut entity = CombatEntity::new(1, "dummy", 1, 50, Attributes::new());
        entity.set_attribute(Attribute::Speed, 100);
        assert_eq!(entity.combat.attack_cooldown().as_millis(), 1000);
    }
}
