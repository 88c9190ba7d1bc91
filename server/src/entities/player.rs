//! Server-side player entity.

use mud_shared::{
    Attribute, Attributes, CharacterClass, EquipmentSlot, ItemDef, ItemKind, Race, DEFAULT_ATTRIBUTE_VALUE,
    PLAYER_INVENTORY_SLOTS, STARTING_CREDITS, STARTING_ENERGY,
};

use super::{CombatEntity, EntityId, Equipment, Inventory};

/// Base health before constitution and level scaling
const BASE_HEALTH: i32 = 100;

/// Share of credits lost on death, in percent
const DEATH_CREDIT_LOSS_PERCENT: u32 = 10;

/// Server-side player state
#[derive(Debug, Clone)]
pub struct Player {
    pub entity: CombatEntity,
    pub race: Race,
    pub class: CharacterClass,
    pub inventory: Inventory,
    pub equipment: Equipment,
    pub energy: u32,
    pub max_energy: u32,
    pub credits: u32,
    pub online: bool,
    /// Last room the player stood in, kept across sessions
    pub room_name: Option<String>,
}

impl Player {
    /// Create a fresh level 1 character
    pub fn new(id: EntityId, name: impl Into<String>, race: Race, class: CharacterClass) -> Self {
        let mut attributes = Attributes::uniform(DEFAULT_ATTRIBUTE_VALUE);
        race.apply_bonuses(&mut attributes);
        class.apply_bonuses(&mut attributes);

        let entity = CombatEntity::new(id, name, 1, 1, attributes);
        let mut player = Self {
            entity,
            race,
            class,
            inventory: Inventory::new(PLAYER_INVENTORY_SLOTS),
            equipment: Equipment::new(),
            energy: STARTING_ENERGY,
            max_energy: STARTING_ENERGY,
            credits: STARTING_CREDITS,
            online: false,
            room_name: None,
        };
        player.update_combat_stats();
        player.entity.set_health(player.entity.max_health());
        player
    }

    pub fn id(&self) -> EntityId {
        self.entity.id
    }

    pub fn name(&self) -> &str {
        &self.entity.name
    }

    /// Full display name, e.g. "Kaito the Draconian Soldier"
    pub fn full_name(&self) -> String {
        format!("{} the {} {}", self.entity.name, self.race.name(), self.class.name())
    }

    /// Recompute max health and attack cooldown from level and attributes
    pub fn update_combat_stats(&mut self) {
        let constitution = self.entity.attribute(Attribute::Constitution);
        let max_health = BASE_HEALTH + (constitution - DEFAULT_ATTRIBUTE_VALUE) * 5 + self.entity.level as i32 * 10;
        self.entity.set_max_health(max_health.max(1) as u32);
        self.entity
            .combat
            .update_attack_cooldown(self.entity.attribute(Attribute::Speed));
    }

    pub fn level_up(&mut self) {
        self.entity.level += 1;
        self.update_combat_stats();
        self.entity.set_health(self.entity.max_health());
    }

    /// Equip an item, returning the one it replaced. Item bonuses move with
    /// the item and max health and cooldown are recomputed.
    pub fn equip(&mut self, item: ItemDef) -> Result<Option<ItemDef>, String> {
        if item.level_required > self.entity.level {
            return Err(format!("You need to be level {} to use {}.", item.level_required, item.name));
        }
        let bonuses = item.bonuses.clone();
        let replaced = self.equipment.equip(item)?;
        if let Some(old) = &replaced {
            self.apply_bonuses(&old.bonuses, -1);
        }
        self.apply_bonuses(&bonuses, 1);
        self.update_combat_stats();
        Ok(replaced)
    }

    /// Take off whatever is in `slot`
    pub fn unequip(&mut self, slot: EquipmentSlot) -> Option<ItemDef> {
        let item = self.equipment.unequip(slot)?;
        self.apply_bonuses(&item.bonuses, -1);
        self.update_combat_stats();
        Some(item)
    }

    fn apply_bonuses(&mut self, bonuses: &[(Attribute, i32)], sign: i32) {
        for (attr, delta) in bonuses {
            let value = self.entity.attribute(*attr) + delta * sign;
            self.entity.set_attribute(*attr, value);
        }
    }

    /// Consume one of an item from the inventory
    pub fn use_item(&mut self, item_id: u32) -> Result<String, String> {
        let item = self
            .inventory
            .take_one(item_id)
            .ok_or_else(|| "You don't have that.".to_string())?;
        match item.kind {
            ItemKind::Consumable { restore_health } => {
                let restored = self.entity.heal(restore_health);
                Ok(format!("You use the {} and recover {} health.", item.name, restored))
            }
            _ => {
                self.inventory.add(&item, 1);
                Err(format!("The {} can't be used like that.", item.name))
            }
        }
    }

    pub fn add_credits(&mut self, amount: u32) {
        self.credits = self.credits.saturating_add(amount);
    }

    /// Death penalty: lose a share of credits and drop out of combat.
    /// Returns the credits lost.
    pub fn on_death(&mut self) -> u32 {
        let lost = self.credits * DEATH_CREDIT_LOSS_PERCENT / 100;
        self.credits -= lost;
        self.entity.combat.exit_combat();
        lost
    }

    /// Bring a defeated player back at full health
    pub fn revive(&mut self) {
        self.entity.set_health(self.entity.max_health());
        self.entity.combat.exit_combat();
    }
}
