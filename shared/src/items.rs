//! Item definitions shared between the core and front ends.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::Attribute;

/// Item definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub kind: ItemKind,
    pub rarity: ItemRarity,
    /// Slot this item occupies when equipped, if it can be equipped at all
    pub slot: Option<EquipmentSlot>,
    pub max_stack: u32,
    pub level_required: u32,
    /// Attribute changes while equipped
    #[serde(default)]
    pub bonuses: Vec<(Attribute, i32)>,
}

impl ItemDef {
    pub fn is_equippable(&self) -> bool {
        self.slot.is_some()
    }

    /// Damage range if this is a weapon
    pub fn damage_range(&self) -> Option<(u32, u32)> {
        match self.kind {
            ItemKind::Weapon { min_damage, max_damage } => Some((min_damage, max_damage)),
            _ => None,
        }
    }

    /// Defense value if this is armor
    pub fn defense(&self) -> Option<u32> {
        match self.kind {
            ItemKind::Armor { defense } => Some(defense),
            _ => None,
        }
    }

    /// Multi-line description shown by `examine`
    pub fn detailed_description(&self) -> String {
        let mut out = format!("{} [{:?}]\n{}\n", self.name, self.rarity, self.description);
        match self.kind {
            ItemKind::Weapon { min_damage, max_damage } => {
                out.push_str(&format!("Damage: {}-{}\n", min_damage, max_damage));
            }
            ItemKind::Armor { defense } => out.push_str(&format!("Defense: {}\n", defense)),
            ItemKind::Consumable { restore_health } => {
                out.push_str(&format!("Restores {} health\n", restore_health));
            }
            ItemKind::Misc => {}
        }
        for (attr, delta) in &self.bonuses {
            out.push_str(&format!("{:+} {}\n", delta, attr.name()));
        }
        if let Some(slot) = self.slot {
            out.push_str(&format!("Slot: {}\n", slot));
        }
        out.push_str(&format!("Level required: {}", self.level_required));
        out
    }
}

/// What an item does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Weapon { min_damage: u32, max_damage: u32 },
    Armor { defense: u32 },
    Consumable { restore_health: u32 },
    Misc,
}

/// Item rarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

/// Equipment slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EquipmentSlot {
    Head,
    Body,
    Legs,
    Feet,
    Hands,
    MainHand,
    OffHand,
}

impl EquipmentSlot {
    pub const ALL: [EquipmentSlot; 7] = [
        EquipmentSlot::Head,
        EquipmentSlot::Body,
        EquipmentSlot::Legs,
        EquipmentSlot::Feet,
        EquipmentSlot::Hands,
        EquipmentSlot::MainHand,
        EquipmentSlot::OffHand,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EquipmentSlot::Head => "head",
            EquipmentSlot::Body => "body",
            EquipmentSlot::Legs => "legs",
            EquipmentSlot::Feet => "feet",
            EquipmentSlot::Hands => "hands",
            EquipmentSlot::MainHand => "mainhand",
            EquipmentSlot::OffHand => "offhand",
        }
    }

    /// Parse a slot name, ignoring case and underscores ("main_hand", "MAINHAND")
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.replace('_', "").to_lowercase();
        Self::ALL.into_iter().find(|slot| slot.name() == wanted)
    }
}

impl fmt::Display for EquipmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const STIM_PACK: u32 = 1;
pub const SCRAP_METAL: u32 = 2;
pub const COMBAT_KNIFE: u32 = 3;
pub const PULSE_BATON: u32 = 4;
pub const PADDED_JACKET: u32 = 5;
pub const COMPOSITE_HELMET: u32 = 6;

/// Built-in item definitions
pub fn get_item_definitions() -> Vec<ItemDef> {
    vec![
        ItemDef {
            id: STIM_PACK,
            name: "Stim Pack".into(),
            description: "Restores 25 health.".into(),
            kind: ItemKind::Consumable { restore_health: 25 },
            rarity: ItemRarity::Common,
            slot: None,
            max_stack: 10,
            level_required: 1,
            bonuses: Vec::new(),
        },
        ItemDef {
            id: SCRAP_METAL,
            name: "Scrap Metal".into(),
            description: "Twisted plating salvaged from a wreck.".into(),
            kind: ItemKind::Misc,
            rarity: ItemRarity::Common,
            slot: None,
            max_stack: 99,
            level_required: 1,
            bonuses: Vec::new(),
        },
        ItemDef {
            id: COMBAT_KNIFE,
            name: "Combat Knife".into(),
            description: "A serrated blade. Better than nothing.".into(),
            kind: ItemKind::Weapon { min_damage: 2, max_damage: 5 },
            rarity: ItemRarity::Common,
            slot: Some(EquipmentSlot::MainHand),
            max_stack: 1,
            level_required: 1,
            bonuses: Vec::new(),
        },
        ItemDef {
            id: PULSE_BATON,
            name: "Pulse Baton".into(),
            description: "A shock baton humming with stored charge.".into(),
            kind: ItemKind::Weapon { min_damage: 4, max_damage: 9 },
            rarity: ItemRarity::Uncommon,
            slot: Some(EquipmentSlot::MainHand),
            max_stack: 1,
            level_required: 3,
            bonuses: vec![(Attribute::Speed, 2)],
        },
        ItemDef {
            id: PADDED_JACKET,
            name: "Padded Jacket".into(),
            description: "Layered synthweave that turns a glancing blow.".into(),
            kind: ItemKind::Armor { defense: 2 },
            rarity: ItemRarity::Common,
            slot: Some(EquipmentSlot::Body),
            max_stack: 1,
            level_required: 1,
            bonuses: vec![(Attribute::Constitution, 2)],
        },
        ItemDef {
            id: COMPOSITE_HELMET,
            name: "Composite Helmet".into(),
            description: "A scuffed riot helmet.".into(),
            kind: ItemKind::Armor { defense: 1 },
            rarity: ItemRarity::Common,
            slot: Some(EquipmentSlot::Head),
            max_stack: 1,
            level_required: 1,
            bonuses: Vec::new(),
        },
    ]
}

/// Look up a single item definition by ID
pub fn find_item_definition(id: u32) -> Option<ItemDef> {
    get_item_definitions().into_iter().find(|item| item.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_names() {
        assert_eq!(EquipmentSlot::from_name("MAIN_HAND"), Some(EquipmentSlot::MainHand));
        assert_eq!(EquipmentSlot::from_name("body"), Some(EquipmentSlot::Body));
        assert_eq!(EquipmentSlot::from_name("tail"), None);
        assert_eq!(EquipmentSlot::OffHand.to_string(), "offhand");
    }

    #[test]
    fn test_detailed_description() {
        let jacket = find_item_definition(PADDED_JACKET).unwrap();
        let text = jacket.detailed_description();
        assert!(text.starts_with("Padded Jacket [Common]"));
        assert!(text.contains("Defense: 2"));
        assert!(text.contains("+2 Constitution"));
        assert!(text.contains("Slot: body"));
    }
}
