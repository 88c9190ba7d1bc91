//! Inventory and equipment containers.

use std::collections::BTreeMap;

use mud_shared::{EquipmentSlot, ItemDef};

/// A stack of identical items in one inventory slot
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub item: ItemDef,
    pub quantity: u32,
}

/// Fixed number of slots holding item stacks
#[derive(Debug, Clone)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
}

impl Inventory {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Add items, stacking onto existing stacks before taking empty slots.
    /// Returns false if not everything fit; whatever fit stays added.
    pub fn add(&mut self, item: &ItemDef, quantity: u32) -> bool {
        let max_stack = item.max_stack.max(1);
        let mut remaining = quantity;

        // Try to stack with existing items
        for stack in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if stack.item.id == item.id && stack.quantity < max_stack {
                let can_add = (max_stack - stack.quantity).min(remaining);
                stack.quantity += can_add;
                remaining -= can_add;
            }
        }

        // Add to empty slots
        for slot in &mut self.slots {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let add_amount = remaining.min(max_stack);
                *slot = Some(ItemStack {
                    item: item.clone(),
                    quantity: add_amount,
                });
                remaining -= add_amount;
            }
        }

        remaining == 0
    }

    /// Take a whole stack out of a slot
    pub fn remove_slot(&mut self, slot: usize) -> Option<ItemStack> {
        self.slots.get_mut(slot)?.take()
    }

    /// Remove one item by id, returning its definition
    pub fn take_one(&mut self, item_id: u32) -> Option<ItemDef> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.as_ref().map(|stack| stack.item.id == item_id).unwrap_or(false))?;
        let stack = slot.as_mut()?;
        let item = stack.item.clone();
        stack.quantity -= 1;
        if stack.quantity == 0 {
            *slot = None;
        }
        Some(item)
    }

    /// Remove up to `amount` of an item, returning how many were removed
    pub fn remove(&mut self, item_id: u32, amount: u32) -> u32 {
        let mut removed = 0;
        while removed < amount && self.take_one(item_id).is_some() {
            removed += 1;
        }
        removed
    }

    /// First stack whose item name contains `name` (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<&ItemStack> {
        let wanted = name.to_lowercase();
        self.stacks().find(|s| s.item.name.to_lowercase().contains(&wanted))
    }

    pub fn count(&self, item_id: u32) -> u32 {
        self.stacks().filter(|s| s.item.id == item_id).map(|s| s.quantity).sum()
    }

    pub fn stacks(&self) -> impl Iterator<Item = &ItemStack> {
        self.slots.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks().next().is_none()
    }
}

/// Items worn or wielded, one per slot
#[derive(Debug, Clone, Default)]
pub struct Equipment {
    equipped: BTreeMap<EquipmentSlot, ItemDef>,
}

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Item equipped in a slot
    pub fn at(&self, slot: EquipmentSlot) -> Option<&ItemDef> {
        self.equipped.get(&slot)
    }

    /// Equip an item into its slot, returning whatever it replaced
    pub fn equip(&mut self, item: ItemDef) -> Result<Option<ItemDef>, String> {
        let slot = item.slot.ok_or_else(|| format!("{} cannot be equipped", item.name))?;
        Ok(self.equipped.insert(slot, item))
    }

    pub fn unequip(&mut self, slot: EquipmentSlot) -> Option<ItemDef> {
        self.equipped.remove(&slot)
    }

    /// Equipped items in slot order
    pub fn items(&self) -> impl Iterator<Item = (EquipmentSlot, &ItemDef)> {
        self.equipped.iter().map(|(slot, item)| (*slot, item))
    }

    /// One line per slot, "Empty" where nothing is worn
    pub fn display(&self) -> String {
        let mut out = String::from("Equipment:");
        for slot in EquipmentSlot::ALL {
            let worn = self.at(slot).map(|item| item.name.as_str()).unwrap_or("Empty");
            out.push_str(&format!("\n  {:<10}: {}", slot.name(), worn));
        }
        out
    }

    /// Sum of the defense values of all equipped armor
    pub fn total_defense(&self) -> u32 {
        self.equipped.values().filter_map(|item| item.defense()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_shared::{find_item_definition, COMBAT_KNIFE, COMPOSITE_HELMET, PADDED_JACKET, STIM_PACK};

    #[test]
    fn test_inventory_stacks_before_using_new_slots() {
        let stim = find_item_definition(STIM_PACK).unwrap();
        let mut inv = Inventory::new(2);

        assert!(inv.add(&stim, 8));
        assert!(inv.add(&stim, 4));
        assert_eq!(inv.count(STIM_PACK), 12);
        assert_eq!(inv.stacks().count(), 2);

        // 2 slots of 10 max
        assert!(!inv.add(&stim, 10));
        assert_eq!(inv.count(STIM_PACK), 20);
    }

    #[test]
    fn test_take_one_clears_empty_stack() {
        let stim = find_item_definition(STIM_PACK).unwrap();
        let mut inv = Inventory::new(4);
        inv.add(&stim, 1);

        assert_eq!(inv.take_one(STIM_PACK).map(|i| i.id), Some(STIM_PACK));
        assert!(inv.is_empty());
        assert!(inv.take_one(STIM_PACK).is_none());
    }

    #[test]
    fn test_remove_and_find_by_name() {
        let stim = find_item_definition(STIM_PACK).unwrap();
        let mut inv = Inventory::new(4);
        inv.add(&stim, 3);

        assert_eq!(inv.find_by_name("stim").map(|s| s.quantity), Some(3));
        assert!(inv.find_by_name("knife").is_none());
        assert_eq!(inv.remove(STIM_PACK, 2), 2);
        assert_eq!(inv.remove(STIM_PACK, 5), 1);
        assert!(inv.is_empty());
    }

    #[test]
    fn test_equipment_defense_and_slots() {
        let mut equipment = Equipment::new();
        equipment.equip(find_item_definition(PADDED_JACKET).unwrap()).unwrap();
        equipment.equip(find_item_definition(COMPOSITE_HELMET).unwrap()).unwrap();
        equipment.equip(find_item_definition(COMBAT_KNIFE).unwrap()).unwrap();

        assert_eq!(equipment.total_defense(), 3);
        assert_eq!(equipment.at(EquipmentSlot::MainHand).map(|i| i.id), Some(COMBAT_KNIFE));
        assert!(equipment.at(EquipmentSlot::Feet).is_none());

        assert!(equipment.equip(find_item_definition(STIM_PACK).unwrap()).is_err());
        assert!(equipment.unequip(EquipmentSlot::Body).is_some());
        assert_eq!(equipment.total_defense(), 1);
    }
}
