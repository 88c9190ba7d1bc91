//! Inventory and equipment hydration.
//!
//! The core never knows where a character's belongings are stored. A front
//! end plugs in an [`ItemProvider`]; the server ships with one that hands every
//! new character the starter kit from the built-in catalog.

use log::{debug, warn};

use mud_shared::{find_item_definition, COMBAT_KNIFE, PADDED_JACKET, STIM_PACK};

use crate::entities::Player;

/// Loads a character's inventory and equipment
pub trait ItemProvider: Send + Sync {
    fn hydrate(&self, player: &mut Player) -> Result<(), String>;
}

/// Equips a knife and a jacket and packs a couple of stims
#[derive(Debug, Clone)]
pub struct StarterKitProvider {
    pub stim_packs: u32,
}

impl Default for StarterKitProvider {
    fn default() -> Self {
        Self { stim_packs: 2 }
    }
}

impl ItemProvider for StarterKitProvider {
    fn hydrate(&self, player: &mut Player) -> Result<(), String> {
        for item_id in [COMBAT_KNIFE, PADDED_JACKET] {
            let item = find_item_definition(item_id).ok_or_else(|| format!("Unknown starter item {}", item_id))?;
            if let Some(replaced) = player.equip(item)? {
                // Keep whatever was already worn
                if !player.inventory.add(&replaced, 1) {
                    warn!("No room to keep {} for {}", replaced.name, player.name());
                }
            }
        }

        if self.stim_packs > 0 {
            let stim = find_item_definition(STIM_PACK).ok_or_else(|| format!("Unknown starter item {}", STIM_PACK))?;
            if !player.inventory.add(&stim, self.stim_packs) {
                warn!("Inventory full while packing stims for {}", player.name());
            }
        }

        debug!("Hydrated starter kit for {}", player.name());
        Ok(())
    }
}

/// Leaves characters empty-handed
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyProvider;

impl ItemProvider for EmptyProvider {
    fn hydrate(&self, _player: &mut Player) -> Result<(), String> {
        Ok(())
    }
}
