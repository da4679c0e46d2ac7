//! Player loadout
//!
//! Bundles the containers and stats one player owns. Equip and unequip go
//! through here so the inventory slot, the equipment slot and the stat
//! modifiers change together or not at all.

use std::collections::HashSet;
use std::sync::Arc;

use outpost_core::NetworkClock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capability::{EquipCapability, UseContext, UseEffect};
use crate::equipment::{Equipment, EquipmentCategory};
use crate::error::EquipError;
use crate::events::GameEvent;
use crate::inventory::Inventory;
use crate::item::ItemInstance;
use crate::stats::CharacterStats;

/// Unlock keys a player has earned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnlockSet {
    keys: HashSet<String>,
}

impl UnlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the key was already unlocked
    pub fn unlock(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Whether a requirement is met. `None` is always met.
    pub fn is_unlocked(&self, requirement: Option<&str>) -> bool {
        requirement.map_or(true, |key| self.contains(key))
    }
}

/// Everything one player owns
#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    pub inventory: Inventory,
    pub equipment: Equipment,
    pub stats: CharacterStats,
    pub unlocks: UnlockSet,
    /// Items a failed rollback could not put back anywhere
    stranded: Vec<ItemInstance>,
}

impl PlayerState {
    pub fn new(inventory_slots: usize) -> Self {
        Self {
            inventory: Inventory::new(inventory_slots),
            ..Default::default()
        }
    }

    /// Equip one unit from an inventory slot. A displaced item goes back
    /// into the inventory and its modifiers are removed.
    pub fn equip_from_slot(&mut self, index: usize) -> Result<(), EquipError> {
        let item = self.inventory.get(index).ok_or(EquipError::EmptySlot(index))?;
        let definition = Arc::clone(item.definition());
        let params = definition
            .equip()
            .ok_or(EquipError::NotEquippable(definition.id))?;

        // Taking a single unit out only frees the slot when it was the last
        let frees_slot = item.count == 1;
        if let Some(displaced) = self.equipment.get(params.slot) {
            if !frees_slot && !self.inventory.can_accept_instance(displaced) {
                return Err(EquipError::InventoryFull);
            }
        }

        let one = self
            .inventory
            .take_out_item(index, Some(1))
            .ok_or(EquipError::EmptySlot(index))?;

        let previous = match self.equipment.try_equip_item(one) {
            Ok(previous) => previous,
            Err(one) => {
                self.restore(one);
                return Err(EquipError::NotEquippable(definition.id));
            }
        };

        if let Some(previous) = previous {
            let previous_def = Arc::clone(previous.definition());
            if let Err(previous) = self.inventory.try_add_instance(previous) {
                match self.equipment.try_equip_item(previous) {
                    Ok(Some(ours)) => self.restore(ours),
                    Ok(None) => {}
                    Err(previous) => self.restore(previous),
                }
                return Err(EquipError::InventoryFull);
            }
            if let Some(old) = previous_def.equip() {
                EquipCapability::apply(&mut self.stats, old, false);
            }
        }

        EquipCapability::apply(&mut self.stats, params, true);
        debug!("Equipped {} in {}", definition.name, params.slot.name());
        Ok(())
    }

    /// Move the item in `category` back into the inventory
    pub fn unequip_to_inventory(&mut self, category: EquipmentCategory) -> Result<(), EquipError> {
        let item = self
            .equipment
            .get(category)
            .ok_or(EquipError::NothingEquipped(category))?;
        if !self.inventory.can_accept_instance(item) {
            return Err(EquipError::InventoryFull);
        }

        let item = self
            .equipment
            .try_unequip_item(category)
            .ok_or(EquipError::NothingEquipped(category))?;
        let definition = Arc::clone(item.definition());

        if let Err(item) = self.inventory.try_add_instance(item) {
            match self.equipment.try_equip_item(item) {
                Ok(None) => {}
                Ok(Some(other)) | Err(other) => self.strand(other),
            }
            return Err(EquipError::InventoryFull);
        }
        if let Some(params) = definition.equip() {
            EquipCapability::apply(&mut self.stats, params, false);
        }
        debug!("Unequipped {} from {}", definition.name, category.name());
        Ok(())
    }

    /// Use the item in a slot against this player's stats. Returns the
    /// world effects the use asked for, or `None` if nothing happened.
    pub fn use_slot(&mut self, index: usize, clock: &NetworkClock) -> Option<Vec<UseEffect>> {
        let mut ctx = UseContext::with_stats(clock, &mut self.stats);
        if self.inventory.try_use_item(index, &mut ctx) {
            Some(ctx.effects)
        } else {
            None
        }
    }

    /// Drain inventory then equipment events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        let mut events = self.inventory.take_events();
        events.extend(self.equipment.take_events());
        events
    }

    /// Drain items that could not be put back during a rollback. The owner
    /// is expected to drop them into the world.
    pub fn take_stranded(&mut self) -> Vec<ItemInstance> {
        std::mem::take(&mut self.stranded)
    }

    fn restore(&mut self, item: ItemInstance) {
        if let Err(lost) = self.inventory.try_add_instance(item) {
            self.strand(lost);
        }
    }

    fn strand(&mut self, item: ItemInstance) {
        warn!(
            "Could not return {}x {} during rollback, setting it aside",
            item.count,
            item.definition().name
        );
        self.stranded.push(item);
    }
}
