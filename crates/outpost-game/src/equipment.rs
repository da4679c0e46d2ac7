//! Equipment slots
//!
//! One slot per `EquipmentCategory`. Stat modifiers are not applied here;
//! `PlayerState` wraps equip/unequip so stats and inventory stay consistent.

use serde::{Deserialize, Serialize};

use crate::events::GameEvent;
use crate::item::{ItemInstance, SlotSnapshot};
use crate::stats::StatModifier;

/// Body location an item is worn in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentCategory {
    Head,
    Body,
    Hand,
}

impl EquipmentCategory {
    pub fn all() -> [EquipmentCategory; 3] {
        [Self::Head, Self::Body, Self::Hand]
    }

    fn index(self) -> usize {
        match self {
            Self::Head => 0,
            Self::Body => 1,
            Self::Hand => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Head => "Head",
            Self::Body => "Body",
            Self::Hand => "Hand",
        }
    }
}

/// Worn items, one per category
#[derive(Debug, Clone, Default)]
pub struct Equipment {
    slots: [Option<ItemInstance>; 3],
    events: Vec<GameEvent>,
}

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: EquipmentCategory) -> Option<&ItemInstance> {
        self.slots[category.index()].as_ref()
    }

    /// Equip an item into the slot named by its Equip capability.
    ///
    /// Returns the previous occupant, or gives the item back unchanged if it
    /// has no Equip capability.
    #[allow(clippy::result_large_err)]
    pub fn try_equip_item(&mut self, item: ItemInstance) -> Result<Option<ItemInstance>, ItemInstance> {
        let Some(category) = item.definition().equip().map(|e| e.slot) else {
            return Err(item);
        };

        let snapshot = item.snapshot();
        let previous = self.slots[category.index()].replace(item);
        self.events.push(GameEvent::EquipmentChanged {
            category,
            item: Some(snapshot),
        });
        Ok(previous)
    }

    /// Empty a slot, returning what was in it
    pub fn try_unequip_item(&mut self, category: EquipmentCategory) -> Option<ItemInstance> {
        let item = self.slots[category.index()].take()?;
        self.events.push(GameEvent::EquipmentChanged {
            category,
            item: None,
        });
        Some(item)
    }

    /// Modifiers of every worn item, Head to Hand
    pub fn total_modifiers(&self) -> Vec<StatModifier> {
        self.slots
            .iter()
            .flatten()
            .filter_map(|item| item.definition().equip())
            .flat_map(|params| params.modifiers.iter().cloned())
            .collect()
    }

    /// Worn items by category, for sync and display
    pub fn snapshot(&self) -> Vec<(EquipmentCategory, Option<SlotSnapshot>)> {
        EquipmentCategory::all()
            .into_iter()
            .map(|c| (c, self.get(c).map(ItemInstance::snapshot)))
            .collect()
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityConfig, CapabilityParams, DurabilityParams, EquipParams};
    use crate::item::{ItemCategory, ItemDefinition};
    use crate::stats::StatKind;
    use outpost_core::ItemDefId;
    use std::sync::Arc;

    fn wearable(id: u32, slot: EquipmentCategory, defense: f32) -> ItemInstance {
        let def = ItemDefinition::new(
            ItemDefId(id),
            "Gear",
            ItemCategory::Armor,
            vec![
                CapabilityConfig::new(
                    0,
                    CapabilityParams::Equip(EquipParams {
                        slot,
                        modifiers: vec![StatModifier::flat(StatKind::Defense, defense)],
                    }),
                ),
                CapabilityConfig::new(
                    1,
                    CapabilityParams::Durability(DurabilityParams {
                        max_durability: 50.0,
                        cost_per_use: 1.0,
                    }),
                ),
            ],
        );
        ItemInstance::new(Arc::new(def), 1)
    }

    #[test]
    fn test_equip_into_empty_slot() {
        let mut eq = Equipment::new();
        let previous = eq.try_equip_item(wearable(1, EquipmentCategory::Head, 2.0)).unwrap();
        assert!(previous.is_none());
        assert_eq!(eq.get(EquipmentCategory::Head).unwrap().id(), ItemDefId(1));

        let events = eq.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            GameEvent::EquipmentChanged {
                category: EquipmentCategory::Head,
                item: Some(_)
            }
        ));
    }

    #[test]
    fn test_equip_returns_displaced() {
        let mut eq = Equipment::new();
        eq.try_equip_item(wearable(1, EquipmentCategory::Body, 2.0)).unwrap();
        let previous = eq.try_equip_item(wearable(2, EquipmentCategory::Body, 5.0)).unwrap();
        assert_eq!(previous.unwrap().id(), ItemDefId(1));
        assert_eq!(eq.get(EquipmentCategory::Body).unwrap().id(), ItemDefId(2));
    }

    #[test]
    fn test_equip_rejects_non_equippable() {
        let def = ItemDefinition::new(ItemDefId(9), "Stone", ItemCategory::Material, vec![]);
        let mut eq = Equipment::new();
        let back = eq.try_equip_item(ItemInstance::new(Arc::new(def), 1)).unwrap_err();
        assert_eq!(back.id(), ItemDefId(9));
        assert!(eq.take_events().is_empty());
    }

    #[test]
    fn test_unequip() {
        let mut eq = Equipment::new();
        assert!(eq.try_unequip_item(EquipmentCategory::Hand).is_none());
        eq.try_equip_item(wearable(3, EquipmentCategory::Hand, 1.0)).unwrap();
        eq.take_events();
        let item = eq.try_unequip_item(EquipmentCategory::Hand).unwrap();
        assert_eq!(item.id(), ItemDefId(3));
        assert_eq!(
            eq.take_events(),
            vec![GameEvent::EquipmentChanged {
                category: EquipmentCategory::Hand,
                item: None
            }]
        );
    }

    #[test]
    fn test_total_modifiers() {
        let mut eq = Equipment::new();
        eq.try_equip_item(wearable(1, EquipmentCategory::Head, 2.0)).unwrap();
        eq.try_equip_item(wearable(2, EquipmentCategory::Body, 5.0)).unwrap();
        let total: f32 = eq.total_modifiers().iter().map(|m| m.value).sum();
        assert_eq!(total, 7.0);
    }
}
