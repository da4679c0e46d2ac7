use outpost_core::{ItemDefId, RecipeId, StationId};
use thiserror::Error;

use crate::capability::CapabilityKind;
use crate::equipment::EquipmentCategory;

/// Errors raised while loading or validating the item and recipe catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate item definition id {0}")]
    DuplicateItem(ItemDefId),

    #[error("Duplicate recipe id {0}")]
    DuplicateRecipe(RecipeId),

    #[error("Item {item} declares capability {kind:?} more than once")]
    DuplicateCapability { item: ItemDefId, kind: CapabilityKind },

    #[error("Item {item} has invalid {kind:?} parameters: {reason}")]
    InvalidParams {
        item: ItemDefId,
        kind: CapabilityKind,
        reason: &'static str,
    },

    #[error("Recipe {recipe} references unknown item {item}")]
    UnknownItem { recipe: RecipeId, item: ItemDefId },

    #[error("Recipe {recipe} is invalid: {reason}")]
    InvalidRecipe {
        recipe: RecipeId,
        reason: &'static str,
    },
}

/// Errors from transactional equip/unequip.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EquipError {
    #[error("Inventory slot {0} is empty or out of range")]
    EmptySlot(usize),

    #[error("Item {0} cannot be equipped")]
    NotEquippable(ItemDefId),

    #[error("Nothing equipped in {0:?}")]
    NothingEquipped(EquipmentCategory),

    #[error("Inventory has no room for the returned item")]
    InventoryFull,
}

/// Reasons a craft request is rejected. No ingredient is consumed on error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CraftError {
    #[error("Unknown recipe {0}")]
    UnknownRecipe(RecipeId),

    #[error("Unknown station {0}")]
    UnknownStation(StationId),

    #[error("Recipe needs a station")]
    StationRequired,

    #[error("Station {0} cannot craft this recipe")]
    WrongStation(StationId),

    #[error("Station {0} is not nearby")]
    StationNotNear(StationId),

    #[error("Station tech level {have} is below required {need}")]
    TechTooLow { have: u32, need: u32 },

    #[error("Recipe is locked (requires '{0}')")]
    Locked(String),

    #[error("Missing ingredient {item}: need {need}, have {have}")]
    MissingIngredient { item: ItemDefId, need: u32, have: u32 },
}
