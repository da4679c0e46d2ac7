//! Outpost Game - item and crafting model
//!
//! Provides:
//! - Capability-driven item definitions and instances
//! - Item registry and catalog loading
//! - Inventory and equipment containers
//! - Player loadout with transactional equip
//! - Crafting stations and timed jobs
//! - Change-notification bus

pub mod capability;
pub mod crafting;
pub mod equipment;
pub mod error;
pub mod events;
pub mod inventory;
pub mod item;
pub mod player;
pub mod registry;
pub mod stats;

pub use capability::{
    Capability, CapabilityConfig, CapabilityKind, CapabilityParams, Gate, UseContext, UseEffect,
};
pub use crafting::{
    CraftingEngine, CraftingJob, Delivery, JobOutcome, Recipe, RecipeBook, RecipeSpec, RecipeStack,
    Station, StationType, DEFAULT_STATION_BUFFER_SLOTS,
};
pub use equipment::{Equipment, EquipmentCategory};
pub use error::{CatalogError, CraftError, EquipError};
pub use events::{EventBus, EventKind, GameEvent, SubscriptionId};
pub use inventory::{AddOutcome, Inventory, DEFAULT_INVENTORY_SLOTS};
pub use item::{ItemCategory, ItemDefinition, ItemInstance, SlotSnapshot};
pub use player::{PlayerState, UnlockSet};
pub use registry::{Catalog, ItemRegistry};
pub use stats::{CharacterStats, ModifierKind, StatKind, StatModifier};
