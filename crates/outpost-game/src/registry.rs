//! Item definition registry and catalog loading
//!
//! The registry interns one `Arc<ItemDefinition>` per id, so stack merging
//! can compare definitions by pointer and still mean "same id".

use std::collections::HashMap;
use std::sync::Arc;

use outpost_core::ItemDefId;
use serde::Deserialize;
use tracing::{info, warn};

use crate::crafting::{RecipeBook, RecipeSpec};
use crate::error::CatalogError;
use crate::item::{ItemDefinition, ItemInstance, SlotSnapshot};

/// Read-only lookup of item definitions by stable id
#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    items: HashMap<ItemDefId, Arc<ItemDefinition>>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a JSON array of definitions
    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let defs: Vec<ItemDefinition> = serde_json::from_str(content)?;
        let mut registry = Self::new();
        for def in defs {
            registry.register(def)?;
        }
        Ok(registry)
    }

    /// Validate and intern a definition
    pub fn register(&mut self, mut def: ItemDefinition) -> Result<Arc<ItemDefinition>, CatalogError> {
        if self.items.contains_key(&def.id) {
            return Err(CatalogError::DuplicateItem(def.id));
        }
        def.sort_capabilities();
        def.validate()?;
        let def = Arc::new(def);
        self.items.insert(def.id, Arc::clone(&def));
        Ok(def)
    }

    /// Look up a definition. Unknown ids are logged as catalog drift.
    pub fn lookup(&self, id: ItemDefId) -> Option<Arc<ItemDefinition>> {
        let found = self.items.get(&id).cloned();
        if found.is_none() {
            warn!("Item definition {} not found in registry", id);
        }
        found
    }

    pub fn contains(&self, id: ItemDefId) -> bool {
        self.items.contains_key(&id)
    }

    /// Stack limit of a definition
    pub fn max_stack(def: &ItemDefinition) -> u32 {
        def.max_stack()
    }

    /// Definition identity (interned, so equal ids share one allocation)
    pub fn same_definition(a: &Arc<ItemDefinition>, b: &Arc<ItemDefinition>) -> bool {
        Arc::ptr_eq(a, b)
    }

    /// Rebuild an instance from a snapshot; `None` if the id has drifted
    pub fn instantiate(&self, snapshot: &SlotSnapshot) -> Option<ItemInstance> {
        self.lookup(snapshot.item)
            .map(|def| ItemInstance::from_snapshot(def, snapshot))
    }

    /// All definitions ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ItemDefinition>> {
        let mut defs: Vec<&Arc<ItemDefinition>> = self.items.values().collect();
        defs.sort_by_key(|d| d.id);
        defs.into_iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    items: Vec<ItemDefinition>,
    #[serde(default)]
    recipes: Vec<RecipeSpec>,
}

/// Items and recipes loaded together from one catalog file
#[derive(Debug, Clone)]
pub struct Catalog {
    pub items: Arc<ItemRegistry>,
    pub recipes: Arc<RecipeBook>,
}

impl Catalog {
    /// Parse `{ "items": [...], "recipes": [...] }`, validating every entry
    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(content)?;

        let mut items = ItemRegistry::new();
        for def in file.items {
            items.register(def)?;
        }
        let recipes = RecipeBook::from_specs(file.recipes, &items)?;

        info!(
            "Loaded catalog: {} items, {} recipes",
            items.len(),
            recipes.len()
        );
        Ok(Self {
            items: Arc::new(items),
            recipes: Arc::new(recipes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityKind;
    use crate::item::ItemCategory;

    const ITEMS: &str = r#"[
        {"id": 1, "name": "Wood", "category": "Material",
         "capabilities": [{"kind": "Stackable", "max_stack": 50}]},
        {"id": 2, "name": "Stone Axe", "category": "Tool",
         "capabilities": [
            {"kind": "Durability", "max_durability": 40, "cost_per_use": 1},
            {"kind": "Equip", "slot": "Hand",
             "modifiers": [{"stat": "Attack", "value": 4.0}]}
         ]}
    ]"#;

    #[test]
    fn test_load_from_json() {
        let reg = ItemRegistry::from_json(ITEMS).unwrap();
        assert_eq!(reg.len(), 2);
        let wood = reg.lookup(ItemDefId(1)).unwrap();
        assert_eq!(wood.max_stack(), 50);
        let axe = reg.lookup(ItemDefId(2)).unwrap();
        assert_eq!(axe.category, ItemCategory::Tool);
        assert!(axe.has(CapabilityKind::Equip));
        assert_eq!(axe.durability().unwrap().max_durability, 40.0);
    }

    #[test]
    fn test_lookup_is_interned() {
        let reg = ItemRegistry::from_json(ITEMS).unwrap();
        let a = reg.lookup(ItemDefId(1)).unwrap();
        let b = reg.lookup(ItemDefId(1)).unwrap();
        assert!(ItemRegistry::same_definition(&a, &b));
    }

    #[test]
    fn test_unknown_id_is_none() {
        let reg = ItemRegistry::from_json(ITEMS).unwrap();
        assert!(reg.lookup(ItemDefId(99)).is_none());
        let snap = SlotSnapshot {
            item: ItemDefId(99),
            count: 1,
            durability: 0.0,
            last_use: 0.0,
        };
        assert!(reg.instantiate(&snap).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let json = r#"[
            {"id": 1, "name": "A", "category": "Material"},
            {"id": 1, "name": "B", "category": "Material"}
        ]"#;
        assert!(matches!(
            ItemRegistry::from_json(json),
            Err(CatalogError::DuplicateItem(ItemDefId(1)))
        ));
    }

    #[test]
    fn test_duplicate_capability_rejected() {
        let json = r#"[
            {"id": 1, "name": "A", "category": "Food", "capabilities": [
                {"kind": "Consumable", "consume_amount": 1},
                {"kind": "Consumable", "consume_amount": 2}
            ]}
        ]"#;
        assert!(matches!(
            ItemRegistry::from_json(json),
            Err(CatalogError::DuplicateCapability { .. })
        ));
    }

    #[test]
    fn test_catalog_with_recipes() {
        let json = r#"{
            "items": [
                {"id": 1, "name": "Wood", "category": "Material",
                 "capabilities": [{"kind": "Stackable", "max_stack": 50}]},
                {"id": 3, "name": "Plank", "category": "Material",
                 "capabilities": [{"kind": "Stackable", "max_stack": 50}]}
            ],
            "recipes": [
                {"id": 1, "name": "Planks", "station": "Hand", "time_cost": 1.0,
                 "ingredients": [{"item": 1, "count": 1}],
                 "results": [{"item": 3, "count": 2}]}
            ]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.items.len(), 2);
        assert_eq!(catalog.recipes.len(), 1);
    }

    #[test]
    fn test_catalog_unknown_recipe_item() {
        let json = r#"{
            "items": [{"id": 1, "name": "Wood", "category": "Material"}],
            "recipes": [
                {"id": 1, "name": "Bad", "station": "Hand", "time_cost": 1.0,
                 "ingredients": [{"item": 1, "count": 1}],
                 "results": [{"item": 5, "count": 1}]}
            ]
        }"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::UnknownItem { .. })
        ));
    }
}
