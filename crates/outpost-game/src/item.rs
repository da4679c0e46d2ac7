//! Item definitions and runtime item instances
//!
//! A definition is immutable catalog data shared through `Arc`. An instance
//! references its definition and carries the per-item state: count,
//! durability and the last-use timestamp on the network clock.

use std::sync::Arc;

use outpost_core::ItemDefId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::{
    CapabilityConfig, CapabilityKind, CapabilityParams, DurabilityParams, EquipParams, Gate,
    UseContext,
};
use crate::error::CatalogError;

/// Broad item category, used for sorting and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    Material,
    Food,
    Tool,
    Weapon,
    Armor,
    Structure,
}

impl ItemCategory {
    /// Sort position in the inventory
    pub fn sort_order(self) -> u8 {
        match self {
            Self::Weapon => 0,
            Self::Tool => 1,
            Self::Armor => 2,
            Self::Food => 3,
            Self::Structure => 4,
            Self::Material => 5,
        }
    }
}

/// Immutable item definition from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: ItemDefId,
    pub name: String,
    pub category: ItemCategory,
    #[serde(default)]
    capabilities: Vec<CapabilityConfig>,
}

impl ItemDefinition {
    /// Build a definition; capabilities are sorted by `order` (stable)
    pub fn new(
        id: ItemDefId,
        name: impl Into<String>,
        category: ItemCategory,
        capabilities: Vec<CapabilityConfig>,
    ) -> Self {
        let mut def = Self {
            id,
            name: name.into(),
            category,
            capabilities,
        };
        def.sort_capabilities();
        def
    }

    pub(crate) fn sort_capabilities(&mut self) {
        self.capabilities.sort_by_key(|c| c.order);
    }

    /// Capabilities in execution order
    pub fn capabilities(&self) -> &[CapabilityConfig] {
        &self.capabilities
    }

    /// Parameter block of a capability kind, if attached
    pub fn capability(&self, kind: CapabilityKind) -> Option<&CapabilityParams> {
        self.capabilities
            .iter()
            .map(|c| &c.params)
            .find(|p| p.kind() == kind)
    }

    pub fn has(&self, kind: CapabilityKind) -> bool {
        self.capability(kind).is_some()
    }

    /// Stack limit: 1 unless a Stackable capability says otherwise
    pub fn max_stack(&self) -> u32 {
        match self.capability(CapabilityKind::Stackable) {
            Some(CapabilityParams::Stackable(p)) => p.max_stack,
            _ => 1,
        }
    }

    pub fn is_stackable(&self) -> bool {
        self.max_stack() > 1
    }

    pub fn durability(&self) -> Option<&DurabilityParams> {
        match self.capability(CapabilityKind::Durability) {
            Some(CapabilityParams::Durability(p)) => Some(p),
            _ => None,
        }
    }

    pub fn equip(&self) -> Option<&EquipParams> {
        match self.capability(CapabilityKind::Equip) {
            Some(CapabilityParams::Equip(p)) => Some(p),
            _ => None,
        }
    }

    /// Load-time validation of the capability list
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen: Vec<CapabilityKind> = Vec::with_capacity(self.capabilities.len());
        for cfg in &self.capabilities {
            let kind = cfg.params.kind();
            if seen.contains(&kind) {
                return Err(CatalogError::DuplicateCapability {
                    item: self.id,
                    kind,
                });
            }
            seen.push(kind);
            cfg.params
                .validate()
                .map_err(|reason| CatalogError::InvalidParams {
                    item: self.id,
                    kind,
                    reason,
                })?;
        }

        // Per-instance state cannot be merged, so such items never stack
        if self.is_stackable() {
            if self.has(CapabilityKind::Durability) {
                return Err(CatalogError::InvalidParams {
                    item: self.id,
                    kind: CapabilityKind::Stackable,
                    reason: "durable items cannot stack",
                });
            }
            if self.has(CapabilityKind::Equip) {
                return Err(CatalogError::InvalidParams {
                    item: self.id,
                    kind: CapabilityKind::Stackable,
                    reason: "equippable items cannot stack",
                });
            }
        }
        Ok(())
    }
}

/// Slot contents as sent over the wire and in events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotSnapshot {
    pub item: ItemDefId,
    pub count: u32,
    #[serde(default)]
    pub durability: f32,
    /// Network clock reading of the last use
    #[serde(default)]
    pub last_use: f64,
}

/// Runtime item owned by exactly one container slot
#[derive(Debug, Clone)]
pub struct ItemInstance {
    definition: Arc<ItemDefinition>,
    pub count: u32,
    pub durability: f32,
    /// Network clock reading of the last use; `<= 0` means never used
    pub last_use: f64,
}

impl ItemInstance {
    /// New instance at full durability
    pub fn new(definition: Arc<ItemDefinition>, count: u32) -> Self {
        let durability = definition
            .durability()
            .map(|d| d.max_durability)
            .unwrap_or(0.0);
        Self {
            definition,
            count,
            durability,
            last_use: 0.0,
        }
    }

    pub fn definition(&self) -> &Arc<ItemDefinition> {
        &self.definition
    }

    pub fn id(&self) -> ItemDefId {
        self.definition.id
    }

    /// Whether both instances share the same interned definition
    pub fn same_definition(&self, other: &ItemInstance) -> bool {
        Arc::ptr_eq(&self.definition, &other.definition)
    }

    /// Run the capability pipeline. Returns false without touching any state
    /// if a gate blocks or no capability takes part.
    pub fn try_use(&mut self, ctx: &mut UseContext<'_>) -> bool {
        let definition = Arc::clone(&self.definition);
        let capabilities = definition.capabilities();

        let gates: Vec<Gate> = {
            let item: &ItemInstance = self;
            let view: &UseContext<'_> = ctx;
            capabilities
                .iter()
                .map(|cfg| cfg.params.gate(item, view))
                .collect()
        };

        if let Some(blocked) = gates.iter().position(|g| *g == Gate::Block) {
            debug!(
                "Use of {} blocked by {:?}",
                definition.name,
                capabilities[blocked].params.kind()
            );
            return false;
        }
        if gates.iter().all(|g| *g == Gate::Skip) {
            return false;
        }

        for (cfg, gate) in capabilities.iter().zip(&gates) {
            if *gate != Gate::Skip {
                cfg.params.run(self, ctx);
            }
        }
        true
    }

    /// Copy of this item with a count of one. The caller decrements the source.
    pub fn split_one(&self) -> ItemInstance {
        let mut one = self.clone();
        one.count = 1;
        one
    }

    /// True when durability is tracked and exhausted
    pub fn is_broken(&self) -> bool {
        self.definition.durability().is_some() && self.durability <= 0.0
    }

    /// True when the item should leave its slot
    pub fn is_depleted(&self) -> bool {
        self.count == 0 || self.is_broken()
    }

    pub fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            item: self.definition.id,
            count: self.count,
            durability: self.durability,
            last_use: self.last_use,
        }
    }

    /// Rebuild an instance from a snapshot against a resolved definition
    pub fn from_snapshot(definition: Arc<ItemDefinition>, snapshot: &SlotSnapshot) -> Self {
        let mut item = Self::new(definition, snapshot.count);
        if item.definition.durability().is_some() {
            item.durability = snapshot.durability;
        }
        item.last_use = snapshot.last_use;
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        ConsumableParams, CoolTimeParams, EdibleParams, PlaceableParams, StackableParams, UseEffect,
    };
    use crate::stats::{CharacterStats, StatKind, StatModifier};
    use outpost_core::NetworkClock;

    fn berry() -> Arc<ItemDefinition> {
        Arc::new(ItemDefinition::new(
            ItemDefId(10),
            "Berry",
            ItemCategory::Food,
            vec![
                CapabilityConfig::new(0, CapabilityParams::Stackable(StackableParams { max_stack: 10 })),
                CapabilityConfig::new(
                    2,
                    CapabilityParams::Consumable(ConsumableParams { consume_amount: 1 }),
                ),
                CapabilityConfig::new(
                    1,
                    CapabilityParams::Edible(EdibleParams {
                        modifiers: vec![StatModifier::flat(StatKind::Hunger, 15.0)],
                    }),
                ),
                CapabilityConfig::new(
                    1,
                    CapabilityParams::CoolTime(CoolTimeParams {
                        cool_time_seconds: 5.0,
                    }),
                ),
            ],
        ))
    }

    #[test]
    fn test_capabilities_sorted_stably() {
        let def = berry();
        let kinds: Vec<CapabilityKind> = def.capabilities().iter().map(|c| c.params.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                CapabilityKind::Stackable,
                CapabilityKind::Edible,
                CapabilityKind::CoolTime,
                CapabilityKind::Consumable
            ]
        );
    }

    #[test]
    fn test_max_stack_default_one() {
        let def = ItemDefinition::new(ItemDefId(1), "Rock", ItemCategory::Material, vec![]);
        assert_eq!(def.max_stack(), 1);
        assert!(!def.is_stackable());
        assert_eq!(berry().max_stack(), 10);
    }

    #[test]
    fn test_eat_applies_stats_and_consumes() {
        let mut item = ItemInstance::new(berry(), 3);
        let mut stats = CharacterStats {
            hunger: 50.0,
            ..Default::default()
        };
        let mut clock = NetworkClock::new();
        clock.advance(100.0);
        let mut ctx = UseContext::with_stats(&clock, &mut stats);
        assert!(item.try_use(&mut ctx));
        assert_eq!(item.count, 2);
        assert!((item.last_use - 100.0).abs() < 1e-9);
        assert_eq!(stats.hunger, 65.0);
    }

    #[test]
    fn test_blocked_use_changes_nothing() {
        let mut item = ItemInstance::new(berry(), 3);
        let mut clock = NetworkClock::new();
        clock.advance(100.0);
        item.last_use = 98.0;
        let before = (item.count, item.durability, item.last_use);

        let mut stats = CharacterStats {
            hunger: 50.0,
            ..Default::default()
        };
        let mut ctx = UseContext::with_stats(&clock, &mut stats);
        assert!(!item.try_use(&mut ctx));
        assert_eq!((item.count, item.durability, item.last_use), before);
        assert_eq!(stats.hunger, 50.0);
    }

    #[test]
    fn test_cooldown_survives_snapshot() {
        let mut item = ItemInstance::new(berry(), 3);
        let mut clock = NetworkClock::new();
        clock.advance(100.0);
        let mut stats = CharacterStats::default();
        assert!(item.try_use(&mut UseContext::with_stats(&clock, &mut stats)));

        let mut rebuilt = ItemInstance::from_snapshot(berry(), &item.snapshot());
        assert_eq!(rebuilt.last_use, item.last_use);
        assert!(!rebuilt.try_use(&mut UseContext::with_stats(&clock, &mut stats)));
        assert_eq!(rebuilt.count, 2);
    }

    #[test]
    fn test_all_skip_is_not_a_use() {
        let def = Arc::new(ItemDefinition::new(
            ItemDefId(2),
            "Wood",
            ItemCategory::Material,
            vec![CapabilityConfig::new(
                0,
                CapabilityParams::Stackable(StackableParams { max_stack: 50 }),
            )],
        ));
        let mut item = ItemInstance::new(def, 5);
        let clock = NetworkClock::new();
        let mut ctx = UseContext::new(&clock);
        assert!(!item.try_use(&mut ctx));
        assert_eq!(item.count, 5);
    }

    #[test]
    fn test_placeable_emits_effect() {
        let def = Arc::new(ItemDefinition::new(
            ItemDefId(30),
            "Campfire Kit",
            ItemCategory::Structure,
            vec![
                CapabilityConfig::new(0, CapabilityParams::Placeable(PlaceableParams { structure: 4 })),
                CapabilityConfig::new(
                    1,
                    CapabilityParams::Consumable(ConsumableParams { consume_amount: 1 }),
                ),
            ],
        ));
        let mut item = ItemInstance::new(def, 1);
        let clock = NetworkClock::new();
        let mut ctx = UseContext::new(&clock);
        assert!(item.try_use(&mut ctx));
        assert_eq!(item.count, 0);
        assert_eq!(
            ctx.effects,
            vec![UseEffect::Place {
                item: ItemDefId(30),
                structure: 4
            }]
        );
    }

    #[test]
    fn test_split_one_shares_definition() {
        let item = ItemInstance::new(berry(), 4);
        let one = item.split_one();
        assert_eq!(one.count, 1);
        assert_eq!(item.count, 4);
        assert!(one.same_definition(&item));
    }

    #[test]
    fn test_validate_rejects_durable_stack() {
        let def = ItemDefinition::new(
            ItemDefId(3),
            "Bad",
            ItemCategory::Tool,
            vec![
                CapabilityConfig::new(0, CapabilityParams::Stackable(StackableParams { max_stack: 5 })),
                CapabilityConfig::new(
                    0,
                    CapabilityParams::Durability(crate::capability::DurabilityParams {
                        max_durability: 10.0,
                        cost_per_use: 1.0,
                    }),
                ),
            ],
        );
        assert!(matches!(def.validate(), Err(CatalogError::InvalidParams { .. })));
    }
}
