//! Item capabilities
//!
//! A definition carries an ordered list of `CapabilityConfig`s. Each config
//! holds a `CapabilityParams` variant; the variant decides which stateless
//! capability runs it, so a kind can never be paired with the wrong
//! parameter block.
//!
//! Using an item is all-or-nothing: every gate is evaluated first, and only
//! if none of them blocks do the `before_use -> on_use -> after_use` phases
//! run for the capabilities that did not skip.

use outpost_core::{ItemDefId, NetworkClock};
use serde::{Deserialize, Serialize};

use crate::equipment::EquipmentCategory;
use crate::item::ItemInstance;
use crate::stats::{CharacterStats, StatModifier};

/// Capability discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    Stackable,
    Consumable,
    Durability,
    CoolTime,
    Edible,
    Equip,
    Placeable,
}

/// Outcome of a capability gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Capability participates in this use
    Ok,
    /// Capability has nothing to do for this use
    Skip,
    /// Capability forbids this use
    Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackableParams {
    pub max_stack: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumableParams {
    #[serde(default = "default_consume_amount")]
    pub consume_amount: u32,
}

fn default_consume_amount() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurabilityParams {
    pub max_durability: f32,
    #[serde(default = "default_cost_per_use")]
    pub cost_per_use: f32,
}

fn default_cost_per_use() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolTimeParams {
    pub cool_time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdibleParams {
    #[serde(default)]
    pub modifiers: Vec<StatModifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipParams {
    pub slot: EquipmentCategory,
    #[serde(default)]
    pub modifiers: Vec<StatModifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceableParams {
    /// Structure spawned in the world when placed
    pub structure: u32,
}

/// Parameter block, tagged by capability kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum CapabilityParams {
    Stackable(StackableParams),
    Consumable(ConsumableParams),
    Durability(DurabilityParams),
    CoolTime(CoolTimeParams),
    Edible(EdibleParams),
    Equip(EquipParams),
    Placeable(PlaceableParams),
}

/// One capability attached to an item definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Execution order, ascending. Ties keep declaration order.
    #[serde(default)]
    pub order: i32,
    #[serde(flatten)]
    pub params: CapabilityParams,
}

impl CapabilityConfig {
    pub fn new(order: i32, params: CapabilityParams) -> Self {
        Self { order, params }
    }
}

/// Side effect a use asks the world to perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UseEffect {
    /// Spawn a structure where the user is aiming
    Place { item: ItemDefId, structure: u32 },
}

/// Everything a use pipeline may read or touch besides the item itself
pub struct UseContext<'a> {
    pub clock: &'a NetworkClock,
    pub stats: Option<&'a mut CharacterStats>,
    pub effects: Vec<UseEffect>,
}

impl<'a> UseContext<'a> {
    pub fn new(clock: &'a NetworkClock) -> Self {
        Self {
            clock,
            stats: None,
            effects: Vec::new(),
        }
    }

    pub fn with_stats(clock: &'a NetworkClock, stats: &'a mut CharacterStats) -> Self {
        Self {
            clock,
            stats: Some(stats),
            effects: Vec::new(),
        }
    }
}

/// Stateless behavior of one capability kind
pub trait Capability {
    type Params;

    /// Pure gate. Must not mutate anything.
    fn can_use(&self, item: &ItemInstance, params: &Self::Params, ctx: &UseContext<'_>) -> Gate;

    fn before_use(&self, _item: &mut ItemInstance, _params: &Self::Params, _ctx: &mut UseContext<'_>) {}

    fn on_use(&self, _item: &mut ItemInstance, _params: &Self::Params, _ctx: &mut UseContext<'_>) {}

    fn after_use(&self, _item: &mut ItemInstance, _params: &Self::Params, _ctx: &mut UseContext<'_>) {}
}

fn run_phases<C: Capability>(
    cap: &C,
    item: &mut ItemInstance,
    params: &C::Params,
    ctx: &mut UseContext<'_>,
) {
    cap.before_use(item, params, ctx);
    cap.on_use(item, params, ctx);
    cap.after_use(item, params, ctx);
}

pub struct StackableCapability;
pub struct ConsumableCapability;
pub struct DurabilityCapability;
pub struct CoolTimeCapability;
pub struct EdibleCapability;
pub struct EquipCapability;
pub struct PlaceableCapability;

impl Capability for StackableCapability {
    type Params = StackableParams;

    fn can_use(&self, _item: &ItemInstance, _params: &StackableParams, _ctx: &UseContext<'_>) -> Gate {
        Gate::Skip
    }
}

impl Capability for ConsumableCapability {
    type Params = ConsumableParams;

    fn can_use(&self, item: &ItemInstance, params: &ConsumableParams, _ctx: &UseContext<'_>) -> Gate {
        if item.count >= params.consume_amount {
            Gate::Ok
        } else {
            Gate::Block
        }
    }

    fn on_use(&self, item: &mut ItemInstance, params: &ConsumableParams, _ctx: &mut UseContext<'_>) {
        item.count = item.count.saturating_sub(params.consume_amount);
    }
}

impl Capability for DurabilityCapability {
    type Params = DurabilityParams;

    fn can_use(&self, item: &ItemInstance, _params: &DurabilityParams, _ctx: &UseContext<'_>) -> Gate {
        if item.durability <= 0.0 {
            Gate::Block
        } else {
            Gate::Ok
        }
    }

    fn after_use(&self, item: &mut ItemInstance, params: &DurabilityParams, _ctx: &mut UseContext<'_>) {
        item.durability = (item.durability - params.cost_per_use).max(0.0);
    }
}

impl CoolTimeCapability {
    /// Whether the cooldown has elapsed. A non-positive timestamp means the
    /// item was never used.
    pub fn is_ready(item: &ItemInstance, params: &CoolTimeParams, clock: &NetworkClock) -> bool {
        if item.last_use <= 0.0 {
            return true;
        }
        clock.elapsed_since(item.last_use) >= params.cool_time_seconds
    }
}

impl Capability for CoolTimeCapability {
    type Params = CoolTimeParams;

    fn can_use(&self, item: &ItemInstance, params: &CoolTimeParams, ctx: &UseContext<'_>) -> Gate {
        if Self::is_ready(item, params, ctx.clock) {
            Gate::Ok
        } else {
            Gate::Block
        }
    }

    fn after_use(&self, item: &mut ItemInstance, _params: &CoolTimeParams, ctx: &mut UseContext<'_>) {
        // Zero is reserved for "never used"
        item.last_use = ctx.clock.now().max(f64::MIN_POSITIVE);
    }
}

impl Capability for EdibleCapability {
    type Params = EdibleParams;

    fn can_use(&self, _item: &ItemInstance, _params: &EdibleParams, ctx: &UseContext<'_>) -> Gate {
        if ctx.stats.is_some() {
            Gate::Ok
        } else {
            Gate::Skip
        }
    }

    fn on_use(&self, _item: &mut ItemInstance, params: &EdibleParams, ctx: &mut UseContext<'_>) {
        if let Some(stats) = ctx.stats.as_deref_mut() {
            stats.apply_all(&params.modifiers, true);
            stats.clamp_pools();
        }
    }
}

impl EquipCapability {
    /// Apply or revert the equip modifiers. Called around equip/unequip,
    /// never from the use pipeline.
    pub fn apply(stats: &mut CharacterStats, params: &EquipParams, is_applying: bool) {
        stats.apply_all(&params.modifiers, is_applying);
    }
}

impl Capability for EquipCapability {
    type Params = EquipParams;

    fn can_use(&self, _item: &ItemInstance, _params: &EquipParams, _ctx: &UseContext<'_>) -> Gate {
        Gate::Skip
    }
}

impl Capability for PlaceableCapability {
    type Params = PlaceableParams;

    fn can_use(&self, _item: &ItemInstance, _params: &PlaceableParams, _ctx: &UseContext<'_>) -> Gate {
        Gate::Ok
    }

    fn on_use(&self, item: &mut ItemInstance, params: &PlaceableParams, ctx: &mut UseContext<'_>) {
        ctx.effects.push(UseEffect::Place {
            item: item.definition().id,
            structure: params.structure,
        });
    }
}

impl CapabilityParams {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::Stackable(_) => CapabilityKind::Stackable,
            Self::Consumable(_) => CapabilityKind::Consumable,
            Self::Durability(_) => CapabilityKind::Durability,
            Self::CoolTime(_) => CapabilityKind::CoolTime,
            Self::Edible(_) => CapabilityKind::Edible,
            Self::Equip(_) => CapabilityKind::Equip,
            Self::Placeable(_) => CapabilityKind::Placeable,
        }
    }

    /// Evaluate this capability's gate
    pub fn gate(&self, item: &ItemInstance, ctx: &UseContext<'_>) -> Gate {
        match self {
            Self::Stackable(p) => StackableCapability.can_use(item, p, ctx),
            Self::Consumable(p) => ConsumableCapability.can_use(item, p, ctx),
            Self::Durability(p) => DurabilityCapability.can_use(item, p, ctx),
            Self::CoolTime(p) => CoolTimeCapability.can_use(item, p, ctx),
            Self::Edible(p) => EdibleCapability.can_use(item, p, ctx),
            Self::Equip(p) => EquipCapability.can_use(item, p, ctx),
            Self::Placeable(p) => PlaceableCapability.can_use(item, p, ctx),
        }
    }

    /// Run before/use/after for this capability
    pub fn run(&self, item: &mut ItemInstance, ctx: &mut UseContext<'_>) {
        match self {
            Self::Stackable(p) => run_phases(&StackableCapability, item, p, ctx),
            Self::Consumable(p) => run_phases(&ConsumableCapability, item, p, ctx),
            Self::Durability(p) => run_phases(&DurabilityCapability, item, p, ctx),
            Self::CoolTime(p) => run_phases(&CoolTimeCapability, item, p, ctx),
            Self::Edible(p) => run_phases(&EdibleCapability, item, p, ctx),
            Self::Equip(p) => run_phases(&EquipCapability, item, p, ctx),
            Self::Placeable(p) => run_phases(&PlaceableCapability, item, p, ctx),
        }
    }

    /// Check parameter ranges. Returns a reason on failure.
    pub fn validate(&self) -> Result<(), &'static str> {
        match self {
            Self::Stackable(p) if p.max_stack == 0 => Err("max_stack must be at least 1"),
            Self::Consumable(p) if p.consume_amount == 0 => Err("consume_amount must be at least 1"),
            Self::Durability(p) if !(p.max_durability > 0.0) => Err("max_durability must be positive"),
            Self::Durability(p) if p.cost_per_use < 0.0 => Err("cost_per_use must not be negative"),
            Self::CoolTime(p) if !(p.cool_time_seconds >= 0.0) => {
                Err("cool_time_seconds must not be negative")
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemCategory, ItemDefinition};
    use crate::stats::StatKind;
    use outpost_core::ItemDefId;
    use std::sync::Arc;

    fn instance(caps: Vec<CapabilityConfig>, count: u32) -> ItemInstance {
        let def = ItemDefinition::new(ItemDefId(1), "Test", ItemCategory::Food, caps);
        ItemInstance::new(Arc::new(def), count)
    }

    #[test]
    fn test_params_json_shape() {
        let cfg: CapabilityConfig =
            serde_json::from_str(r#"{"order": 2, "kind": "Stackable", "max_stack": 20}"#).unwrap();
        assert_eq!(cfg.order, 2);
        assert_eq!(cfg.params, CapabilityParams::Stackable(StackableParams { max_stack: 20 }));
        assert_eq!(cfg.params.kind(), CapabilityKind::Stackable);
    }

    #[test]
    fn test_mismatched_params_rejected_at_parse() {
        let result: Result<CapabilityConfig, _> =
            serde_json::from_str(r#"{"kind": "Durability", "max_stack": 20}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_consumable_gate() {
        let caps = vec![CapabilityConfig::new(
            0,
            CapabilityParams::Consumable(ConsumableParams { consume_amount: 2 }),
        )];
        let clock = NetworkClock::new();
        let ctx = UseContext::new(&clock);
        let item = instance(caps.clone(), 1);
        assert_eq!(item.definition().capabilities()[0].params.gate(&item, &ctx), Gate::Block);
        let item = instance(caps, 2);
        assert_eq!(item.definition().capabilities()[0].params.gate(&item, &ctx), Gate::Ok);
    }

    #[test]
    fn test_cooldown_never_used_is_ready() {
        let params = CoolTimeParams {
            cool_time_seconds: 1000.0,
        };
        let item = instance(vec![], 1);
        let clock = NetworkClock::new();
        assert!(CoolTimeCapability::is_ready(&item, &params, &clock));
    }

    #[test]
    fn test_cooldown_across_wrap() {
        let params = CoolTimeParams {
            cool_time_seconds: 2.0,
        };
        let mut clock = NetworkClock::with_period(100.0).unwrap();
        let mut item = instance(vec![], 1);
        item.last_use = 99.5;

        clock.sync(1.0);
        assert!(!CoolTimeCapability::is_ready(&item, &params, &clock));
        clock.sync(1.5);
        assert!(CoolTimeCapability::is_ready(&item, &params, &clock));
    }

    #[test]
    fn test_edible_skips_without_stats() {
        let params = EdibleParams {
            modifiers: vec![StatModifier::flat(StatKind::Hunger, 10.0)],
        };
        let item = instance(vec![], 1);
        let clock = NetworkClock::new();
        let ctx = UseContext::new(&clock);
        assert_eq!(EdibleCapability.can_use(&item, &params, &ctx), Gate::Skip);
    }

    #[test]
    fn test_validate_ranges() {
        assert!(CapabilityParams::Stackable(StackableParams { max_stack: 0 }).validate().is_err());
        assert!(CapabilityParams::Durability(DurabilityParams {
            max_durability: 0.0,
            cost_per_use: 1.0
        })
        .validate()
        .is_err());
        assert!(CapabilityParams::CoolTime(CoolTimeParams {
            cool_time_seconds: 1.5
        })
        .validate()
        .is_ok());
    }
}
