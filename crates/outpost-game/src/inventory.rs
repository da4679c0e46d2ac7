//! Inventory container
//!
//! A fixed number of slots, each empty or holding one stack. Every
//! non-empty slot satisfies `0 < count <= max_stack`. Mutations queue one
//! `InventorySlotChanged` per touched slot followed by a single
//! `InventoryChanged`; no-ops queue nothing.

use std::collections::HashMap;
use std::sync::Arc;

use outpost_core::ItemDefId;
use tracing::debug;

use crate::capability::UseContext;
use crate::events::GameEvent;
use crate::item::{ItemCategory, ItemDefinition, ItemInstance, SlotSnapshot};
use crate::registry::ItemRegistry;

/// Default number of player inventory slots
pub const DEFAULT_INVENTORY_SLOTS: usize = 20;

/// Result of `try_add_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// At least one unit was stored
    pub accepted: bool,
    /// Units that did not fit
    pub remainder: u32,
}

/// Fixed-size slot container
#[derive(Debug, Clone)]
pub struct Inventory {
    slots: Vec<Option<ItemInstance>>,
    events: Vec<GameEvent>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(DEFAULT_INVENTORY_SLOTS)
    }
}

impl Inventory {
    /// Create an empty inventory. The slot count never changes afterwards.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            events: Vec::new(),
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Item in a slot, if any
    pub fn get(&self, index: usize) -> Option<&ItemInstance> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// No empty slot left (partial stacks may still accept items)
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Contents of every slot, for sync and display
    pub fn snapshot(&self) -> Vec<Option<SlotSnapshot>> {
        self.slots
            .iter()
            .map(|s| s.as_ref().map(ItemInstance::snapshot))
            .collect()
    }

    /// Drain queued change events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn touch(&mut self, index: usize) {
        let item = self.slots[index].as_ref().map(ItemInstance::snapshot);
        self.events.push(GameEvent::InventorySlotChanged { index, item });
    }

    fn commit(&mut self, touched: &[usize]) {
        if touched.is_empty() {
            return;
        }
        for &index in touched {
            self.touch(index);
        }
        self.events.push(GameEvent::InventoryChanged);
    }

    /// Units of `def` this inventory could still take
    fn free_space_for(&self, def: &Arc<ItemDefinition>) -> u64 {
        let max = def.max_stack() as u64;
        self.slots
            .iter()
            .map(|slot| match slot {
                None => max,
                Some(item) if ItemRegistry::same_definition(item.definition(), def) => {
                    max.saturating_sub(item.count as u64)
                }
                Some(_) => 0,
            })
            .sum()
    }

    /// Whether `count` units of `def` fit completely
    pub fn can_accept(&self, def: &Arc<ItemDefinition>, count: u32) -> bool {
        self.free_space_for(def) >= count as u64
    }

    /// Whether an instance fits completely
    pub fn can_accept_instance(&self, item: &ItemInstance) -> bool {
        self.can_accept(item.definition(), item.count)
    }

    /// Merge units of `template`'s definition into partial stacks, then fill
    /// empty slots with copies of `template`. Returns the units left over.
    fn distribute(&mut self, template: &ItemInstance, count: u32, touched: &mut Vec<usize>) -> u32 {
        let def = template.definition();
        let max = def.max_stack();
        let mut remaining = count;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if remaining == 0 {
                break;
            }
            if let Some(item) = slot {
                if ItemRegistry::same_definition(item.definition(), def) && item.count < max {
                    let add = (max - item.count).min(remaining);
                    item.count += add;
                    remaining -= add;
                    touched.push(index);
                }
            }
        }

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let mut stack = template.clone();
                stack.count = max.min(remaining);
                remaining -= stack.count;
                *slot = Some(stack);
                touched.push(index);
            }
        }

        remaining
    }

    /// Add fresh units of a definition: partial stacks first (ascending),
    /// then empty slots (ascending).
    pub fn try_add_item(&mut self, def: &Arc<ItemDefinition>, count: u32) -> AddOutcome {
        if count == 0 {
            return AddOutcome {
                accepted: false,
                remainder: 0,
            };
        }

        let template = ItemInstance::new(Arc::clone(def), 0);
        let mut touched = Vec::new();
        let remainder = self.distribute(&template, count, &mut touched);
        self.commit(&touched);

        debug!(
            "Added {}x {} ({} left over)",
            count - remainder,
            def.name,
            remainder
        );
        AddOutcome {
            accepted: remainder < count,
            remainder,
        }
    }

    /// Add an existing instance, keeping its durability and cooldown.
    /// All or nothing: returns the item untouched if it does not fit.
    #[allow(clippy::result_large_err)]
    pub fn try_add_instance(&mut self, item: ItemInstance) -> Result<(), ItemInstance> {
        if item.count == 0 {
            return Ok(());
        }
        if !self.can_accept_instance(&item) {
            return Err(item);
        }

        let mut touched = Vec::new();
        let remainder = self.distribute(&item, item.count, &mut touched);
        debug_assert_eq!(remainder, 0);
        self.commit(&touched);
        Ok(())
    }

    /// Remove `count` units from a slot, or the whole stack for `None` or a
    /// count at least the stack size. Invalid or empty slots are a no-op.
    pub fn remove_item(&mut self, index: usize, count: Option<u32>) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        let Some(item) = slot.as_mut() else {
            return false;
        };

        match count {
            Some(0) => return false,
            Some(n) if n < item.count => item.count -= n,
            _ => *slot = None,
        }
        self.commit(&[index]);
        true
    }

    /// Detach up to `count` units (all for `None`) into a new instance
    pub fn take_out_item(&mut self, index: usize, count: Option<u32>) -> Option<ItemInstance> {
        let slot = self.slots.get_mut(index)?;
        let item = slot.as_mut()?;

        let n = count.map_or(item.count, |c| c.min(item.count));
        if n == 0 {
            return None;
        }

        let taken = if n == item.count {
            slot.take()
        } else {
            let mut part = item.clone();
            part.count = n;
            item.count -= n;
            Some(part)
        };
        self.commit(&[index]);
        taken
    }

    /// Take a single unit out of a slot
    pub fn split_one(&mut self, index: usize) -> Option<ItemInstance> {
        self.take_out_item(index, Some(1))
    }

    /// Move, merge or swap the contents of two slots.
    ///
    /// Same definition: merge into `to` up to its free space, the overflow
    /// stays in `from`; a full `to` leaves both slots untouched. Different
    /// definitions trade places.
    pub fn swap_item(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.slots.len() || to >= self.slots.len() {
            return false;
        }

        let (src, dst) = if from < to {
            let (left, right) = self.slots.split_at_mut(to);
            (&mut left[from], &mut right[0])
        } else {
            let (left, right) = self.slots.split_at_mut(from);
            (&mut right[0], &mut left[to])
        };

        let merge = match (src.as_ref(), dst.as_ref()) {
            (None, _) => return false,
            (Some(a), Some(b)) => a.same_definition(b),
            (Some(_), None) => false,
        };

        if merge {
            let (Some(src_item), Some(dst_item)) = (src.as_mut(), dst.as_mut()) else {
                return false;
            };
            let space = dst_item.definition().max_stack().saturating_sub(dst_item.count);
            let moved = space.min(src_item.count);
            if moved == 0 {
                return false;
            }
            dst_item.count += moved;
            src_item.count -= moved;
            if src_item.count == 0 {
                *src = None;
            }
        } else {
            std::mem::swap(src, dst);
        }

        self.commit(&[from, to]);
        true
    }

    /// Use the item in a slot. The slot is emptied when the use leaves the
    /// stack at zero or breaks a durable item.
    pub fn try_use_item(&mut self, index: usize, ctx: &mut UseContext<'_>) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        let Some(item) = slot.as_mut() else {
            return false;
        };

        if !item.try_use(ctx) {
            return false;
        }
        if item.is_depleted() {
            debug!("{} used up in slot {}", item.definition().name, index);
            *slot = None;
        }
        self.commit(&[index]);
        true
    }

    /// Total units of a definition id across all slots
    pub fn count_of(&self, id: ItemDefId) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|item| item.id() == id)
            .map(|item| item.count)
            .sum()
    }

    /// Whether every `(id, count)` requirement is met (duplicates add up)
    pub fn has_items(&self, requirements: &[(ItemDefId, u32)]) -> bool {
        let mut needed: HashMap<ItemDefId, u32> = HashMap::new();
        for &(id, count) in requirements {
            *needed.entry(id).or_insert(0) += count;
        }
        needed.into_iter().all(|(id, count)| self.count_of(id) >= count)
    }

    /// Remove up to `count` units of a definition, last slots first.
    /// Returns the number removed.
    pub fn remove_by_definition(&mut self, id: ItemDefId, count: u32) -> u32 {
        let mut remaining = count;
        let mut touched = Vec::new();

        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if remaining == 0 {
                break;
            }
            let Some(item) = slot.as_mut() else {
                continue;
            };
            if item.id() != id {
                continue;
            }
            let take = item.count.min(remaining);
            item.count -= take;
            remaining -= take;
            if item.count == 0 {
                *slot = None;
            }
            touched.push(index);
        }

        touched.reverse();
        self.commit(&touched);
        count - remaining
    }

    /// Stable sort by category then id, packing items to the front
    pub fn sort_by_category(&mut self) {
        let before = self.snapshot();

        let mut items: Vec<ItemInstance> = self.slots.iter_mut().filter_map(Option::take).collect();
        items.sort_by_key(|item| (item.definition().category.sort_order(), item.id()));

        let capacity = self.slots.len();
        let mut items = items.into_iter();
        for index in 0..capacity {
            self.slots[index] = items.next();
        }

        let after = self.snapshot();
        let touched: Vec<usize> = (0..capacity).filter(|&i| before[i] != after[i]).collect();
        self.commit(&touched);
    }

    /// Items of one category with their slot indices
    pub fn items_by_category(&self, category: ItemCategory) -> Vec<(usize, &ItemInstance)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|item| (index, item)))
            .filter(|(_, item)| item.definition().category == category)
            .collect()
    }
}
