//! Change notifications for presentation layers
//!
//! Containers queue `GameEvent`s as they mutate; the owner drains them with
//! `take_events()` and publishes them on an `EventBus`. Delivery is
//! synchronous and in-process, and the core never depends on what a
//! subscriber does.

use outpost_core::RecipeId;
use serde::{Deserialize, Serialize};

use crate::equipment::EquipmentCategory;
use crate::item::SlotSnapshot;

/// A state change raised by the item core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Something in the inventory changed (raised once per operation)
    InventoryChanged,
    /// One inventory slot has new contents
    InventorySlotChanged {
        index: usize,
        item: Option<SlotSnapshot>,
    },
    /// An equipment slot has a new occupant
    EquipmentChanged {
        category: EquipmentCategory,
        item: Option<SlotSnapshot>,
    },
    /// A crafting job delivered its results
    CraftSucceeded {
        recipe: RecipeId,
        results: Vec<SlotSnapshot>,
    },
}

/// Event discriminant, for per-kind subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    InventoryChanged,
    InventorySlotChanged,
    EquipmentChanged,
    CraftSucceeded,
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::InventoryChanged => EventKind::InventoryChanged,
            Self::InventorySlotChanged { .. } => EventKind::InventorySlotChanged,
            Self::EquipmentChanged { .. } => EventKind::EquipmentChanged,
            Self::CraftSucceeded { .. } => EventKind::CraftSucceeded,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&GameEvent) + Send>;

struct Subscriber {
    id: SubscriptionId,
    filter: Option<EventKind>,
    handler: Handler,
}

/// Typed publish/subscribe bus
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event
    pub fn subscribe(&mut self, handler: impl FnMut(&GameEvent) + Send + 'static) -> SubscriptionId {
        self.add(None, Box::new(handler))
    }

    /// Receive only events of one kind
    pub fn subscribe_to(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&GameEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.add(Some(kind), Box::new(handler))
    }

    fn add(&mut self, filter: Option<EventKind>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, filter, handler });
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn publish(&mut self, event: &GameEvent) {
        let kind = event.kind();
        for sub in &mut self.subscribers {
            if sub.filter.map_or(true, |f| f == kind) {
                (sub.handler)(event);
            }
        }
    }

    pub fn publish_all(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        for event in events {
            self.publish(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_subscribe_and_publish() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(move |e| sink.lock().unwrap().push(e.kind()));

        bus.publish(&GameEvent::InventoryChanged);
        bus.publish(&GameEvent::InventorySlotChanged { index: 0, item: None });

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::InventoryChanged, EventKind::InventorySlotChanged]
        );
    }

    #[test]
    fn test_filtered_subscription() {
        let mut bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        bus.subscribe_to(EventKind::InventoryChanged, move |_| *sink.lock().unwrap() += 1);

        bus.publish_all(vec![
            GameEvent::InventoryChanged,
            GameEvent::InventorySlotChanged { index: 2, item: None },
            GameEvent::InventoryChanged,
        ]);
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let id = bus.subscribe(|_| {});
        assert_eq!(bus.subscriber_count(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
