//! Network messages
//!
//! Clients send one-way `Intent`s to the authority; the authority answers
//! with `Delta`s describing the resulting state. Slot contents always travel
//! as `SlotSnapshot`s (definition id, count, durability).

use glam::Vec3;
use outpost_core::{ItemDefId, JobId, PeerId, PickupId, RecipeId, StationId};
use outpost_game::{CharacterStats, EquipmentCategory, SlotSnapshot};
use serde::{Deserialize, Serialize};

/// A loose item lying in the world (shared state)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldPickup {
    pub id: PickupId,
    pub snapshot: SlotSnapshot,
    pub position: Vec3,
}

/// New contents of one container slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotUpdate {
    pub index: usize,
    pub item: Option<SlotSnapshot>,
}

/// Mutation request sent to the authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    UseItem {
        slot: usize,
    },
    SwapItem {
        from: usize,
        to: usize,
    },
    /// Drop `count` units (all for `None`) at `position`
    DropItem {
        slot: usize,
        count: Option<u32>,
        position: Vec3,
    },
    /// Definition and count are what the requester saw; a stale view is
    /// rejected
    PickupItem {
        pickup_id: PickupId,
        definition_id: ItemDefId,
        count: u32,
    },
    EquipItem {
        slot: usize,
    },
    UnequipItem {
        category: EquipmentCategory,
    },
    RequestCraft {
        recipe_id: RecipeId,
        station_id: Option<StationId>,
    },
    CancelCraft {
        job_id: JobId,
    },
    TakeFromStation {
        station_id: StationId,
        slot: usize,
    },
    /// Put fresh items into a player's inventory (authority only)
    GrantItem {
        target: PeerId,
        definition_id: ItemDefId,
        count: u32,
    },
}

/// State change broadcast by the authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Delta {
    InventorySlots {
        owner: PeerId,
        slots: Vec<SlotUpdate>,
    },
    Equipment {
        owner: PeerId,
        category: EquipmentCategory,
        item: Option<SlotSnapshot>,
    },
    Stats {
        owner: PeerId,
        stats: CharacterStats,
    },
    StationBuffer {
        station: StationId,
        slots: Vec<SlotUpdate>,
    },
    JobStarted {
        job: JobId,
        recipe: RecipeId,
        station: Option<StationId>,
        owner: PeerId,
    },
    JobFinished {
        job: JobId,
        cancelled: bool,
    },
    PickupSpawned(WorldPickup),
    PickupRemoved {
        pickup_id: PickupId,
    },
    ClockSync {
        now: f64,
    },
    /// A player left; replicas forget everything they own
    PlayerLeft {
        peer: PeerId,
    },
    /// Sent only to the peer whose intent was refused
    IntentRejected {
        seq: u64,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Intent(Intent),
    Delta(Delta),
}

/// Wire envelope. `sender` is checked against the transport's view of who
/// sent the packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: PeerId,
    pub seq: u64,
    pub body: Message,
}

impl Envelope {
    pub fn intent(sender: PeerId, seq: u64, intent: Intent) -> Self {
        Self {
            sender,
            seq,
            body: Message::Intent(intent),
        }
    }

    pub fn delta(sender: PeerId, seq: u64, delta: Delta) -> Self {
        Self {
            sender,
            seq,
            body: Message::Delta(delta),
        }
    }
}
