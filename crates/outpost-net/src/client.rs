//! Non-authoritative session
//!
//! A client never mutates shared or foreign state. It sends intents to the
//! authority and rebuilds a display replica from the deltas it receives,
//! ignoring anything that did not come from the authority.

use std::collections::HashMap;

use outpost_core::{ItemDefId, JobId, NetworkClock, PeerId, PickupId, RecipeId, StationId};
use outpost_game::{CharacterStats, EquipmentCategory, SlotSnapshot};
use tracing::{debug, warn};

use crate::authority::AuthorityGate;
use crate::codec;
use crate::error::SessionError;
use crate::message::{Delta, Envelope, Intent, Message, SlotUpdate, WorldPickup};
use crate::transport::{Target, Transport};

/// A crafting job as seen by clients
#[derive(Debug, Clone, PartialEq)]
pub struct JobView {
    pub recipe: RecipeId,
    pub station: Option<StationId>,
    pub owner: PeerId,
}

/// Highest slot count a replica will grow a container to
pub const MAX_REPLICA_SLOTS: usize = 1024;

fn apply_slots(slots: &mut Vec<Option<SlotSnapshot>>, updates: Vec<SlotUpdate>) {
    for update in updates {
        if update.index >= MAX_REPLICA_SLOTS {
            warn!(
                "Ignoring update for slot {} (limit {})",
                update.index, MAX_REPLICA_SLOTS
            );
            continue;
        }
        if update.index >= slots.len() {
            slots.resize(update.index + 1, None);
        }
        slots[update.index] = update.item;
    }
}

/// Display copy of session state, rebuilt from deltas
#[derive(Debug, Clone, Default)]
pub struct ReplicaState {
    inventories: HashMap<PeerId, Vec<Option<SlotSnapshot>>>,
    equipment: HashMap<PeerId, HashMap<EquipmentCategory, SlotSnapshot>>,
    stats: HashMap<PeerId, CharacterStats>,
    stations: HashMap<StationId, Vec<Option<SlotSnapshot>>>,
    jobs: HashMap<JobId, JobView>,
    pickups: HashMap<PickupId, WorldPickup>,
    clock: NetworkClock,
    rejections: Vec<(u64, String)>,
}

impl ReplicaState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, delta: Delta) {
        match delta {
            Delta::InventorySlots { owner, slots } => {
                apply_slots(self.inventories.entry(owner).or_default(), slots);
            }
            Delta::Equipment {
                owner,
                category,
                item,
            } => {
                let worn = self.equipment.entry(owner).or_default();
                match item {
                    Some(item) => worn.insert(category, item),
                    None => worn.remove(&category),
                };
            }
            Delta::Stats { owner, stats } => {
                self.stats.insert(owner, stats);
            }
            Delta::StationBuffer { station, slots } => {
                apply_slots(self.stations.entry(station).or_default(), slots);
            }
            Delta::JobStarted {
                job,
                recipe,
                station,
                owner,
            } => {
                self.jobs.insert(
                    job,
                    JobView {
                        recipe,
                        station,
                        owner,
                    },
                );
            }
            Delta::JobFinished { job, .. } => {
                self.jobs.remove(&job);
            }
            Delta::PickupSpawned(pickup) => {
                self.pickups.insert(pickup.id, pickup);
            }
            Delta::PickupRemoved { pickup_id } => {
                self.pickups.remove(&pickup_id);
            }
            Delta::ClockSync { now } => self.clock.sync(now),
            Delta::PlayerLeft { peer } => {
                self.inventories.remove(&peer);
                self.equipment.remove(&peer);
                self.stats.remove(&peer);
                self.jobs.retain(|_, job| job.owner != peer);
            }
            Delta::IntentRejected { seq, reason } => {
                debug!("Intent {} rejected: {}", seq, reason);
                self.rejections.push((seq, reason));
            }
        }
    }

    /// Slots of a player's inventory; empty if never seen
    pub fn inventory(&self, peer: PeerId) -> &[Option<SlotSnapshot>] {
        self.inventories.get(&peer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count_of(&self, peer: PeerId, item: ItemDefId) -> u32 {
        self.inventory(peer)
            .iter()
            .flatten()
            .filter(|s| s.item == item)
            .map(|s| s.count)
            .sum()
    }

    pub fn equipped(&self, peer: PeerId, category: EquipmentCategory) -> Option<&SlotSnapshot> {
        self.equipment.get(&peer)?.get(&category)
    }

    pub fn stats(&self, peer: PeerId) -> Option<&CharacterStats> {
        self.stats.get(&peer)
    }

    pub fn station(&self, id: StationId) -> &[Option<SlotSnapshot>] {
        self.stations.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn jobs(&self) -> &HashMap<JobId, JobView> {
        &self.jobs
    }

    pub fn pickups(&self) -> impl Iterator<Item = &WorldPickup> {
        self.pickups.values()
    }

    pub fn clock(&self) -> &NetworkClock {
        &self.clock
    }

    /// Drain `(seq, reason)` pairs for intents the authority refused
    pub fn take_rejections(&mut self) -> Vec<(u64, String)> {
        std::mem::take(&mut self.rejections)
    }
}

/// A client's view of the session
pub struct ClientSession<T: Transport> {
    transport: T,
    gate: AuthorityGate,
    replica: ReplicaState,
    next_seq: u64,
}

impl<T: Transport> ClientSession<T> {
    pub fn new(transport: T, authority: PeerId) -> Self {
        let local = transport.local_peer();
        Self {
            transport,
            gate: AuthorityGate::new(local, authority),
            replica: ReplicaState::new(),
            next_seq: 1,
        }
    }

    pub fn local_peer(&self) -> PeerId {
        self.gate.local()
    }

    pub fn authority(&self) -> PeerId {
        self.gate.authority()
    }

    /// Send an intent to the authority. Returns its sequence number, which
    /// a rejection will quote.
    pub fn send(&mut self, intent: Intent) -> Result<u64, SessionError> {
        let seq = self.next_seq;
        self.next_seq += 1;
        let bytes = codec::encode(&Envelope::intent(self.gate.local(), seq, intent))?;
        self.transport.send(Target::Peer(self.gate.authority()), bytes)?;
        Ok(seq)
    }

    /// Apply everything received since the last tick. Returns the number of
    /// deltas applied.
    pub fn tick(&mut self, dt: f32) -> usize {
        self.replica.clock.advance(dt as f64);

        let mut applied = 0;
        for packet in self.transport.drain() {
            let envelope = match codec::decode(&packet.payload) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!("Dropping packet from {}: {}", packet.from, e);
                    continue;
                }
            };
            let checked = self
                .gate
                .check_sender(envelope.sender, packet.from)
                .and_then(|_| self.gate.check_delta(packet.from));
            if let Err(e) = checked {
                warn!("{}", e);
                continue;
            }

            match envelope.body {
                Message::Delta(delta) => {
                    self.replica.apply(delta);
                    applied += 1;
                }
                Message::Intent(intent) => {
                    warn!("Client ignoring intent {:?} from {}", intent, packet.from)
                }
            }
        }
        applied
    }

    pub fn replica(&self) -> &ReplicaState {
        &self.replica
    }

    pub fn replica_mut(&mut self) -> &mut ReplicaState {
        &mut self.replica
    }
}
