//! Authoritative session
//!
//! The host owns every container in the session. Each tick it drains
//! inbound intents in arrival order, checks them against the authority
//! gate, applies them, advances crafting, and broadcasts the resulting
//! deltas. Rejected intents are answered only to their sender.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use outpost_core::{NetworkClock, PeerId, PickupId, StationId};
use outpost_game::{
    Catalog, CraftError, CraftingEngine, EventBus, GameEvent, ItemInstance, JobOutcome, PlayerState,
    SlotSnapshot, Station, StationType, UseEffect, DEFAULT_INVENTORY_SLOTS,
    DEFAULT_STATION_BUFFER_SLOTS,
};
use tracing::{debug, info, warn};

use crate::authority::{AuthorityGate, StateScope};
use crate::codec;
use crate::error::{IntentError, SessionError};
use crate::message::{Delta, Envelope, Intent, Message, SlotUpdate, WorldPickup};
use crate::transport::{Packet, Target, Transport};

/// Session-wide tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub inventory_slots: usize,
    pub station_buffer_slots: usize,
    /// Seconds between clock sync broadcasts
    pub clock_sync_interval: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inventory_slots: DEFAULT_INVENTORY_SLOTS,
            station_buffer_slots: DEFAULT_STATION_BUFFER_SLOTS,
            clock_sync_interval: 5.0,
        }
    }
}

fn player_mut(
    players: &mut HashMap<PeerId, PlayerState>,
    peer: PeerId,
) -> Result<&mut PlayerState, IntentError> {
    players.get_mut(&peer).ok_or(IntentError::UnknownPlayer(peer))
}

fn slot_updates(slots: Vec<Option<SlotSnapshot>>) -> Vec<SlotUpdate> {
    slots
        .into_iter()
        .enumerate()
        .map(|(index, item)| SlotUpdate { index, item })
        .collect()
}

/// A pickup together with the full state of the item it holds. Only the
/// snapshot is replicated.
struct LooseItem {
    pickup: WorldPickup,
    item: ItemInstance,
}

/// The authoritative peer's view of the session
pub struct HostSession<T: Transport> {
    transport: T,
    gate: AuthorityGate,
    catalog: Catalog,
    config: SessionConfig,
    clock: NetworkClock,
    players: HashMap<PeerId, PlayerState>,
    positions: HashMap<PeerId, Vec3>,
    near: HashMap<PeerId, HashSet<StationId>>,
    stations: HashMap<StationId, Station>,
    pickups: HashMap<PickupId, LooseItem>,
    crafting: CraftingEngine,
    bus: EventBus,
    outbox: Vec<(Target, Delta)>,
    next_station: u32,
    next_pickup: u64,
    next_seq: u64,
    since_sync: f64,
}

impl<T: Transport> HostSession<T> {
    /// Start hosting. The local peer becomes the authority and a player.
    pub fn new(transport: T, catalog: Catalog, config: SessionConfig) -> Self {
        let local = transport.local_peer();
        let mut players = HashMap::new();
        players.insert(local, PlayerState::new(config.inventory_slots));

        info!("Hosting session as {}", local);
        Self {
            transport,
            gate: AuthorityGate::new(local, local),
            catalog,
            config,
            clock: NetworkClock::new(),
            players,
            positions: HashMap::new(),
            near: HashMap::new(),
            stations: HashMap::new(),
            pickups: HashMap::new(),
            crafting: CraftingEngine::new(),
            bus: EventBus::new(),
            outbox: Vec::new(),
            next_station: 1,
            next_pickup: 1,
            next_seq: 0,
            since_sync: 0.0,
        }
    }

    pub fn local_peer(&self) -> PeerId {
        self.gate.local()
    }

    /// Admit a peer and queue a full state snapshot for it
    pub fn join(&mut self, peer: PeerId) {
        if !self.gate.admit(peer) {
            debug!("Peer {} already joined", peer);
            return;
        }
        self.players
            .insert(peer, PlayerState::new(self.config.inventory_slots));
        info!("Peer {} joined", peer);
        self.queue_snapshot(peer);
    }

    /// Remove a peer, returning its player state. Its running crafts are
    /// cancelled and refunded into that state; whatever does not fit is
    /// dropped where the player last stood.
    pub fn leave(&mut self, peer: PeerId) -> Option<PlayerState> {
        if !self.gate.remove(peer) {
            return None;
        }
        let position = self.position_of(peer);
        self.near.remove(&peer);
        self.positions.remove(&peer);
        let mut player = self.players.remove(&peer).unwrap_or_default();

        for outcome in self.crafting.cancel_all_for(peer) {
            self.outbox.push((
                Target::Broadcast,
                Delta::JobFinished {
                    job: outcome.job,
                    cancelled: true,
                },
            ));
            let delivery = self.crafting.deliver(&outcome, &mut player.inventory, None);
            for item in delivery.overflow {
                self.spawn_pickup(item, position);
            }
        }
        for item in player.take_stranded() {
            self.spawn_pickup(item, position);
        }

        self.outbox
            .push((Target::Broadcast, Delta::PlayerLeft { peer }));
        info!("Peer {} left", peer);
        Some(player)
    }

    pub fn place_station(&mut self, kind: StationType, tech_level: u32) -> StationId {
        let id = StationId(self.next_station);
        self.next_station += 1;
        self.stations.insert(
            id,
            Station::new(id, kind, tech_level, self.config.station_buffer_slots),
        );
        info!("Placed {:?} {} (tech {})", kind, id, tech_level);
        id
    }

    /// Stations a player's proximity volume currently overlaps
    pub fn set_near_stations(&mut self, peer: PeerId, stations: impl IntoIterator<Item = StationId>) {
        self.near.insert(peer, stations.into_iter().collect());
    }

    pub fn set_position(&mut self, peer: PeerId, position: Vec3) {
        self.positions.insert(peer, position);
    }

    /// Grant a recipe unlock key to a player
    pub fn unlock(&mut self, peer: PeerId, key: &str) -> bool {
        let Some(player) = self.players.get_mut(&peer) else {
            warn!("Cannot unlock {:?} for unknown player {}", key, peer);
            return false;
        };
        let added = player.unlocks.unlock(key);
        if added {
            info!("{} unlocked {:?}", peer, key);
        }
        added
    }

    /// Put a loose item into the world. The item keeps its durability and
    /// cooldown until someone picks it up.
    pub fn spawn_pickup(&mut self, item: ItemInstance, position: Vec3) -> PickupId {
        let id = PickupId(self.next_pickup);
        self.next_pickup += 1;
        let snapshot = item.snapshot();
        let pickup = WorldPickup {
            id,
            snapshot,
            position,
        };
        self.outbox
            .push((Target::Broadcast, Delta::PickupSpawned(pickup.clone())));
        self.pickups.insert(id, LooseItem { pickup, item });
        debug!("Spawned {} ({}x {})", id, snapshot.count, snapshot.item);
        id
    }

    /// Apply an intent on behalf of the local player
    pub fn submit(&mut self, intent: Intent) -> Result<(), IntentError> {
        let local = self.gate.local();
        self.execute(local, &intent)
    }

    pub fn player(&self, peer: PeerId) -> Option<&PlayerState> {
        self.players.get(&peer)
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn pickups(&self) -> impl Iterator<Item = &WorldPickup> {
        self.pickups.values().map(|loose| &loose.pickup)
    }

    pub fn clock(&self) -> &NetworkClock {
        &self.clock
    }

    pub fn crafting(&self) -> &CraftingEngine {
        &self.crafting
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Change notifications for the host's presentation layer
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// One simulation step
    pub fn tick(&mut self, dt: f32) -> Result<(), SessionError> {
        for packet in self.transport.drain() {
            self.handle_packet(packet);
        }

        self.clock.advance(dt as f64);
        for outcome in self.crafting.tick(dt) {
            self.finish_job(outcome);
        }
        self.collect_changes();

        self.since_sync += dt as f64;
        if self.since_sync >= self.config.clock_sync_interval {
            self.since_sync = 0.0;
            self.outbox.push((
                Target::Broadcast,
                Delta::ClockSync {
                    now: self.clock.now(),
                },
            ));
        }

        self.flush()
    }

    fn handle_packet(&mut self, packet: Packet) {
        let envelope = match codec::decode(&packet.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Dropping packet from {}: {}", packet.from, e);
                return;
            }
        };
        if let Err(e) = self.gate.check_sender(envelope.sender, packet.from) {
            warn!("{}", e);
            return;
        }

        match envelope.body {
            Message::Intent(intent) => {
                if let Err(e) = self.execute(packet.from, &intent) {
                    warn!("Rejected {:?} from {}: {}", intent, packet.from, e);
                    self.outbox.push((
                        Target::Peer(packet.from),
                        Delta::IntentRejected {
                            seq: envelope.seq,
                            reason: e.to_string(),
                        },
                    ));
                }
            }
            Message::Delta(_) => {
                if let Err(e) = self.gate.check_delta(packet.from) {
                    warn!("{}", e);
                }
            }
        }
    }

    fn position_of(&self, peer: PeerId) -> Vec3 {
        self.positions.get(&peer).copied().unwrap_or(Vec3::ZERO)
    }

    fn scope_of(&self, sender: PeerId, intent: &Intent) -> StateScope {
        match intent {
            Intent::DropItem { .. } | Intent::PickupItem { .. } | Intent::TakeFromStation { .. } => {
                StateScope::Shared
            }
            Intent::CancelCraft { job_id } => self
                .crafting
                .job(*job_id)
                .map_or(StateScope::Player(sender), |job| StateScope::Player(job.owner)),
            Intent::GrantItem { .. } => StateScope::AuthorityOnly,
            _ => StateScope::Player(sender),
        }
    }

    fn execute(&mut self, sender: PeerId, intent: &Intent) -> Result<(), IntentError> {
        let scope = self.scope_of(sender, intent);
        self.gate.check_intent(sender, scope)?;

        match *intent {
            Intent::UseItem { slot } => {
                let player = player_mut(&mut self.players, sender)?;
                let effects = player
                    .use_slot(slot, &self.clock)
                    .ok_or(IntentError::Invalid("item cannot be used right now"))?;
                for effect in effects {
                    match effect {
                        UseEffect::Place { item, structure } => {
                            info!("{} placed structure {} using {}", sender, structure, item)
                        }
                    }
                }
            }
            Intent::SwapItem { from, to } => {
                let player = player_mut(&mut self.players, sender)?;
                if !player.inventory.swap_item(from, to) {
                    return Err(IntentError::Invalid("nothing to swap"));
                }
            }
            Intent::DropItem {
                slot,
                count,
                position,
            } => {
                if count == Some(0) {
                    return Err(IntentError::Invalid("cannot drop zero items"));
                }
                let player = player_mut(&mut self.players, sender)?;
                let item = player
                    .inventory
                    .take_out_item(slot, count)
                    .ok_or(IntentError::Invalid("slot is empty"))?;
                self.spawn_pickup(item, position);
            }
            Intent::PickupItem {
                pickup_id,
                definition_id,
                count,
            } => {
                let loose = self
                    .pickups
                    .get(&pickup_id)
                    .ok_or(IntentError::Invalid("pickup no longer exists"))?;
                if loose.item.id() != definition_id || loose.item.count != count {
                    return Err(IntentError::Invalid("pickup has changed"));
                }
                let item = loose.item.clone();

                let player = player_mut(&mut self.players, sender)?;
                if player.inventory.try_add_instance(item).is_err() {
                    return Err(IntentError::Invalid("inventory is full"));
                }
                self.pickups.remove(&pickup_id);
                self.outbox
                    .push((Target::Broadcast, Delta::PickupRemoved { pickup_id }));
            }
            Intent::EquipItem { slot } => {
                player_mut(&mut self.players, sender)?.equip_from_slot(slot)?;
            }
            Intent::UnequipItem { category } => {
                player_mut(&mut self.players, sender)?.unequip_to_inventory(category)?;
            }
            Intent::RequestCraft {
                recipe_id,
                station_id,
            } => {
                let recipe = self
                    .catalog
                    .recipes
                    .get(recipe_id)
                    .ok_or(CraftError::UnknownRecipe(recipe_id))?;
                let station = match station_id {
                    Some(id) => Some(self.stations.get(&id).ok_or(CraftError::UnknownStation(id))?),
                    None => None,
                };
                let nobody_near = HashSet::new();
                let near = self.near.get(&sender).unwrap_or(&nobody_near);
                let player = player_mut(&mut self.players, sender)?;

                let job = self
                    .crafting
                    .request_craft(&recipe, station, near, sender, player)?;
                let station = self.crafting.job(job).and_then(|j| j.station);
                self.outbox.push((
                    Target::Broadcast,
                    Delta::JobStarted {
                        job,
                        recipe: recipe_id,
                        station,
                        owner: sender,
                    },
                ));
            }
            Intent::CancelCraft { job_id } => {
                if !self.crafting.cancel(job_id) {
                    return Err(IntentError::Invalid("job is not running"));
                }
            }
            Intent::TakeFromStation { station_id, slot } => {
                let is_near = self
                    .near
                    .get(&sender)
                    .is_some_and(|near| near.contains(&station_id));
                let station = self
                    .stations
                    .get_mut(&station_id)
                    .ok_or(CraftError::UnknownStation(station_id))?;
                if !is_near {
                    return Err(CraftError::StationNotNear(station_id).into());
                }

                let player = player_mut(&mut self.players, sender)?;
                let item = station
                    .buffer
                    .get(slot)
                    .ok_or(IntentError::Invalid("station slot is empty"))?;
                if !player.inventory.can_accept_instance(item) {
                    return Err(IntentError::Invalid("inventory is full"));
                }
                let item = station
                    .buffer
                    .take_out_item(slot, None)
                    .ok_or(IntentError::Invalid("station slot is empty"))?;
                if let Err(item) = player.inventory.try_add_instance(item) {
                    if let Err(item) = station.buffer.try_add_instance(item) {
                        warn!(
                            "{} could not take back {}x {}, dropping it",
                            station_id,
                            item.count,
                            item.definition().name
                        );
                        let position = self.position_of(sender);
                        self.spawn_pickup(item, position);
                    }
                    return Err(IntentError::Invalid("inventory is full"));
                }
            }
            Intent::GrantItem {
                target,
                definition_id,
                count,
            } => {
                let definition = self
                    .catalog
                    .items
                    .lookup(definition_id)
                    .ok_or(IntentError::Invalid("unknown item definition"))?;
                let player = player_mut(&mut self.players, target)?;
                let outcome = player.inventory.try_add_item(&definition, count);
                if !outcome.accepted {
                    return Err(IntentError::Invalid("inventory is full"));
                }
                if outcome.remainder > 0 {
                    let position = self.position_of(target);
                    self.spawn_pickup(ItemInstance::new(definition, outcome.remainder), position);
                }
            }
        }
        Ok(())
    }

    fn finish_job(&mut self, outcome: JobOutcome) {
        self.outbox.push((
            Target::Broadcast,
            Delta::JobFinished {
                job: outcome.job,
                cancelled: outcome.cancelled,
            },
        ));

        let Some(player) = self.players.get_mut(&outcome.owner) else {
            warn!("{} finished but {} has left", outcome.job, outcome.owner);
            return;
        };
        let buffer = outcome
            .station
            .and_then(|id| self.stations.get_mut(&id))
            .map(|station| &mut station.buffer);
        let delivery = self.crafting.deliver(&outcome, &mut player.inventory, buffer);

        // Craft notifications are for the local presentation only
        let events = self.crafting.take_events();
        if outcome.owner == self.gate.local() {
            self.bus.publish_all(events);
        }

        let position = self.position_of(outcome.owner);
        for item in delivery.overflow {
            self.spawn_pickup(item, position);
        }
    }

    /// Turn queued container events into deltas. Only the local player's
    /// events reach the bus.
    fn collect_changes(&mut self) {
        let local = self.gate.local();
        let mut owners: Vec<PeerId> = self.players.keys().copied().collect();
        owners.sort();

        for &owner in &owners {
            let stranded = match self.players.get_mut(&owner) {
                Some(player) => player.take_stranded(),
                None => continue,
            };
            let position = self.position_of(owner);
            for item in stranded {
                self.spawn_pickup(item, position);
            }
        }

        for owner in owners {
            let Some(player) = self.players.get_mut(&owner) else {
                continue;
            };
            let events = player.take_events();
            if events.is_empty() {
                continue;
            }

            let mut slots = Vec::new();
            for event in &events {
                match event {
                    GameEvent::InventorySlotChanged { index, item } => slots.push(SlotUpdate {
                        index: *index,
                        item: *item,
                    }),
                    GameEvent::EquipmentChanged { category, item } => self.outbox.push((
                        Target::Broadcast,
                        Delta::Equipment {
                            owner,
                            category: *category,
                            item: *item,
                        },
                    )),
                    _ => {}
                }
            }
            if !slots.is_empty() {
                self.outbox
                    .push((Target::Broadcast, Delta::InventorySlots { owner, slots }));
            }
            self.outbox.push((
                Target::Broadcast,
                Delta::Stats {
                    owner,
                    stats: player.stats.clone(),
                },
            ));
            if owner == local {
                self.bus.publish_all(events);
            }
        }

        let mut station_ids: Vec<StationId> = self.stations.keys().copied().collect();
        station_ids.sort();
        for id in station_ids {
            let Some(station) = self.stations.get_mut(&id) else {
                continue;
            };
            let slots: Vec<SlotUpdate> = station
                .buffer
                .take_events()
                .into_iter()
                .filter_map(|event| match event {
                    GameEvent::InventorySlotChanged { index, item } => Some(SlotUpdate { index, item }),
                    _ => None,
                })
                .collect();
            if !slots.is_empty() {
                self.outbox
                    .push((Target::Broadcast, Delta::StationBuffer { station: id, slots }));
            }
        }
    }

    /// Queue everything a late joiner needs to build its replica
    fn queue_snapshot(&mut self, peer: PeerId) {
        let target = Target::Peer(peer);
        let mut owners: Vec<PeerId> = self.players.keys().copied().collect();
        owners.sort();

        for owner in owners {
            let Some(player) = self.players.get(&owner) else {
                continue;
            };
            self.outbox.push((
                target,
                Delta::InventorySlots {
                    owner,
                    slots: slot_updates(player.inventory.snapshot()),
                },
            ));
            for (category, item) in player.equipment.snapshot() {
                self.outbox.push((
                    target,
                    Delta::Equipment {
                        owner,
                        category,
                        item,
                    },
                ));
            }
            self.outbox.push((
                target,
                Delta::Stats {
                    owner,
                    stats: player.stats.clone(),
                },
            ));
        }

        for station in self.stations.values() {
            self.outbox.push((
                target,
                Delta::StationBuffer {
                    station: station.id,
                    slots: slot_updates(station.buffer.snapshot()),
                },
            ));
        }
        for loose in self.pickups.values() {
            self.outbox
                .push((target, Delta::PickupSpawned(loose.pickup.clone())));
        }
        self.outbox.push((
            target,
            Delta::ClockSync {
                now: self.clock.now(),
            },
        ));
    }

    fn flush(&mut self) -> Result<(), SessionError> {
        let local = self.gate.local();
        for (target, delta) in std::mem::take(&mut self.outbox) {
            let seq = self.next_seq;
            self.next_seq += 1;
            let bytes = codec::encode(&Envelope::delta(local, seq, delta))?;
            if let Err(e) = self.transport.send(target, bytes) {
                warn!("Could not deliver delta {}: {}", seq, e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{LoopbackEndpoint, LoopbackHub};
    use outpost_core::{ItemDefId, JobId, RecipeId};
    use outpost_game::EventKind;

    const CATALOG: &str = r#"{
        "items": [
            {"id": 1, "name": "Wood", "category": "Material",
             "capabilities": [{"kind": "Stackable", "max_stack": 20}]},
            {"id": 2, "name": "Berry", "category": "Food",
             "capabilities": [
                {"kind": "Stackable", "max_stack": 10},
                {"kind": "Edible", "order": 1,
                 "modifiers": [{"stat": "Hunger", "value": 10.0}]},
                {"kind": "Consumable", "order": 2, "consume_amount": 1}
             ]},
            {"id": 3, "name": "Plank", "category": "Material",
             "capabilities": [{"kind": "Stackable", "max_stack": 20}]},
            {"id": 4, "name": "Herb", "category": "Food",
             "capabilities": [
                {"kind": "Stackable", "max_stack": 10},
                {"kind": "CoolTime", "cool_time_seconds": 5.0},
                {"kind": "Edible", "order": 1,
                 "modifiers": [{"stat": "Health", "value": 5.0}]},
                {"kind": "Consumable", "order": 2, "consume_amount": 1}
             ]}
        ],
        "recipes": [
            {"id": 1, "name": "Planks", "station": "Workbench", "time_cost": 1.0,
             "ingredients": [{"item": 1, "count": 2}],
             "results": [{"item": 3, "count": 4}]},
            {"id": 2, "name": "Fine Planks", "station": "Hand", "unlock": "saw",
             "time_cost": 1.0,
             "ingredients": [{"item": 1, "count": 1}],
             "results": [{"item": 3, "count": 2}]}
        ]
    }"#;

    fn host_with_client() -> (HostSession<LoopbackEndpoint>, LoopbackEndpoint, LoopbackHub) {
        let hub = LoopbackHub::new();
        let host_peer = PeerId::new();
        let client_peer = PeerId::new();
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let mut host = HostSession::new(hub.connect(host_peer), catalog, SessionConfig::default());
        let client = hub.connect(client_peer);
        host.join(client_peer);
        (host, client, hub)
    }

    fn send(client: &LoopbackEndpoint, host: PeerId, seq: u64, intent: Intent) {
        let bytes = codec::encode(&Envelope::intent(client.local_peer(), seq, intent)).unwrap();
        client.send(Target::Peer(host), bytes).unwrap();
    }

    fn deltas(client: &mut LoopbackEndpoint) -> Vec<Delta> {
        client
            .drain()
            .into_iter()
            .filter_map(|p| match codec::decode(&p.payload).unwrap().body {
                Message::Delta(d) => Some(d),
                Message::Intent(_) => None,
            })
            .collect()
    }

    fn grant(host: &mut HostSession<LoopbackEndpoint>, target: PeerId, id: u32, count: u32) {
        host.submit(Intent::GrantItem {
            target,
            definition_id: ItemDefId(id),
            count,
        })
        .unwrap();
    }

    #[test]
    fn test_join_sends_snapshot() {
        let (mut host, mut client, _hub) = host_with_client();
        host.tick(0.0).unwrap();
        let received = deltas(&mut client);
        assert!(received
            .iter()
            .any(|d| matches!(d, Delta::InventorySlots { owner, .. } if *owner == client.local_peer())));
        assert!(received.iter().any(|d| matches!(d, Delta::ClockSync { .. })));
    }

    #[test]
    fn test_remote_use_is_applied_and_broadcast() {
        let (mut host, mut client, _hub) = host_with_client();
        let me = client.local_peer();
        grant(&mut host, me, 2, 3);
        host.tick(0.0).unwrap();
        deltas(&mut client);

        send(&client, host.local_peer(), 1, Intent::UseItem { slot: 0 });
        host.tick(0.1).unwrap();

        assert_eq!(host.player(me).unwrap().inventory.count_of(ItemDefId(2)), 2);
        let received = deltas(&mut client);
        assert!(received.iter().any(|d| matches!(
            d,
            Delta::InventorySlots { owner, slots } if *owner == me && slots[0].item.unwrap().count == 2
        )));
    }

    #[test]
    fn test_client_cannot_grant() {
        let (mut host, mut client, _hub) = host_with_client();
        let me = client.local_peer();
        host.tick(0.0).unwrap();
        deltas(&mut client);

        send(
            &client,
            host.local_peer(),
            4,
            Intent::GrantItem {
                target: me,
                definition_id: ItemDefId(1),
                count: 99,
            },
        );
        host.tick(0.1).unwrap();

        assert_eq!(host.player(me).unwrap().inventory.count_of(ItemDefId(1)), 0);
        let received = deltas(&mut client);
        assert!(received
            .iter()
            .any(|d| matches!(d, Delta::IntentRejected { seq: 4, .. })));
    }

    #[test]
    fn test_spoofed_sender_ignored() {
        let (mut host, client, _hub) = host_with_client();
        let host_peer = host.local_peer();
        let bytes = codec::encode(&Envelope::intent(
            host_peer,
            1,
            Intent::GrantItem {
                target: client.local_peer(),
                definition_id: ItemDefId(1),
                count: 5,
            },
        ))
        .unwrap();
        client.send(Target::Peer(host_peer), bytes).unwrap();
        host.tick(0.1).unwrap();
        assert_eq!(
            host.player(client.local_peer())
                .unwrap()
                .inventory
                .count_of(ItemDefId(1)),
            0
        );
    }

    #[test]
    fn test_craft_at_station() {
        let (mut host, mut client, _hub) = host_with_client();
        let me = client.local_peer();
        let bench = host.place_station(StationType::Workbench, 0);
        host.set_near_stations(me, [bench]);
        grant(&mut host, me, 1, 5);
        host.tick(0.0).unwrap();
        deltas(&mut client);

        send(
            &client,
            host.local_peer(),
            2,
            Intent::RequestCraft {
                recipe_id: RecipeId(1),
                station_id: Some(bench),
            },
        );
        host.tick(0.5).unwrap();
        assert_eq!(host.player(me).unwrap().inventory.count_of(ItemDefId(1)), 3);
        assert_eq!(host.crafting().jobs().len(), 1);

        host.tick(0.5).unwrap();
        assert_eq!(host.player(me).unwrap().inventory.count_of(ItemDefId(3)), 4);

        let received = deltas(&mut client);
        assert!(received
            .iter()
            .any(|d| matches!(d, Delta::JobStarted { owner, .. } if *owner == me)));
        assert!(received
            .iter()
            .any(|d| matches!(d, Delta::JobFinished { cancelled: false, .. })));
    }

    #[test]
    fn test_only_owner_cancels() {
        let (mut host, mut client, _hub) = host_with_client();
        let host_peer = host.local_peer();
        let bench = host.place_station(StationType::Workbench, 0);
        host.set_near_stations(host_peer, [bench]);
        grant(&mut host, host_peer, 1, 2);
        host.submit(Intent::RequestCraft {
            recipe_id: RecipeId(1),
            station_id: Some(bench),
        })
        .unwrap();
        host.tick(0.0).unwrap();
        deltas(&mut client);

        send(&client, host_peer, 9, Intent::CancelCraft { job_id: JobId(0) });
        host.tick(0.1).unwrap();
        assert!(!host.crafting().job(JobId(0)).unwrap().is_cancelled());
        assert!(deltas(&mut client)
            .iter()
            .any(|d| matches!(d, Delta::IntentRejected { seq: 9, .. })));

        host.submit(Intent::CancelCraft { job_id: JobId(0) }).unwrap();
        host.tick(0.1).unwrap();
        assert_eq!(
            host.player(host_peer).unwrap().inventory.count_of(ItemDefId(1)),
            2
        );
    }

    #[test]
    fn test_unlock_opens_recipe() {
        let (mut host, _client, _hub) = host_with_client();
        let host_peer = host.local_peer();
        grant(&mut host, host_peer, 1, 2);
        let craft = Intent::RequestCraft {
            recipe_id: RecipeId(2),
            station_id: None,
        };

        assert!(matches!(
            host.submit(craft.clone()),
            Err(IntentError::Craft(CraftError::Locked(_)))
        ));
        assert!(host.unlock(host_peer, "saw"));
        assert!(!host.unlock(host_peer, "saw"));
        assert!(!host.unlock(PeerId::new(), "saw"));
        host.submit(craft).unwrap();
        assert_eq!(host.crafting().jobs().len(), 1);
    }

    #[test]
    fn test_drop_and_pickup() {
        let (mut host, mut client, _hub) = host_with_client();
        let host_peer = host.local_peer();
        let me = client.local_peer();
        grant(&mut host, host_peer, 1, 6);
        host.submit(Intent::DropItem {
            slot: 0,
            count: Some(4),
            position: Vec3::new(2.0, 0.0, 2.0),
        })
        .unwrap();
        host.tick(0.0).unwrap();

        let pickup = host.pickups().next().unwrap().clone();
        assert_eq!(pickup.snapshot.count, 4);
        assert!(deltas(&mut client)
            .iter()
            .any(|d| matches!(d, Delta::PickupSpawned(p) if p.id == pickup.id)));

        send(
            &client,
            host_peer,
            3,
            Intent::PickupItem {
                pickup_id: pickup.id,
                definition_id: ItemDefId(1),
                count: 4,
            },
        );
        host.tick(0.1).unwrap();
        assert_eq!(host.player(me).unwrap().inventory.count_of(ItemDefId(1)), 4);
        assert_eq!(host.pickups().count(), 0);
        assert!(deltas(&mut client)
            .iter()
            .any(|d| matches!(d, Delta::PickupRemoved { pickup_id } if *pickup_id == pickup.id)));
    }

    #[test]
    fn test_clock_sync_interval() {
        let (mut host, mut client, _hub) = host_with_client();
        host.tick(0.0).unwrap();
        deltas(&mut client);

        host.tick(2.0).unwrap();
        assert!(!deltas(&mut client)
            .iter()
            .any(|d| matches!(d, Delta::ClockSync { .. })));
        host.tick(3.0).unwrap();
        assert!(deltas(&mut client)
            .iter()
            .any(|d| matches!(d, Delta::ClockSync { .. })));
    }

    #[test]
    fn test_cooldown_survives_drop_and_pickup() {
        let (mut host, _client, _hub) = host_with_client();
        let host_peer = host.local_peer();
        grant(&mut host, host_peer, 4, 2);
        host.tick(1.0).unwrap();

        host.submit(Intent::UseItem { slot: 0 }).unwrap();
        host.submit(Intent::DropItem {
            slot: 0,
            count: None,
            position: Vec3::ZERO,
        })
        .unwrap();
        let pickup_id = host.pickups().next().unwrap().id;
        host.submit(Intent::PickupItem {
            pickup_id,
            definition_id: ItemDefId(4),
            count: 1,
        })
        .unwrap();

        assert!(matches!(
            host.submit(Intent::UseItem { slot: 0 }),
            Err(IntentError::Invalid(_))
        ));
        assert_eq!(
            host.player(host_peer).unwrap().inventory.count_of(ItemDefId(4)),
            1
        );
    }

    #[test]
    fn test_drop_zero_is_rejected() {
        let (mut host, _client, _hub) = host_with_client();
        let host_peer = host.local_peer();
        grant(&mut host, host_peer, 1, 3);

        let err = host
            .submit(Intent::DropItem {
                slot: 0,
                count: Some(0),
                position: Vec3::ZERO,
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot drop zero items");
        assert_eq!(
            host.player(host_peer).unwrap().inventory.count_of(ItemDefId(1)),
            3
        );
        assert_eq!(host.pickups().count(), 0);
    }

    #[test]
    fn test_bus_only_sees_local_player() {
        use parking_lot::Mutex;
        use std::sync::Arc;

        let (mut host, client, _hub) = host_with_client();
        let host_peer = host.local_peer();
        let me = client.local_peer();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        host.events_mut()
            .subscribe_to(EventKind::InventorySlotChanged, move |event| {
                sink.lock().push(event.clone())
            });

        grant(&mut host, me, 2, 3);
        host.tick(0.0).unwrap();
        send(&client, host_peer, 1, Intent::UseItem { slot: 0 });
        host.tick(0.1).unwrap();
        assert_eq!(host.player(me).unwrap().inventory.count_of(ItemDefId(2)), 2);
        assert!(seen.lock().is_empty());

        grant(&mut host, host_peer, 2, 1);
        host.tick(0.1).unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_leave_refunds_running_craft() {
        let (mut host, mut client, _hub) = host_with_client();
        let me = client.local_peer();
        let bench = host.place_station(StationType::Workbench, 0);
        host.set_near_stations(me, [bench]);
        grant(&mut host, me, 1, 2);
        host.tick(0.0).unwrap();
        send(
            &client,
            host.local_peer(),
            1,
            Intent::RequestCraft {
                recipe_id: RecipeId(1),
                station_id: Some(bench),
            },
        );
        host.tick(0.1).unwrap();
        assert_eq!(host.crafting().jobs().len(), 1);
        deltas(&mut client);

        let state = host.leave(me).unwrap();
        assert_eq!(state.inventory.count_of(ItemDefId(1)), 2);
        assert!(host.crafting().jobs().is_empty());
        assert!(host.player(me).is_none());
        assert!(host.leave(me).is_none());

        host.tick(1.0).unwrap();
        let received = deltas(&mut client);
        assert!(received
            .iter()
            .any(|d| matches!(d, Delta::JobFinished { cancelled: true, .. })));
        assert!(received
            .iter()
            .any(|d| matches!(d, Delta::PlayerLeft { peer } if *peer == me)));
    }
}
