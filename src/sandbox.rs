//! Scripted host + client run over the loopback hub
//!
//! One client joins a host, gathers materials, crafts at a workbench,
//! trades an item through the world and equips what it made. The client
//! only ever sends intents; everything it knows comes back as deltas.

use anyhow::{Context, Result};
use glam::Vec3;
use outpost_core::{GameTime, ItemDefId, PeerId, RecipeId, StationId};
use outpost_game::{Catalog, EquipmentCategory, EventKind, GameEvent, SlotSnapshot, StationType};
use outpost_net::{ClientSession, HostSession, Intent, LoopbackEndpoint, LoopbackHub};
use tracing::{debug, info, warn};

use crate::settings::Settings;

const CATALOG: &str = include_str!("../assets/catalog.json");

const WOOD: ItemDefId = ItemDefId(1);
const STONE: ItemDefId = ItemDefId(2);
const PLANK: ItemDefId = ItemDefId(3);
const BERRY: ItemDefId = ItemDefId(10);
const HERB: ItemDefId = ItemDefId(11);
const STONE_AXE: ItemDefId = ItemDefId(20);
const CLUB: ItemDefId = ItemDefId(21);
const LEATHER_CAP: ItemDefId = ItemDefId(30);
const CAMPFIRE_KIT: ItemDefId = ItemDefId(40);

const PLANKS: RecipeId = RecipeId(1);
const CLUB_RECIPE: RecipeId = RecipeId(2);
const AXE_RECIPE: RecipeId = RecipeId(3);
const CAMPFIRE_RECIPE: RecipeId = RecipeId(4);

/// Parse the catalog bundled with the binary
pub fn load_catalog() -> Result<Catalog> {
    Catalog::from_json(CATALOG).context("Bundled catalog is invalid")
}

fn find_slot(slots: &[Option<SlotSnapshot>], item: ItemDefId) -> Option<usize> {
    slots
        .iter()
        .position(|slot| slot.is_some_and(|s| s.item == item))
}

pub struct Sandbox {
    host: HostSession<LoopbackEndpoint>,
    client: ClientSession<LoopbackEndpoint>,
    time: GameTime,
    bench: StationId,
    tick: u32,
    rejections: Vec<(u64, String)>,
}

impl Sandbox {
    pub fn new(settings: &Settings, catalog: Catalog) -> Result<Self> {
        let hub = LoopbackHub::new();
        let host_peer = PeerId::new();
        let mut host = HostSession::new(
            hub.connect(host_peer),
            catalog,
            settings.session.session_config(),
        );
        let client = ClientSession::new(hub.connect(PeerId::new()), host_peer);
        let me = client.local_peer();

        host.join(me);
        host.set_position(me, Vec3::new(4.0, 0.0, 2.0));
        let bench = host.place_station(StationType::Workbench, 1);
        host.set_near_stations(me, [bench]);
        host.events_mut()
            .subscribe_to(EventKind::CraftSucceeded, |event| {
                if let GameEvent::CraftSucceeded { recipe, results } = event {
                    info!("Crafted {} -> {} stack(s)", recipe, results.len());
                }
            });

        let time = GameTime::new(settings.session.time_config())
            .context("Invalid session tick rate")?;

        Ok(Self {
            host,
            client,
            time,
            bench,
            tick: 0,
            rejections: Vec::new(),
        })
    }

    /// Run `ticks` simulation steps at the configured tick rate
    pub fn run(&mut self, ticks: u32) -> Result<()> {
        let step = self.time.config.tick_seconds();
        info!("Running sandbox for {} ticks ({:.3}s each)", ticks, step);

        while self.tick < ticks {
            self.time.update(step);
            for _ in 0..self.time.due_ticks() {
                if self.tick >= ticks {
                    break;
                }
                self.script()?;
                self.host.tick(step)?;
                self.client.tick(step);
                for (seq, reason) in self.client.replica_mut().take_rejections() {
                    info!("Host rejected intent {}: {}", seq, reason);
                    self.rejections.push((seq, reason));
                }
                self.tick += 1;
            }
        }
        Ok(())
    }

    fn me(&self) -> PeerId {
        self.client.local_peer()
    }

    fn grant(&mut self, target: PeerId, item: ItemDefId, count: u32) -> Result<()> {
        self.host
            .submit(Intent::GrantItem {
                target,
                definition_id: item,
                count,
            })
            .with_context(|| format!("Granting {}x {}", count, item))
    }

    /// Send an intent for the first client slot holding `item`
    fn client_slot_intent(&mut self, item: ItemDefId, intent: impl FnOnce(usize) -> Intent) -> Result<()> {
        let me = self.me();
        match find_slot(self.client.replica().inventory(me), item) {
            Some(slot) => {
                self.client.send(intent(slot))?;
            }
            None => warn!("Tick {}: client has no {} to act on", self.tick, item),
        }
        Ok(())
    }

    fn craft(&mut self, recipe_id: RecipeId, station_id: Option<StationId>) -> Result<()> {
        self.client.send(Intent::RequestCraft {
            recipe_id,
            station_id,
        })?;
        Ok(())
    }

    fn script(&mut self) -> Result<()> {
        let me = self.me();
        let host_peer = self.host.local_peer();
        match self.tick {
            0 => {
                self.grant(me, WOOD, 10)?;
                self.grant(me, STONE, 6)?;
                self.grant(me, BERRY, 5)?;
                self.grant(me, HERB, 2)?;
                self.grant(host_peer, WOOD, 3)?;
                self.grant(host_peer, LEATHER_CAP, 1)?;
            }
            5 => {
                self.client_slot_intent(BERRY, |slot| Intent::UseItem { slot })?;
                let cap = self
                    .host
                    .player(host_peer)
                    .and_then(|p| find_slot(&p.inventory.snapshot(), LEATHER_CAP));
                if let Some(slot) = cap {
                    self.host.submit(Intent::EquipItem { slot })?;
                }
            }
            10 => {
                self.craft(PLANKS, None)?;
                self.craft(PLANKS, None)?;
            }
            12 => self.craft(CAMPFIRE_RECIPE, None)?,
            50 => self.craft(CLUB_RECIPE, Some(self.bench))?,
            60 => self.craft(AXE_RECIPE, Some(self.bench))?,
            70 => self.client_slot_intent(WOOD, |slot| Intent::DropItem {
                slot,
                count: Some(2),
                position: Vec3::new(4.0, 0.0, 3.0),
            })?,
            80 => {
                let dropped = self
                    .host
                    .pickups()
                    .find(|p| p.snapshot.item == WOOD)
                    .map(|p| (p.id, p.snapshot.count));
                if let Some((pickup_id, count)) = dropped {
                    self.host.submit(Intent::PickupItem {
                        pickup_id,
                        definition_id: WOOD,
                        count,
                    })?;
                }
            }
            90 => self.host.submit(Intent::RequestCraft {
                recipe_id: PLANKS,
                station_id: None,
            })?,
            120 => self.client_slot_intent(CLUB, |slot| Intent::EquipItem { slot })?,
            130 | 131 => self.client_slot_intent(HERB, |slot| Intent::UseItem { slot })?,
            160 => self.client_slot_intent(STONE_AXE, |slot| Intent::EquipItem { slot })?,
            200 => {
                self.host.unlock(me, "campfire");
                self.craft(CAMPFIRE_RECIPE, None)?;
            }
            260 => self.client_slot_intent(CAMPFIRE_KIT, |slot| Intent::UseItem { slot })?,
            _ => {}
        }
        Ok(())
    }

    /// Whether the client's replica of every player matches the host
    pub fn replica_in_sync(&self) -> bool {
        [self.host.local_peer(), self.me()].into_iter().all(|peer| {
            let Some(player) = self.host.player(peer) else {
                return false;
            };
            let replica = self.client.replica();
            let inventory = player.inventory.snapshot();
            let seen = replica.inventory(peer);
            let slots_match = (0..inventory.len().max(seen.len()))
                .all(|i| inventory.get(i).copied().flatten() == seen.get(i).copied().flatten());
            let equipment_match = player
                .equipment
                .snapshot()
                .into_iter()
                .all(|(category, item)| replica.equipped(peer, category).copied() == item);
            slots_match && equipment_match && replica.stats(peer) == Some(&player.stats)
        })
    }

    /// Log what the client ended up seeing
    pub fn report(&self) {
        let replica = self.client.replica();
        let items = &self.host.catalog().items;
        let name = |id: ItemDefId| {
            items
                .lookup(id)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        for (label, peer) in [("host", self.host.local_peer()), ("client", self.me())] {
            info!("{} player {}", label, peer);
            for (index, slot) in replica.inventory(peer).iter().enumerate() {
                if let Some(s) = slot {
                    info!("  [{:2}] {} x{}", index, name(s.item), s.count);
                }
            }
            for category in EquipmentCategory::all() {
                if let Some(s) = replica.equipped(peer, category) {
                    info!("  {:>4}: {} ({:.0})", category.name(), name(s.item), s.durability);
                }
            }
            if let Some(stats) = replica.stats(peer) {
                debug!("  stats: {:?}", stats);
                info!(
                    "  attack {:.1} defense {:.1} speed {:.2}",
                    stats.attack, stats.defense, stats.speed
                );
            }
        }

        info!(
            "{} pickup(s) in world, {} job(s) running, {} intent(s) rejected, clock {:.2}s",
            replica.pickups().count(),
            replica.jobs().len(),
            self.rejections.len(),
            replica.clock().now()
        );
        if self.replica_in_sync() {
            info!("Client replica matches host state");
        } else {
            warn!("Client replica diverged from host state");
        }
    }
}
