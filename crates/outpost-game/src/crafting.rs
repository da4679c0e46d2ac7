//! Crafting: recipe catalog, stations and timed jobs
//!
//! Recipes are loaded from JSON and resolved against the item registry, so a
//! recipe never refers to an unknown item at runtime. A request is validated
//! completely before any ingredient leaves the inventory.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use outpost_core::{ItemDefId, JobId, PeerId, RecipeId, StationId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CatalogError, CraftError};
use crate::events::GameEvent;
use crate::inventory::Inventory;
use crate::item::{ItemDefinition, ItemInstance};
use crate::player::PlayerState;
use crate::registry::ItemRegistry;

/// Default number of slots in a station's shared buffer
pub const DEFAULT_STATION_BUFFER_SLOTS: usize = 10;

/// Kind of crafting station a recipe needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationType {
    /// Crafted in hand, no station needed
    Hand,
    Workbench,
    Furnace,
    Anvil,
}

/// `(item, count)` pair as written in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStackSpec {
    pub item: ItemDefId,
    pub count: u32,
}

/// Recipe as written in the catalog, before id resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSpec {
    pub id: RecipeId,
    pub name: String,
    pub station: StationType,
    #[serde(default)]
    pub tech_level: u32,
    /// Unlock key the player must hold
    #[serde(default)]
    pub unlock: Option<String>,
    /// Crafting time in seconds
    pub time_cost: f32,
    pub ingredients: Vec<RecipeStackSpec>,
    pub results: Vec<RecipeStackSpec>,
}

/// Resolved ingredient or result
#[derive(Debug, Clone)]
pub struct RecipeStack {
    pub definition: Arc<ItemDefinition>,
    pub count: u32,
}

/// Recipe with every item id resolved against the registry
#[derive(Debug, Clone)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub station: StationType,
    pub tech_level: u32,
    pub unlock: Option<String>,
    pub time_cost: f32,
    pub ingredients: Vec<RecipeStack>,
    pub results: Vec<RecipeStack>,
}

impl Recipe {
    fn resolve(spec: RecipeSpec, items: &ItemRegistry) -> Result<Self, CatalogError> {
        if spec.results.is_empty() {
            return Err(CatalogError::InvalidRecipe {
                recipe: spec.id,
                reason: "recipe has no results",
            });
        }
        if !(spec.time_cost >= 0.0) || !spec.time_cost.is_finite() {
            return Err(CatalogError::InvalidRecipe {
                recipe: spec.id,
                reason: "time_cost must be a finite, non-negative number",
            });
        }

        let resolve_stacks = |stacks: Vec<RecipeStackSpec>| -> Result<Vec<RecipeStack>, CatalogError> {
            stacks
                .into_iter()
                .map(|s| {
                    if s.count == 0 {
                        return Err(CatalogError::InvalidRecipe {
                            recipe: spec.id,
                            reason: "stack counts must be positive",
                        });
                    }
                    if !items.contains(s.item) {
                        return Err(CatalogError::UnknownItem {
                            recipe: spec.id,
                            item: s.item,
                        });
                    }
                    let definition = items.lookup(s.item).ok_or(CatalogError::UnknownItem {
                        recipe: spec.id,
                        item: s.item,
                    })?;
                    Ok(RecipeStack {
                        definition,
                        count: s.count,
                    })
                })
                .collect()
        };

        let ingredients = resolve_stacks(spec.ingredients)?;
        let results = resolve_stacks(spec.results)?;

        let mut totals: HashMap<ItemDefId, u32> = HashMap::new();
        for stack in &ingredients {
            let total = totals.entry(stack.definition.id).or_insert(0);
            *total = total
                .checked_add(stack.count)
                .ok_or(CatalogError::InvalidRecipe {
                    recipe: spec.id,
                    reason: "ingredient counts overflow",
                })?;
        }

        Ok(Self {
            id: spec.id,
            name: spec.name,
            station: spec.station,
            tech_level: spec.tech_level,
            unlock: spec.unlock,
            time_cost: spec.time_cost,
            ingredients,
            results,
        })
    }

    /// Ingredient totals per item id
    pub fn requirements(&self) -> Vec<(ItemDefId, u32)> {
        let mut totals: Vec<(ItemDefId, u32)> = Vec::new();
        for stack in &self.ingredients {
            let id = stack.definition.id;
            match totals.iter_mut().find(|(i, _)| *i == id) {
                Some((_, count)) => *count = count.saturating_add(stack.count),
                None => totals.push((id, stack.count)),
            }
        }
        totals
    }
}

/// All known recipes, read-only after load
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: HashMap<RecipeId, Arc<Recipe>>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve catalog recipes. Any bad entry fails the whole load.
    pub fn from_specs(specs: Vec<RecipeSpec>, items: &ItemRegistry) -> Result<Self, CatalogError> {
        let mut book = Self::new();
        for spec in specs {
            if book.recipes.contains_key(&spec.id) {
                return Err(CatalogError::DuplicateRecipe(spec.id));
            }
            let recipe = Recipe::resolve(spec, items)?;
            book.recipes.insert(recipe.id, Arc::new(recipe));
        }
        Ok(book)
    }

    /// Parse a JSON array of recipes
    pub fn from_json(content: &str, items: &ItemRegistry) -> Result<Self, CatalogError> {
        let specs: Vec<RecipeSpec> = serde_json::from_str(content)?;
        Self::from_specs(specs, items)
    }

    pub fn get(&self, id: RecipeId) -> Option<Arc<Recipe>> {
        self.recipes.get(&id).cloned()
    }

    /// Recipes ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Recipe>> {
        let mut recipes: Vec<&Arc<Recipe>> = self.recipes.values().collect();
        recipes.sort_by_key(|r| r.id);
        recipes.into_iter()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

/// A placed crafting station with its shared output buffer
#[derive(Debug, Clone)]
pub struct Station {
    pub id: StationId,
    pub kind: StationType,
    pub tech_level: u32,
    /// Results that did not fit the crafter's inventory
    pub buffer: Inventory,
}

impl Station {
    pub fn new(id: StationId, kind: StationType, tech_level: u32, buffer_slots: usize) -> Self {
        Self {
            id,
            kind,
            tech_level,
            buffer: Inventory::new(buffer_slots),
        }
    }
}

/// A running craft
#[derive(Debug, Clone)]
pub struct CraftingJob {
    pub id: JobId,
    pub recipe: Arc<Recipe>,
    pub station: Option<StationId>,
    pub owner: PeerId,
    /// Seconds left
    pub remaining: f32,
    cancelled: bool,
}

impl CraftingJob {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// A job that left the engine this tick
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job: JobId,
    pub recipe: Arc<Recipe>,
    pub owner: PeerId,
    pub station: Option<StationId>,
    pub cancelled: bool,
}

impl JobOutcome {
    /// What goes back to the owner: results, or the ingredients on cancel
    pub fn items(&self) -> &[RecipeStack] {
        if self.cancelled {
            &self.recipe.ingredients
        } else {
            &self.recipe.results
        }
    }
}

/// Where the items of an outcome ended up
#[derive(Debug, Clone, Default)]
pub struct Delivery {
    pub to_inventory: u32,
    pub to_station: u32,
    /// Left over for the caller to drop into the world
    pub overflow: Vec<ItemInstance>,
}

/// Runs crafting jobs for one session
#[derive(Debug, Default)]
pub struct CraftingEngine {
    jobs: Vec<CraftingJob>,
    next_job: u64,
    events: Vec<GameEvent>,
}

impl CraftingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a request and start a job. Ingredients are removed only
    /// once every check has passed.
    pub fn request_craft(
        &mut self,
        recipe: &Arc<Recipe>,
        station: Option<&Station>,
        near: &HashSet<StationId>,
        owner: PeerId,
        player: &mut PlayerState,
    ) -> Result<JobId, CraftError> {
        let station_id = if recipe.station == StationType::Hand {
            if recipe.tech_level > 0 {
                return Err(CraftError::TechTooLow {
                    have: 0,
                    need: recipe.tech_level,
                });
            }
            None
        } else {
            let station = station.ok_or(CraftError::StationRequired)?;
            if station.kind != recipe.station {
                return Err(CraftError::WrongStation(station.id));
            }
            if !near.contains(&station.id) {
                return Err(CraftError::StationNotNear(station.id));
            }
            if station.tech_level < recipe.tech_level {
                return Err(CraftError::TechTooLow {
                    have: station.tech_level,
                    need: recipe.tech_level,
                });
            }
            Some(station.id)
        };

        if !player.unlocks.is_unlocked(recipe.unlock.as_deref()) {
            return Err(CraftError::Locked(recipe.unlock.clone().unwrap_or_default()));
        }

        let requirements = recipe.requirements();
        for &(item, need) in &requirements {
            let have = player.inventory.count_of(item);
            if have < need {
                return Err(CraftError::MissingIngredient { item, need, have });
            }
        }
        for &(item, need) in &requirements {
            player.inventory.remove_by_definition(item, need);
        }

        let id = JobId(self.next_job);
        self.next_job += 1;
        self.jobs.push(CraftingJob {
            id,
            recipe: Arc::clone(recipe),
            station: station_id,
            owner,
            remaining: recipe.time_cost,
            cancelled: false,
        });
        debug!("Started {} crafting {} for {}", id, recipe.name, owner);
        Ok(id)
    }

    /// Flag a job for cancellation at the next tick. False if unknown or
    /// already cancelled.
    pub fn cancel(&mut self, job: JobId) -> bool {
        match self.jobs.iter_mut().find(|j| j.id == job && !j.cancelled) {
            Some(j) => {
                j.cancelled = true;
                true
            }
            None => false,
        }
    }

    /// Remove every job `owner` started and return them as cancelled
    /// outcomes right away, without waiting for a tick
    pub fn cancel_all_for(&mut self, owner: PeerId) -> Vec<JobOutcome> {
        let (theirs, rest): (Vec<_>, Vec<_>) =
            self.jobs.drain(..).partition(|job| job.owner == owner);
        self.jobs = rest;

        theirs
            .into_iter()
            .map(|job| JobOutcome {
                job: job.id,
                recipe: job.recipe,
                owner: job.owner,
                station: job.station,
                cancelled: true,
            })
            .collect()
    }

    /// Advance timers. Cancellation wins over completion in the same tick.
    pub fn tick(&mut self, dt: f32) -> Vec<JobOutcome> {
        let mut outcomes = Vec::new();
        let mut pending = Vec::with_capacity(self.jobs.len());

        for mut job in self.jobs.drain(..) {
            if !job.cancelled {
                job.remaining -= dt;
                if job.remaining > 0.0 {
                    pending.push(job);
                    continue;
                }
            }
            outcomes.push(JobOutcome {
                job: job.id,
                recipe: job.recipe,
                owner: job.owner,
                station: job.station,
                cancelled: job.cancelled,
            });
        }

        self.jobs = pending;
        outcomes
    }

    /// Hand an outcome's items to the owner: inventory first, then the
    /// station buffer, anything else is reported as overflow.
    pub fn deliver(
        &mut self,
        outcome: &JobOutcome,
        inventory: &mut Inventory,
        mut station_buffer: Option<&mut Inventory>,
    ) -> Delivery {
        let mut delivery = Delivery::default();

        for stack in outcome.items() {
            let added = inventory.try_add_item(&stack.definition, stack.count);
            delivery.to_inventory += stack.count - added.remainder;
            let mut rest = added.remainder;

            if rest > 0 {
                if let Some(buffer) = station_buffer.as_deref_mut() {
                    let buffered = buffer.try_add_item(&stack.definition, rest);
                    delivery.to_station += rest - buffered.remainder;
                    rest = buffered.remainder;
                }
            }

            if rest > 0 {
                delivery
                    .overflow
                    .push(ItemInstance::new(Arc::clone(&stack.definition), rest));
            }
        }

        if outcome.cancelled {
            info!("{} cancelled, refunded {}", outcome.job, outcome.recipe.name);
        } else {
            info!("{} finished {}", outcome.job, outcome.recipe.name);
            self.events.push(GameEvent::CraftSucceeded {
                recipe: outcome.recipe.id,
                results: outcome
                    .recipe
                    .results
                    .iter()
                    .map(|s| ItemInstance::new(Arc::clone(&s.definition), s.count).snapshot())
                    .collect(),
            });
        }
        delivery
    }

    pub fn job(&self, id: JobId) -> Option<&CraftingJob> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn jobs(&self) -> &[CraftingJob] {
        &self.jobs
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
