//! Outpost Core - Shared primitives for the Outpost item core
//!
//! This crate provides the types every other Outpost crate agrees on:
//! - Stable identifiers for item definitions, recipes, stations, jobs and peers
//! - The wrapping network clock used for cooldown gating
//! - Frame time tracking for the tick-driven simulation

pub mod ids;
pub mod time;

pub use glam::Vec3;
pub use ids::{ItemDefId, JobId, PeerId, PickupId, RecipeId, StationId};
pub use time::{wrapping_elapsed, ClockError, GameTime, NetworkClock, TimeConfig, CLOCK_PERIOD};
