//! Character stats and stat modifiers
//!
//! Equipment and food change stats through `StatModifier`s. Flat modifiers
//! add, percent modifiers scale by `1 + value` and are removed by scaling
//! with `1 / (1 + value)`.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Maximum hunger and thirst pools
pub const MAX_HUNGER: f32 = 100.0;
pub const MAX_THIRST: f32 = 100.0;

/// A stat that items can modify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    MaxHealth,
    Health,
    Hunger,
    Thirst,
    Attack,
    Defense,
    Speed,
}

/// How a modifier combines with the base value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ModifierKind {
    #[default]
    Flat,
    Percent,
}

/// A single stat change carried by an item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: StatKind,
    #[serde(default)]
    pub kind: ModifierKind,
    pub value: f32,
}

impl StatModifier {
    /// Flat additive modifier
    pub fn flat(stat: StatKind, value: f32) -> Self {
        Self {
            stat,
            kind: ModifierKind::Flat,
            value,
        }
    }

    /// Multiplicative modifier (`0.1` = +10%)
    pub fn percent(stat: StatKind, value: f32) -> Self {
        Self {
            stat,
            kind: ModifierKind::Percent,
            value,
        }
    }
}

/// Survival and combat stats of one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub max_health: f32,
    pub health: f32,
    pub hunger: f32,
    pub thirst: f32,
    pub attack: f32,
    pub defense: f32,
    pub speed: f32,
}

impl Default for CharacterStats {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            health: 100.0,
            hunger: MAX_HUNGER,
            thirst: MAX_THIRST,
            attack: 10.0,
            defense: 0.0,
            speed: 1.0,
        }
    }
}

impl CharacterStats {
    /// Read a stat
    pub fn get(&self, stat: StatKind) -> f32 {
        match stat {
            StatKind::MaxHealth => self.max_health,
            StatKind::Health => self.health,
            StatKind::Hunger => self.hunger,
            StatKind::Thirst => self.thirst,
            StatKind::Attack => self.attack,
            StatKind::Defense => self.defense,
            StatKind::Speed => self.speed,
        }
    }

    fn get_mut(&mut self, stat: StatKind) -> &mut f32 {
        match stat {
            StatKind::MaxHealth => &mut self.max_health,
            StatKind::Health => &mut self.health,
            StatKind::Hunger => &mut self.hunger,
            StatKind::Thirst => &mut self.thirst,
            StatKind::Attack => &mut self.attack,
            StatKind::Defense => &mut self.defense,
            StatKind::Speed => &mut self.speed,
        }
    }

    /// Apply (`is_applying = true`) or revert a modifier.
    ///
    /// Reverting a percent modifier divides by the same factor, which is only
    /// an exact undo if nothing else scaled the stat in between.
    pub fn apply_modifier(&mut self, modifier: &StatModifier, is_applying: bool) {
        let value = self.get_mut(modifier.stat);
        match modifier.kind {
            ModifierKind::Flat => {
                if is_applying {
                    *value += modifier.value;
                } else {
                    *value -= modifier.value;
                }
            }
            ModifierKind::Percent => {
                let factor = 1.0 + modifier.value;
                if factor.abs() <= f32::EPSILON {
                    warn!("Ignoring percent modifier {:?} with zero factor", modifier);
                    return;
                }
                if is_applying {
                    *value *= factor;
                } else {
                    *value /= factor;
                }
            }
        }
    }

    /// Apply a list of modifiers
    pub fn apply_all(&mut self, modifiers: &[StatModifier], is_applying: bool) {
        for modifier in modifiers {
            self.apply_modifier(modifier, is_applying);
        }
    }

    /// Clamp the current pools into their valid ranges
    pub fn clamp_pools(&mut self) {
        self.max_health = self.max_health.max(1.0);
        self.health = self.health.clamp(0.0, self.max_health);
        self.hunger = self.hunger.clamp(0.0, MAX_HUNGER);
        self.thirst = self.thirst.clamp(0.0, MAX_THIRST);
    }
}
