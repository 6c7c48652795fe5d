//! # Player Status
//!
//! The scheduler asks the player a handful of questions through
//! [`PlayerStatus`]. Hosts implement it over their own character state;
//! [`PlayerSnapshot`] is a plain-data implementation for simulation and tests.

use std::collections::{BTreeMap, BTreeSet};

use crate::recipe::BuildOutput;

/// What the scheduler needs to know about the player.
pub trait PlayerStatus {
    /// Current/maximum ammunition for a type, in `0.0..=1.0`.
    ///
    /// Types the player has no weapon for report `1.0`.
    fn ammo_fraction(&self, ammo_type: &str) -> f32;

    /// Health below maximum. Zero when at full health.
    fn missing_health(&self) -> f32;

    /// True when the shield is fully charged (or absent).
    fn shield_full(&self) -> bool;

    /// True while the shield is recharging on its own.
    fn shield_recharging(&self) -> bool;

    /// True when the player holds a weapon, tool or item with this name.
    fn holds(&self, item: &str) -> bool;
}

/// Ammunition held for one type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmmoPool {
    /// Rounds held.
    pub current: u32,
    /// Capacity.
    pub max: u32,
}

/// Plain-data player state.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Shield charge, `0.0..=1.0`.
    pub shield: f32,
    /// Shield is recharging by itself.
    pub shield_recharging: bool,
    /// Ammunition by type.
    pub ammo: BTreeMap<String, AmmoPool>,
    /// Held weapons, tools and items.
    pub items: BTreeSet<String>,
}

impl PlayerSnapshot {
    /// A healthy player with a full shield and nothing held.
    #[must_use]
    pub fn new(max_health: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            shield: 1.0,
            shield_recharging: false,
            ammo: BTreeMap::new(),
            items: BTreeSet::new(),
        }
    }

    /// Adds an ammunition pool.
    #[must_use]
    pub fn with_ammo(mut self, ammo_type: &str, current: u32, max: u32) -> Self {
        self.ammo.insert(ammo_type.to_string(), AmmoPool { current: current.min(max), max });
        self
    }

    /// Adds a held item.
    #[must_use]
    pub fn with_item(mut self, item: &str) -> Self {
        self.items.insert(item.to_string());
        self
    }

    /// Applies damage, clamped at zero.
    pub fn damage(&mut self, amount: f32) {
        self.health = (self.health - amount).max(0.0);
    }

    /// Fires rounds of one type, clamped at zero.
    pub fn fire(&mut self, ammo_type: &str, rounds: u32) {
        if let Some(pool) = self.ammo.get_mut(ammo_type) {
            pool.current = pool.current.saturating_sub(rounds);
        }
    }

    /// True when health has run out.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Applies a finished build as if the player picked it up.
    pub fn apply(&mut self, output: &BuildOutput) {
        match output {
            BuildOutput::Ammo { ammo_type, amount } => {
                if let Some(pool) = self.ammo.get_mut(ammo_type) {
                    pool.current = pool.current.saturating_add(*amount).min(pool.max);
                }
            }
            BuildOutput::Heal { amount } => {
                self.health = (self.health + amount).min(self.max_health);
            }
            BuildOutput::ShieldCharge { amount } => {
                self.shield = (self.shield + amount).min(1.0);
            }
            BuildOutput::Weapon { weapon } => {
                self.items.insert(weapon.clone());
            }
            BuildOutput::Tool { tool } => {
                self.items.insert(tool.clone());
            }
            BuildOutput::Item { item } => {
                self.items.insert(item.clone());
            }
        }
    }
}

impl PlayerStatus for PlayerSnapshot {
    fn ammo_fraction(&self, ammo_type: &str) -> f32 {
        match self.ammo.get(ammo_type) {
            Some(pool) if pool.max > 0 => pool.current as f32 / pool.max as f32,
            _ => 1.0,
        }
    }

    fn missing_health(&self) -> f32 {
        (self.max_health - self.health).max(0.0)
    }

    fn shield_full(&self) -> bool {
        self.shield >= 1.0
    }

    fn shield_recharging(&self) -> bool {
        self.shield_recharging
    }

    fn holds(&self, item: &str) -> bool {
        self.items.contains(item)
    }
}
