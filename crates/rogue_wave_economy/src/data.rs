//! # Progression Data
//!
//! [`PersistentData`] survives deaths and is written to the profile file.
//! [`RunData`] lives for one life. [`GameMode`] holds the starting recipes
//! a mode grants.
//!
//! Recipes are stored one entry per owned stack unit, so a stackable recipe
//! held three times appears three times.

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};
use crate::recipe::RecipeId;

/// Current profile format version.
pub const PERSISTENT_DATA_VERSION: u32 = 1;

const fn current_version() -> u32 {
    PERSISTENT_DATA_VERSION
}

/// Progression that survives deaths and runs.
///
/// Every mutation marks the data dirty; [`PersistentData::clear_dirty`] is
/// called once the data has been written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentData {
    #[serde(default = "current_version")]
    version: u32,
    #[serde(default)]
    recipes: Vec<RecipeId>,
    #[serde(default)]
    weapon_build_order: Vec<RecipeId>,
    #[serde(default)]
    resources: u32,
    #[serde(default)]
    nanobot_level: u32,
    #[serde(default)]
    level_progress: u32,
    #[serde(default)]
    game_level: u32,
    #[serde(default)]
    run_number: u32,
    #[serde(skip)]
    is_dirty: bool,
}

impl Default for PersistentData {
    fn default() -> Self {
        Self {
            version: PERSISTENT_DATA_VERSION,
            recipes: Vec::new(),
            weapon_build_order: Vec::new(),
            resources: 0,
            nanobot_level: 0,
            level_progress: 0,
            game_level: 0,
            run_number: 0,
            is_dirty: false,
        }
    }
}

impl PersistentData {
    /// Format version the data was written with.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Owned permanent recipes, one entry per stack unit.
    #[must_use]
    pub fn recipes(&self) -> &[RecipeId] {
        &self.recipes
    }

    /// Copies of a recipe held.
    #[must_use]
    pub fn count(&self, id: &RecipeId) -> u32 {
        count_of(&self.recipes, id)
    }

    /// True when at least one copy is held.
    #[must_use]
    pub fn contains(&self, id: &RecipeId) -> bool {
        self.recipes.contains(id)
    }

    /// Weapons in build priority order.
    #[must_use]
    pub fn weapon_build_order(&self) -> &[RecipeId] {
        &self.weapon_build_order
    }

    /// Resources available to spend.
    #[must_use]
    pub const fn resources(&self) -> u32 {
        self.resources
    }

    /// Nanobot level.
    #[must_use]
    pub const fn nanobot_level(&self) -> u32 {
        self.nanobot_level
    }

    /// Resources collected toward the next nanobot level.
    #[must_use]
    pub const fn level_progress(&self) -> u32 {
        self.level_progress
    }

    /// Campaign level the next run starts on.
    #[must_use]
    pub const fn game_level(&self) -> u32 {
        self.game_level
    }

    /// Number of runs started, counting deaths.
    #[must_use]
    pub const fn run_number(&self) -> u32 {
        self.run_number
    }

    /// True when there are unsaved changes.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Flags unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Clears the dirty flag after a save.
    pub fn clear_dirty(&mut self) {
        self.is_dirty = false;
    }

    pub(crate) fn push_recipe(&mut self, id: RecipeId) {
        self.recipes.push(id);
        self.is_dirty = true;
    }

    pub(crate) fn retain_recipes(&mut self, mut keep: impl FnMut(&RecipeId) -> bool) -> usize {
        let before = self.recipes.len();
        self.recipes.retain(|id| keep(id));
        let removed = before - self.recipes.len();
        if removed > 0 {
            self.is_dirty = true;
        }
        removed
    }

    /// Puts a weapon at `position` (clamped) unless it is already listed.
    pub(crate) fn insert_weapon(&mut self, id: RecipeId, position: usize) -> bool {
        if self.weapon_build_order.contains(&id) {
            return false;
        }
        let position = position.min(self.weapon_build_order.len());
        self.weapon_build_order.insert(position, id);
        self.is_dirty = true;
        true
    }

    pub(crate) fn retain_build_order(&mut self, mut keep: impl FnMut(&RecipeId) -> bool) -> usize {
        let before = self.weapon_build_order.len();
        self.weapon_build_order.retain(|id| keep(id));
        let removed = before - self.weapon_build_order.len();
        if removed > 0 {
            self.is_dirty = true;
        }
        removed
    }

    /// Moves a listed weapon to a new position in the build order.
    ///
    /// Returns false when the weapon is not in the build order.
    pub fn reorder_weapon(&mut self, id: &RecipeId, position: usize) -> bool {
        let Some(current) = self.weapon_build_order.iter().position(|w| w == id) else {
            return false;
        };
        let weapon = self.weapon_build_order.remove(current);
        let position = position.min(self.weapon_build_order.len());
        self.weapon_build_order.insert(position, weapon);
        self.is_dirty = true;
        true
    }

    pub(crate) fn add_resources(&mut self, amount: u32) {
        self.resources = self.resources.saturating_add(amount);
        self.is_dirty = true;
    }

    pub(crate) fn spend_resources(&mut self, amount: u32) -> EconomyResult<()> {
        if self.resources < amount {
            return Err(EconomyError::InsufficientResources {
                required: amount,
                available: self.resources,
            });
        }
        self.resources -= amount;
        self.is_dirty = true;
        Ok(())
    }

    pub(crate) fn set_levelling(&mut self, nanobot_level: u32, level_progress: u32) {
        self.nanobot_level = nanobot_level;
        self.level_progress = level_progress;
        self.is_dirty = true;
    }

    pub(crate) fn set_game_level(&mut self, level: u32) {
        self.game_level = level;
        self.is_dirty = true;
    }

    pub(crate) fn increment_run_number(&mut self) {
        self.run_number = self.run_number.saturating_add(1);
        self.is_dirty = true;
    }
}

/// State for the current life. Replaced wholesale on death.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunData {
    recipes: Vec<RecipeId>,
    loadout: Vec<RecipeId>,
    revision: u64,
}

impl RunData {
    /// Empty run data whose revision follows `previous`.
    ///
    /// Revisions only ever grow so observers can tell two runs apart.
    #[must_use]
    pub const fn after(previous: u64) -> Self {
        Self {
            recipes: Vec::new(),
            loadout: Vec::new(),
            revision: previous.wrapping_add(1),
        }
    }

    /// Held recipes: temporary ones plus permanent ones re-applied for this run.
    #[must_use]
    pub fn recipes(&self) -> &[RecipeId] {
        &self.recipes
    }

    /// Copies of a recipe held this run.
    #[must_use]
    pub fn count(&self, id: &RecipeId) -> u32 {
        count_of(&self.recipes, id)
    }

    /// True when at least one copy is held this run.
    #[must_use]
    pub fn contains(&self, id: &RecipeId) -> bool {
        self.recipes.contains(id)
    }

    /// Distinct recipes in acquisition order.
    #[must_use]
    pub fn distinct(&self) -> Vec<RecipeId> {
        let mut seen = Vec::with_capacity(self.recipes.len());
        for id in &self.recipes {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }

    /// Weapons equipped for this run.
    #[must_use]
    pub fn loadout(&self) -> &[RecipeId] {
        &self.loadout
    }

    /// Bumped on every acquisition.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn push_recipe(&mut self, id: RecipeId) {
        self.recipes.push(id);
        self.revision = self.revision.wrapping_add(1);
    }

    pub(crate) fn remove_one(&mut self, id: &RecipeId) -> bool {
        match self.recipes.iter().position(|r| r == id) {
            Some(i) => {
                self.recipes.remove(i);
                self.revision = self.revision.wrapping_add(1);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_loadout(&mut self, loadout: Vec<RecipeId>) {
        self.loadout = loadout;
    }
}

/// A playable mode and the recipes it grants.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMode {
    /// Display name.
    pub name: String,
    /// Hub scene loaded between runs.
    #[serde(default)]
    pub scene: String,
    /// Recipes guaranteed in persistent data.
    #[serde(default)]
    pub permanent_starting_recipes: Vec<RecipeId>,
    /// Recipes granted at the start of every run.
    #[serde(default)]
    pub run_starting_recipes: Vec<RecipeId>,
    /// Weapons equipped from the build order.
    #[serde(default = "default_loadout_size")]
    pub loadout_size: usize,
}

const fn default_loadout_size() -> usize {
    2
}

impl GameMode {
    /// A mode with no starting recipes.
    #[must_use]
    pub fn new(name: impl Into<String>, scene: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scene: scene.into(),
            permanent_starting_recipes: Vec::new(),
            run_starting_recipes: Vec::new(),
            loadout_size: default_loadout_size(),
        }
    }
}

pub(crate) fn count_of(list: &[RecipeId], id: &RecipeId) -> u32 {
    u32::try_from(list.iter().filter(|r| *r == id).count()).unwrap_or(u32::MAX)
}
