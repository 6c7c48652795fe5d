//! # Rogue-Lite Context
//!
//! Owns the recipe catalog, the persistent data, the current run data and
//! the selected game mode. Every change to progression goes through here so
//! the dirty flag, stack limits and weapon build order stay consistent.
//!
//! ## Run reconciliation
//!
//! [`RogueLiteContext::pre_spawn_step`] rebuilds the run before the player
//! spawns:
//!
//! 1. Strip one run copy per persistent recipe
//! 2. Grant game-mode permanent starting recipes (union by count)
//! 3. Prune build-order entries no longer owned
//! 4. Gather the remaining run recipes plus game-mode run starting recipes
//! 5. Clear run data
//! 6. Re-add the gathered recipes
//! 7. Re-add every permanent recipe and derive the loadout
//!
//! Calling it twice in a row yields the same run.

use std::collections::HashSet;
use std::sync::Arc;

use crate::catalog::RecipeCatalog;
use crate::data::{count_of, GameMode, PersistentData, RunData};
use crate::error::{EconomyError, EconomyResult};
use crate::offers::{LevelUp, LevellingConfig};
use crate::profile::ProfileStore;
use crate::recipe::{RecipeId, RecipeKind};

/// Which store an acquisition goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Run,
    Permanent,
}

/// Summary of one run reconciliation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreSpawnReport {
    /// Permanent recipes granted by the game mode this time.
    pub granted_permanent: Vec<RecipeId>,
    /// Recipes the run started with, including permanent ones.
    pub run_recipes: Vec<RecipeId>,
    /// Weapons equipped.
    pub loadout: Vec<RecipeId>,
}

/// Explicit progression context handed to the scheduler and the session.
#[derive(Clone, Debug)]
pub struct RogueLiteContext {
    catalog: Arc<RecipeCatalog>,
    persistent: PersistentData,
    run: RunData,
    game_mode: GameMode,
}

impl RogueLiteContext {
    /// Creates a context with fresh progression.
    #[must_use]
    pub fn new(catalog: Arc<RecipeCatalog>, game_mode: GameMode) -> Self {
        Self {
            catalog,
            persistent: PersistentData::default(),
            run: RunData::default(),
            game_mode,
        }
    }

    /// The recipe catalog.
    #[must_use]
    pub fn catalog(&self) -> &RecipeCatalog {
        &self.catalog
    }

    /// Shared handle to the catalog.
    #[must_use]
    pub fn catalog_handle(&self) -> Arc<RecipeCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Persistent progression.
    #[must_use]
    pub const fn persistent(&self) -> &PersistentData {
        &self.persistent
    }

    /// Current run.
    #[must_use]
    pub const fn run(&self) -> &RunData {
        &self.run
    }

    /// Selected game mode.
    #[must_use]
    pub const fn game_mode(&self) -> &GameMode {
        &self.game_mode
    }

    /// Switches game mode. Takes effect at the next reconciliation.
    pub fn set_game_mode(&mut self, game_mode: GameMode) {
        self.game_mode = game_mode;
    }

    /// Replaces persistent data, dropping anything the catalog can't resolve.
    ///
    /// Unknown recipe ids are logged and skipped, stacks above their limit
    /// are trimmed, and the build order keeps only known weapons. The run is
    /// reset. Data that needed repair is marked dirty.
    pub fn load_persistent(&mut self, mut data: PersistentData) {
        let catalog = Arc::clone(&self.catalog);
        data.clear_dirty();

        let dropped = data.retain_recipes(|id| {
            let known = catalog.contains(id);
            if !known {
                tracing::error!("Dropping unknown recipe {} from persistent data", id);
            }
            known
        });

        let mut seen: Vec<RecipeId> = Vec::new();
        let trimmed = data.retain_recipes(|id| {
            let limit = catalog.get(id).map_or(0, |r| r.max_stack);
            if count_of(&seen, id) >= limit {
                tracing::warn!("Trimming recipe {} above its stack limit of {}", id, limit);
                return false;
            }
            seen.push(*id);
            true
        });

        let mut listed = HashSet::new();
        data.retain_build_order(|id| {
            let is_weapon = catalog
                .get(id)
                .is_some_and(|r| matches!(r.kind, RecipeKind::Weapon { .. }));
            if !is_weapon {
                tracing::error!("Dropping {} from the weapon build order", id);
            }
            is_weapon && listed.insert(*id)
        });

        tracing::info!(
            "Loaded persistent data: {} recipes, {} resources, level {} ({} dropped, {} trimmed)",
            data.recipes().len(),
            data.resources(),
            data.game_level(),
            dropped,
            trimmed
        );

        self.persistent = data;
        self.run = RunData::after(self.run.revision());
    }

    /// Copies of a recipe owned: permanent copies plus temporary ones.
    #[must_use]
    pub fn owned_count(&self, id: &RecipeId) -> u32 {
        self.persistent.count(id) + self.temporary_count(id)
    }

    /// True when the recipe is owned permanently or this run.
    #[must_use]
    pub fn owns(&self, id: &RecipeId) -> bool {
        self.owned_count(id) > 0
    }

    /// Copies held this run that are not backed by persistent data.
    ///
    /// The run holds every permanent copy as well, so this is whatever the
    /// run carries beyond the persistent count.
    #[must_use]
    pub fn temporary_count(&self, id: &RecipeId) -> u32 {
        self.run.count(id).saturating_sub(self.persistent.count(id))
    }

    /// Adds a recipe to the current run.
    ///
    /// Returns false for unknown ids (logged), a non-stackable recipe already
    /// held, or a stack at its limit. Weapons join the build order and pull
    /// in their ammo recipe.
    pub fn add_run_recipe(&mut self, id: &RecipeId) -> bool {
        self.add(Scope::Run, *id, true)
    }

    /// Adds a recipe to persistent data. Same rules as [`Self::add_run_recipe`],
    /// with the limit checked against every owned copy.
    ///
    /// The new copy is also added to the current run.
    pub fn add_permanent_recipe(&mut self, id: &RecipeId) -> bool {
        self.add(Scope::Permanent, *id, true)
    }

    fn add(&mut self, scope: Scope, id: RecipeId, cascade: bool) -> bool {
        let catalog = Arc::clone(&self.catalog);
        let Some(recipe) = catalog.get(&id) else {
            tracing::error!("Cannot add unknown recipe {}", id);
            return false;
        };

        let held = match scope {
            Scope::Run => self.run.count(&id),
            Scope::Permanent => self.owned_count(&id),
        };
        if held >= recipe.max_stack {
            if recipe.is_stackable() {
                tracing::debug!("{} is at its stack limit of {}", recipe.name, recipe.max_stack);
            }
            return false;
        }

        if scope == Scope::Permanent {
            self.persistent.push_recipe(id);
        }
        self.run.push_recipe(id);

        if let RecipeKind::Weapon { ammo_recipe, primary, .. } = &recipe.kind {
            let position = if *primary { 0 } else { 1 };
            if self.persistent.insert_weapon(id, position) {
                tracing::debug!("{} added to the weapon build order at {}", recipe.name, position);
            }
            if cascade {
                if let Some(ammo) = ammo_recipe {
                    match scope {
                        Scope::Run if self.run.count(ammo) == 0 => {
                            self.add(scope, *ammo, false);
                        }
                        Scope::Permanent if self.persistent.count(ammo) == 0 => {
                            if !self.make_permanent(ammo) {
                                self.add(scope, *ammo, false);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        tracing::debug!("Acquired {} ({:?})", recipe.name, scope);
        true
    }

    /// Rebuilds the run from persistent data and the game mode.
    pub fn pre_spawn_step(&mut self) -> PreSpawnReport {
        let catalog = Arc::clone(&self.catalog);
        let mut report = PreSpawnReport::default();

        // 1. Permanent copies come back in step 7
        for id in self.persistent.recipes().to_vec() {
            self.run.remove_one(&id);
        }

        // 2. Grants go to persistent data only; step 7 puts them in the run
        for (id, wanted) in tally(&self.game_mode.permanent_starting_recipes) {
            while self.persistent.count(&id) < wanted {
                if !self.grant_permanent(id) {
                    break;
                }
                report.granted_permanent.push(id);
            }
        }

        // 3.
        let owned: HashSet<RecipeId> = self
            .persistent
            .recipes()
            .iter()
            .chain(self.run.recipes())
            .copied()
            .collect();
        let pruned = self.persistent.retain_build_order(|id| owned.contains(id));
        if pruned > 0 {
            tracing::debug!("Pruned {} weapons from the build order", pruned);
        }

        // 4. Ammo for newly granted weapons is gathered explicitly so that
        // re-adding in step 6 never cascades.
        let mut gathered = self.run.recipes().to_vec();
        for (id, wanted) in tally(&self.game_mode.run_starting_recipes) {
            while count_of(&gathered, &id) < wanted {
                gathered.push(id);
            }
            if let Some(ammo) = catalog.get(&id).and_then(|r| r.ammo_recipe()) {
                if !gathered.contains(&ammo) && !self.persistent.contains(&ammo) {
                    gathered.push(ammo);
                }
            }
        }

        // 5.
        self.run = RunData::after(self.run.revision());

        // 6.
        for id in gathered {
            self.add(Scope::Run, id, false);
        }

        // 7.
        for id in self.persistent.recipes().to_vec() {
            self.add(Scope::Run, id, false);
        }

        let loadout: Vec<RecipeId> = self
            .persistent
            .weapon_build_order()
            .iter()
            .filter(|id| self.run.contains(id))
            .take(self.game_mode.loadout_size)
            .copied()
            .collect();
        self.run.set_loadout(loadout);

        report.run_recipes = self.run.recipes().to_vec();
        report.loadout = self.run.loadout().to_vec();
        tracing::info!(
            "Run reconciled: {} recipes, loadout of {}",
            report.run_recipes.len(),
            report.loadout.len()
        );
        report
    }

    fn grant_permanent(&mut self, id: RecipeId) -> bool {
        let catalog = Arc::clone(&self.catalog);
        let Some(recipe) = catalog.get(&id) else {
            tracing::error!("Cannot grant unknown recipe {}", id);
            return false;
        };
        if self.persistent.count(&id) >= recipe.max_stack {
            return false;
        }
        self.persistent.push_recipe(id);

        if let RecipeKind::Weapon { ammo_recipe, primary, .. } = &recipe.kind {
            let position = if *primary { 0 } else { 1 };
            self.persistent.insert_weapon(id, position);
            if let Some(ammo) = ammo_recipe {
                if self.persistent.count(ammo) == 0 {
                    self.grant_permanent(*ammo);
                }
            }
        }
        tracing::debug!("Granted {} permanently", recipe.name);
        true
    }

    /// Makes one temporary copy of a recipe permanent.
    ///
    /// Returns false when no temporary copy is held or the permanent stack
    /// is full.
    pub fn make_permanent(&mut self, id: &RecipeId) -> bool {
        let Some(recipe) = self.catalog.get(id) else {
            tracing::error!("Cannot make unknown recipe {} permanent", id);
            return false;
        };
        if self.temporary_count(id) == 0 || self.persistent.count(id) >= recipe.max_stack {
            return false;
        }
        tracing::info!("{} is now permanent", recipe.name);
        self.persistent.push_recipe(*id);
        true
    }

    /// Ends a successful level: folds temporary recipes into persistent
    /// data and advances the game level. Returns the recipes folded.
    pub fn complete_run(&mut self) -> Vec<RecipeId> {
        let mut folded = Vec::new();
        for id in self.run.distinct() {
            while self.make_permanent(&id) {
                folded.push(id);
            }
        }
        let next = self.persistent.game_level().saturating_add(1);
        self.persistent.set_game_level(next);
        tracing::info!("Level complete: {} recipes made permanent, next level {}", folded.len(), next);
        folded
    }

    /// Player death: the run is discarded and the campaign restarts.
    pub fn on_death(&mut self) {
        tracing::info!(
            "Run {} ended on level {} with {} run recipes",
            self.persistent.run_number(),
            self.persistent.game_level(),
            self.run.recipes().len()
        );
        self.run = RunData::after(self.run.revision());
        self.persistent.increment_run_number();
        self.persistent.set_game_level(0);
    }

    /// Adds resources without levelling.
    pub fn add_resources(&mut self, amount: u32) {
        self.persistent.add_resources(amount);
    }

    /// Spends resources.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientResources` and leaves the balance untouched when
    /// the balance is too low.
    pub fn spend_resources(&mut self, amount: u32) -> EconomyResult<()> {
        self.persistent.spend_resources(amount)
    }

    /// True when `amount` can be spent.
    #[must_use]
    pub const fn can_afford(&self, amount: u32) -> bool {
        self.persistent.resources() >= amount
    }

    /// Collects resources and applies any nanobot level-ups they earn.
    pub fn collect_resources(&mut self, amount: u32, levelling: &LevellingConfig) -> Vec<LevelUp> {
        self.persistent.add_resources(amount);

        let mut level = self.persistent.nanobot_level();
        let mut progress = self.persistent.level_progress().saturating_add(amount);
        let mut level_ups = Vec::new();
        while level < levelling.max_level {
            let needed = levelling.resources_for_level(level);
            if progress < needed {
                break;
            }
            progress -= needed;
            level += 1;
            level_ups.push(LevelUp { level });
        }
        self.persistent.set_levelling(level, progress);

        for level_up in &level_ups {
            tracing::info!("Nanobots reached level {}", level_up.level);
        }
        level_ups
    }

    /// Moves a weapon within the build order.
    pub fn reorder_weapon(&mut self, id: &RecipeId, position: usize) -> bool {
        self.persistent.reorder_weapon(id, position)
    }

    /// True when persistent data has unsaved changes.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.persistent.is_dirty()
    }

    /// Writes persistent data when it has changed.
    ///
    /// Returns whether a write happened.
    ///
    /// # Errors
    ///
    /// Any error from [`ProfileStore::save`]; the data stays dirty.
    pub fn save_if_dirty(&mut self, store: &ProfileStore, profile: &str) -> EconomyResult<bool> {
        if !self.persistent.is_dirty() {
            return Ok(false);
        }
        store.save(profile, &self.persistent)?;
        self.persistent.clear_dirty();
        Ok(true)
    }

    /// Loads a profile into the context, or starts fresh when none exists.
    ///
    /// # Errors
    ///
    /// Errors other than `ProfileNotFound` from [`ProfileStore::load`].
    pub fn load_profile(&mut self, store: &ProfileStore, profile: &str) -> EconomyResult<bool> {
        match store.load(profile) {
            Ok(data) => {
                self.load_persistent(data);
                Ok(true)
            }
            Err(EconomyError::ProfileNotFound(_)) => {
                tracing::info!("No saved profile {:?}, starting fresh", profile);
                self.load_persistent(PersistentData::default());
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// Distinct ids with their multiplicity, in first-seen order.
fn tally(list: &[RecipeId]) -> Vec<(RecipeId, u32)> {
    let mut counts: Vec<(RecipeId, u32)> = Vec::new();
    for id in list {
        match counts.iter_mut().find(|(seen, _)| seen == id) {
            Some((_, n)) => *n += 1,
            None => counts.push((*id, 1)),
        }
    }
    counts
}
