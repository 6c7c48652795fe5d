//! # Session Orchestration
//!
//! A [`Session`] drives one profile through the campaign:
//!
//! ```text
//! start_run ──▶ tick(dt) ... ──▶ on_level_complete ──▶ start_run (next level)
//!                   │
//!                   └──────────▶ on_player_death ──▶ hub ──▶ start_run (level 0)
//! ```
//!
//! Level seeds derive from the configured base seed, the run number and the
//! campaign level, so a profile replays the same map for the same run.
//! Progress is saved on every run boundary and at the autosave interval.

use rand_chacha::ChaCha8Rng;
use rogue_wave_economy::{
    LevelUp, NanobotEvent, NanobotManager, PlayerStatus, ProfileStore, RecipeCatalog, RecipeId,
    RecipeLibrary, RecipeOffers, RogueLiteContext,
};
use rogue_wave_procedural::{
    CampaignLevel, EncounterPlan, EncounterPlanner, GeneratedLevel, LevelGenerator, LevelSeed,
};
use std::path::Path;
use std::sync::Arc;

use crate::config::{resolve_game_mode, CampaignConfig, GameConfig};
use crate::error::{SessionError, SessionResult};
use crate::events::{EventSender, GameEvent, TransitionReason};

/// Directory, relative to the data root, holding campaign level files.
pub const LEVEL_DIR: &str = "levels";

const NANOBOT_STREAM: u64 = 0x4E41_4E4F_424F_5453;
const OFFER_STREAM: u64 = 0x4F46_4645_5253;

/// The level currently being played.
#[derive(Clone, Debug)]
pub struct ActiveLevel {
    /// Index into the campaign.
    pub index: usize,
    /// Level name.
    pub name: String,
    /// Generated grid.
    pub generated: GeneratedLevel,
    /// Spawners and structure sites.
    pub encounters: EncounterPlan,
    /// Weapons equipped for the run.
    pub loadout: Vec<RecipeId>,
}

/// One profile's play session.
pub struct Session {
    config: GameConfig,
    levels: Vec<CampaignLevel>,
    ctx: RogueLiteContext,
    nanobots: NanobotManager,
    store: ProfileStore,
    profile: String,
    events: EventSender,
    offer_rng: ChaCha8Rng,
    autosave_timer: f32,
    active: Option<ActiveLevel>,
    pending_offers: Vec<RecipeId>,
}

impl Session {
    /// Opens a session, loading the profile or starting fresh.
    ///
    /// # Errors
    ///
    /// Returns `NoLevels`, `UnknownGameMode`, or a profile load error.
    pub fn new(
        config: GameConfig,
        catalog: Arc<RecipeCatalog>,
        levels: Vec<CampaignLevel>,
        store: ProfileStore,
        profile: &str,
        mode: &str,
        events: EventSender,
    ) -> SessionResult<Self> {
        if levels.is_empty() {
            return Err(SessionError::NoLevels);
        }
        let game_mode = config
            .game_mode(mode)
            .map(|m| resolve_game_mode(m, &catalog))
            .ok_or_else(|| SessionError::UnknownGameMode(mode.to_string()))?;

        let mut ctx = RogueLiteContext::new(catalog, game_mode);
        ctx.load_profile(&store, profile)?;

        let base = LevelSeed::new(config.session.base_seed);
        let nanobots = NanobotManager::new(config.nanobots.clone(), base.derive(NANOBOT_STREAM).value());

        tracing::info!(
            "Session opened: profile {:?}, mode {:?}, {} levels, {} recipes",
            profile,
            mode,
            levels.len(),
            ctx.catalog().len()
        );

        Ok(Self {
            offer_rng: base.derive(OFFER_STREAM).rng(),
            config,
            levels,
            ctx,
            nanobots,
            store,
            profile: profile.to_string(),
            events,
            autosave_timer: 0.0,
            active: None,
            pending_offers: Vec::new(),
        })
    }

    /// Opens a session over a data directory holding `Recipes/` and `levels/`.
    ///
    /// # Errors
    ///
    /// Any catalog, level or profile error, or those of [`Session::new`].
    pub fn open(
        data_root: &Path,
        config: GameConfig,
        store: ProfileStore,
        profile: &str,
        mode: &str,
        events: EventSender,
    ) -> SessionResult<Self> {
        let catalog = RecipeLibrary::new(data_root).catalog()?;
        let levels = load_campaign(&data_root.join(LEVEL_DIR), &config.campaign)?;
        Self::new(config, catalog, levels, store, profile, mode, events)
    }

    /// Seed for a campaign level in the current run.
    #[must_use]
    pub fn level_seed(&self, index: usize) -> LevelSeed {
        let persistent = self.ctx.persistent();
        self.levels
            .get(index)
            .and_then(CampaignLevel::fixed_seed)
            .unwrap_or_else(|| {
                LevelSeed::new(self.config.session.base_seed)
                    .derive(u64::from(persistent.run_number()))
                    .derive(u64::from(persistent.game_level()))
            })
    }

    fn current_index(&self) -> usize {
        let level = usize::try_from(self.ctx.persistent().game_level()).unwrap_or(usize::MAX);
        level.min(self.levels.len() - 1)
    }

    /// Generates the current level and starts a run on it.
    ///
    /// # Errors
    ///
    /// Returns `Generation` when the level cannot be satisfied, or a save
    /// error.
    pub fn start_run(&mut self) -> SessionResult<&ActiveLevel> {
        let index = self.current_index();
        let seed = self.level_seed(index);
        let level = &self.levels[index];

        let generated = LevelGenerator::new(level).generate(seed)?;
        let anchor = generated.grid.find(&self.config.encounters.anchor_tile);
        if anchor.is_none() {
            tracing::warn!("Level {} has no {} tile", level.name(), self.config.encounters.anchor_tile);
        }
        let mut planner = EncounterPlanner::new(self.config.encounters.clone(), anchor);
        generated.populate(level.palette(), &mut planner);
        let encounters = planner.finish();
        let name = level.name().to_string();

        self.events.send(GameEvent::LevelGenerated {
            name: name.clone(),
            seed: generated.seed.value(),
            attempts: generated.attempts,
            spawners: encounters.spawners.len(),
            waves: encounters.wave_count(),
        });

        if let Some(event) = self.nanobots.reset_for_run() {
            self.forward(event);
        }
        let report = self.ctx.pre_spawn_step();
        self.pending_offers.clear();
        self.autosave_timer = 0.0;

        let persistent = self.ctx.persistent();
        tracing::info!(
            "Run {} started on level {} ({}), {} recipes",
            persistent.run_number(),
            persistent.game_level(),
            name,
            report.run_recipes.len()
        );
        self.events.send(GameEvent::RunStarted {
            run_number: persistent.run_number(),
            game_level: persistent.game_level(),
            loadout: report.loadout.clone(),
        });
        self.save()?;

        Ok(&*self.active.insert(ActiveLevel {
            index,
            name,
            generated,
            encounters,
            loadout: report.loadout,
        }))
    }

    /// Advances the nanobots and the autosave timer.
    pub fn tick(&mut self, dt: f32, player: &impl PlayerStatus) {
        if self.active.is_none() {
            return;
        }

        for event in self.nanobots.tick(dt, &mut self.ctx, player) {
            self.forward(event);
        }

        let interval = self.config.session.autosave_interval;
        if interval > 0.0 {
            self.autosave_timer += dt;
            if self.autosave_timer >= interval {
                self.autosave_timer = 0.0;
                if let Err(e) = self.save() {
                    tracing::error!("Autosave failed: {}", e);
                }
            }
        }
    }

    fn forward(&self, event: NanobotEvent) {
        match event {
            NanobotEvent::BuildStarted { recipe, name, cost, cue, .. } => {
                self.events.send(GameEvent::BuildStarted { recipe, name, cost, cue });
            }
            NanobotEvent::BuildFinished { recipe, name, cue, output } => {
                self.events.send(GameEvent::BuildFinished { recipe, name, cue });
                if let Some(output) = output {
                    self.events.send(GameEvent::PickupSpawned { recipe, output });
                }
            }
            NanobotEvent::BuildAborted { recipe } => {
                self.events.send(GameEvent::BuildAborted { recipe });
            }
        }
    }

    /// Collects resources, rolling recipe offers for each level-up.
    pub fn collect_resources(&mut self, amount: u32) -> Vec<LevelUp> {
        let level_ups = self.ctx.collect_resources(amount, &self.config.levelling);
        for level_up in &level_ups {
            let offers = RecipeOffers::roll(&self.ctx, self.config.session.offers_per_level_up, &mut self.offer_rng);
            self.pending_offers.clone_from(&offers);
            self.events.send(GameEvent::NanobotLevelUp {
                level: level_up.level,
                offers,
            });
        }
        level_ups
    }

    /// Recipes currently on offer.
    #[must_use]
    pub fn pending_offers(&self) -> &[RecipeId] {
        &self.pending_offers
    }

    /// Takes one of the pending offers into the run.
    ///
    /// Returns false when the recipe is not on offer or cannot be added.
    pub fn accept_offer(&mut self, recipe: &RecipeId) -> bool {
        if !self.pending_offers.contains(recipe) {
            return false;
        }
        let accepted = RecipeOffers::accept(&mut self.ctx, recipe);
        if accepted {
            self.pending_offers.clear();
            self.events.send(GameEvent::RecipeAcquired {
                recipe: *recipe,
                permanent: false,
            });
        }
        accepted
    }

    /// Grants a recipe found in the world.
    pub fn acquire_recipe(&mut self, recipe: &RecipeId, permanent: bool) -> bool {
        let added = if permanent {
            self.ctx.add_permanent_recipe(recipe)
        } else {
            self.ctx.add_run_recipe(recipe)
        };
        if added {
            self.events.send(GameEvent::RecipeAcquired {
                recipe: *recipe,
                permanent,
            });
        }
        added
    }

    /// The player died: abort builds, reset the run and return to the hub.
    ///
    /// # Errors
    ///
    /// Returns a save error; the run is reset either way.
    pub fn on_player_death(&mut self) -> SessionResult<()> {
        if let Some(event) = self.nanobots.reset_for_run() {
            self.forward(event);
        }
        self.ctx.on_death();
        self.active = None;
        self.pending_offers.clear();

        let scene = self.ctx.game_mode().scene.clone();
        self.events.send(GameEvent::SceneTransition {
            scene,
            reason: TransitionReason::Death,
        });
        self.save().map(|_| ())
    }

    /// The level was cleared: keep the run's recipes and move on.
    ///
    /// Returns the name of the next level.
    ///
    /// # Errors
    ///
    /// Returns a save error; progress is kept in memory either way.
    pub fn on_level_complete(&mut self) -> SessionResult<String> {
        if let Some(event) = self.nanobots.abort() {
            self.forward(event);
        }
        for recipe in self.ctx.complete_run() {
            self.events.send(GameEvent::RecipeAcquired { recipe, permanent: true });
        }
        self.active = None;

        let next = self.levels[self.current_index()].name().to_string();
        self.events.send(GameEvent::SceneTransition {
            scene: next.clone(),
            reason: TransitionReason::LevelComplete,
        });
        self.save()?;
        Ok(next)
    }

    /// Writes the profile if it changed.
    ///
    /// # Errors
    ///
    /// Returns the underlying profile store error.
    pub fn save(&mut self) -> SessionResult<bool> {
        let saved = self.ctx.save_if_dirty(&self.store, &self.profile)?;
        if saved {
            self.events.send(GameEvent::ProfileSaved {
                profile: self.profile.clone(),
            });
        }
        Ok(saved)
    }

    /// Progression context.
    #[must_use]
    pub const fn context(&self) -> &RogueLiteContext {
        &self.ctx
    }

    /// Mutable progression context, for host-driven changes.
    pub fn context_mut(&mut self) -> &mut RogueLiteContext {
        &mut self.ctx
    }

    /// Nanobot scheduler.
    #[must_use]
    pub const fn nanobots(&self) -> &NanobotManager {
        &self.nanobots
    }

    /// Level being played, if a run is in progress.
    #[must_use]
    pub const fn active_level(&self) -> Option<&ActiveLevel> {
        self.active.as_ref()
    }

    /// Campaign levels in order.
    #[must_use]
    pub fn levels(&self) -> &[CampaignLevel] {
        &self.levels
    }

    /// Profile name.
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Game configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }
}

/// Loads campaign levels in order from `dir`.
///
/// # Errors
///
/// Returns `NoLevels` for an empty campaign, or the first level load error.
pub fn load_campaign(dir: &Path, campaign: &CampaignConfig) -> SessionResult<Vec<CampaignLevel>> {
    if campaign.levels.is_empty() {
        return Err(SessionError::NoLevels);
    }
    let levels = campaign
        .levels
        .iter()
        .map(|file| CampaignLevel::load(dir.join(file)))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!("Loaded {} campaign levels from {}", levels.len(), dir.display());
    Ok(levels)
}
