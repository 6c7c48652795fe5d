//! # Nanobot Build Scheduler
//!
//! The nanobots spend resources on the recipes the player holds this run.
//! [`NanobotManager::tick`] advances a small state machine:
//!
//! ```text
//! Idle ──decide──▶ Building { remaining } ──done──▶ Cooldown { remaining } ──▶ Idle
//! ```
//!
//! While idle a decision is taken every `decision_interval` seconds. The
//! first matching priority band wins:
//!
//! | Band | Picks |
//! |------|-------|
//! | Queued | follow-up builds, e.g. a new weapon's ammo |
//! | Emergency ammo | ammo below `emergency_ammo_threshold` |
//! | Health | heal with the smallest overage, else the largest heal |
//! | Shield | shield not recharging and below full |
//! | Power-up | weapons and tools not held, in a per-acquisition shuffle |
//! | Top-up ammo | ammo below `topup_ammo_threshold` |
//! | Generic | periodic items whose jittered cooldown elapsed |
//!
//! Cost is paid when a build starts. Aborted builds are not refunded.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::player::PlayerStatus;
use crate::recipe::{BuildOutput, Recipe, RecipeId, RecipeKind};
use crate::rogue_lite::RogueLiteContext;

/// Scheduler tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NanobotConfig {
    /// Seconds between build decisions while idle.
    pub decision_interval: f32,
    /// Seconds to wait after a build before deciding again.
    pub cooldown: f32,
    /// Ammo fraction below which ammo jumps ahead of healing.
    pub emergency_ammo_threshold: f32,
    /// Ammo fraction below which ammo is topped up after power-ups.
    pub topup_ammo_threshold: f32,
    /// Relative jitter on generic item cooldowns.
    pub generic_jitter: f32,
    /// Cue for recipes without their own start cue.
    pub start_cue: String,
    /// Cue for recipes without their own complete cue.
    pub complete_cue: String,
}

impl Default for NanobotConfig {
    fn default() -> Self {
        Self {
            decision_interval: 0.5,
            cooldown: 1.0,
            emergency_ammo_threshold: 0.1,
            topup_ammo_threshold: 0.9,
            generic_jitter: 0.3,
            start_cue: "nanobot_build_start".to_string(),
            complete_cue: "nanobot_build_complete".to_string(),
        }
    }
}

/// Where the manager is in its build cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NanobotState {
    /// Waiting for the next decision.
    Idle,
    /// Building a recipe.
    Building {
        /// Recipe being built.
        recipe: RecipeId,
        /// Seconds left.
        remaining: f32,
    },
    /// Resting after a build.
    Cooldown {
        /// Seconds left.
        remaining: f32,
    },
}

/// Priority band a build was chosen from, highest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildPriority {
    /// Queued follow-up.
    Queued,
    /// Nearly out of ammo.
    EmergencyAmmo,
    /// Missing health.
    Health,
    /// Shield below full.
    Shield,
    /// Weapon or tool not held.
    PowerUp,
    /// Ammo below the top-up threshold.
    TopUpAmmo,
    /// Periodic generic item.
    Generic,
}

/// Something the host should react to.
#[derive(Clone, Debug, PartialEq)]
pub enum NanobotEvent {
    /// A build started and its cost was paid.
    BuildStarted {
        /// Recipe being built.
        recipe: RecipeId,
        /// Recipe display name.
        name: String,
        /// Resources spent.
        cost: u32,
        /// Seconds the build takes.
        build_time: f32,
        /// Band it was chosen from.
        priority: BuildPriority,
        /// Cue to play.
        cue: String,
    },
    /// A build completed.
    BuildFinished {
        /// Recipe built.
        recipe: RecipeId,
        /// Recipe display name.
        name: String,
        /// Cue to play.
        cue: String,
        /// What to spawn.
        output: Option<BuildOutput>,
    },
    /// A build was interrupted without refund.
    BuildAborted {
        /// Recipe that was being built.
        recipe: RecipeId,
    },
}

/// Priority-banded build scheduler.
pub struct NanobotManager {
    config: NanobotConfig,
    state: NanobotState,
    decision_timer: f32,
    clock: f32,
    rng: ChaCha8Rng,
    queue: VecDeque<RecipeId>,
    power_up_order: Vec<RecipeId>,
    power_up_revision: Option<u64>,
    generic_ready_at: HashMap<RecipeId, f32>,
    builds_completed: u32,
}

impl NanobotManager {
    /// Creates an idle manager. The first decision happens on the first tick.
    #[must_use]
    pub fn new(config: NanobotConfig, seed: u64) -> Self {
        Self {
            config,
            state: NanobotState::Idle,
            decision_timer: 0.0,
            clock: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            queue: VecDeque::new(),
            power_up_order: Vec::new(),
            power_up_revision: None,
            generic_ready_at: HashMap::new(),
            builds_completed: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> NanobotState {
        self.state
    }

    /// Scheduler tuning.
    #[must_use]
    pub const fn config(&self) -> &NanobotConfig {
        &self.config
    }

    /// True while a build is in flight.
    #[must_use]
    pub const fn is_building(&self) -> bool {
        matches!(self.state, NanobotState::Building { .. })
    }

    /// Builds finished since creation.
    #[must_use]
    pub const fn builds_completed(&self) -> u32 {
        self.builds_completed
    }

    /// Pending follow-up builds.
    #[must_use]
    pub fn queued(&self) -> Vec<RecipeId> {
        self.queue.iter().copied().collect()
    }

    /// Queues a follow-up build ahead of every other band.
    pub fn enqueue(&mut self, recipe: RecipeId) {
        self.queue.push_back(recipe);
    }

    /// Advances timers and makes at most one build decision.
    pub fn tick(
        &mut self,
        dt: f32,
        ctx: &mut RogueLiteContext,
        player: &impl PlayerStatus,
    ) -> Vec<NanobotEvent> {
        let mut events = Vec::new();
        if dt <= 0.0 {
            return events;
        }
        self.clock += dt;

        match self.state {
            NanobotState::Building { recipe, remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.state = NanobotState::Building { recipe, remaining };
                } else {
                    events.push(self.finish(recipe, ctx));
                    self.state = if self.config.cooldown > 0.0 {
                        NanobotState::Cooldown { remaining: self.config.cooldown }
                    } else {
                        NanobotState::Idle
                    };
                    self.decision_timer = 0.0;
                }
                return events;
            }
            NanobotState::Cooldown { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.state = NanobotState::Cooldown { remaining };
                    return events;
                }
                self.state = NanobotState::Idle;
                self.decision_timer = 0.0;
            }
            NanobotState::Idle => {}
        }

        self.decision_timer -= dt;
        if self.decision_timer > 0.0 {
            return events;
        }
        self.decision_timer = self.config.decision_interval;

        if let Some((recipe, priority)) = self.select(ctx, player) {
            if let Some(event) = self.start(recipe, priority, ctx) {
                events.push(event);
            }
        }
        events
    }

    /// Interrupts the current build. The cost is not refunded.
    pub fn abort(&mut self) -> Option<NanobotEvent> {
        self.queue.clear();
        self.decision_timer = 0.0;
        let previous = std::mem::replace(&mut self.state, NanobotState::Idle);
        match previous {
            NanobotState::Building { recipe, .. } => {
                tracing::debug!("Nanobot build of {} aborted", recipe);
                Some(NanobotEvent::BuildAborted { recipe })
            }
            _ => None,
        }
    }

    /// Aborts and forgets per-run scheduling state.
    pub fn reset_for_run(&mut self) -> Option<NanobotEvent> {
        let aborted = self.abort();
        self.power_up_order.clear();
        self.power_up_revision = None;
        self.generic_ready_at.clear();
        aborted
    }

    /// Picks the next recipe to build, if any.
    pub fn select(
        &mut self,
        ctx: &RogueLiteContext,
        player: &impl PlayerStatus,
    ) -> Option<(RecipeId, BuildPriority)> {
        let catalog = ctx.catalog_handle();
        let resources = ctx.persistent().resources();
        let buildable = |r: &Recipe| r.cost <= resources && r.should_build(player);

        while let Some(&id) = self.queue.front() {
            match catalog.get(&id) {
                Some(recipe) if !recipe.should_build(player) => {
                    tracing::debug!("Dropping queued {}: not needed", recipe.name);
                    self.queue.pop_front();
                }
                Some(recipe) if recipe.cost <= resources => {
                    self.queue.pop_front();
                    return Some((id, BuildPriority::Queued));
                }
                Some(_) => break,
                None => {
                    tracing::error!("Dropping unknown queued recipe {}", id);
                    self.queue.pop_front();
                }
            }
        }

        let distinct = ctx.run().distinct();
        let held: Vec<&Recipe> = distinct.iter().filter_map(|id| catalog.get(id)).collect();

        if let Some(id) = neediest_ammo(&held, player, self.config.emergency_ammo_threshold, &buildable) {
            return Some((id, BuildPriority::EmergencyAmmo));
        }

        let missing = player.missing_health();
        if missing > 0.0 {
            let heals = held.iter().filter_map(|r| match r.kind {
                RecipeKind::Health { heal_amount } if buildable(*r) => Some((r.id, heal_amount)),
                _ => None,
            });
            if let Some(id) = choose_heal(heals, missing) {
                return Some((id, BuildPriority::Health));
            }
        }

        if let Some(r) = held
            .iter()
            .copied()
            .find(|r| matches!(r.kind, RecipeKind::Shield { .. }) && buildable(*r))
        {
            return Some((r.id, BuildPriority::Shield));
        }

        let revision = ctx.run().revision();
        if self.power_up_revision != Some(revision) {
            self.power_up_order = held
                .iter()
                .filter(|r| matches!(r.kind, RecipeKind::Weapon { .. } | RecipeKind::Tool { .. }))
                .map(|r| r.id)
                .collect();
            self.power_up_order.shuffle(&mut self.rng);
            self.power_up_revision = Some(revision);
        }
        if let Some(id) = self
            .power_up_order
            .iter()
            .find(|id| catalog.get(id).is_some_and(&buildable))
        {
            return Some((*id, BuildPriority::PowerUp));
        }

        if let Some(id) = neediest_ammo(&held, player, self.config.topup_ammo_threshold, &buildable) {
            return Some((id, BuildPriority::TopUpAmmo));
        }

        for recipe in &held {
            let RecipeKind::Generic { approx_frequency, .. } = recipe.kind else {
                continue;
            };
            let ready_at = match self.generic_ready_at.get(&recipe.id) {
                Some(t) => *t,
                None => {
                    let t = self.clock + self.jittered(approx_frequency);
                    self.generic_ready_at.insert(recipe.id, t);
                    t
                }
            };
            if self.clock >= ready_at && buildable(recipe) {
                return Some((recipe.id, BuildPriority::Generic));
            }
        }

        None
    }

    fn start(
        &mut self,
        id: RecipeId,
        priority: BuildPriority,
        ctx: &mut RogueLiteContext,
    ) -> Option<NanobotEvent> {
        let catalog = ctx.catalog_handle();
        let recipe = catalog.get(&id)?;
        if let Err(e) = ctx.spend_resources(recipe.cost) {
            tracing::debug!("Cannot start {}: {}", recipe.name, e);
            return None;
        }

        if let RecipeKind::Generic { approx_frequency, .. } = recipe.kind {
            let next = self.clock + self.jittered(approx_frequency);
            self.generic_ready_at.insert(id, next);
        }

        self.state = NanobotState::Building {
            recipe: id,
            remaining: recipe.build_time,
        };
        tracing::debug!(
            "Nanobots building {} ({:?}, cost {}, {:.1}s)",
            recipe.name,
            priority,
            recipe.cost,
            recipe.build_time
        );

        Some(NanobotEvent::BuildStarted {
            recipe: id,
            name: recipe.name.clone(),
            cost: recipe.cost,
            build_time: recipe.build_time,
            priority,
            cue: recipe
                .feedback
                .start_cue
                .clone()
                .unwrap_or_else(|| self.config.start_cue.clone()),
        })
    }

    fn finish(&mut self, id: RecipeId, ctx: &RogueLiteContext) -> NanobotEvent {
        self.builds_completed += 1;
        let Some(recipe) = ctx.catalog().get(&id) else {
            tracing::error!("Finished build of unknown recipe {}", id);
            return NanobotEvent::BuildFinished {
                recipe: id,
                name: String::new(),
                cue: self.config.complete_cue.clone(),
                output: None,
            };
        };

        if let Some(ammo) = recipe.ammo_recipe() {
            self.queue.push_back(ammo);
        }
        tracing::debug!("Nanobots finished {}", recipe.name);

        NanobotEvent::BuildFinished {
            recipe: id,
            name: recipe.name.clone(),
            cue: recipe
                .feedback
                .complete_cue
                .clone()
                .unwrap_or_else(|| self.config.complete_cue.clone()),
            output: recipe.build_output(),
        }
    }

    fn jittered(&mut self, seconds: f32) -> f32 {
        let jitter = self.config.generic_jitter.clamp(0.0, 1.0);
        if jitter <= 0.0 {
            return seconds;
        }
        seconds * (1.0 + self.rng.gen_range(-jitter..=jitter))
    }
}

/// Ammo recipe for the emptiest ammo type below `threshold`.
fn neediest_ammo(
    held: &[&Recipe],
    player: &impl PlayerStatus,
    threshold: f32,
    buildable: &impl Fn(&Recipe) -> bool,
) -> Option<RecipeId> {
    held.iter()
        .filter_map(|r| match &r.kind {
            RecipeKind::Ammo { ammo_type, .. } => Some((*r, player.ammo_fraction(ammo_type))),
            _ => None,
        })
        .filter(|(r, fraction)| *fraction < threshold && buildable(*r))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(r, _)| r.id)
}

/// Smallest heal covering `missing`, otherwise the largest heal.
fn choose_heal(heals: impl Iterator<Item = (RecipeId, f32)>, missing: f32) -> Option<RecipeId> {
    let mut covering: Option<(RecipeId, f32)> = None;
    let mut largest: Option<(RecipeId, f32)> = None;
    for (id, heal) in heals {
        if heal >= missing {
            let excess = heal - missing;
            if covering.map_or(true, |(_, best)| excess < best) {
                covering = Some((id, excess));
            }
        }
        if largest.map_or(true, |(_, best)| heal > best) {
            largest = Some((id, heal));
        }
    }
    covering.or(largest).map(|(id, _)| id)
}
