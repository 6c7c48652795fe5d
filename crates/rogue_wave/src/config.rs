//! # Game Configuration
//!
//! All balance data for a session, authored as one TOML file:
//!
//! ```toml
//! [nanobots]
//! decision_interval = 0.5
//! cooldown = 1.0
//!
//! [levelling]
//! base_cost = 100
//! growth = 1.25
//!
//! [session]
//! autosave_interval = 30.0
//! offers_per_level_up = 3
//!
//! [encounters]
//! wave_band = 3
//!
//! [campaign]
//! levels = ["outskirts.toml", "foundry.toml"]
//!
//! [[game_mode]]
//! name = "Campaign"
//! scene = "hub"
//! run_starting_recipes = ["5f0d6b36-3a0e-4a51-9a43-6f0f8a0bd1a1"]
//! ```
//!
//! Every section is optional and falls back to its defaults.

use rogue_wave_economy::{GameMode, LevellingConfig, NanobotConfig, RecipeCatalog};
use rogue_wave_procedural::{EncounterConfig, LevelSeed};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{SessionError, SessionResult};

/// Session pacing and persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds between autosaves while playing.
    pub autosave_interval: f32,
    /// Recipes offered per nanobot level-up.
    pub offers_per_level_up: usize,
    /// Event channel capacity.
    pub event_capacity: usize,
    /// Seed every level seed is derived from.
    pub base_seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_interval: 30.0,
            offers_per_level_up: 3,
            event_capacity: 1024,
            base_seed: LevelSeed::default().value(),
        }
    }
}

/// Ordered campaign level files, relative to the levels directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Level files in play order.
    pub levels: Vec<String>,
}

/// Complete game configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Nanobot scheduler tuning.
    pub nanobots: NanobotConfig,
    /// Nanobot levelling curve.
    pub levelling: LevellingConfig,
    /// Session pacing.
    pub session: SessionConfig,
    /// Enemy spawner placement.
    pub encounters: EncounterConfig,
    /// Campaign level order.
    pub campaign: CampaignConfig,
    /// Playable modes.
    #[serde(rename = "game_mode")]
    pub game_modes: Vec<GameMode>,
}

impl GameConfig {
    /// Parses and validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns `Config` on malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> SessionResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Io` when the file cannot be read, or any parse error.
    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Config` describing the first invalid value.
    pub fn validate(&self) -> SessionResult<()> {
        let n = &self.nanobots;
        if n.decision_interval.is_nan() || n.decision_interval <= 0.0 {
            return Err(SessionError::Config("nanobots.decision_interval must be positive".into()));
        }
        if n.cooldown < 0.0 {
            return Err(SessionError::Config("nanobots.cooldown must not be negative".into()));
        }
        if !(0.0..=1.0).contains(&n.emergency_ammo_threshold) || !(0.0..=1.0).contains(&n.topup_ammo_threshold) {
            return Err(SessionError::Config("ammo thresholds must lie in 0..=1".into()));
        }
        if n.emergency_ammo_threshold > n.topup_ammo_threshold {
            return Err(SessionError::Config(
                "nanobots.emergency_ammo_threshold exceeds topup_ammo_threshold".into(),
            ));
        }
        if !(0.0..=1.0).contains(&n.generic_jitter) {
            return Err(SessionError::Config("nanobots.generic_jitter must lie in 0..=1".into()));
        }
        if self.levelling.base_cost == 0 || self.levelling.growth.is_nan() || self.levelling.growth < 1.0 {
            return Err(SessionError::Config(
                "levelling needs a positive base_cost and growth of at least 1".into(),
            ));
        }
        if self.session.event_capacity == 0 {
            return Err(SessionError::Config("session.event_capacity must be positive".into()));
        }
        let mut names: Vec<&str> = self.game_modes.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(SessionError::Config(format!("game mode {:?} is defined twice", pair[0])));
        }
        Ok(())
    }

    /// Looks up a game mode by name.
    #[must_use]
    pub fn game_mode(&self, name: &str) -> Option<&GameMode> {
        self.game_modes.iter().find(|m| m.name == name)
    }
}

/// Drops game-mode recipes the catalog does not know, logging each one.
#[must_use]
pub fn resolve_game_mode(mode: &GameMode, catalog: &RecipeCatalog) -> GameMode {
    let keep = |list: &[rogue_wave_economy::RecipeId]| {
        list.iter()
            .filter(|id| {
                let known = catalog.contains(id);
                if !known {
                    tracing::error!("Game mode {:?} lists unknown recipe {}", mode.name, id);
                }
                known
            })
            .copied()
            .collect::<Vec<_>>()
    };

    GameMode {
        name: mode.name.clone(),
        scene: mode.scene.clone(),
        permanent_starting_recipes: keep(&mode.permanent_starting_recipes),
        run_starting_recipes: keep(&mode.run_starting_recipes),
        loadout_size: mode.loadout_size,
    }
}
