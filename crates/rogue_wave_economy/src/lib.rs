//! # Rogue Wave Economy
//!
//! Recipes, nanobot builds and rogue-lite progression, independent of any
//! engine.
//!
//! ## Design Principles
//!
//! 1. **Closed recipe kinds**: every dispatch is an exhaustive `match`
//! 2. **Explicit context**: all progression changes go through `RogueLiteContext`
//! 3. **Tick-driven**: build timers and cooldowns advance with `tick(dt)`
//! 4. **External configuration**: recipes and tuning live in TOML files
//!
//! ## Persistence
//!
//! Nothing is written in the background. Callers check
//! `RogueLiteContext::is_dirty` and flush with `save_if_dirty`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rogue_wave_economy::{NanobotConfig, NanobotManager, RecipeLibrary, RogueLiteContext};
//!
//! let catalog = RecipeLibrary::new("data").catalog()?;
//! let mut ctx = RogueLiteContext::new(catalog, game_mode);
//! ctx.pre_spawn_step();
//!
//! let mut nanobots = NanobotManager::new(NanobotConfig::default(), seed);
//! for event in nanobots.tick(dt, &mut ctx, &player) {
//!     host.handle(event);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod catalog;
pub mod data;
pub mod error;
pub mod nanobot;
pub mod offers;
pub mod player;
pub mod profile;
pub mod recipe;
pub mod rogue_lite;

pub use catalog::{RecipeCatalog, RecipeLibrary, RECIPE_DIR};
pub use data::{GameMode, PersistentData, RunData, PERSISTENT_DATA_VERSION};
pub use error::{EconomyError, EconomyResult};
pub use nanobot::{BuildPriority, NanobotConfig, NanobotEvent, NanobotManager, NanobotState};
pub use offers::{LevelUp, LevellingConfig, RecipeOffers};
pub use player::{AmmoPool, PlayerSnapshot, PlayerStatus};
pub use profile::ProfileStore;
pub use recipe::{BuildFeedback, BuildOutput, Recipe, RecipeCategory, RecipeId, RecipeKind};
pub use rogue_lite::{PreSpawnReport, RogueLiteContext};
