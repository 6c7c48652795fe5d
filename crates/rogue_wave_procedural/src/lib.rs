//! # Rogue Wave Procedural Generation
//!
//! Deterministic, constraint-satisfying level generation.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same level
//! 2. **Constraint-safe**: Every placed tile satisfies its region and all four edges
//! 3. **Fail loudly**: A level that cannot be satisfied is an error, never a broken grid
//! 4. **Data-driven**: Palettes and levels are authored in TOML
//!
//! ## Core Components
//!
//! - `TileDefinition` / `TilePalette`: immutable tile templates and their constraints
//! - `CampaignLevel`: map size, palette and fixed placements
//! - `LevelGenerator`: seeded scan-order placement with bounded retries
//! - `EncounterPlanner`: enemy spawner and structure placement per tile
//!
//! ## Example
//!
//! ```rust,ignore
//! use rogue_wave_procedural::{CampaignLevel, LevelGenerator, LevelSeed};
//!
//! let level = CampaignLevel::load("data/levels/outskirts.toml")?;
//! let generated = LevelGenerator::new(&level).generate(LevelSeed::new(12345))?;
//!
//! assert!(generated.verify(level.palette()).is_empty());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod encounter;
pub mod error;
pub mod generator;
pub mod grid;
pub mod level;
pub mod seed;
pub mod tile;

pub use encounter::{EncounterConfig, EncounterPlan, EncounterPlanner, SpawnerPlacement};
pub use error::{GenerationError, GenerationResult};
pub use generator::{GeneratedLevel, LevelGenerator, TilePopulator};
pub use grid::{GridCoord, LevelGrid, TileInstance};
pub use level::{CampaignLevel, LevelSettings, PrePlacedTile};
pub use seed::LevelSeed;
pub use tile::{
    Direction, PlacementRegion, TerrainKind, TileConstraint, TileDefinition, TileEdges, TileId,
    TilePalette,
};
