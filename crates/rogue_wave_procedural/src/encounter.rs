//! # Encounter Planning
//!
//! The built-in [`TilePopulator`]: decides which tiles get enemy spawners,
//! which wave each spawner belongs to, and where structures can stand.
//!
//! Waves grow outward from an anchor tile (normally the player spawn):
//! spawners within `safe_radius` cells of the anchor are suppressed, and
//! the wave index is the anchor distance divided by `wave_band`.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::generator::TilePopulator;
use crate::grid::{GridCoord, TileInstance};
use crate::tile::{TerrainKind, TileDefinition, TileId};

/// Encounter tuning, loaded with the game configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Tile the waves are measured from.
    pub anchor_tile: TileId,
    /// Cells of Manhattan distance per wave.
    pub wave_band: u32,
    /// No spawners within this distance of the anchor.
    pub safe_radius: u32,
    /// Tiles that never receive spawners.
    pub safe_tiles: Vec<TileId>,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            anchor_tile: TileId::from("player_spawn"),
            wave_band: 3,
            safe_radius: 1,
            safe_tiles: Vec::new(),
        }
    }
}

/// An enemy spawner assigned to a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnerPlacement {
    /// Tile holding the spawner.
    pub coord: GridCoord,
    /// Wave index, 0 closest to the anchor.
    pub wave: u32,
}

/// Result of populating a level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterPlan {
    /// Enemy spawners in population order.
    pub spawners: Vec<SpawnerPlacement>,
    /// Flat tiles available for structures.
    pub structure_sites: Vec<GridCoord>,
    /// Every populated tile, in population order.
    pub populated: Vec<GridCoord>,
}

impl EncounterPlan {
    /// Number of distinct waves.
    #[must_use]
    pub fn wave_count(&self) -> u32 {
        self.spawners.iter().map(|s| s.wave + 1).max().unwrap_or(0)
    }

    /// Spawners belonging to one wave.
    pub fn wave(&self, wave: u32) -> impl Iterator<Item = &SpawnerPlacement> {
        self.spawners.iter().filter(move |s| s.wave == wave)
    }
}

/// Populator that builds an [`EncounterPlan`].
pub struct EncounterPlanner {
    config: EncounterConfig,
    anchor: Option<GridCoord>,
    plan: EncounterPlan,
}

impl EncounterPlanner {
    /// Creates a planner. `anchor` is the location of the anchor tile, if placed.
    #[must_use]
    pub fn new(config: EncounterConfig, anchor: Option<GridCoord>) -> Self {
        Self {
            config,
            anchor,
            plan: EncounterPlan::default(),
        }
    }

    /// Finishes planning and returns the plan.
    #[must_use]
    pub fn finish(self) -> EncounterPlan {
        tracing::debug!(
            "Encounter plan: {} spawners over {} waves, {} structure sites",
            self.plan.spawners.len(),
            self.plan.wave_count(),
            self.plan.structure_sites.len()
        );
        self.plan
    }

    fn distance(&self, coord: GridCoord) -> u32 {
        self.anchor.map_or(u32::MAX, |anchor| anchor.manhattan(coord))
    }
}

impl TilePopulator for EncounterPlanner {
    fn populate(&mut self, tile: &TileInstance, definition: &TileDefinition, rng: &mut ChaCha8Rng) {
        self.plan.populated.push(tile.coord);

        if definition.terrain == TerrainKind::Flat {
            self.plan.structure_sites.push(tile.coord);
        }

        // Roll before any early-out so the stream does not depend on the config
        let roll: f32 = rng.gen();
        if roll >= definition.enemy_spawn_chance {
            return;
        }
        if self.config.safe_tiles.contains(&tile.tile) || tile.tile == self.config.anchor_tile {
            return;
        }

        let distance = self.distance(tile.coord);
        if self.anchor.is_some() && distance <= self.config.safe_radius {
            return;
        }

        let wave = match self.anchor {
            Some(_) => distance / self.config.wave_band.max(1),
            None => 0,
        };
        self.plan.spawners.push(SpawnerPlacement {
            coord: tile.coord,
            wave,
        });
    }
}
