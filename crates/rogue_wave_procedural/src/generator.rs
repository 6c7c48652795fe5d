//! # Level Generator
//!
//! **Seeded, constraint-satisfying tile placement.**
//!
//! ## Algorithm
//!
//! A simplified wave-function-collapse pass without backtracking:
//!
//! ```text
//! for attempt in 0..max_attempts:
//!     grid = pre-placed tiles
//!     for cell in scan order (row-major, south to north):
//!         candidates = palette
//!             ∩ region contains cell centre
//!             ∩ under max_instances
//!             ∩ compatible with every placed neighbour (both edges)
//!         empty      -> attempt fails (dead end)
//!         required   -> first unplaced required candidate
//!         otherwise  -> weighted draw, weight = base × Π edge weights
//!     every required tile placed? -> done
//! ```
//!
//! A failed attempt retries with `seed.derive(attempt)`. The generator
//! never places a tile that breaks a constraint: if every attempt fails,
//! generation returns an error.
//!
//! ## Side Effects
//!
//! Placement and population are separate phases. Tiles are handed to the
//! [`TilePopulator`] only once the whole grid is resolved, in scan order,
//! so content for a cell is created after its final definition is fixed.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::error::{GenerationError, GenerationResult};
use crate::grid::{GridCoord, LevelGrid, TileInstance};
use crate::level::CampaignLevel;
use crate::seed::{LevelSeed, POPULATE_STREAM};
use crate::tile::{Direction, TileDefinition, TilePalette};

/// Hook invoked for every tile once its cell is final.
pub trait TilePopulator {
    /// Creates the content of one tile (ground, structures, spawners).
    fn populate(&mut self, tile: &TileInstance, definition: &TileDefinition, rng: &mut ChaCha8Rng);
}

/// Why a single attempt failed.
#[derive(Clone, Debug, PartialEq, Eq)]
enum AttemptFailure {
    /// No candidate for this cell.
    DeadEnd(GridCoord),
    /// A required tile (palette index) was never placed.
    RequiredMissing(usize),
}

/// A fully resolved level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedLevel {
    /// The placed tiles.
    pub grid: LevelGrid,
    /// Seed of the attempt that succeeded.
    pub seed: LevelSeed,
    /// Number of attempts used (1 = first try).
    pub attempts: u32,
}

impl GeneratedLevel {
    /// Hands every tile to `populator` in scan order.
    ///
    /// Uses an RNG stream derived from the level seed, so population is as
    /// reproducible as placement.
    pub fn populate(&self, palette: &TilePalette, populator: &mut impl TilePopulator) {
        let mut rng = self.seed.derive(POPULATE_STREAM).rng();
        for tile in self.grid.tiles() {
            if let Some(definition) = palette.get(&tile.tile) {
                populator.populate(tile, definition, &mut rng);
            }
        }
    }

    /// Re-checks adjacency and region invariants; empty when the level is valid.
    #[must_use]
    pub fn verify(&self, palette: &TilePalette) -> Vec<String> {
        self.grid.violations(palette)
    }
}

/// Generator for one campaign level.
pub struct LevelGenerator<'a> {
    level: &'a CampaignLevel,
}

impl<'a> LevelGenerator<'a> {
    /// Creates a generator for a level.
    #[must_use]
    pub const fn new(level: &'a CampaignLevel) -> Self {
        Self { level }
    }

    /// Generates the level.
    ///
    /// # Errors
    ///
    /// - Pre-placement errors if fixed tiles are invalid
    /// - `Unsatisfiable` if every attempt hit a dead end
    /// - `RequiredTileMissing` if a required tile never fit
    pub fn generate(&self, seed: LevelSeed) -> GenerationResult<GeneratedLevel> {
        let palette = self.level.palette();
        let base = self.place_fixed()?;
        let max_attempts = self.level.max_attempts();

        let mut last_failure = None;
        for attempt in 0..max_attempts {
            let attempt_seed = if attempt == 0 {
                seed
            } else {
                seed.derive(u64::from(attempt))
            };

            match self.resolve(&base, attempt_seed) {
                Ok(grid) => {
                    tracing::info!(
                        "Generated level {} ({}x{}) with seed {:#x} in {} attempt(s)",
                        self.level.name(),
                        grid.x_size(),
                        grid.y_size(),
                        attempt_seed.value(),
                        attempt + 1
                    );
                    return Ok(GeneratedLevel {
                        grid,
                        seed: attempt_seed,
                        attempts: attempt + 1,
                    });
                }
                Err(failure) => {
                    match &failure {
                        AttemptFailure::DeadEnd(coord) => tracing::warn!(
                            "Level {} attempt {} hit a dead end at ({}, {})",
                            self.level.name(),
                            attempt + 1,
                            coord.x,
                            coord.y
                        ),
                        AttemptFailure::RequiredMissing(index) => tracing::warn!(
                            "Level {} attempt {} never placed required tile {}",
                            self.level.name(),
                            attempt + 1,
                            palette.at(*index).id
                        ),
                    }
                    last_failure = Some(failure);
                }
            }
        }

        Err(match last_failure {
            Some(AttemptFailure::RequiredMissing(index)) => GenerationError::RequiredTileMissing {
                tile: palette.at(index).id.to_string(),
                attempts: max_attempts,
            },
            Some(AttemptFailure::DeadEnd(coord)) => GenerationError::Unsatisfiable {
                x: coord.x,
                y: coord.y,
                attempts: max_attempts,
            },
            None => GenerationError::InvalidLevel("no generation attempts were made".to_string()),
        })
    }

    /// Generates the level and populates it.
    ///
    /// # Errors
    ///
    /// See [`LevelGenerator::generate`].
    pub fn generate_populated(
        &self,
        seed: LevelSeed,
        populator: &mut impl TilePopulator,
    ) -> GenerationResult<GeneratedLevel> {
        let level = self.generate(seed)?;
        level.populate(self.level.palette(), populator);
        Ok(level)
    }

    /// Validates fixed placements and returns the palette-index grid holding them.
    fn place_fixed(&self) -> GenerationResult<Vec<Option<usize>>> {
        let palette = self.level.palette();
        let probe = LevelGrid::new(self.level.x_size(), self.level.y_size());
        let mut cells = vec![None; (self.level.x_size() as usize) * (self.level.y_size() as usize)];

        for fixed in self.level.pre_placed() {
            let coord = fixed.coord();
            if !probe.in_bounds(coord) {
                return Err(GenerationError::PrePlacedOutOfBounds {
                    tile: fixed.tile.to_string(),
                    x: fixed.x,
                    y: fixed.y,
                });
            }
            let index = palette
                .index_of(&fixed.tile)
                .ok_or_else(|| GenerationError::UnknownTile(fixed.tile.to_string()))?;
            let (u, v) = probe.normalized(coord);
            if !palette.at(index).region.contains(u, v) {
                return Err(GenerationError::PrePlacedOutsideRegion {
                    tile: fixed.tile.to_string(),
                    x: fixed.x,
                    y: fixed.y,
                });
            }
            let slot = &mut cells[self.cell_index(coord)];
            if slot.is_some() {
                return Err(GenerationError::PrePlacedConflict {
                    x: fixed.x,
                    y: fixed.y,
                });
            }
            *slot = Some(index);
        }

        // Fixed tiles must accept each other
        for coord in probe.coords() {
            let Some(index) = cells[self.cell_index(coord)] else {
                continue;
            };
            for direction in Direction::ALL {
                let Some(next) = probe.neighbor_coord(coord, direction) else {
                    continue;
                };
                if let Some(other) = cells[self.cell_index(next)] {
                    if palette
                        .compatible(palette.at(index), direction, palette.at(other))
                        .is_none()
                    {
                        return Err(GenerationError::PrePlacedConflict {
                            x: coord.x,
                            y: coord.y,
                        });
                    }
                }
            }
        }

        let mut counts = vec![0u32; palette.len()];
        for index in cells.iter().flatten() {
            counts[*index] += 1;
        }
        for (index, count) in counts.iter().enumerate() {
            if let Some(max) = palette.at(index).max_instances {
                if *count > max {
                    return Err(GenerationError::InvalidLevel(format!(
                        "tile {} is pre-placed {} times but capped at {}",
                        palette.at(index).id,
                        count,
                        max
                    )));
                }
            }
        }

        Ok(cells)
    }

    #[inline]
    fn cell_index(&self, coord: GridCoord) -> usize {
        coord.y as usize * self.level.x_size() as usize + coord.x as usize
    }

    /// Runs one placement attempt.
    fn resolve(&self, fixed: &[Option<usize>], seed: LevelSeed) -> Result<LevelGrid, AttemptFailure> {
        let palette = self.level.palette();
        let mut rng = seed.rng();
        let mut cells = fixed.to_vec();
        let mut counts = vec![0u32; palette.len()];
        for index in cells.iter().flatten() {
            counts[*index] += 1;
        }

        let probe = LevelGrid::new(self.level.x_size(), self.level.y_size());
        let mut candidates: Vec<(usize, f32)> = Vec::with_capacity(palette.len());

        for coord in probe.coords() {
            if cells[self.cell_index(coord)].is_some() {
                continue;
            }

            candidates.clear();
            let (u, v) = probe.normalized(coord);
            for (index, definition) in palette.iter().enumerate() {
                if !definition.region.contains(u, v) {
                    continue;
                }
                if definition.max_instances.is_some_and(|max| counts[index] >= max) {
                    continue;
                }
                if let Some(weight) = self.neighbor_weight(&probe, &cells, coord, definition) {
                    candidates.push((index, definition.weight * weight));
                }
            }

            if candidates.is_empty() {
                return Err(AttemptFailure::DeadEnd(coord));
            }

            let chosen = candidates
                .iter()
                .find(|(index, _)| palette.at(*index).required && counts[*index] == 0)
                .map_or_else(|| weighted_pick(&candidates, &mut rng), |(index, _)| *index);

            tracing::trace!("({}, {}) -> {}", coord.x, coord.y, palette.at(chosen).id);
            cells[self.cell_index(coord)] = Some(chosen);
            counts[chosen] += 1;
        }

        if let Some(missing) = (0..palette.len()).find(|&i| palette.at(i).required && counts[i] == 0) {
            return Err(AttemptFailure::RequiredMissing(missing));
        }

        let mut grid = LevelGrid::new(self.level.x_size(), self.level.y_size());
        for coord in probe.coords() {
            if let Some(index) = cells[self.cell_index(coord)] {
                grid.set(TileInstance {
                    coord,
                    tile: palette.at(index).id.clone(),
                    pre_placed: fixed[self.cell_index(coord)].is_some(),
                });
            }
        }
        Ok(grid)
    }

    /// Product of edge weights against placed neighbours, `None` if any rejects.
    ///
    /// Off-grid and empty neighbours are always compatible.
    fn neighbor_weight(
        &self,
        probe: &LevelGrid,
        cells: &[Option<usize>],
        coord: GridCoord,
        definition: &TileDefinition,
    ) -> Option<f32> {
        let palette = self.level.palette();
        let mut weight = 1.0;
        for direction in Direction::ALL {
            let Some(next) = probe.neighbor_coord(coord, direction) else {
                continue;
            };
            let Some(neighbor) = cells[self.cell_index(next)] else {
                continue;
            };
            weight *= palette.compatible(definition, direction, palette.at(neighbor))?;
        }
        Some(weight)
    }
}

/// Weighted random draw over `(palette index, weight)` pairs.
fn weighted_pick(candidates: &[(usize, f32)], rng: &mut ChaCha8Rng) -> usize {
    let total: f32 = candidates.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen::<f32>() * total;
    for &(index, weight) in candidates {
        if roll < weight {
            return index;
        }
        roll -= weight;
    }
    // Rounding can leave a sliver past the last bucket
    candidates[candidates.len() - 1].0
}
