//! # Tile Definitions
//!
//! Immutable templates for one cell of the level grid.
//!
//! A definition says *where* it may appear (a normalised placement region),
//! *how often* (a selection weight and an optional instance cap) and *next
//! to what* (one edge rule per cardinal direction). Definitions are loaded
//! once as static data and never mutated at runtime.
//!
//! ## Edge Rules
//!
//! ```text
//!              North (+y)
//!                 ▲
//!   West (-x) ◄───┼───► East (+x)
//!                 ▼
//!              South (-y)
//! ```
//!
//! A direction omitted in data accepts any neighbour. A direction that is
//! present accepts only the listed neighbours, each with a weight
//! multiplier applied when the candidate is drawn.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{GenerationError, GenerationResult};

/// Stable identifier of a tile definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(String);

impl TileId {
    /// Creates a tile id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TileId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Cardinal direction on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards +y.
    North,
    /// Towards +x.
    East,
    /// Towards -y.
    South,
    /// Towards -x.
    West,
}

impl Direction {
    /// All four directions, in the order edges are checked.
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Returns the opposite direction.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Grid offset `(dx, dy)` of this direction.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> (i64, i64) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }
}

/// Placement region as a fraction of the map extent (inclusive on both ends).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementRegion {
    /// Normalised bottom-left corner `[x, y]`.
    pub bottom_left: [f32; 2],
    /// Normalised top-right corner `[x, y]`.
    pub top_right: [f32; 2],
}

impl PlacementRegion {
    /// The whole map.
    pub const FULL: Self = Self {
        bottom_left: [0.0, 0.0],
        top_right: [1.0, 1.0],
    };

    /// Creates a region from its corners.
    #[must_use]
    pub const fn new(bottom_left: [f32; 2], top_right: [f32; 2]) -> Self {
        Self {
            bottom_left,
            top_right,
        }
    }

    /// Checks whether a normalised coordinate lies inside the region.
    #[inline]
    #[must_use]
    pub fn contains(&self, u: f32, v: f32) -> bool {
        u >= self.bottom_left[0]
            && u <= self.top_right[0]
            && v >= self.bottom_left[1]
            && v <= self.top_right[1]
    }

    fn is_well_formed(&self) -> bool {
        let in_unit = |c: f32| (0.0..=1.0).contains(&c);
        self.bottom_left.iter().chain(&self.top_right).all(|&c| in_unit(c))
            && self.bottom_left[0] <= self.top_right[0]
            && self.bottom_left[1] <= self.top_right[1]
    }
}

impl Default for PlacementRegion {
    fn default() -> Self {
        Self::FULL
    }
}

/// One accepted neighbour on an edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileConstraint {
    /// The accepted neighbour.
    pub tile: TileId,
    /// Weight multiplier applied when this neighbour is present.
    #[serde(default = "default_weight")]
    pub weight: f32,
}

impl TileConstraint {
    /// Creates a constraint with weight 1.
    #[must_use]
    pub fn new(tile: impl Into<TileId>) -> Self {
        Self {
            tile: tile.into(),
            weight: 1.0,
        }
    }

    /// Sets the weight multiplier.
    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }
}

impl From<String> for TileId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

const fn default_weight() -> f32 {
    1.0
}

/// Edge rules for the four directions. `None` accepts any neighbour.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileEdges {
    /// Rule towards +y.
    pub north: Option<Vec<TileConstraint>>,
    /// Rule towards +x.
    pub east: Option<Vec<TileConstraint>>,
    /// Rule towards -y.
    pub south: Option<Vec<TileConstraint>>,
    /// Rule towards -x.
    pub west: Option<Vec<TileConstraint>>,
}

impl TileEdges {
    /// Returns the constraint list for a direction, `None` when unconstrained.
    #[must_use]
    pub fn rule(&self, direction: Direction) -> Option<&[TileConstraint]> {
        match direction {
            Direction::North => self.north.as_deref(),
            Direction::East => self.east.as_deref(),
            Direction::South => self.south.as_deref(),
            Direction::West => self.west.as_deref(),
        }
    }

    /// Sets the constraint list for a direction.
    pub fn set_rule(&mut self, direction: Direction, constraints: Vec<TileConstraint>) {
        let slot = match direction {
            Direction::North => &mut self.north,
            Direction::East => &mut self.east,
            Direction::South => &mut self.south,
            Direction::West => &mut self.west,
        };
        *slot = Some(constraints);
    }

    /// Checks whether `neighbour` is accepted in `direction`.
    ///
    /// Returns the weight multiplier when accepted.
    #[must_use]
    pub fn accepts(&self, direction: Direction, neighbour: &TileId) -> Option<f32> {
        match self.rule(direction) {
            None => Some(1.0),
            Some(list) => list
                .iter()
                .find(|c| &c.tile == neighbour)
                .map(|c| c.weight),
        }
    }

    fn all_constraints(&self) -> impl Iterator<Item = &TileConstraint> {
        Direction::ALL
            .into_iter()
            .filter_map(|d| self.rule(d))
            .flatten()
    }
}

/// Ground type of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    /// Flat ground; structures may be placed.
    #[default]
    Flat,
    /// Uneven terrain.
    Terrain,
}

/// Immutable template for one grid cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    /// Unique id.
    pub id: TileId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Where on the map this tile may appear.
    #[serde(default)]
    pub region: PlacementRegion,
    /// Base selection weight.
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Neighbour rules.
    #[serde(default)]
    pub edges: TileEdges,
    /// Ground type.
    #[serde(default)]
    pub terrain: TerrainKind,
    /// Probability of an enemy spawner on this tile.
    #[serde(default)]
    pub enemy_spawn_chance: f32,
    /// Must appear at least once; chosen outright when it is a candidate.
    #[serde(default)]
    pub required: bool,
    /// Upper bound on occurrences in one level.
    #[serde(default)]
    pub max_instances: Option<u32>,
}

impl TileDefinition {
    /// Creates an unconstrained definition with weight 1.
    #[must_use]
    pub fn new(id: impl Into<TileId>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            region: PlacementRegion::FULL,
            weight: 1.0,
            edges: TileEdges::default(),
            terrain: TerrainKind::Flat,
            enemy_spawn_chance: 0.0,
            required: false,
            max_instances: None,
        }
    }

    /// Sets the placement region.
    #[must_use]
    pub fn with_region(mut self, region: PlacementRegion) -> Self {
        self.region = region;
        self
    }

    /// Sets the selection weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Restricts one edge to the listed neighbours.
    #[must_use]
    pub fn with_edge(mut self, direction: Direction, constraints: Vec<TileConstraint>) -> Self {
        self.edges.set_rule(direction, constraints);
        self
    }

    /// Sets the terrain kind.
    #[must_use]
    pub fn with_terrain(mut self, terrain: TerrainKind) -> Self {
        self.terrain = terrain;
        self
    }

    /// Sets the enemy spawn chance.
    #[must_use]
    pub fn with_enemy_spawn_chance(mut self, chance: f32) -> Self {
        self.enemy_spawn_chance = chance;
        self
    }

    /// Marks the tile as required, at most `max` times.
    #[must_use]
    pub fn required(mut self, max: Option<u32>) -> Self {
        self.required = true;
        self.max_instances = max;
        self
    }

    /// Caps the number of instances.
    #[must_use]
    pub fn with_max_instances(mut self, max: u32) -> Self {
        self.max_instances = Some(max);
        self
    }
}

/// Ordered set of tile definitions. Order is candidate order.
#[derive(Clone, Debug, Default)]
pub struct TilePalette {
    definitions: Vec<TileDefinition>,
    index: HashMap<TileId, usize>,
}

impl TilePalette {
    /// Builds and validates a palette.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPalette` for duplicate ids, non-positive weights,
    /// malformed regions or out-of-range spawn chances, and `UnknownTile`
    /// when an edge references a tile that is not in the palette.
    pub fn new(definitions: Vec<TileDefinition>) -> GenerationResult<Self> {
        if definitions.is_empty() {
            return Err(GenerationError::InvalidPalette(
                "palette must contain at least one tile".to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            if index.insert(def.id.clone(), i).is_some() {
                return Err(GenerationError::InvalidPalette(format!(
                    "tile id {} defined twice",
                    def.id
                )));
            }
            if !(def.weight > 0.0 && def.weight.is_finite()) {
                return Err(GenerationError::InvalidPalette(format!(
                    "tile {} has non-positive weight {}",
                    def.id, def.weight
                )));
            }
            if !def.region.is_well_formed() {
                return Err(GenerationError::InvalidPalette(format!(
                    "tile {} has a malformed placement region",
                    def.id
                )));
            }
            if !(0.0..=1.0).contains(&def.enemy_spawn_chance) {
                return Err(GenerationError::InvalidPalette(format!(
                    "tile {} has enemy spawn chance {} outside [0, 1]",
                    def.id, def.enemy_spawn_chance
                )));
            }
            if def.max_instances == Some(0) && def.required {
                return Err(GenerationError::InvalidPalette(format!(
                    "tile {} is required but capped at zero instances",
                    def.id
                )));
            }
        }

        for def in &definitions {
            for constraint in def.edges.all_constraints() {
                if !index.contains_key(&constraint.tile) {
                    return Err(GenerationError::UnknownTile(constraint.tile.to_string()));
                }
                if !(constraint.weight > 0.0 && constraint.weight.is_finite()) {
                    return Err(GenerationError::InvalidPalette(format!(
                        "tile {} has non-positive edge weight towards {}",
                        def.id, constraint.tile
                    )));
                }
            }
        }

        Ok(Self { definitions, index })
    }

    /// Returns the number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if the palette is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Looks up a definition by id.
    #[must_use]
    pub fn get(&self, id: &TileId) -> Option<&TileDefinition> {
        self.index.get(id).map(|&i| &self.definitions[i])
    }

    /// Returns the palette index of a definition.
    #[must_use]
    pub fn index_of(&self, id: &TileId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Returns the definition at a palette index.
    #[must_use]
    pub fn at(&self, index: usize) -> &TileDefinition {
        &self.definitions[index]
    }

    /// Iterates definitions in candidate order.
    pub fn iter(&self) -> impl Iterator<Item = &TileDefinition> {
        self.definitions.iter()
    }

    /// Checks two-sided compatibility: `tile` placed with `neighbour` in `direction`.
    ///
    /// Returns the candidate-side weight multiplier when both edges accept.
    #[must_use]
    pub fn compatible(
        &self,
        tile: &TileDefinition,
        direction: Direction,
        neighbour: &TileDefinition,
    ) -> Option<f32> {
        let weight = tile.edges.accepts(direction, &neighbour.id)?;
        neighbour.edges.accepts(direction.opposite(), &tile.id)?;
        Some(weight)
    }
}
