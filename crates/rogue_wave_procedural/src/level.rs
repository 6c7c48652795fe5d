//! # Campaign Level Definitions
//!
//! A campaign level bundles the map size, the tile palette and any fixed
//! tile placements. Levels are authored as TOML:
//!
//! ```toml
//! [level]
//! name = "Outskirts"
//! x_size = 5
//! y_size = 5
//! tile_size = 50.0
//!
//! [[tile]]
//! id = "player_spawn"
//! required = true
//! max_instances = 1
//! region = { bottom_left = [0.4, 0.4], top_right = [0.6, 0.6] }
//!
//! [[tile]]
//! id = "plains"
//! weight = 4.0
//! enemy_spawn_chance = 0.2
//!
//! [[pre_placed]]
//! tile = "plains"
//! x = 0
//! y = 0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GenerationError, GenerationResult};
use crate::grid::GridCoord;
use crate::seed::LevelSeed;
use crate::tile::{TileDefinition, TileId, TilePalette};

/// Default number of generation attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// A tile fixed at a position before generation starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrePlacedTile {
    /// The tile to place.
    pub tile: TileId,
    /// Grid X coordinate.
    pub x: u32,
    /// Grid Y coordinate.
    pub y: u32,
}

impl PrePlacedTile {
    /// Returns the cell coordinate.
    #[must_use]
    pub const fn coord(&self) -> GridCoord {
        GridCoord::new(self.x, self.y)
    }
}

/// Map-level settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelSettings {
    /// Display name.
    pub name: String,
    /// Width in tiles.
    pub x_size: u32,
    /// Height in tiles.
    pub y_size: u32,
    /// Edge length of one tile in world units.
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    /// Fixed seed; when absent the caller supplies one.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Generation attempts before failing.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

const fn default_tile_size() -> f32 {
    50.0
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

#[derive(Deserialize)]
struct LevelFile {
    level: LevelSettings,
    #[serde(default, rename = "tile")]
    tiles: Vec<TileDefinition>,
    #[serde(default)]
    pre_placed: Vec<PrePlacedTile>,
}

/// A validated campaign level definition.
#[derive(Clone, Debug)]
pub struct CampaignLevel {
    settings: LevelSettings,
    palette: TilePalette,
    pre_placed: Vec<PrePlacedTile>,
}

impl CampaignLevel {
    /// Builds and validates a level.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLevel` for zero-sized maps or zero attempts, and
    /// `UnknownTile` when a pre-placed tile is not in the palette.
    pub fn new(
        settings: LevelSettings,
        palette: TilePalette,
        pre_placed: Vec<PrePlacedTile>,
    ) -> GenerationResult<Self> {
        if settings.x_size == 0 || settings.y_size == 0 {
            return Err(GenerationError::InvalidLevel(format!(
                "level {} has an empty map ({}x{})",
                settings.name, settings.x_size, settings.y_size
            )));
        }
        if settings.max_attempts == 0 {
            return Err(GenerationError::InvalidLevel(format!(
                "level {} allows zero generation attempts",
                settings.name
            )));
        }
        for fixed in &pre_placed {
            if palette.get(&fixed.tile).is_none() {
                return Err(GenerationError::UnknownTile(fixed.tile.to_string()));
            }
        }

        Ok(Self {
            settings,
            palette,
            pre_placed,
        })
    }

    /// Convenience constructor for a sized map with default settings.
    ///
    /// # Errors
    ///
    /// See [`CampaignLevel::new`].
    pub fn with_size(
        name: &str,
        x_size: u32,
        y_size: u32,
        palette: TilePalette,
    ) -> GenerationResult<Self> {
        Self::new(
            LevelSettings {
                name: name.to_string(),
                x_size,
                y_size,
                tile_size: default_tile_size(),
                seed: None,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
            },
            palette,
            Vec::new(),
        )
    }

    /// Parses a level from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Parse` on malformed TOML, or any validation error.
    pub fn from_toml_str(text: &str) -> GenerationResult<Self> {
        let file: LevelFile =
            toml::from_str(text).map_err(|e| GenerationError::Parse(e.to_string()))?;
        let palette = TilePalette::new(file.tiles)?;
        Self::new(file.level, palette, file.pre_placed)
    }

    /// Loads a level from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, or any parse/validation error.
    pub fn load(path: impl AsRef<Path>) -> GenerationResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GenerationError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Adds a fixed placement.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTile` if the tile is not in the palette.
    pub fn pre_place(&mut self, tile: impl Into<TileId>, x: u32, y: u32) -> GenerationResult<()> {
        let tile = tile.into();
        if self.palette.get(&tile).is_none() {
            return Err(GenerationError::UnknownTile(tile.to_string()));
        }
        self.pre_placed.push(PrePlacedTile { tile, x, y });
        Ok(())
    }

    /// Sets the generation attempt budget (minimum 1).
    pub fn set_max_attempts(&mut self, attempts: u32) {
        self.settings.max_attempts = attempts.max(1);
    }

    /// Level settings.
    #[must_use]
    pub const fn settings(&self) -> &LevelSettings {
        &self.settings
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// Width in tiles.
    #[must_use]
    pub const fn x_size(&self) -> u32 {
        self.settings.x_size
    }

    /// Height in tiles.
    #[must_use]
    pub const fn y_size(&self) -> u32 {
        self.settings.y_size
    }

    /// The tile palette.
    #[must_use]
    pub const fn palette(&self) -> &TilePalette {
        &self.palette
    }

    /// Fixed placements.
    #[must_use]
    pub fn pre_placed(&self) -> &[PrePlacedTile] {
        &self.pre_placed
    }

    /// Generation attempt budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.settings.max_attempts
    }

    /// The level's fixed seed, if it has one.
    #[must_use]
    pub fn fixed_seed(&self) -> Option<LevelSeed> {
        self.settings.seed.map(LevelSeed::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTSKIRTS: &str = r#"
        [level]
        name = "Outskirts"
        x_size = 4
        y_size = 3
        seed = 99

        [[tile]]
        id = "plains"
        weight = 4.0
        enemy_spawn_chance = 0.25

        [[tile]]
        id = "rocks"
        terrain = "terrain"
        [tile.edges]
        north = [{ tile = "plains", weight = 2.0 }, { tile = "rocks" }]

        [[pre_placed]]
        tile = "rocks"
        x = 3
        y = 2
    "#;

    #[test]
    fn test_parse_level() {
        let level = CampaignLevel::from_toml_str(OUTSKIRTS).unwrap();
        assert_eq!(level.name(), "Outskirts");
        assert_eq!((level.x_size(), level.y_size()), (4, 3));
        assert_eq!(level.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(level.fixed_seed(), Some(LevelSeed::new(99)));
        assert_eq!(level.palette().len(), 2);
        assert_eq!(level.pre_placed().len(), 1);

        let rocks = level.palette().get(&"rocks".into()).unwrap();
        assert_eq!(rocks.edges.north.as_ref().map(Vec::len), Some(2));
        assert!(rocks.edges.east.is_none());
        assert_eq!(rocks.weight, 1.0);
    }

    #[test]
    fn test_unknown_pre_placed_tile_rejected() {
        let text = OUTSKIRTS.replace("tile = \"rocks\"\n        x = 3", "tile = \"lava\"\n        x = 3");
        let err = CampaignLevel::from_toml_str(&text).unwrap_err();
        assert_eq!(err, GenerationError::UnknownTile("lava".to_string()));
    }

    #[test]
    fn test_empty_map_rejected() {
        let palette = TilePalette::new(vec![TileDefinition::new("a")]).unwrap();
        assert!(matches!(
            CampaignLevel::with_size("void", 0, 3, palette),
            Err(GenerationError::InvalidLevel(_))
        ));
    }
}
