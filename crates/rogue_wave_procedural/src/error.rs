//! # Generation Error Types
//!
//! All errors that can occur while loading or generating a level.

use thiserror::Error;

/// Errors that can occur in level generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The tile palette failed validation.
    #[error("invalid palette: {0}")]
    InvalidPalette(String),

    /// The campaign level definition failed validation.
    #[error("invalid level: {0}")]
    InvalidLevel(String),

    /// A tile id was referenced that the palette does not define.
    #[error("unknown tile: {0}")]
    UnknownTile(String),

    /// A pre-placed tile lies outside the map.
    #[error("pre-placed tile {tile} at ({x}, {y}) is outside the map")]
    PrePlacedOutOfBounds {
        /// The tile that was pre-placed.
        tile: String,
        /// Grid X coordinate.
        x: u32,
        /// Grid Y coordinate.
        y: u32,
    },

    /// A pre-placed tile lies outside its own placement region.
    #[error("pre-placed tile {tile} at ({x}, {y}) is outside its placement region")]
    PrePlacedOutsideRegion {
        /// The tile that was pre-placed.
        tile: String,
        /// Grid X coordinate.
        x: u32,
        /// Grid Y coordinate.
        y: u32,
    },

    /// Two pre-placed tiles occupy the same cell or reject each other as neighbours.
    #[error("pre-placed tiles conflict at ({x}, {y})")]
    PrePlacedConflict {
        /// Grid X coordinate.
        x: u32,
        /// Grid Y coordinate.
        y: u32,
    },

    /// No candidate satisfied the constraints of a cell in any attempt.
    #[error("no tile satisfies the constraints at ({x}, {y}) after {attempts} attempts")]
    Unsatisfiable {
        /// Grid X coordinate of the last dead end.
        x: u32,
        /// Grid Y coordinate of the last dead end.
        y: u32,
        /// Number of attempts made.
        attempts: u32,
    },

    /// A required tile could not be placed in any attempt.
    #[error("required tile {tile} was never placed after {attempts} attempts")]
    RequiredTileMissing {
        /// The required tile.
        tile: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// Failed to read a level file.
    #[error("failed to read {path}: {message}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying error message.
        message: String,
    },

    /// Failed to parse a level file.
    #[error("failed to parse level: {0}")]
    Parse(String),
}

/// Result type for generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;
