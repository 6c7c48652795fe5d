//! # Session Error Types

use rogue_wave_economy::EconomyError;
use rogue_wave_procedural::GenerationError;
use thiserror::Error;

/// Errors that can occur while running a session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Level generation failed.
    #[error("level generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Economy or profile operation failed.
    #[error("economy error: {0}")]
    Economy(#[from] EconomyError),

    /// Invalid game configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The requested game mode is not configured.
    #[error("unknown game mode: {0}")]
    UnknownGameMode(String),

    /// The campaign has no levels.
    #[error("the campaign has no levels")]
    NoLevels,

    /// Filesystem failure.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
