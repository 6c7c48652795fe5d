//! # Economy Error Types
//!
//! All errors that can occur in the economy system.

use thiserror::Error;

use crate::recipe::RecipeId;

/// Errors that can occur in the economy system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Attempted to spend more resources than are held.
    #[error("insufficient resources: need {required}, have {available}")]
    InsufficientResources {
        /// The amount required.
        required: u32,
        /// The amount available.
        available: u32,
    },

    /// Recipe not found in the catalog.
    #[error("recipe not found: {0}")]
    RecipeNotFound(RecipeId),

    /// Two catalog entries share an id.
    #[error("recipe {0} is defined twice")]
    DuplicateRecipe(RecipeId),

    /// A recipe definition failed validation.
    #[error("invalid recipe {id}: {reason}")]
    InvalidRecipe {
        /// The offending recipe.
        id: RecipeId,
        /// What is wrong with it.
        reason: String,
    },

    /// Detected a cycle in the recipe dependency graph.
    #[error("dependency cycle detected: {0:?}")]
    CycleDetected(Vec<RecipeId>),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to parse a data file.
    #[error("failed to parse {source_name}: {message}")]
    Parse {
        /// File or logical source that failed.
        source_name: String,
        /// Underlying parser message.
        message: String,
    },

    /// Profile name cannot be used as a file name.
    #[error("invalid profile name: {0:?}")]
    InvalidProfileName(String),

    /// No profile file with this name exists.
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    /// Filesystem failure.
    #[error("i/o error on {path}: {message}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying error message.
        message: String,
    },
}

impl EconomyError {
    pub(crate) fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
