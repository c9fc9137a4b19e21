//! Error types for psi-tagger

use std::path::PathBuf;
use thiserror::Error;

/// Tagging error type
#[derive(Debug, Error)]
pub enum TagError {
    /// Consensus needs at least two taggers.
    ///
    /// Not fatal: the caller should wait for more tags or report "not enough
    /// data".
    #[error("Tried to compare taggers' tags when there were less than 2 (found {found})")]
    InsufficientTaggers { found: usize },

    /// No image registered under this path
    #[error("Image not registered: {0}")]
    UnknownImage(String),

    /// An image with this original path is already registered
    #[error("Image already registered: {0}")]
    DuplicateImage(String),

    /// A path did not resolve to an existing file
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// A configuration value could not be interpreted
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// psi-common error
    #[error("Common error: {0}")]
    Common(#[from] psi_common::Error),
}

impl TagError {
    /// Whether this error only means "not enough tags yet"
    pub fn is_insufficient_taggers(&self) -> bool {
        matches!(self, TagError::InsufficientTaggers { .. })
    }
}

/// Result type for tagging operations
pub type TagResult<T> = Result<T, TagError>;
