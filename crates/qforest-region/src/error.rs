//! Error types for qforest-region

use thiserror::Error;

/// Errors that can occur during forest analysis
#[derive(Debug, Error)]
pub enum RegionError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] qforest_core::Error),

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Operation not valid in the current forest state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Unknown tree, segment or link
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type for region operations
pub type RegionResult<T> = Result<T, RegionError>;
