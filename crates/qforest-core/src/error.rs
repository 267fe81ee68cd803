//! Error types for qforest-core
//!
//! Provides a unified error type for the image, arena and collection
//! types of the core crate. Each variant captures enough context for
//! diagnostics without exposing internal layout.
//!
//! # Taxonomy
//!
//! - invalid argument: [`Error::InvalidDimension`], [`Error::IndexOutOfBounds`],
//!   [`Error::InvalidParameter`], [`Error::DimensionMismatch`]
//! - invalid state: [`Error::InvalidState`]
//! - resource exhaustion: [`Error::ResourceExhausted`]
//! - not found: [`Error::NotFound`]
//! - unimplemented: [`Error::Unimplemented`]

use thiserror::Error;

/// qforest-core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid image dimensions
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    /// Index out of bounds
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Image dimension mismatch
    #[error("dimension mismatch: expected {}x{}, got {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation is not valid in the current state of the object
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Memory for a record could not be reserved
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Item is not part of the collection
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation is reserved but not provided
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),
}

/// Result type alias for qforest-core operations
pub type Result<T> = std::result::Result<T, Error>;
