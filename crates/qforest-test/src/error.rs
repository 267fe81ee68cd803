//! Error types for the test framework

use thiserror::Error;

/// Errors that can occur during regression testing
#[derive(Debug, Error)]
pub enum TestError {
    /// Failed to build a synthetic test image
    #[error("failed to build fixture '{name}': {message}")]
    Fixture { name: String, message: String },

    /// Value comparison failed
    #[error(
        "value comparison failed at index {index}: expected {expected}, got {actual}, delta {delta}"
    )]
    ValueMismatch {
        index: usize,
        expected: f64,
        actual: f64,
        delta: f64,
    },

    /// Image comparison failed
    #[error("image comparison failed at index {index}")]
    ImageMismatch { index: usize },

    /// Error from the core crate
    #[error("core error: {0}")]
    Core(#[from] qforest_core::Error),
}

/// Result type for test operations
pub type TestResult<T> = Result<T, TestError>;
