//! qforest-test - Regression test framework for quad-forest region analysis
//!
//! Regression tests count numbered checks and report every failure at the
//! end instead of stopping at the first one. Three modes are recognised:
//!
//! - **Compare**: Check results against expected values (default)
//! - **Generate**: Same as compare, used when recording new expectations
//! - **Display**: Run tests without failing on mismatches
//!
//! # Usage
//!
//! ```ignore
//! use qforest_test::{RegParams, fixtures};
//!
//! let mut rp = RegParams::new("segmentation");
//! rp.compare_values(2.0, count as f64, 0.0);
//! assert!(rp.cleanup());
//! ```
//!
//! # Environment Variables
//!
//! - `REGTEST_MODE`: Set to "generate", "compare", or "display"

mod error;
mod params;

pub mod fixtures;

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode};
