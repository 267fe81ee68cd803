//! QForest - Hierarchical region analysis for grayscale images
//!
//! A quad-forest tiles an image with square root trees, subdivides the
//! trees whose content is inconsistent and merges consistent neighbors
//! into segments. Local measurements such as edge strength and intensity
//! deviation are spread over the leaf adjacency by diffusion and feed edge
//! detection, boundary detection and a boundary parser.
//!
//! # Example
//!
//! ```
//! use qforest::Image;
//! use qforest::region::{DeviationOptions, ForestOptions, QuadForest};
//!
//! let image = Image::from_fn(8, 8, |_, _| 100).unwrap();
//! let options = ForestOptions::new().with_tree_max_size(8).with_tree_min_size(2);
//! let mut forest = QuadForest::new(&image, &options).unwrap();
//!
//! let count = forest
//!     .segment_with_deviation(&DeviationOptions::new().with_threshold(5.0))
//!     .unwrap();
//! assert_eq!(count, 1);
//! ```

// Re-export core types (image, statistics and containers used everywhere)
pub use qforest_core::*;

// Re-export the analysis crate as a module
pub use qforest_region as region;
