//! qforest-region - Quad-forest region analysis
//!
//! This crate builds a forest of quad-trees over a grayscale image and
//! runs its analyses on the leaves:
//!
//! - **Forest** - Root tiling, subdivision and cached neighbor links
//! - **Segmentation** - Union-find merging by deviation or range overlap
//! - **Diffusion** - Multi-round propagation of leaf measures to neighbors
//! - **Edges and boundaries** - Leaves that stand out from their neighborhood
//! - **Parsing** - Boundary strengths on the links between leaves
//!
//! # Examples
//!
//! ## Segmenting an image
//!
//! ```
//! use qforest_core::Image;
//! use qforest_region::{DeviationOptions, ForestOptions, QuadForest};
//!
//! let image = Image::from_fn(16, 16, |x, _| if x < 8 { 50 } else { 200 }).unwrap();
//! let options = ForestOptions::new().with_tree_max_size(16).with_tree_min_size(2);
//! let mut forest = QuadForest::new(&image, &options).unwrap();
//!
//! let count = forest
//!     .segment_with_deviation(&DeviationOptions::new().with_threshold(10.0))
//!     .unwrap();
//! assert_eq!(count, 2);
//! ```
//!
//! ## Parsing boundaries
//!
//! ```
//! use qforest_core::Image;
//! use qforest_region::{ForestOptions, ParseOptions, QuadForest};
//!
//! let image = Image::from_fn(32, 16, |x, y| {
//!     if (12..16).contains(&x) && (x + y) % 2 == 0 { 30 } else { 100 }
//! })
//! .unwrap();
//! let options = ForestOptions::new().with_tree_max_size(4).with_tree_min_size(2);
//! let mut forest = QuadForest::new(&image, &options).unwrap();
//!
//! forest.parse(&ParseOptions::new().with_rounds(3)).unwrap();
//! for link in forest.links().iter() {
//!     assert!((0.0..=1.0).contains(&link.strength));
//! }
//! ```

pub mod boundary;
pub mod diffusion;
pub mod edges;
pub mod error;
pub mod forest;
pub mod link;
pub mod parse;
pub mod segment;
pub mod segmentation;
pub mod tree;

// Re-export core types
pub use qforest_core;

// Re-export error types
pub use error::{RegionError, RegionResult};

// Re-export forest and node types
pub use forest::{ForestOptions, QuadForest};
pub use tree::{
    AccumulatedStat, BoundaryInfo, Direction, Edge, ParseContext, QuadTree, Segment, TreeId,
};

// Re-export link types
pub use link::{EdgeParser, HeadRef, LinkHead, Side, TreeLink};

// Re-export analysis options and engines
pub use boundary::BoundaryOptions;
pub use diffusion::{Diffusion, DiffusionGraph, ForestGraph};
pub use edges::{EdgeDirection, EdgeOptions};
pub use parse::ParseOptions;
pub use segmentation::{DeviationOptions, OverlapOptions};
