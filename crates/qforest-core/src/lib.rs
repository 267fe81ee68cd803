//! QForest Core - Basic data structures for quad-forest region analysis
//!
//! This crate provides the building blocks the forest and its analyses are
//! assembled from:
//!
//! - [`Image`] / [`ImageMut`] - 8-bit grayscale sample container (immutable / mutable)
//! - [`IntegralImage`] - Summed area tables of samples and squared samples
//! - [`Statistics`] - Count, sum, sum of squares, mean, variance, deviation
//! - [`Rect`] - Integer rectangles
//! - [`Chunk`] - Block arena with stable global indices
//! - [`List`] / [`Sublist`] - Doubly-linked orderings with free-list reuse
//!
//! # Examples
//!
//! ```
//! use qforest_core::{Image, IntegralImage};
//!
//! let image = Image::from_fn(8, 8, |x, _| if x < 4 { 50 } else { 200 }).unwrap();
//! let integral = IntegralImage::new(&image);
//! let left = integral.statistics(0, 0, 4, 8).unwrap();
//! assert_eq!(left.mean(), 50.0);
//! assert_eq!(left.deviation(), 0.0);
//! ```

pub mod arena;
pub mod error;
pub mod image;
pub mod integral;
pub mod list;
pub mod rect;
pub mod statistics;

pub use arena::Chunk;
pub use error::{Error, Result};
pub use image::{Image, ImageMut};
pub use integral::IntegralImage;
pub use list::{Item, Items, List, Sublist};
pub use rect::Rect;
pub use statistics::Statistics;
