//! Edge responses and diffusion-based edge detection
//!
//! The response of a node compares pairs of boxes on either side of each
//! of its centre lines using a signed Fisher criterion:
//!
//! ```text
//! g = (mean_2 - mean_1) / sqrt(max(1, var_1 + var_2))
//! ```
//!
//! Horizontal contrast (`dx`) slides a left/right box pair across the node's
//! columns, vertical contrast (`dy`) slides a top/bottom pair down its rows.
//! Detection then compares each leaf's response with the diffused response
//! of its neighborhood.

use crate::error::{RegionError, RegionResult};
use crate::forest::QuadForest;
use crate::link::orientation;
use crate::tree::{Edge, TreeId};
use qforest_core::{IntegralImage, Statistics};

/// Which response an edge search diffuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeDirection {
    /// Horizontal edges, found through vertical contrast `dy`
    Horizontal,
    /// Vertical edges, found through horizontal contrast `dx`
    Vertical,
    /// Edges of any orientation, found through the magnitude
    #[default]
    Any,
}

/// Options for [`QuadForest::find_edges`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeOptions {
    /// Diffusion rounds
    pub rounds: u32,
    /// Added to the neighborhood mean before the deviation is subtracted
    pub bias: f64,
    pub direction: EdgeDirection,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            rounds: 3,
            bias: 0.0,
            direction: EdgeDirection::Any,
        }
    }
}

impl EdgeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_direction(mut self, direction: EdgeDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn validate(&self) -> RegionResult<()> {
        if self.rounds == 0 {
            return Err(RegionError::InvalidParameters(
                "edge search needs at least one round".to_string(),
            ));
        }
        if !self.bias.is_finite() {
            return Err(RegionError::InvalidParameters(format!(
                "edge bias must be finite, got {}",
                self.bias
            )));
        }
        Ok(())
    }
}

/// Signed Fisher criterion between two boxes
fn fisher_signed(first: &Statistics, second: &Statistics) -> f64 {
    let spread = (first.variance() + second.variance()).max(1.0).sqrt();
    (second.mean() - first.mean()) / spread
}

/// Sum of box-pair criteria along one axis, divided by the node width.
///
/// `horizontal` slides boxes of `length x width` left and right of each
/// centre column; otherwise boxes of `width x length` above and below each
/// centre row.
fn box_pair_response(
    integral: &IntegralImage,
    x: u32,
    y: u32,
    width: u32,
    length: u32,
    horizontal: bool,
) -> RegionResult<f64> {
    let (start, limit) = if horizontal {
        (x, integral.width())
    } else {
        (y, integral.height())
    };
    // every box of the sweep must lie inside the image
    if start < length || u64::from(start) + u64::from(width) + u64::from(length) > u64::from(limit) {
        return Ok(0.0);
    }
    let mut sum = 0.0;
    for centre in start..start + width {
        let (first, second) = if horizontal {
            (
                integral.statistics(centre - length, y, length, width)?,
                integral.statistics(centre, y, length, width)?,
            )
        } else {
            (
                integral.statistics(x, centre - length, width, length)?,
                integral.statistics(x, centre, width, length)?,
            )
        };
        sum += fisher_signed(&first, &second);
    }
    Ok(sum / f64::from(width))
}

impl QuadForest {
    /// Compute and store the edge response of a node.
    ///
    /// Boxes are `max(size / 2, 4)` long; a response whose boxes would
    /// leave the image is 0.
    pub fn edge_response(&mut self, id: TreeId) -> RegionResult<Edge> {
        let tree = self.tree(id)?;
        let (x, y, size) = (tree.x, tree.y, tree.size);
        let length = (size / 2).max(4);
        let dx = box_pair_response(self.integral(), x, y, size, length, true)?;
        let dy = box_pair_response(self.integral(), x, y, size, length, false)?;

        let tree = self.tree_mut(id)?;
        tree.edge.dx = dx;
        tree.edge.dy = dy;
        tree.edge.mag = dx.hypot(dy);
        tree.edge.ang = orientation(dx, dy);
        Ok(tree.edge)
    }

    /// Flag leaves whose edge response stands out from their neighborhood.
    ///
    /// The chosen measure (|dy|, |dx| or magnitude) is diffused for
    /// `rounds` rounds; a leaf has an edge when its measure exceeds
    /// `max(mean, mean + bias - deviation)` of the diffused neighborhood.
    /// Returns the number of leaves flagged.
    pub fn find_edges(&mut self, options: &EdgeOptions) -> RegionResult<usize> {
        options.validate()?;
        let leaves = self.leaves()?;
        for &leaf in &leaves {
            self.edge_response(leaf)?;
        }

        let direction = options.direction;
        let measure = move |edge: &Edge| match direction {
            EdgeDirection::Horizontal => edge.dy.abs(),
            EdgeDirection::Vertical => edge.dx.abs(),
            EdgeDirection::Any => edge.mag,
        };
        let (graph, diffusion) = self.diffuse(options.rounds, |tree| measure(&tree.edge))?;

        let mut count = 0;
        for (node, &leaf) in graph.leaves().iter().enumerate() {
            let (mean, deviation) = diffusion.mean_and_deviation(node)?;
            let edge = &mut self.tree_mut(leaf)?.edge;
            edge.mean = mean;
            edge.deviation = deviation;
            edge.has_edge = measure(edge) > mean.max(mean + options.bias - deviation);
            if edge.has_edge {
                count += 1;
            }
        }
        log::debug!(
            "found {} {:?} edges among {} leaves",
            count,
            direction,
            leaves.len()
        );
        Ok(count)
    }
}
