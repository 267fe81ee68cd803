//! Segmentation policies and segment queries
//!
//! Both policies follow the same three passes: divide inconsistent trees,
//! merge each leaf with its most similar neighbor, then merge neighboring
//! segments that agree as a whole. [`QuadForest::finalize_segments`] colours
//! and counts the result.
//!
//! # See also
//!
//! The union-find primitives live in [`crate::segment`].

use crate::error::{RegionError, RegionResult};
use crate::forest::QuadForest;
use crate::tree::TreeId;
use qforest_core::{Image, ImageMut, Statistics, Sublist};
use rand::prelude::*;
use std::collections::HashSet;

const COLOR_SEED: u64 = 1234;

fn is_positive(value: f64) -> bool {
    value > 0.0 && value.is_finite()
}

/// Options for [`QuadForest::segment_with_deviation`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviationOptions {
    /// Trees with a larger deviation are divided
    pub threshold: f64,
    /// Means closer than `alpha * threshold` are merged
    pub alpha: f64,
}

impl Default for DeviationOptions {
    fn default() -> Self {
        Self {
            threshold: 10.0,
            alpha: 1.0,
        }
    }
}

impl DeviationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn validate(&self) -> RegionResult<()> {
        if !is_positive(self.threshold) || !is_positive(self.alpha) {
            return Err(RegionError::InvalidParameters(format!(
                "deviation threshold and alpha must be positive, got {} and {}",
                self.threshold, self.alpha
            )));
        }
        Ok(())
    }
}

/// Options for [`QuadForest::segment_with_overlap`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapOptions {
    /// Scale of the intensity range around a mean
    pub alpha: f64,
    /// Overlap below which trees divide and above which leaves merge
    pub threshold_trees: f64,
    /// Overlap above which neighboring segments merge
    pub threshold_segments: f64,
}

impl Default for OverlapOptions {
    fn default() -> Self {
        Self {
            alpha: 4.0,
            threshold_trees: 0.5,
            threshold_segments: 0.5,
        }
    }
}

impl OverlapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_threshold_trees(mut self, threshold: f64) -> Self {
        self.threshold_trees = threshold;
        self
    }

    pub fn with_threshold_segments(mut self, threshold: f64) -> Self {
        self.threshold_segments = threshold;
        self
    }

    pub fn validate(&self) -> RegionResult<()> {
        if [self.alpha, self.threshold_trees, self.threshold_segments]
            .into_iter()
            .any(|v| !is_positive(v))
        {
            return Err(RegionError::InvalidParameters(format!(
                "overlap alpha and thresholds must be positive, got {}, {} and {}",
                self.alpha, self.threshold_trees, self.threshold_segments
            )));
        }
        Ok(())
    }
}

/// Intersection over union of intensity ranges.
///
/// Touching ranges count as an intersection of 1; the union is at least 1.
fn range_overlap(ranges: &[(f64, f64)]) -> f64 {
    let lo_max = ranges.iter().map(|r| r.0).fold(f64::MIN, f64::max);
    let lo_min = ranges.iter().map(|r| r.0).fold(f64::MAX, f64::min);
    let hi_max = ranges.iter().map(|r| r.1).fold(f64::MIN, f64::max);
    let hi_min = ranges.iter().map(|r| r.1).fold(f64::MAX, f64::min);
    let intersection = if lo_max > hi_min {
        0.0
    } else {
        (hi_min - lo_max).max(1.0)
    };
    intersection / (hi_max - lo_min).max(1.0)
}

fn pair_overlap(a: &Statistics, b: &Statistics, alpha: f64) -> f64 {
    range_overlap(&[a.intensity_range(alpha), b.intensity_range(alpha)])
}

impl QuadForest {
    /// Visit every tree in list order, including trees appended by `visit`.
    fn walk_trees<F>(&mut self, mut visit: F) -> RegionResult<()>
    where
        F: FnMut(&mut Self, TreeId) -> RegionResult<()>,
    {
        let mut cursor = self.trees.first();
        while let Some(item) = cursor {
            let id = TreeId(self.trees.payload_index(item)?);
            visit(self, id)?;
            cursor = self.trees.next(item);
        }
        Ok(())
    }

    fn ensure_leaf_segments(&mut self) -> RegionResult<()> {
        for leaf in self.leaves()? {
            if self.tree(leaf)?.segment.is_none() {
                self.create_segment(leaf)?;
            }
        }
        Ok(())
    }

    /// Segment the forest by intensity deviation.
    ///
    /// Trees deviating more than `threshold` are divided down to the
    /// minimum size; leaves and then whole segments whose means differ by
    /// less than `alpha * threshold` are merged. Returns the segment count.
    pub fn segment_with_deviation(&mut self, options: &DeviationOptions) -> RegionResult<usize> {
        options.validate()?;
        let min_size = self.tree_min_size();
        let threshold = options.threshold;
        self.walk_trees(|forest, id| {
            let tree = forest.tree(id)?;
            if tree.is_leaf() && tree.size >= 2 * min_size && tree.stat.deviation() > threshold {
                forest.divide(id)?;
            }
            Ok(())
        })?;
        self.ensure_leaf_segments()?;

        let limit = options.alpha * options.threshold;
        let leaves = self.leaves()?;
        for &leaf in &leaves {
            let own = self.find_segment(leaf)?;
            let mean = self.tree(leaf)?.stat.mean();
            let mut best: Option<(f64, TreeId)> = None;
            for neighbor in self.leaf_neighbors(leaf)? {
                if self.find_segment(neighbor)? == own {
                    continue;
                }
                let dist = (mean - self.tree(neighbor)?.stat.mean()).abs();
                if best.is_none_or(|(d, _)| dist < d) {
                    best = Some((dist, neighbor));
                }
            }
            if let Some((_, neighbor)) = best.filter(|&(dist, _)| dist < limit) {
                self.union_segments(leaf, neighbor)?;
            }
        }

        for &leaf in &leaves {
            for neighbor in self.leaf_neighbors(leaf)? {
                let (Some(own), Some(other)) = (self.segment(leaf)?, self.segment(neighbor)?) else {
                    continue;
                };
                if self.find_segment(leaf)? == self.find_segment(neighbor)? {
                    continue;
                }
                if (own.stat.mean() - other.stat.mean()).abs() < limit {
                    self.union_segments(leaf, neighbor)?;
                }
            }
        }
        self.finalize_segments()
    }

    /// Divide a leaf when the intensity ranges of its four would-be
    /// children overlap less than `threshold`.
    ///
    /// Returns whether the leaf was divided. Leaves at the minimum size and
    /// divided trees are left alone.
    pub fn divide_with_overlap(&mut self, id: TreeId, alpha: f64, threshold: f64) -> RegionResult<bool> {
        let tree = self.tree(id)?;
        if !tree.is_leaf() || tree.size < 2 * self.tree_min_size() {
            return Ok(false);
        }
        let ranges = self
            .child_statistics(id)?
            .map(|stat| stat.intensity_range(alpha));
        if range_overlap(&ranges) < threshold {
            self.divide(id)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Segment the forest by overlap of intensity ranges.
    ///
    /// Returns the segment count.
    pub fn segment_with_overlap(&mut self, options: &OverlapOptions) -> RegionResult<usize> {
        options.validate()?;
        let OverlapOptions {
            alpha,
            threshold_trees,
            threshold_segments,
        } = *options;
        let mut divided = 0usize;
        self.walk_trees(|forest, id| {
            if forest.divide_with_overlap(id, alpha, threshold_trees)? {
                divided += 1;
            }
            Ok(())
        })?;
        log::debug!("overlap pass divided {} trees", divided);
        self.ensure_leaf_segments()?;

        let leaves = self.leaves()?;
        for &leaf in &leaves {
            let own = self.find_segment(leaf)?;
            let stat = self.tree(leaf)?.stat;
            let mut best: Option<(f64, TreeId)> = None;
            for neighbor in self.leaf_neighbors(leaf)? {
                if self.find_segment(neighbor)? == own {
                    continue;
                }
                let overlap = pair_overlap(&stat, &self.tree(neighbor)?.stat, alpha);
                if overlap > best.map_or(0.0, |(o, _)| o) {
                    best = Some((overlap, neighbor));
                }
            }
            if let Some((_, neighbor)) = best.filter(|&(overlap, _)| overlap > threshold_trees) {
                self.union_segments(leaf, neighbor)?;
            }
        }

        for &leaf in &leaves {
            for neighbor in self.leaf_neighbors(leaf)? {
                if self.find_segment(leaf)? == self.find_segment(neighbor)? {
                    continue;
                }
                let (Some(own), Some(other)) = (self.segment(leaf)?, self.segment(neighbor)?) else {
                    continue;
                };
                if pair_overlap(&own.stat, &other.stat, alpha) > threshold_segments {
                    self.union_segments(leaf, neighbor)?;
                }
            }
        }
        self.finalize_segments()
    }

    /// Colour every segment root and count the segments.
    ///
    /// Colours come from a fixed seed in list order, so the same
    /// segmentation is always painted the same way.
    pub fn finalize_segments(&mut self) -> RegionResult<usize> {
        let mut rng = StdRng::seed_from_u64(COLOR_SEED);
        let mut count = 0;
        for leaf in self.leaves()? {
            if self.find_segment(leaf)? != Some(leaf) {
                continue;
            }
            if let Some(segment) = self.tree_mut(leaf)?.segment.as_mut() {
                segment.color = [rng.random::<u8>(), rng.random::<u8>(), rng.random::<u8>()];
                count += 1;
            }
        }
        self.segments = count;
        log::debug!("{} segments over {} trees", count, self.trees.len());
        Ok(count)
    }

    /// Number of segments counted by the last segmentation
    pub fn segment_count(&self) -> usize {
        self.segments
    }

    /// Segment roots in list order.
    pub fn get_segments(&self) -> RegionResult<Vec<TreeId>> {
        let mut segments = Vec::with_capacity(self.segments);
        for leaf in self.leaves()? {
            if self.is_segment_root(leaf)? {
                segments.push(leaf);
            }
        }
        Ok(segments)
    }

    fn segment_set(&self, segments: &[TreeId]) -> RegionResult<HashSet<TreeId>> {
        let mut set = HashSet::with_capacity(segments.len());
        for &id in segments {
            if let Some(root) = self.segment_of(id)? {
                set.insert(root);
            }
        }
        Ok(set)
    }

    /// Leaves belonging to any of `segments`, as a sublist over the node
    /// list.
    pub fn get_segment_trees(&self, segments: &[TreeId]) -> RegionResult<Sublist> {
        let set = self.segment_set(segments)?;
        let mut trees = Sublist::new(self.trees.len().max(1))?;
        for leaf in self.leaves()? {
            if self.segment_of(leaf)?.is_some_and(|root| set.contains(&root)) {
                trees.append(&self.trees, leaf.0)?;
            }
        }
        Ok(trees)
    }

    /// Roots of the segments adjacent to `segments` but not among them.
    pub fn get_segment_neighbors(&self, segments: &[TreeId]) -> RegionResult<Vec<TreeId>> {
        let set = self.segment_set(segments)?;
        let mut seen = HashSet::new();
        let mut neighbors = Vec::new();
        for leaf in self.leaves()? {
            if !self.segment_of(leaf)?.is_some_and(|root| set.contains(&root)) {
                continue;
            }
            for neighbor in self.leaf_neighbors(leaf)? {
                let Some(root) = self.segment_of(neighbor)? else {
                    continue;
                };
                if !set.contains(&root) && seen.insert(root) {
                    neighbors.push(root);
                }
            }
        }
        Ok(neighbors)
    }

    /// Binary mask of `segments`: 255 inside, 0 outside, or the reverse when
    /// `invert` is set.
    pub fn get_segment_mask(&self, segments: &[TreeId], invert: bool) -> RegionResult<Image> {
        let set = self.segment_set(segments)?;
        let (inside, outside) = if invert { (0, 255) } else { (255, 0) };
        let mut mask = ImageMut::new(self.width(), self.height())?;
        mask.set_all(outside);
        for leaf in self.leaves()? {
            if self.segment_of(leaf)?.is_some_and(|root| set.contains(&root)) {
                mask.fill_rect(&self.tree(leaf)?.rect(), inside);
            }
        }
        Ok(mask.into())
    }

    /// Leaves of a segment that touch a different segment.
    pub fn get_segment_boundary(&self, segment: TreeId) -> RegionResult<Vec<TreeId>> {
        let root = self
            .segment_of(segment)?
            .ok_or_else(|| RegionError::InvalidState(format!("{} has no segment", segment)))?;
        let mut boundary = Vec::new();
        for leaf in self.leaves()? {
            if self.segment_of(leaf)? != Some(root) {
                continue;
            }
            for neighbor in self.leaf_neighbors(leaf)? {
                if self.segment_of(neighbor)? != Some(root) {
                    boundary.push(leaf);
                    break;
                }
            }
        }
        Ok(boundary)
    }
}
