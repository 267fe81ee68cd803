//! Boundary detection from diffused deviation
//!
//! A leaf lies on a boundary when its own deviation stands out from the
//! deviation of its neighborhood. Pruning then drops boundary flags that
//! do not actually separate two segments.

use crate::error::{RegionError, RegionResult};
use crate::forest::QuadForest;
use crate::tree::{AccumulatedStat, Direction, TreeId};

/// Options for [`QuadForest::find_boundaries`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryOptions {
    /// Diffusion rounds
    pub rounds: u32,
    /// Added to the neighborhood deviation mean before its deviation is
    /// subtracted
    pub bias: f64,
}

impl Default for BoundaryOptions {
    fn default() -> Self {
        Self {
            rounds: 4,
            bias: 0.0,
        }
    }
}

impl BoundaryOptions {
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

    pub fn validate(&self) -> RegionResult<()> {
        if self.rounds == 0 {
            return Err(RegionError::InvalidParameters(
                "boundary search needs at least one round".to_string(),
            ));
        }
        if !self.bias.is_finite() {
            return Err(RegionError::InvalidParameters(format!(
                "boundary bias must be finite, got {}",
                self.bias
            )));
        }
        Ok(())
    }
}

impl QuadForest {
    /// Flag leaves whose deviation stands out from their neighborhood.
    ///
    /// Stores the diffused `devmean` / `devdev` of every leaf and returns
    /// the number of boundary leaves.
    pub fn find_boundaries(&mut self, options: &BoundaryOptions) -> RegionResult<usize> {
        options.validate()?;
        let (graph, diffusion) = self.diffuse(options.rounds, |tree| tree.stat.deviation())?;

        let mut count = 0;
        for (node, &leaf) in graph.leaves().iter().enumerate() {
            let (devmean, devdev) = diffusion.mean_and_deviation(node)?;
            let tree = self.tree_mut(leaf)?;
            tree.boundary.devmean = devmean;
            tree.boundary.devdev = devdev;
            tree.boundary.has_boundary =
                tree.stat.deviation() > devmean.max(devmean + options.bias - devdev);
            if tree.boundary.has_boundary {
                count += 1;
            }
        }
        log::debug!("found {} boundary leaves", count);
        Ok(count)
    }

    /// Clear boundary flags that do not separate segments.
    ///
    /// A boundary leaf whose non-boundary neighbors all belong to one
    /// segment loses its flag and joins that segment. Returns the number of
    /// leaves unflagged.
    pub fn prune_boundaries(&mut self) -> RegionResult<usize> {
        let mut pruned = 0;
        for leaf in self.leaves()? {
            if !self.tree(leaf)?.boundary.has_boundary {
                continue;
            }
            let mut joined: Option<(TreeId, TreeId)> = None;
            let mut has_diff_segment = false;
            for dir in Direction::ALL {
                for neighbor in self.neighbor_leaves(leaf, dir)? {
                    if self.tree(neighbor)?.boundary.has_boundary {
                        continue;
                    }
                    let Some(segment) = self.find_segment(neighbor)? else {
                        continue;
                    };
                    if joined.is_some_and(|(_, previous)| previous != segment) {
                        has_diff_segment = true;
                    }
                    joined = Some((neighbor, segment));
                }
            }
            if has_diff_segment {
                continue;
            }
            self.tree_mut(leaf)?.boundary.has_boundary = false;
            pruned += 1;
            if let Some((neighbor, _)) = joined {
                if self.tree(leaf)?.segment.is_none() {
                    self.create_segment(leaf)?;
                }
                self.union_segments(leaf, neighbor)?;
            }
        }
        log::debug!("pruned {} boundary leaves", pruned);
        Ok(pruned)
    }

    /// Diffuse mean and deviation together and store the neighborhood
    /// statistics of every leaf.
    ///
    /// The strength of a leaf is the average of its mean-deviation and
    /// deviation-deviation, each normalised by its maximum over all leaves.
    pub fn calculate_accumulated_stats(&mut self, rounds: u32) -> RegionResult<()> {
        let (graph, means) = self.diffuse(rounds, |tree| tree.stat.mean())?;
        let (_, deviations) = self.diffuse(rounds, |tree| tree.stat.deviation())?;

        let mut max_meandev: f64 = 0.0;
        let mut max_devdev: f64 = 0.0;
        let mut stats = Vec::with_capacity(graph.leaves().len());
        for node in 0..graph.leaves().len() {
            let (meanmean, meandev) = means.mean_and_deviation(node)?;
            let (devmean, devdev) = deviations.mean_and_deviation(node)?;
            max_meandev = max_meandev.max(meandev);
            max_devdev = max_devdev.max(devdev);
            stats.push(AccumulatedStat {
                meanmean,
                meandev,
                devmean,
                devdev,
                strength: 0.0,
            });
        }

        let normalise = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };
        for (&leaf, mut stat) in graph.leaves().iter().zip(stats) {
            stat.strength =
                0.5 * normalise(stat.meandev, max_meandev) + 0.5 * normalise(stat.devdev, max_devdev);
            self.tree_mut(leaf)?.accumulated = stat;
        }
        Ok(())
    }
}
