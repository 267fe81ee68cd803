//! Boundary parsing over the link graph
//!
//! Seeds are leaves whose deviation stands out from the diffused
//! neighborhood. A token spreads from them one link per round; every
//! tokened leaf pools the cheapest paths arriving at it and passes them on
//! through its links. After the last round each link's strength is the
//! normalised average cost of the paths crossing it, so cheap paths along
//! consistent edges score close to 1.

use crate::error::{RegionError, RegionResult};
use crate::forest::QuadForest;
use crate::link::{EdgeParser, HeadRef};
use crate::tree::{ParseContext, TreeId};
use rand::prelude::*;
use std::f64::consts::{FRAC_PI_2, PI};

const TOKEN_SEED: u64 = 384746272;

/// Costs smaller than this are replaced by [`MIN_COST`]
const COST_EPSILON: f64 = 1e-7;
const MIN_COST: f64 = 0.001;

/// Options for [`QuadForest::parse`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseOptions {
    /// Parser rounds; deviation is diffused one round longer
    pub rounds: u32,
    /// Added to the neighborhood deviation mean when picking seeds
    pub bias: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            rounds: 5,
            bias: 0.0,
        }
    }
}

impl ParseOptions {
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
                "parsing needs at least one round".to_string(),
            ));
        }
        if !self.bias.is_finite() {
            return Err(RegionError::InvalidParameters(format!(
                "parse bias must be finite, got {}",
                self.bias
            )));
        }
        Ok(())
    }
}

/// Fold an orientation onto (-π, π].
fn fold_angle(angle: f64) -> f64 {
    if angle > PI { angle - 2.0 * PI } else { angle }
}

/// Difference of two orientations regardless of sign, scaled to [0, 1].
fn angle_difference(a: f64, b: f64) -> f64 {
    let mut diff = (fold_angle(a) - fold_angle(b)).abs();
    if diff > PI {
        diff = 2.0 * PI - diff;
    }
    if diff > FRAC_PI_2 {
        diff = PI - diff;
    }
    diff / FRAC_PI_2
}

/// Intersection over union of two intensity ranges clipped to [0, 255].
fn interval_overlap(a: (f64, f64), b: (f64, f64)) -> f64 {
    let clip = |(lo, hi): (f64, f64)| (lo.clamp(0.0, 255.0), hi.clamp(0.0, 255.0));
    let (a, b) = (clip(a), clip(b));
    let intersection = (a.1.min(b.1) - a.0.max(b.0)).max(0.0);
    let union = (a.1.max(b.1) - a.0.min(b.0)).max(1.0);
    intersection / union
}

impl QuadForest {
    /// Parse boundaries between leaves and store a strength on every link.
    ///
    /// Rebuilds the link list, flags leaves whose mean disagrees with the
    /// diffused neighborhood mean as `has_boundary`, then runs the edge
    /// parser for `rounds` rounds. Returns the number of links with a
    /// non-zero strength.
    pub fn parse(&mut self, options: &ParseOptions) -> RegionResult<usize> {
        options.validate()?;
        self.create_links()?;
        let mut rng = StdRng::seed_from_u64(TOKEN_SEED);
        // 0 marks trees the parser has not reached
        let token = rng.random::<u32>().max(1);

        let (graph, deviations) = self.diffuse(options.rounds + 1, |tree| tree.stat.deviation())?;
        for (node, &leaf) in graph.leaves().iter().enumerate() {
            let (devmean, devdev) = deviations.mean_and_deviation(node)?;
            let tree = self.tree_mut(leaf)?;
            tree.boundary.devmean = devmean;
            tree.boundary.devdev = devdev;
            tree.context = ParseContext::default();
        }

        let mut seeds = Vec::new();
        for &leaf in graph.leaves() {
            let tree = self.tree(leaf)?;
            let devmean = tree.boundary.devmean;
            let threshold = devmean.max(devmean + options.bias - tree.boundary.devdev);
            if tree.stat.deviation() > threshold {
                seeds.push(leaf);
            }
        }
        for &seed in &seeds {
            self.init_edge_parsers(seed, token)?;
        }
        log::debug!("parser seeded from {} of {} leaves", seeds.len(), graph.leaves().len());

        let (_, means) = self.diffuse(options.rounds, |tree| tree.stat.mean())?;
        for (node, &leaf) in graph.leaves().iter().enumerate() {
            let pooled = means.pool(node)?;
            let tree = self.tree_mut(leaf)?;
            let spread = tree.boundary.devmean.max(1.0);
            let own = tree.stat.deviation().max(1.0);
            let mean = tree.stat.mean();
            tree.boundary.has_boundary =
                interval_overlap((pooled - spread, pooled + spread), (mean - own, mean + own)) < 0.5;
        }

        let leaves = graph.leaves();
        for round in 1..=options.rounds {
            let (head, tail) = (self.links.head(), self.links.tail());
            self.links.iterate_forward(head, tail, |link| {
                link.strength = 0.0;
                Ok::<(), RegionError>(())
            })?;

            for &leaf in leaves {
                let context = self.tree(leaf)?.context;
                if context.token != token || context.round >= round {
                    continue;
                }
                self.pool_edge_parsers(leaf, round)?;
                for head in self.tree_links(leaf).to_vec() {
                    let other = self.link_head(head.other())?.tree;
                    if self.tree(other)?.context.token != token {
                        self.init_edge_parsers(other, token)?;
                        self.pool_edge_parsers(other, round)?;
                    }
                }
            }

            for &leaf in leaves {
                if self.tree(leaf)?.context.token == token {
                    self.acc_edge_parsers(leaf, token)?;
                }
            }
            log::trace!("parser round {}/{} done", round, options.rounds);
        }

        self.normalize_link_strengths(token)
    }

    /// Join a tree to the parser's wavefront and set the half-step costs of
    /// the link heads starting at it.
    ///
    /// Inside smooth regions the cost rewards similar deviations; across
    /// textured ones it penalises turning away from the edge orientation.
    fn init_edge_parsers(&mut self, id: TreeId, token: u32) -> RegionResult<()> {
        self.tree_mut(id)?.context = ParseContext { token, round: 0 };
        let edge = self.edge_response(id)?;
        let tree = self.tree(id)?;
        let (dev, devmean, devdev) = (
            tree.stat.deviation(),
            tree.boundary.devmean,
            tree.boundary.devdev,
        );

        for head in self.tree_links(id).to_vec() {
            let this = *self.link_head(head)?;
            if this.token == token {
                continue;
            }
            let other = self.tree(self.link_head(head.other())?.tree)?;
            let other_dev = other.stat.deviation();
            let mut cost = if dev < devmean && other_dev < other.boundary.devmean {
                (devmean - (dev - other_dev).abs()).max(0.0)
            } else {
                angle_difference(this.angle, edge.ang) * (devdev - other.boundary.devdev).abs()
            };
            if cost < COST_EPSILON {
                cost = MIN_COST;
            }

            let this = self.link_head_mut(head)?;
            this.token = token;
            this.round = 0;
            this.cost = cost;
            this.parser = EdgeParser::default();
        }
        Ok(())
    }

    /// Pool the two cheapest paths arriving at a tree.
    ///
    /// Every head passes on the cheapest path that did not arrive through
    /// itself; the links carrying the two cheapest paths are marked.
    fn pool_edge_parsers(&mut self, id: TreeId, round: u32) -> RegionResult<()> {
        let heads = self.tree_links(id).to_vec();
        let mut best: Option<(HeadRef, EdgeParser)> = None;
        let mut second: Option<(HeadRef, EdgeParser)> = None;
        for &head in &heads {
            let parser = self.link_head(head)?.parser;
            if parser.acc_length == 0 {
                continue;
            }
            if best.is_none_or(|(_, b)| parser.acc_cost < b.acc_cost) {
                second = best;
                best = Some((head, parser));
            } else if second.is_none_or(|(_, s)| parser.acc_cost < s.acc_cost) {
                second = Some((head, parser));
            }
        }

        for &head in &heads {
            let path = match (best, second) {
                (Some((b, parser)), _) if b != head => parser,
                (_, Some((_, parser))) => parser,
                _ => EdgeParser::default(),
            };
            let this = self.link_head_mut(head)?;
            this.parser.pool_cost = path.acc_cost + this.cost;
            this.parser.pool_length = path.acc_length;
            this.round = round;
        }
        for (head, _) in [best, second].into_iter().flatten() {
            self.links.payload_mut(head.link)?.strength = 1.0;
        }
        self.tree_mut(id)?.context.round = round;
        Ok(())
    }

    /// Take over the pooled paths waiting at the far end of each link.
    fn acc_edge_parsers(&mut self, id: TreeId, token: u32) -> RegionResult<()> {
        for head in self.tree_links(id).to_vec() {
            let other = *self.link_head(head.other())?;
            if other.token != token {
                continue;
            }
            let this = self.link_head_mut(head)?;
            this.parser.acc_cost = this.cost + other.parser.pool_cost;
            this.parser.acc_length = other.parser.pool_length + 1;
        }
        Ok(())
    }

    /// Turn the accumulated path costs into strengths in [0, 1].
    ///
    /// The cheapest links get 1 and the costliest 0; links the parser never
    /// reached from both ends stay at 0.
    fn normalize_link_strengths(&mut self, token: u32) -> RegionResult<usize> {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        let (head, tail) = (self.links.head(), self.links.tail());
        self.links.iterate_forward(head, tail, |link| {
            link.strength = 0.0;
            if link.a.token == token && link.b.token == token {
                let length = link.a.parser.acc_length + link.b.parser.acc_length;
                if length > 0 {
                    link.strength =
                        (link.a.parser.acc_cost + link.b.parser.acc_cost) / f64::from(length);
                }
            }
            if link.strength >= COST_EPSILON {
                min = min.min(link.strength);
                max = max.max(link.strength);
            }
            Ok::<(), RegionError>(())
        })?;

        if max > f64::MIN && max <= min {
            log::warn!("all parsed links have the same cost {}, strengths set to 1", max);
        }
        let mut count = 0usize;
        self.links.iterate_forward(head, tail, |link| {
            if link.strength < COST_EPSILON {
                link.strength = 0.0;
                return Ok::<(), RegionError>(());
            }
            link.strength = if max > min {
                1.0 - (link.strength - min) / (max - min)
            } else {
                1.0
            };
            if link.strength > 0.0 {
                count += 1;
            }
            Ok(())
        })?;
        log::debug!("parsed {} of {} links", count, self.links.len());
        Ok(count)
    }
}
