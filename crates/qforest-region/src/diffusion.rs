//! Diffusion - multi-round neighborhood averaging over a node graph
//!
//! Every node starts with a value `v` and keeps half of it (`acc = v / 2`).
//! In one propagation round each node sends a quarter of its `acc` across
//! each of its four sides into the receiving node's `pool`. A side without
//! a neighbor returns the share to the sender; a side facing several
//! smaller nodes splits it evenly between them. Between rounds the pool is
//! halved into the next `acc`. The second channel carries `v * acc` in the
//! same way, so that after the last round
//!
//! ```text
//! mean      = pool
//! deviation = sqrt(max(0, pool2 - pool²))
//! ```
//!
//! describe the neighborhood of each node.
//!
//! # Buffers
//!
//! `acc` values are read by neighbors while pools are written, so they live
//! in two separate buffers. Every operation is a whole sweep over all
//! nodes, which keeps a round from seeing partially updated state.

use crate::error::{RegionError, RegionResult};
use crate::forest::QuadForest;
use crate::tree::{Direction, QuadTree, TreeId};
use std::collections::HashMap;

/// Node graph a [`Diffusion`] can run on
///
/// Nodes are numbered `0..node_count()`.
pub trait DiffusionGraph {
    fn node_count(&self) -> usize;

    /// Nodes receiving the share `node` sends towards `dir`.
    ///
    /// An empty slice means there is no neighbor on that side.
    fn receivers(&self, node: usize, dir: Direction) -> &[usize];
}

/// The leaves of a forest as a diffusion graph
#[derive(Debug, Clone)]
pub struct ForestGraph {
    leaves: Vec<TreeId>,
    index: HashMap<TreeId, usize>,
    receivers: Vec<[Vec<usize>; 4]>,
}

impl ForestGraph {
    /// Snapshot the leaf adjacency of a forest.
    pub fn new(forest: &QuadForest) -> RegionResult<Self> {
        let leaves = forest.leaves()?;
        let index: HashMap<TreeId, usize> =
            leaves.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let mut receivers = Vec::with_capacity(leaves.len());
        for &leaf in &leaves {
            let mut sides: [Vec<usize>; 4] = Default::default();
            for dir in Direction::ALL {
                for neighbor in forest.neighbor_leaves(leaf, dir)? {
                    let &i = index.get(&neighbor).ok_or_else(|| {
                        RegionError::InvalidState(format!("{} is not a leaf", neighbor))
                    })?;
                    sides[dir.index()].push(i);
                }
            }
            receivers.push(sides);
        }
        Ok(Self {
            leaves,
            index,
            receivers,
        })
    }

    /// Leaves in node order
    pub fn leaves(&self) -> &[TreeId] {
        &self.leaves
    }

    /// Node number of a leaf
    pub fn node_of(&self, id: TreeId) -> Option<usize> {
        self.index.get(&id).copied()
    }
}

impl DiffusionGraph for ForestGraph {
    fn node_count(&self) -> usize {
        self.leaves.len()
    }

    fn receivers(&self, node: usize, dir: Direction) -> &[usize] {
        &self.receivers[node][dir.index()]
    }
}

#[derive(Debug, Clone, Default)]
struct Buffer {
    linear: Vec<f64>,
    squared: Vec<f64>,
}

impl Buffer {
    fn zeroed(n: usize) -> Self {
        Self {
            linear: vec![0.0; n],
            squared: vec![0.0; n],
        }
    }
}

/// Double-buffered diffusion state
///
/// # Examples
///
/// ```
/// use qforest_region::{Diffusion, DiffusionGraph, Direction};
///
/// // a single node whose every side is open
/// struct Lonely;
/// impl DiffusionGraph for Lonely {
///     fn node_count(&self) -> usize { 1 }
///     fn receivers(&self, _: usize, _: Direction) -> &[usize] { &[] }
/// }
///
/// let mut diffusion = Diffusion::new(1);
/// diffusion.run(&Lonely, &[8.0], 3).unwrap();
/// let (mean, dev) = diffusion.mean_and_deviation(0).unwrap();
/// assert_eq!((mean, dev), (8.0, 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct Diffusion {
    /// acc / acc2, read during propagation
    current: Buffer,
    /// pool / pool2, written during propagation
    next: Buffer,
    primed: bool,
}

impl Diffusion {
    /// Create state for `n` nodes.
    pub fn new(n: usize) -> Self {
        Self {
            current: Buffer::zeroed(n),
            next: Buffer::zeroed(n),
            primed: false,
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.current.linear.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.linear.is_empty()
    }

    /// Load the initial values.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::InvalidParameters`] if the number of values
    /// differs from the number of nodes.
    pub fn prime(&mut self, values: &[f64]) -> RegionResult<()> {
        if values.len() != self.len() {
            return Err(RegionError::InvalidParameters(format!(
                "{} values for {} diffusion nodes",
                values.len(),
                self.len()
            )));
        }
        for (i, &v) in values.iter().enumerate() {
            let acc = v / 2.0;
            self.current.linear[i] = acc;
            self.next.linear[i] = acc;
            self.current.squared[i] = v * acc;
            self.next.squared[i] = v * acc;
        }
        self.primed = true;
        Ok(())
    }

    fn check_primed(&self) -> RegionResult<()> {
        if !self.primed {
            return Err(RegionError::InvalidState(
                "diffusion has not been primed".to_string(),
            ));
        }
        Ok(())
    }

    /// Run one propagation sweep over the whole graph.
    pub fn propagate<G: DiffusionGraph + ?Sized>(&mut self, graph: &G) -> RegionResult<()> {
        self.check_primed()?;
        if graph.node_count() != self.len() {
            return Err(RegionError::InvalidParameters(format!(
                "graph of {} nodes for {} diffusion nodes",
                graph.node_count(),
                self.len()
            )));
        }
        for node in 0..self.len() {
            let share = self.current.linear[node] / 4.0;
            let share2 = self.current.squared[node] / 4.0;
            for dir in Direction::ALL {
                let receivers = graph.receivers(node, dir);
                if receivers.is_empty() {
                    self.next.linear[node] += share;
                    self.next.squared[node] += share2;
                    continue;
                }
                let n = receivers.len() as f64;
                for &r in receivers {
                    self.next.linear[r] += share / n;
                    self.next.squared[r] += share2 / n;
                }
            }
        }
        Ok(())
    }

    /// Start the next round from the pools: `acc = pool / 2`, `pool = acc`.
    pub fn prime_with_pool(&mut self) -> RegionResult<()> {
        self.check_primed()?;
        for i in 0..self.len() {
            let acc = self.next.linear[i] / 2.0;
            let acc2 = self.next.squared[i] / 2.0;
            self.current.linear[i] = acc;
            self.next.linear[i] = acc;
            self.current.squared[i] = acc2;
            self.next.squared[i] = acc2;
        }
        Ok(())
    }

    /// Copy the pools into the accumulators.
    pub fn accumulate(&mut self) -> RegionResult<()> {
        self.check_primed()?;
        self.current.linear.copy_from_slice(&self.next.linear);
        self.current.squared.copy_from_slice(&self.next.squared);
        Ok(())
    }

    /// Prime, then run `rounds` propagation rounds.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::InvalidParameters`] for zero rounds.
    pub fn run<G: DiffusionGraph + ?Sized>(
        &mut self,
        graph: &G,
        values: &[f64],
        rounds: u32,
    ) -> RegionResult<()> {
        if rounds == 0 {
            return Err(RegionError::InvalidParameters(
                "diffusion needs at least one round".to_string(),
            ));
        }
        self.prime(values)?;
        for round in 0..rounds {
            self.propagate(graph)?;
            if round + 1 < rounds {
                self.prime_with_pool()?;
            }
            log::trace!("diffusion round {}/{} done", round + 1, rounds);
        }
        Ok(())
    }

    fn value(&self, buffer: &[f64], i: usize) -> RegionResult<f64> {
        self.check_primed()?;
        buffer.get(i).copied().ok_or_else(|| {
            qforest_core::Error::IndexOutOfBounds {
                index: i,
                len: buffer.len(),
            }
            .into()
        })
    }

    pub fn acc(&self, i: usize) -> RegionResult<f64> {
        self.value(&self.current.linear, i)
    }

    pub fn acc2(&self, i: usize) -> RegionResult<f64> {
        self.value(&self.current.squared, i)
    }

    pub fn pool(&self, i: usize) -> RegionResult<f64> {
        self.value(&self.next.linear, i)
    }

    pub fn pool2(&self, i: usize) -> RegionResult<f64> {
        self.value(&self.next.squared, i)
    }

    /// Neighborhood mean and deviation of node `i`.
    pub fn mean_and_deviation(&self, i: usize) -> RegionResult<(f64, f64)> {
        let mean = self.pool(i)?;
        let variance = self.pool2(i)? - mean * mean;
        Ok((mean, variance.max(0.0).sqrt()))
    }

    /// Sum of all pools
    pub fn pool_sum(&self) -> f64 {
        self.next.linear.iter().sum()
    }

    /// Sum of all accumulators
    pub fn acc_sum(&self) -> f64 {
        self.current.linear.iter().sum()
    }
}

impl QuadForest {
    /// Diffuse a per-leaf measure over the leaf graph for `rounds` rounds.
    ///
    /// Returns the graph (for mapping leaves to node numbers) together with
    /// the final state.
    pub fn diffuse<F>(&self, rounds: u32, measure: F) -> RegionResult<(ForestGraph, Diffusion)>
    where
        F: Fn(&QuadTree) -> f64,
    {
        let graph = ForestGraph::new(self)?;
        let values = graph
            .leaves()
            .iter()
            .map(|&id| Ok(measure(self.tree(id)?)))
            .collect::<RegionResult<Vec<f64>>>()?;
        let mut diffusion = Diffusion::new(graph.node_count());
        diffusion.run(&graph, &values, rounds)?;
        log::debug!(
            "diffused {} leaves over {} rounds",
            graph.node_count(),
            rounds
        );
        Ok((graph, diffusion))
    }
}
