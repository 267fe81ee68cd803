//! Diffusion regression test
//!
//! Checks mass conservation of a propagation sweep on a toroidal grid and
//! on a forest with divided trees, and the neighborhood statistics read
//! back after several rounds.
//!
//! Run with:
//! ```
//! cargo test -p qforest-region --test diffusion_reg
//! ```

use qforest_region::{
    Diffusion, DiffusionGraph, Direction, ForestGraph, ForestOptions, QuadForest,
};
use qforest_test::{RegParams, fixtures};

/// Grid whose edges wrap around, so every node has four neighbors
struct Torus {
    cols: usize,
    rows: usize,
    receivers: Vec<[Vec<usize>; 4]>,
}

impl Torus {
    fn new(cols: usize, rows: usize) -> Self {
        let mut receivers = Vec::with_capacity(cols * rows);
        for r in 0..rows {
            for c in 0..cols {
                let at = |r: usize, c: usize| r * cols + c;
                receivers.push([
                    vec![at((r + rows - 1) % rows, c)],
                    vec![at(r, (c + 1) % cols)],
                    vec![at((r + 1) % rows, c)],
                    vec![at(r, (c + cols - 1) % cols)],
                ]);
            }
        }
        Self {
            cols,
            rows,
            receivers,
        }
    }
}

impl DiffusionGraph for Torus {
    fn node_count(&self) -> usize {
        self.cols * self.rows
    }

    fn receivers(&self, node: usize, dir: Direction) -> &[usize] {
        &self.receivers[node][dir.index()]
    }
}

#[test]
fn diffusion_reg_torus() {
    let mut rp = RegParams::new("diffusion_torus");

    let torus = Torus::new(5, 4);
    let values: Vec<f64> = (0..20).map(|i| f64::from((i * 37) % 11)).collect();
    let total: f64 = values.iter().sum();

    let mut diffusion = Diffusion::new(torus.node_count());
    diffusion.prime(&values).unwrap();
    let before = diffusion.pool_sum();
    let sent = diffusion.acc_sum();
    diffusion.propagate(&torus).unwrap();
    rp.compare_values(sent, diffusion.pool_sum() - before, 1e-9);
    rp.compare_values(total, diffusion.pool_sum(), 1e-9);

    // further rounds keep the total and pull every node towards the mean
    let mut diffusion = Diffusion::new(torus.node_count());
    diffusion.run(&torus, &values, 40).unwrap();
    rp.compare_values(total, diffusion.pool_sum(), 1e-9);
    let mean = total / 20.0;
    for i in 0..20 {
        let (m, _) = diffusion.mean_and_deviation(i).unwrap();
        rp.compare_values(mean, m, 0.05);
    }

    assert!(rp.cleanup(), "diffusion_torus regression test failed");
}

#[test]
fn diffusion_reg_forest() {
    let mut rp = RegParams::new("diffusion_forest");

    let image = fixtures::ramp(32, 16).unwrap();
    let options = ForestOptions::new()
        .with_tree_max_size(8)
        .with_tree_min_size(2);
    let mut forest = QuadForest::new(&image, &options).unwrap();
    let root = forest.root_at(0, 1).unwrap();
    let children = forest.divide(root).unwrap();
    forest.divide(children[2]).unwrap();

    let graph = ForestGraph::new(&forest).unwrap();
    rp.compare_values(8.0 - 1.0 + 3.0 + 4.0, graph.node_count() as f64, 0.0);

    let values: Vec<f64> = graph
        .leaves()
        .iter()
        .map(|&id| forest.tree(id).unwrap().stat.mean())
        .collect();
    let total: f64 = values.iter().sum();
    let mut diffusion = Diffusion::new(graph.node_count());
    diffusion.prime(&values).unwrap();
    let before = diffusion.pool_sum();
    let sent = diffusion.acc_sum();
    diffusion.propagate(&graph).unwrap();
    rp.compare_values(sent, diffusion.pool_sum() - before, 1e-9);
    rp.compare_values(total, diffusion.pool_sum(), 1e-9);

    // the forest wrapper gives the same numbers
    let (wrapped_graph, wrapped) = forest.diffuse(1, |tree| tree.stat.mean()).unwrap();
    rp.compare_values(graph.node_count() as f64, wrapped_graph.node_count() as f64, 0.0);
    for i in 0..graph.node_count() {
        rp.compare_values(diffusion.pool(i).unwrap(), wrapped.pool(i).unwrap(), 1e-12);
    }

    assert!(rp.cleanup(), "diffusion_forest regression test failed");
}

#[test]
fn diffusion_reg_flat() {
    let mut rp = RegParams::new("diffusion_flat");

    let image = fixtures::uniform(24, 24, 64).unwrap();
    let options = ForestOptions::new()
        .with_tree_max_size(8)
        .with_tree_min_size(2);
    let forest = QuadForest::new(&image, &options).unwrap();
    let (graph, diffusion) = forest.diffuse(4, |tree| tree.stat.mean()).unwrap();
    for node in 0..graph.node_count() {
        let (mean, dev) = diffusion.mean_and_deviation(node).unwrap();
        rp.compare_values(64.0, mean, 1e-9);
        rp.compare_values(0.0, dev, 1e-6);
    }

    // readers refuse an unprimed engine
    let idle = Diffusion::new(3);
    rp.compare_bool(true, idle.pool(0).is_err());
    rp.compare_bool(true, forest.diffuse(0, |tree| tree.stat.mean()).is_err());

    assert!(rp.cleanup(), "diffusion_flat regression test failed");
}
