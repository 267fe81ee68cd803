//! Quad-forest regression test
//!
//! Checks the root tiling, subdivision geometry, neighbor caching across
//! divided neighbors (including neighbors divided more than one level deep)
//! and the per-frame update cycle.
//!
//! Run with:
//! ```
//! cargo test -p qforest-region --test forest_reg
//! ```

use qforest_region::{
    DeviationOptions, Diffusion, DiffusionGraph, Direction, ForestGraph, ForestOptions, QuadForest,
    QuadTree, TreeId,
};
use qforest_test::{RegParams, fixtures};

fn options(max: u32, min: u32) -> ForestOptions {
    ForestOptions::new()
        .with_tree_max_size(max)
        .with_tree_min_size(min)
}

#[test]
fn forest_reg_uniform() {
    let mut rp = RegParams::new("forest_uniform");

    let image = fixtures::uniform(8, 8, 100).unwrap();
    let mut forest = QuadForest::new(&image, &options(8, 2)).unwrap();
    let count = forest
        .segment_with_deviation(&DeviationOptions::new().with_threshold(5.0))
        .unwrap();

    rp.compare_values(1.0, forest.roots().len() as f64, 0.0);
    rp.compare_values(1.0, forest.tree_count() as f64, 0.0);
    let root = forest.tree(forest.roots()[0]).unwrap();
    rp.compare_bool(true, root.is_leaf());
    rp.compare_values(100.0, root.stat.mean(), 0.0);
    rp.compare_values(0.0, root.stat.deviation(), 0.0);
    rp.compare_values(1.0, count as f64, 0.0);

    assert!(rp.cleanup(), "forest_uniform regression test failed");
}

#[test]
fn forest_reg_divide() {
    let mut rp = RegParams::new("forest_divide");

    let image = fixtures::ramp(32, 32).unwrap();
    let mut forest = QuadForest::new(&image, &options(16, 2)).unwrap();
    let root = forest.root_at(0, 0).unwrap();
    let parent = forest.tree(root).unwrap().clone();
    let children = forest.divide(root).unwrap();

    // the children tile the parent exactly once
    let mut area = 0u32;
    let mut covered = vec![0u8; 16 * 16];
    for &child in &children {
        let tree = forest.tree(child).unwrap();
        rp.compare_values(f64::from(parent.size / 2), f64::from(tree.size), 0.0);
        rp.compare_values(1.0, f64::from(tree.level), 0.0);
        rp.compare_bool(true, tree.parent == Some(root));
        area += tree.size * tree.size;
        for y in tree.y..tree.y + tree.size {
            for x in tree.x..tree.x + tree.size {
                covered[(y * 16 + x) as usize] += 1;
            }
        }
    }
    rp.compare_values(f64::from(parent.size * parent.size), f64::from(area), 0.0);
    rp.compare_bool(true, covered.iter().all(|&c| c == 1));

    // child statistics merge back to the parent's
    let mut merged = forest.tree(children[0]).unwrap().stat;
    for &child in &children[1..] {
        merged.merge_assign(&forest.tree(child).unwrap().stat);
    }
    rp.compare_values(parent.stat.mean(), merged.mean(), 1e-9);
    rp.compare_values(parent.stat.variance(), merged.variance(), 1e-6);

    // dividing again returns the same children
    let again = forest.divide(root).unwrap();
    rp.compare_bool(true, again == children);

    // the east root now sees the two facing children
    let east = forest.root_at(0, 1).unwrap();
    let west_of_east = forest.neighbor_leaves(east, Direction::West).unwrap();
    rp.compare_bool(true, west_of_east == vec![children[1], children[3]]);
    let ne = forest.tree(children[1]).unwrap();
    rp.compare_bool(true, ne.neighbor(Direction::East) == Some(east));

    assert!(rp.cleanup(), "forest_divide regression test failed");
}

/// `other` lies on side `dir` of `tree` and shares part of that side
fn touches(tree: &QuadTree, other: &QuadTree, dir: Direction) -> bool {
    let span_x = other.x < tree.x + tree.size && tree.x < other.x + other.size;
    let span_y = other.y < tree.y + tree.size && tree.y < other.y + other.size;
    match dir {
        Direction::North => other.y + other.size == tree.y && span_x,
        Direction::South => tree.y + tree.size == other.y && span_x,
        Direction::East => tree.x + tree.size == other.x && span_y,
        Direction::West => other.x + other.size == tree.x && span_y,
    }
}

#[test]
fn forest_reg_deep_neighbors() {
    let mut rp = RegParams::new("forest_deep_neighbors");

    // divide the right root two levels deep before its left neighbor
    let image = fixtures::ramp(32, 16).unwrap();
    let mut forest = QuadForest::new(&image, &options(16, 2)).unwrap();
    let left = forest.root_at(0, 0).unwrap();
    let right = forest.root_at(0, 1).unwrap();
    let rc = forest.divide(right).unwrap();
    let grand = forest.divide(rc[0]).unwrap();
    let lc = forest.divide(left).unwrap();

    // the grandchildren along the shared side now see only the left child
    // covering their rows
    let west = |forest: &QuadForest, id| forest.neighbor_leaves(id, Direction::West).unwrap();
    let east = |forest: &QuadForest, id| forest.neighbor_leaves(id, Direction::East).unwrap();
    rp.compare_bool(true, west(&forest, grand[0]) == vec![lc[1]]);
    rp.compare_bool(true, west(&forest, grand[2]) == vec![lc[1]]);
    rp.compare_bool(true, west(&forest, rc[2]) == vec![lc[3]]);
    rp.compare_bool(true, east(&forest, lc[1]) == vec![grand[0], grand[2]]);
    rp.compare_bool(true, east(&forest, lc[3]) == vec![rc[2]]);
    let around_left = forest.leaf_neighbors(lc[1]).unwrap();
    rp.compare_bool(true, around_left == vec![grand[0], grand[2], lc[3], lc[0]]);
    let around_right = forest.leaf_neighbors(grand[2]).unwrap();
    rp.compare_bool(true, around_right == vec![grand[0], grand[3], rc[2], lc[1]]);

    // every cached neighbor is adjacent and the relation is symmetric
    let leaves = forest.leaves().unwrap();
    rp.compare_values(11.0, leaves.len() as f64, 0.0);
    for &leaf in &leaves {
        let tree = forest.tree(leaf).unwrap();
        for dir in Direction::ALL {
            for other in forest.neighbor_leaves(leaf, dir).unwrap() {
                rp.compare_bool(true, touches(tree, forest.tree(other).unwrap(), dir));
                let back = forest.neighbor_leaves(other, dir.opposite()).unwrap();
                rp.compare_bool(true, back.contains(&leaf));
            }
        }
    }

    // one diffusion sweep over this forest keeps the total
    let graph = ForestGraph::new(&forest).unwrap();
    rp.compare_values(leaves.len() as f64, graph.node_count() as f64, 0.0);
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

    assert!(rp.cleanup(), "forest_deep_neighbors regression test failed");
}

#[test]
fn forest_reg_min_size() {
    let mut rp = RegParams::new("forest_min_size");

    let image = fixtures::checkerboard(8, 8, 1, 0, 255).unwrap();
    let mut forest = QuadForest::new(&image, &options(8, 4)).unwrap();
    let root = forest.roots()[0];
    let children = forest.divide(root).unwrap();
    rp.compare_bool(true, forest.divide(children[0]).is_err());

    // single-pixel children come from the samples themselves
    let mut fine = QuadForest::new(&image, &options(2, 1)).unwrap();
    let root = fine.roots()[0];
    let children = fine.divide(root).unwrap();
    let values: Vec<f64> = children
        .iter()
        .map(|&c| fine.tree(c).unwrap().stat.mean())
        .collect();
    rp.compare_bool(true, values == vec![0.0, 255.0, 255.0, 0.0]);

    assert!(rp.cleanup(), "forest_min_size regression test failed");
}

#[test]
fn forest_reg_update() {
    let mut rp = RegParams::new("forest_update");

    let first = fixtures::vertical_halves(32, 16, 10, 90).unwrap();
    let second = fixtures::horizontal_halves(32, 16, 40, 160).unwrap();
    let mut forest = QuadForest::new(&first, &options(8, 2)).unwrap();
    let roots = forest.roots().to_vec();
    rp.compare_values(8.0, roots.len() as f64, 0.0);

    let children = forest.divide(roots[0]).unwrap();
    forest.divide(children[3]).unwrap();
    rp.compare_values(16.0, forest.tree_count() as f64, 0.0);

    forest.update(&second).unwrap();
    rp.compare_values(8.0, forest.tree_count() as f64, 0.0);
    rp.compare_bool(true, forest.roots() == roots.as_slice());
    for &root in &roots {
        let tree = forest.tree(root).unwrap();
        rp.compare_bool(true, tree.is_leaf());
        rp.compare_bool(true, forest.is_segment_root(root).unwrap());
        let expected = if tree.y < 8 { 40.0 } else { 160.0 };
        rp.compare_values(expected, tree.stat.mean(), 0.0);
    }
    // discarded ids are gone until a division reuses them
    rp.compare_bool(true, forest.tree(children[3]).is_err());
    let reused: Vec<TreeId> = forest.divide(roots[0]).unwrap().to_vec();
    rp.compare_bool(true, reused.iter().all(|id| !roots.contains(id)));
    rp.compare_values(12.0, forest.tree_count() as f64, 0.0);

    // frames of another size are rejected, reload re-tiles instead
    let larger = fixtures::uniform(48, 16, 7).unwrap();
    rp.compare_bool(true, forest.update(&larger).is_err());
    forest.reload(&larger, &options(8, 2)).unwrap();
    rp.compare_values(12.0, forest.roots().len() as f64, 0.0);
    rp.compare_values(7.0, forest.tree(forest.roots()[11]).unwrap().stat.mean(), 0.0);

    assert!(rp.cleanup(), "forest_update regression test failed");
}

#[test]
fn forest_reg_neighborhood() {
    let mut rp = RegParams::new("forest_neighborhood");

    let image = fixtures::square(24, 24, 8, 8, 8, 0, 200).unwrap();
    let forest = QuadForest::new(&image, &options(8, 2)).unwrap();
    let centre = forest.root_at(1, 1).unwrap();

    rp.compare_values(200.0, forest.neighborhood_statistics(centre, 0.0).unwrap().mean(), 0.0);
    // one size out on every side covers the whole image
    let grown = forest.neighborhood_statistics(centre, 1.0).unwrap();
    rp.compare_values(576.0, grown.count(), 0.0);
    rp.compare_values(200.0 * 64.0 / 576.0, grown.mean(), 1e-9);
    // the corner root is clipped to the image
    let corner = forest.root_at(0, 0).unwrap();
    rp.compare_values(144.0, forest.neighborhood_statistics(corner, 0.5).unwrap().count(), 0.0);
    rp.compare_bool(true, forest.neighborhood_statistics(corner, -1.0).is_err());

    assert!(rp.cleanup(), "forest_neighborhood regression test failed");
}
