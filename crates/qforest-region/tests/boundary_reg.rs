//! Boundary detection regression test
//!
//! A textured band across a flat image is flagged as boundary, pruning
//! folds it into the surrounding segment once both sides agree, and the
//! accumulated neighborhood statistics stay normalised.
//!
//! Run with:
//! ```
//! cargo test -p qforest-region --test boundary_reg
//! ```

use qforest_core::Image;
use qforest_region::{BoundaryOptions, DeviationOptions, ForestOptions, QuadForest};
use qforest_test::RegParams;

/// Flat 100 with a band of alternating `low` / `high` samples in rows 8..12
fn band(low: u8, high: u8) -> Image {
    Image::from_fn(16, 24, |x, y| {
        if (8..12).contains(&y) {
            if (x + y) % 2 == 0 { low } else { high }
        } else {
            100
        }
    })
    .unwrap()
}

fn forest(image: &Image) -> QuadForest {
    let options = ForestOptions::new()
        .with_tree_max_size(4)
        .with_tree_min_size(4);
    QuadForest::new(image, &options).unwrap()
}

#[test]
fn boundary_reg_find() {
    let mut rp = RegParams::new("boundary_find");

    let mut forest = forest(&band(20, 180));
    let count = forest
        .find_boundaries(&BoundaryOptions::new().with_rounds(3))
        .unwrap();
    rp.compare_values(4.0, count as f64, 0.0);
    for &root in forest.roots() {
        let tree = forest.tree(root).unwrap();
        rp.compare_bool(tree.y == 8, tree.boundary.has_boundary);
        rp.compare_bool(true, tree.boundary.devmean <= 80.0);
    }

    assert!(rp.cleanup(), "boundary_find regression test failed");
}

#[test]
fn boundary_reg_prune() {
    let mut rp = RegParams::new("boundary_prune");

    // the band averages 140 and stands apart from the flat rows
    let mut forest = forest(&band(60, 220));
    let segments = forest
        .segment_with_deviation(&DeviationOptions::new().with_threshold(10.0).with_alpha(0.5))
        .unwrap();
    rp.compare_values(3.0, segments as f64, 0.0);

    forest.find_boundaries(&BoundaryOptions::new().with_rounds(3)).unwrap();
    let pruned = forest.prune_boundaries().unwrap();
    // the flat rows above and below the band are separate segments
    rp.compare_values(0.0, pruned as f64, 0.0);

    // once both sides are one segment the band is absorbed
    let above = forest.root_at(0, 0).unwrap();
    let below = forest.root_at(5, 0).unwrap();
    forest.union_segments(above, below).unwrap();
    let pruned = forest.prune_boundaries().unwrap();
    rp.compare_values(4.0, pruned as f64, 0.0);
    let root = forest.find_segment(above).unwrap();
    for &tree in forest.roots() {
        rp.compare_bool(true, forest.segment_of(tree).unwrap() == root);
    }

    assert!(rp.cleanup(), "boundary_prune regression test failed");
}

#[test]
fn boundary_reg_accumulated() {
    let mut rp = RegParams::new("boundary_accumulated");

    let mut forest = forest(&band(20, 180));
    forest.calculate_accumulated_stats(3).unwrap();
    let mut strongest: f64 = 0.0;
    for &root in forest.roots() {
        let stat = forest.tree(root).unwrap().accumulated;
        rp.compare_bool(true, (0.0..=1.0).contains(&stat.strength));
        rp.compare_values(100.0, stat.meanmean, 1e-9);
        strongest = strongest.max(stat.strength);
    }
    // every root has mean 100, so only the deviation term contributes
    rp.compare_values(0.5, strongest, 1e-12);

    assert!(rp.cleanup(), "boundary_accumulated regression test failed");
}
