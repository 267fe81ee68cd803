//! Segmentation regression test
//!
//! Runs both segmentation policies on synthetic images with known
//! regions and checks segment counts, statistics and repeatability.
//!
//! Run with:
//! ```
//! cargo test -p qforest-region --test segmentation_reg
//! ```

use qforest_core::Rect;
use qforest_region::{DeviationOptions, ForestOptions, OverlapOptions, QuadForest};
use qforest_test::{RegParams, fixtures};

fn options(max: u32, min: u32) -> ForestOptions {
    ForestOptions::new()
        .with_tree_max_size(max)
        .with_tree_min_size(min)
}

/// Segment count and root bounding boxes, sorted for comparison
fn summary(forest: &QuadForest) -> (usize, Vec<Rect>) {
    let mut bounds: Vec<Rect> = forest
        .get_segments()
        .unwrap()
        .iter()
        .map(|&s| forest.segment(s).unwrap().unwrap().bounds)
        .collect();
    bounds.sort_by_key(|r| (r.y, r.x, r.w, r.h));
    (forest.segment_count(), bounds)
}

#[test]
fn segmentation_reg_halves() {
    let mut rp = RegParams::new("segmentation_halves");

    let image = fixtures::vertical_halves(16, 16, 50, 200).unwrap();
    let mut forest = QuadForest::new(&image, &options(16, 2)).unwrap();
    let count = forest
        .segment_with_deviation(&DeviationOptions::new().with_threshold(10.0))
        .unwrap();
    rp.compare_values(2.0, count as f64, 0.0);

    // the root was divided along the boundary column
    let root = forest.roots()[0];
    rp.compare_bool(false, forest.tree(root).unwrap().is_leaf());
    let mut means: Vec<f64> = forest
        .get_segments()
        .unwrap()
        .iter()
        .map(|&s| forest.segment(s).unwrap().unwrap().stat.mean())
        .collect();
    means.sort_by(f64::total_cmp);
    rp.compare_values(50.0, means[0], 1.0);
    rp.compare_values(200.0, means[1], 1.0);

    // every leaf belongs to the segment on its side
    for leaf in forest.leaves().unwrap() {
        let tree = forest.tree(leaf).unwrap();
        let segment = forest.segment(leaf).unwrap().unwrap();
        let expected = if tree.x < 8 { 50.0 } else { 200.0 };
        rp.compare_values(expected, segment.stat.mean(), 0.0);
    }

    assert!(rp.cleanup(), "segmentation_halves regression test failed");
}

#[test]
fn segmentation_reg_square() {
    let mut rp = RegParams::new("segmentation_square");

    let image = fixtures::square(32, 32, 8, 8, 16, 20, 220).unwrap();
    let mut forest = QuadForest::new(&image, &options(16, 2)).unwrap();
    let count = forest.segment_with_deviation(&DeviationOptions::new()).unwrap();
    rp.compare_values(2.0, count as f64, 0.0);

    let inner = forest
        .get_segments()
        .unwrap()
        .into_iter()
        .find(|&s| forest.segment(s).unwrap().unwrap().stat.mean() > 100.0)
        .unwrap();
    let segment = forest.segment(inner).unwrap().unwrap();
    rp.compare_bool(true, segment.bounds == Rect::new_unchecked(8, 8, 16, 16));
    rp.compare_values(256.0, segment.stat.count(), 0.0);

    let mask = forest.get_segment_mask(&[inner], false).unwrap();
    let expected = fixtures::square(32, 32, 8, 8, 16, 0, 255).unwrap();
    rp.compare_images(&expected, &mask);

    let outer = forest.get_segment_neighbors(&[inner]).unwrap();
    rp.compare_values(1.0, outer.len() as f64, 0.0);
    let boundary = forest.get_segment_boundary(inner).unwrap();
    let trees = forest.get_segment_trees(&[inner]).unwrap();
    rp.compare_bool(true, !boundary.is_empty() && boundary.len() <= trees.len());

    assert!(rp.cleanup(), "segmentation_square regression test failed");
}

#[test]
fn segmentation_reg_overlap() {
    let mut rp = RegParams::new("segmentation_overlap");

    let image = fixtures::checkerboard(32, 32, 8, 40, 210).unwrap();
    let mut forest = QuadForest::new(&image, &options(16, 2)).unwrap();
    let count = forest.segment_with_overlap(&OverlapOptions::new()).unwrap();

    // cells of the same shade never touch along a side
    rp.compare_values(16.0, count as f64, 0.0);
    for leaf in forest.leaves().unwrap() {
        let tree = forest.tree(leaf).unwrap();
        rp.compare_values(8.0, f64::from(tree.size), 0.0);
    }

    let bad = OverlapOptions::new().with_alpha(0.0);
    rp.compare_bool(true, forest.segment_with_overlap(&bad).is_err());

    assert!(rp.cleanup(), "segmentation_overlap regression test failed");
}

#[test]
fn segmentation_reg_repeat() {
    let mut rp = RegParams::new("segmentation_repeat");

    let image = fixtures::ramp(64, 32).unwrap();
    let mut forest = QuadForest::new(&image, &options(16, 2)).unwrap();
    let deviation = DeviationOptions::new().with_threshold(6.0).with_alpha(0.5);

    forest.segment_with_deviation(&deviation).unwrap();
    let first = summary(&forest);
    forest.update(&image).unwrap();
    forest.segment_with_deviation(&deviation).unwrap();
    let second = summary(&forest);
    rp.compare_values(first.0 as f64, second.0 as f64, 0.0);
    rp.compare_bool(true, first.1 == second.1);

    forest.update(&image).unwrap();
    forest.segment_with_overlap(&OverlapOptions::new()).unwrap();
    let third = summary(&forest);
    forest.update(&image).unwrap();
    forest.segment_with_overlap(&OverlapOptions::new()).unwrap();
    let fourth = summary(&forest);
    rp.compare_values(third.0 as f64, fourth.0 as f64, 0.0);
    rp.compare_bool(true, third.1 == fourth.1);

    assert!(rp.cleanup(), "segmentation_repeat regression test failed");
}
