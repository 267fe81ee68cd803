//! Edge detection regression test
//!
//! Edge responses of trees around vertical and horizontal steps, and the
//! leaves flagged by diffusion-based edge detection.
//!
//! Run with:
//! ```
//! cargo test -p qforest-region --test edges_reg
//! ```

use qforest_region::{EdgeDirection, EdgeOptions, ForestOptions, QuadForest};
use qforest_test::{RegParams, fixtures};
use std::f64::consts::{FRAC_PI_2, PI};

fn options(max: u32) -> ForestOptions {
    ForestOptions::new()
        .with_tree_max_size(max)
        .with_tree_min_size(2)
}

#[test]
fn edges_reg_response() {
    let mut rp = RegParams::new("edges_response");

    // a vertical step at x = 24 through the middle root
    let vertical = fixtures::vertical_halves(48, 48, 40, 200).unwrap();
    let mut forest = QuadForest::new(&vertical, &options(16)).unwrap();
    let centre = forest.root_at(1, 1).unwrap();
    let edge = forest.edge_response(centre).unwrap();
    rp.compare_bool(true, edge.dx > 0.0);
    rp.compare_values(0.0, edge.dy, 0.0);
    rp.compare_values(FRAC_PI_2, edge.ang, 1e-9);

    // the same step upside down flips the sign and the angle
    let reversed = fixtures::vertical_halves(48, 48, 200, 40).unwrap();
    forest.update(&reversed).unwrap();
    let flipped = forest.edge_response(centre).unwrap();
    rp.compare_values(-edge.dx, flipped.dx, 1e-9);
    rp.compare_values(3.0 * FRAC_PI_2, flipped.ang, 1e-9);

    // a horizontal step responds through dy
    let horizontal = fixtures::horizontal_halves(48, 48, 40, 200).unwrap();
    forest.update(&horizontal).unwrap();
    let across = forest.edge_response(centre).unwrap();
    rp.compare_values(0.0, across.dx, 0.0);
    rp.compare_values(edge.dx, across.dy, 1e-9);
    rp.compare_values(0.0, across.ang, 1e-9);
    rp.compare_values(across.dy, across.mag, 1e-12);

    // the response is stored on the tree
    let stored = forest.tree(centre).unwrap().edge;
    rp.compare_values(across.mag, stored.mag, 0.0);
    rp.compare_bool(true, across.ang < 2.0 * PI);

    assert!(rp.cleanup(), "edges_response regression test failed");
}

#[test]
fn edges_reg_find() {
    let mut rp = RegParams::new("edges_find");

    let image = fixtures::horizontal_halves(32, 64, 30, 190).unwrap();
    let mut forest = QuadForest::new(&image, &options(8)).unwrap();
    let options = EdgeOptions::new()
        .with_rounds(2)
        .with_direction(EdgeDirection::Horizontal);
    let count = forest.find_edges(&options).unwrap();
    rp.compare_bool(true, count > 0);

    let mut flagged = 0;
    for &root in forest.roots() {
        let tree = forest.tree(root).unwrap();
        if tree.edge.has_edge {
            flagged += 1;
            // boxes of length 4 reach the step only from rows next to it
            rp.compare_bool(true, tree.y + tree.size + 4 > 32 && tree.y < 36);
        }
        rp.compare_bool(true, tree.edge.deviation >= 0.0);
    }
    rp.compare_values(count as f64, f64::from(flagged), 0.0);

    // vertical edges are not there
    let vertical = EdgeOptions::new()
        .with_rounds(2)
        .with_direction(EdgeDirection::Vertical);
    rp.compare_values(0.0, forest.find_edges(&vertical).unwrap() as f64, 0.0);

    assert!(rp.cleanup(), "edges_find regression test failed");
}
