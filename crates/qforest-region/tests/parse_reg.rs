//! Boundary parsing regression test
//!
//! Runs the edge parser over a textured square on a flat background and
//! checks the link graph, the normalised strengths and repeatability.
//!
//! Run with:
//! ```
//! cargo test -p qforest-region --test parse_reg
//! ```

use qforest_core::Image;
use qforest_region::{ForestOptions, ParseOptions, QuadForest};
use qforest_test::RegParams;

/// Flat 90 with a 8x8 patch of alternating 10 / 170 samples at (8, 8)
fn patch() -> Image {
    Image::from_fn(24, 24, |x, y| {
        if (8..16).contains(&x) && (8..16).contains(&y) {
            if (x + y) % 2 == 0 { 10 } else { 170 }
        } else {
            90
        }
    })
    .unwrap()
}

fn forest(image: &Image) -> QuadForest {
    let options = ForestOptions::new()
        .with_tree_max_size(4)
        .with_tree_min_size(2);
    QuadForest::new(image, &options).unwrap()
}

#[test]
fn parse_reg_strengths() {
    let mut rp = RegParams::new("parse_strengths");

    let mut forest = forest(&patch());
    let count = forest.parse(&ParseOptions::new().with_rounds(4)).unwrap();

    // 6x6 roots: 2 * 6 * 5 adjacencies
    rp.compare_values(60.0, forest.links().len() as f64, 0.0);
    rp.compare_bool(true, count > 0);

    let mut positive = 0;
    let mut strongest: f64 = 0.0;
    for link in forest.links().iter() {
        rp.compare_bool(true, (0.0..=1.0).contains(&link.strength));
        if link.strength > 0.0 {
            positive += 1;
            // only links the parser reached from both ends carry a strength
            rp.compare_bool(true, link.a.token != 0 && link.a.token == link.b.token);
        }
        strongest = strongest.max(link.strength);
    }
    rp.compare_values(count as f64, f64::from(positive), 0.0);
    rp.compare_values(1.0, strongest, 0.0);

    // the textured roots seed the parser
    for &root in forest.roots() {
        let tree = forest.tree(root).unwrap();
        let inside = (8..16).contains(&tree.x) && (8..16).contains(&tree.y);
        if inside {
            rp.compare_bool(true, tree.context.token != 0);
        }
    }

    assert!(rp.cleanup(), "parse_strengths regression test failed");
}

#[test]
fn parse_reg_links() {
    let mut rp = RegParams::new("parse_links");

    let mut forest = forest(&patch());
    let corner = forest.root_at(0, 0).unwrap();
    forest.divide(corner).unwrap();
    let count = forest.create_links().unwrap();
    // 60 root adjacencies, minus the corner's 2, plus 4 sibling links and
    // 2 children facing each of the corner's two neighbors
    rp.compare_values(66.0, count as f64, 0.0);
    rp.compare_bool(true, forest.tree_links(corner).is_empty());
    for link in forest.links().iter() {
        rp.compare_bool(true, link.a.tree != link.b.tree);
    }

    assert!(rp.cleanup(), "parse_links regression test failed");
}

#[test]
fn parse_reg_repeat() {
    let mut rp = RegParams::new("parse_repeat");

    let image = patch();
    let mut forest = forest(&image);
    let options = ParseOptions::new().with_rounds(3);
    forest.parse(&options).unwrap();
    let first: Vec<f64> = forest.links().iter().map(|l| l.strength).collect();

    forest.update(&image).unwrap();
    rp.compare_values(0.0, forest.links().len() as f64, 0.0);
    forest.parse(&options).unwrap();
    let second: Vec<f64> = forest.links().iter().map(|l| l.strength).collect();
    rp.compare_values(first.len() as f64, second.len() as f64, 0.0);
    for (a, b) in first.iter().zip(&second) {
        rp.compare_values(*a, *b, 0.0);
    }

    assert!(rp.cleanup(), "parse_repeat regression test failed");
}
