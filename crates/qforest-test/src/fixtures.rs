//! Synthetic test images
//!
//! The analyses are exercised on small generated images with known
//! structure rather than on image files.

use crate::error::{TestError, TestResult};
use qforest_core::Image;

fn build(name: &str, width: u32, height: u32, f: impl FnMut(u32, u32) -> u8) -> TestResult<Image> {
    Image::from_fn(width, height, f).map_err(|e| TestError::Fixture {
        name: name.to_string(),
        message: e.to_string(),
    })
}

/// Image of one constant value.
pub fn uniform(width: u32, height: u32, value: u8) -> TestResult<Image> {
    build("uniform", width, height, |_, _| value)
}

/// Left half `left`, right half `right`.
pub fn vertical_halves(width: u32, height: u32, left: u8, right: u8) -> TestResult<Image> {
    let split = width / 2;
    build("vertical_halves", width, height, |x, _| {
        if x < split { left } else { right }
    })
}

/// Top half `top`, bottom half `bottom`.
pub fn horizontal_halves(width: u32, height: u32, top: u8, bottom: u8) -> TestResult<Image> {
    let split = height / 2;
    build("horizontal_halves", width, height, |_, y| {
        if y < split { top } else { bottom }
    })
}

/// Square cells of side `cell` alternating between `a` and `b`.
pub fn checkerboard(width: u32, height: u32, cell: u32, a: u8, b: u8) -> TestResult<Image> {
    let cell = cell.max(1);
    build("checkerboard", width, height, |x, y| {
        if (x / cell + y / cell) % 2 == 0 { a } else { b }
    })
}

/// Background `background` with a filled square of `value`.
pub fn square(width: u32, height: u32, x0: u32, y0: u32, side: u32, background: u8, value: u8) -> TestResult<Image> {
    build("square", width, height, |x, y| {
        if x >= x0 && x < x0 + side && y >= y0 && y < y0 + side {
            value
        } else {
            background
        }
    })
}

/// Horizontal ramp from 0 to 255.
pub fn ramp(width: u32, height: u32) -> TestResult<Image> {
    let span = width.saturating_sub(1).max(1);
    build("ramp", width, height, |x, _| ((x * 255) / span) as u8)
}
