//! Integral image (summed area table)
//!
//! Two prefix-sum planes over an 8-bit image, one of the samples and one
//! of the squared samples, each `(width + 1) x (height + 1)` with a zero
//! first row and column. Any rectangle sum is then four lookups:
//!
//! ```text
//! sum = I[br] - I[tr] - I[bl] + I[tl]
//! ```
//!
//! The planes can be rebuilt in place from a new frame of the same size.

use crate::error::{Error, Result};
use crate::image::Image;
use crate::statistics::Statistics;

/// Integral image with linear and squared planes
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    /// Row stride of both planes (`width + 1`)
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralImage {
    /// Build the integral planes of an image.
    pub fn new(image: &Image) -> Self {
        let stride = image.width() as usize + 1;
        let len = stride * (image.height() as usize + 1);
        let mut integral = Self {
            width: image.width(),
            height: image.height(),
            stride,
            sum: vec![0; len],
            sum_sq: vec![0; len],
        };
        integral.rebuild(image);
        integral
    }

    /// Recompute the planes from a new frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the frame size differs.
    pub fn update(&mut self, image: &Image) -> Result<()> {
        if image.width() != self.width || image.height() != self.height {
            return Err(Error::DimensionMismatch {
                expected: (self.width, self.height),
                actual: (image.width(), image.height()),
            });
        }
        self.rebuild(image);
        Ok(())
    }

    fn rebuild(&mut self, image: &Image) {
        let stride = self.stride;
        for y in 0..self.height as usize {
            let row = image.row_data(y as u32);
            let mut row_sum = 0u64;
            let mut row_sum_sq = 0u64;
            let above = y * stride;
            let here = (y + 1) * stride;
            for (x, &v) in row.iter().enumerate() {
                let v = u64::from(v);
                row_sum += v;
                row_sum_sq += v * v;
                self.sum[here + x + 1] = self.sum[above + x + 1] + row_sum;
                self.sum_sq[here + x + 1] = self.sum_sq[above + x + 1] + row_sum_sq;
            }
        }
    }

    /// Width of the source image
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the source image
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the linear plane value at corner (x, y), `x <= width`, `y <= height`.
    pub fn get(&self, x: u32, y: u32) -> Option<u64> {
        if x > self.width || y > self.height {
            return None;
        }
        Some(self.sum[y as usize * self.stride + x as usize])
    }

    fn check_rect(&self, x: u32, y: u32, w: u32, h: u32) -> Result<()> {
        if u64::from(x) + u64::from(w) > u64::from(self.width)
            || u64::from(y) + u64::from(h) > u64::from(self.height)
        {
            return Err(Error::InvalidParameter(format!(
                "rectangle ({}, {}, {}, {}) exceeds {}x{} integral image",
                x, y, w, h, self.width, self.height
            )));
        }
        Ok(())
    }

    #[inline]
    fn corners(&self, plane: &[u64], x: u32, y: u32, w: u32, h: u32) -> u64 {
        let tl = y as usize * self.stride + x as usize;
        let tr = tl + w as usize;
        let bl = tl + h as usize * self.stride;
        let br = bl + w as usize;
        plane[br] + plane[tl] - plane[tr] - plane[bl]
    }

    /// Sum of samples in a rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the rectangle leaves the image.
    pub fn sum_rect(&self, x: u32, y: u32, w: u32, h: u32) -> Result<u64> {
        self.check_rect(x, y, w, h)?;
        Ok(self.corners(&self.sum, x, y, w, h))
    }

    /// Sum of squared samples in a rectangle.
    pub fn sum_sq_rect(&self, x: u32, y: u32, w: u32, h: u32) -> Result<u64> {
        self.check_rect(x, y, w, h)?;
        Ok(self.corners(&self.sum_sq, x, y, w, h))
    }

    /// Sum and sum of squares of a rectangle in one bounds check.
    pub fn sum_and_sumsq(&self, x: u32, y: u32, w: u32, h: u32) -> Result<(u64, u64)> {
        self.check_rect(x, y, w, h)?;
        Ok((
            self.corners(&self.sum, x, y, w, h),
            self.corners(&self.sum_sq, x, y, w, h),
        ))
    }

    /// Region statistics of a rectangle.
    pub fn statistics(&self, x: u32, y: u32, w: u32, h: u32) -> Result<Statistics> {
        let (sum, sum_sq) = self.sum_and_sumsq(x, y, w, h)?;
        Ok(Statistics::from_sums(
            f64::from(w) * f64::from(h),
            sum as f64,
            sum_sq as f64,
        ))
    }

    /// Region statistics of the part of a rectangle inside the image.
    ///
    /// Returns empty statistics if the rectangle misses the image.
    pub fn statistics_clipped(&self, x: i64, y: i64, w: i64, h: i64) -> Statistics {
        let x1 = x.clamp(0, i64::from(self.width));
        let y1 = y.clamp(0, i64::from(self.height));
        let x2 = (x + w).clamp(0, i64::from(self.width));
        let y2 = (y + h).clamp(0, i64::from(self.height));
        if x2 <= x1 || y2 <= y1 {
            return Statistics::default();
        }
        let (x, y, w, h) = (x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32);
        let sum = self.corners(&self.sum, x, y, w, h);
        let sum_sq = self.corners(&self.sum_sq, x, y, w, h);
        Statistics::from_sums(f64::from(w) * f64::from(h), sum as f64, sum_sq as f64)
    }
}
