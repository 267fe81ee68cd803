//! Sample access functions
//!
//! Getting and setting individual samples and filling rectangles.

use super::{Image, ImageMut};
use crate::error::{Error, Result};
use crate::rect::Rect;

impl Image {
    /// Get a sample at (x, y).
    ///
    /// Returns `None` if coordinates are out of bounds.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(self.get_pixel_unchecked(x, y))
    }

    /// Get a sample without bounds checking.
    ///
    /// # Panics
    ///
    /// Panics if the index falls outside the sample buffer.
    #[inline]
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> u8 {
        self.data()[y as usize * self.width() as usize + x as usize]
    }
}

impl ImageMut {
    /// Get a sample at (x, y).
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(self.data()[y as usize * self.width() as usize + x as usize])
    }

    /// Set a sample at (x, y).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if the coordinates are outside the image.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u8) -> Result<()> {
        if x >= self.width() || y >= self.height() {
            let len = self.data().len();
            return Err(Error::IndexOutOfBounds {
                index: y as usize * self.width() as usize + x as usize,
                len,
            });
        }
        let w = self.width() as usize;
        self.data_mut()[y as usize * w + x as usize] = value;
        Ok(())
    }

    /// Fill the part of `rect` that lies inside the image with `value`.
    pub fn fill_rect(&mut self, rect: &Rect, value: u8) {
        let bounds = Rect::new_unchecked(0, 0, self.width() as i32, self.height() as i32);
        let Some(clipped) = bounds.intersect(rect) else {
            return;
        };
        let w = self.width() as usize;
        let data = self.data_mut();
        for y in clipped.y..clipped.bottom() {
            let start = y as usize * w;
            data[start + clipped.x as usize..start + clipped.right() as usize].fill(value);
        }
    }
}
