//! Image - 8-bit grayscale sample container
//!
//! The forest only ever analyses single-channel 8-bit intensity images, so
//! the container stores one byte per pixel, row-major, without padding.
//!
//! # Ownership model
//!
//! `Image` uses `Arc` for cheap cloning (shared ownership).
//! To modify samples, convert to `ImageMut` via [`Image::try_into_mut`]
//! or [`Image::to_mut`], then convert back with `Into<Image>`.

mod access;

use crate::error::{Error, Result};
use std::sync::Arc;

/// Internal image data
#[derive(Debug, PartialEq, Eq)]
struct ImageData {
    width: u32,
    height: u32,
    /// Row-major samples, `width * height` bytes
    data: Vec<u8>,
}

impl ImageData {
    fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::InvalidParameter(format!(
                "sample buffer holds {} bytes, {}x{} image needs {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }
}

/// Immutable 8-bit grayscale image
///
/// # Examples
///
/// ```
/// use qforest_core::Image;
///
/// let image = Image::new(64, 48).unwrap();
/// assert_eq!(image.width(), 64);
/// assert_eq!(image.get_pixel(10, 10), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    inner: Arc<ImageData>,
}

impl Image {
    /// Create a new image filled with zeros.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if width or height is 0.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let data = vec![0u8; width as usize * height as usize];
        Self::from_vec(width, height, data)
    }

    /// Create an image from row-major samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] for an empty image and
    /// [`Error::InvalidParameter`] if `data.len() != width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Ok(Image {
            inner: Arc::new(ImageData::new(width, height, data)?),
        })
    }

    /// Create an image whose samples are produced by `f(x, y)`.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Result<Self> {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::from_vec(width, height, data)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Get the raw row-major samples.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.inner.data
    }

    /// Get one row of samples.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row_data(&self, y: u32) -> &[u8] {
        let w = self.inner.width as usize;
        let start = y as usize * w;
        &self.inner.data[start..start + w]
    }

    /// Check whether two images have the same dimensions.
    pub fn sizes_equal(&self, other: &Image) -> bool {
        self.width() == other.width() && self.height() == other.height()
    }

    /// Number of handles sharing the sample buffer.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Try to get mutable access to the samples.
    ///
    /// Succeeds only if there is exactly one reference to the data.
    pub fn try_into_mut(self) -> std::result::Result<ImageMut, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(data) => Ok(ImageMut { inner: data }),
            Err(arc) => Err(Image { inner: arc }),
        }
    }

    /// Create a mutable copy of this image.
    pub fn to_mut(&self) -> ImageMut {
        ImageMut {
            inner: ImageData {
                width: self.inner.width,
                height: self.inner.height,
                data: self.inner.data.clone(),
            },
        }
    }
}

/// Mutable 8-bit grayscale image
///
/// Convert back to an immutable [`Image`] using `Into<Image>`.
#[derive(Debug)]
pub struct ImageMut {
    inner: ImageData,
}

impl ImageMut {
    /// Create a new zero-filled mutable image.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let data = vec![0u8; width as usize * height as usize];
        Ok(ImageMut {
            inner: ImageData::new(width, height, data)?,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.inner.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.inner.data
    }

    /// Copy all samples from an image of the same size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the sizes differ.
    pub fn copy_from(&mut self, src: &Image) -> Result<()> {
        if self.width() != src.width() || self.height() != src.height() {
            return Err(Error::DimensionMismatch {
                expected: (self.width(), self.height()),
                actual: (src.width(), src.height()),
            });
        }
        self.inner.data.copy_from_slice(src.data());
        Ok(())
    }

    /// Set every sample to `value`.
    pub fn set_all(&mut self, value: u8) {
        self.inner.data.fill(value);
    }
}

impl From<ImageMut> for Image {
    fn from(image_mut: ImageMut) -> Self {
        Image {
            inner: Arc::new(image_mut.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(
            Image::new(0, 5),
            Err(Error::InvalidDimension { width: 0, height: 5 })
        ));
    }

    #[test]
    fn test_from_vec_length_check() {
        assert!(Image::from_vec(2, 2, vec![0; 3]).is_err());
        let image = Image::from_vec(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(image.row_data(1), &[3, 4]);
    }

    #[test]
    fn test_mut_round_trip() {
        let image = Image::new(4, 4).unwrap();
        let mut image_mut = image.try_into_mut().unwrap();
        image_mut.set_all(7);
        let image: Image = image_mut.into();
        assert!(image.data().iter().all(|&v| v == 7));
    }

    #[test]
    fn test_try_into_mut_shared() {
        let image = Image::new(4, 4).unwrap();
        let shared = image.clone();
        assert_eq!(shared.ref_count(), 2);
        assert!(image.try_into_mut().is_err());
    }

    #[test]
    fn test_copy_from_mismatch() {
        let mut dst = ImageMut::new(4, 4).unwrap();
        let src = Image::new(4, 5).unwrap();
        assert!(dst.copy_from(&src).is_err());
    }
}
