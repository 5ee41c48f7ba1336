//! One-bit-per-pixel image handed from the normalizer to the encoder.

use image::{GrayImage, Luma};

use crate::error::PhomemoError;

/// A black/white pixel grid whose width is a multiple of 8.
///
/// Rows are stored top to bottom; `true` is a black (printed) dot. The
/// width invariant means every row packs into whole bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BilevelImage {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl BilevelImage {
    /// Build from row-major pixels.
    ///
    /// Fails with [`PhomemoError::InvalidDimension`] if the width is not a
    /// positive multiple of 8, the height is zero, or the pixel count does
    /// not match.
    pub fn new(width: u32, height: u32, pixels: Vec<bool>) -> Result<Self, PhomemoError> {
        if width == 0 || width % 8 != 0 || height == 0 {
            return Err(PhomemoError::InvalidDimension { width, height });
        }
        if pixels.len() != width as usize * height as usize {
            return Err(PhomemoError::InvalidDimension { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build by evaluating `is_black(x, y)` for every pixel.
    pub fn from_fn<F>(width: u32, height: u32, is_black: F) -> Result<Self, PhomemoError>
    where
        F: Fn(u32, u32) -> bool,
    {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| is_black(x, y))
            .collect();
        Self::new(width, height, pixels)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per packed row.
    #[inline]
    pub fn width_bytes(&self) -> usize {
        self.width as usize / 8
    }

    #[inline]
    pub fn is_black(&self, x: u32, y: u32) -> bool {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn row(&self, y: u32) -> &[bool] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }

    /// Render as an 8-bit grayscale image (black = 0, white = 255) for previews.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.is_black(x, y) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }
}
