//! # Bilevel Quantization
//!
//! The printer burns a dot or leaves the paper white; there is nothing in
//! between. This module reduces a grayscale image to one bit per pixel.
//!
//! ## Algorithms
//!
//! | Method | Speed | Quality | Artifacts |
//! |--------|-------|---------|-----------|
//! | Floyd-Steinberg | Slow | Best for photos | Noise, worms |
//! | Bayer 8x8 | Fast | Good | Regular cross-hatch |
//! | Threshold | Fastest | Line art only | Banding |
//!
//! Floyd-Steinberg is the default. It pushes each pixel's quantization
//! error onto its unvisited neighbours:
//!
//! ```text
//!             X    7/16
//!   3/16    5/16   1/16
//! ```
//!
//! ## Usage Example
//!
//! ```
//! use phomemo::render::dither;
//!
//! // Pack a row of boolean values into bytes
//! let row: Vec<bool> = vec![true, true, false, false, true, false, true, false];
//! let packed = dither::pack_row(&row);
//! assert_eq!(packed, vec![0b11001010]); // 0xCA
//! ```

use std::fmt;
use std::str::FromStr;

use image::GrayImage;
use tracing::debug;

/// Luminance at or above which a pixel is white.
const THRESHOLD: f32 = 128.0;

/// Bayer 8x8 dithering matrix
///
/// Values 0-63, each exactly once. Low values switch on first as
/// intensity rises.
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Quantization method used by the normalizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DitheringAlgorithm {
    #[default]
    FloydSteinberg,
    Bayer,
    /// Plain 50% cut-off, no dithering.
    Threshold,
}

impl FromStr for DitheringAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "floyd-steinberg" | "floyd_steinberg" | "fs" => Ok(Self::FloydSteinberg),
            "bayer" => Ok(Self::Bayer),
            "threshold" | "none" => Ok(Self::Threshold),
            other => Err(format!(
                "Unknown dithering algorithm '{}'. Use floyd-steinberg, bayer or threshold",
                other
            )),
        }
    }
}

impl fmt::Display for DitheringAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FloydSteinberg => "floyd-steinberg",
            Self::Bayer => "bayer",
            Self::Threshold => "threshold",
        };
        f.write_str(name)
    }
}

/// Get the Bayer threshold for a pixel position, in (0, 1).
///
/// `(matrix_value + 0.5) / 64` keeps the range open at both ends, so full
/// black always prints and full white never does.
#[inline]
pub fn threshold(x: usize, y: usize) -> f32 {
    let matrix_value = BAYER8[y & 7][x & 7];
    (matrix_value as f32 + 0.5) / 64.0
}

/// Ordered-dither decision for one pixel. `intensity`: 0.0 = white, 1.0 = black.
#[inline]
pub fn should_print(x: usize, y: usize, intensity: f32) -> bool {
    intensity > threshold(x, y)
}

/// Pack a row of boolean pixel values into bytes.
///
/// - Bit 7 (MSB) = leftmost pixel
/// - 1 = black (print dot), 0 = white (no dot)
///
/// If the row length is not a multiple of 8, the last byte is padded
/// with zeros (white) on the right.
///
/// ```
/// use phomemo::render::dither::pack_row;
///
/// let row = vec![true; 12];
/// assert_eq!(pack_row(&row), vec![0xFF, 0xF0]);
/// ```
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let num_bytes = pixels.len().div_ceil(8);
    let mut bytes = vec![0u8; num_bytes];

    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            bytes[i / 8] |= 1 << (7 - (i % 8));
        }
    }

    bytes
}

/// Reverse of [`pack_row`]: expand `width` pixels out of packed bytes.
pub fn unpack_row(bytes: &[u8], width: usize) -> Vec<bool> {
    (0..width)
        .map(|i| bytes[i / 8] & (1 << (7 - (i % 8))) != 0)
        .collect()
}

/// Reduce a grayscale image to black (`true`) / white (`false`) pixels,
/// row-major.
pub fn quantize(gray: &GrayImage, algorithm: DitheringAlgorithm) -> Vec<bool> {
    let (width, height) = gray.dimensions();
    debug!(width, height, %algorithm, "quantizing");

    match algorithm {
        DitheringAlgorithm::FloydSteinberg => floyd_steinberg(gray),
        DitheringAlgorithm::Bayer => gray
            .enumerate_pixels()
            .map(|(x, y, p)| should_print(x as usize, y as usize, 1.0 - p[0] as f32 / 255.0))
            .collect(),
        DitheringAlgorithm::Threshold => gray.pixels().map(|p| (p[0] as f32) < THRESHOLD).collect(),
    }
}

fn floyd_steinberg(gray: &GrayImage) -> Vec<bool> {
    let width = gray.width() as usize;
    let height = gray.height() as usize;

    // Signed working copy so diffused error can over/undershoot 0..255
    let mut buffer: Vec<f32> = gray.pixels().map(|p| p[0] as f32).collect();
    let mut out = vec![false; width * height];

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let old = buffer[idx];
            let black = old < THRESHOLD;
            out[idx] = black;

            let error = old - if black { 0.0 } else { 255.0 };
            if x + 1 < width {
                buffer[idx + 1] += error * 7.0 / 16.0;
            }
            if y + 1 < height {
                let below = idx + width;
                if x > 0 {
                    buffer[below - 1] += error * 3.0 / 16.0;
                }
                buffer[below] += error * 5.0 / 16.0;
                if x + 1 < width {
                    buffer[below + 1] += error / 16.0;
                }
            }
        }
    }

    out
}

// ============================================================================
// TESTS
// ============================================================================
