//! # Image Normalizer
//!
//! Turns an arbitrary decoded bitmap into a [`BilevelImage`] exactly as wide
//! as the printer head.
//!
//! ```text
//! load_image → (rotate 90° if landscape) → resize to width → grayscale → quantize
//! ```

use std::fs;
use std::path::Path;

use image::{DynamicImage, imageops::FilterType};
use tracing::{debug, info};

use super::bilevel::BilevelImage;
use super::dither::{self, DitheringAlgorithm};
use crate::error::PhomemoError;

/// Tallest image `normalize` will produce, about 8 m of paper at 203 dpi.
pub const MAX_HEIGHT_DOTS: u32 = 65_535;

/// Decode an image file from disk.
///
/// Any format the `image` crate knows is accepted. HEIC/HEIF photos are
/// decoded through libheif when the `heif` feature is enabled.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage, PhomemoError> {
    let path = path.as_ref();
    let load_error = |reason: String| PhomemoError::ImageLoad {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path).map_err(|e| load_error(e.to_string()))?;

    #[cfg(feature = "heif")]
    if is_heic(&bytes) {
        let img = decode_heic(&bytes).map_err(load_error)?;
        info!(path = %path.display(), width = img.width(), height = img.height(), "loaded HEIC image");
        return Ok(img);
    }

    let img = image::load_from_memory(&bytes).map_err(|e| load_error(e.to_string()))?;
    info!(path = %path.display(), width = img.width(), height = img.height(), "loaded image");
    Ok(img)
}

/// Reduce `source` to a bilevel image `target_width_dots` wide.
///
/// - With `auto_rotate`, landscape images (wider than tall) are turned 90°
///   counter-clockwise so the long side runs along the paper.
/// - Height keeps the aspect ratio: `round(h * target / w)`, at least 1.
/// - The source is never modified.
///
/// ## Errors
///
/// [`PhomemoError::InvalidDimension`] if the source has a zero dimension,
/// the target width is not a positive multiple of 8, or the scaled height
/// exceeds [`MAX_HEIGHT_DOTS`].
pub fn normalize(
    source: &DynamicImage,
    target_width_dots: u32,
    auto_rotate: bool,
    algorithm: DitheringAlgorithm,
) -> Result<BilevelImage, PhomemoError> {
    let (width, height) = (source.width(), source.height());
    if width == 0 || height == 0 {
        return Err(PhomemoError::InvalidDimension { width, height });
    }
    if target_width_dots == 0 || target_width_dots % 8 != 0 {
        return Err(PhomemoError::InvalidDimension {
            width: target_width_dots,
            height,
        });
    }

    let rotated;
    let oriented = if auto_rotate && width > height {
        debug!(width, height, "rotating landscape image");
        rotated = source.rotate270();
        &rotated
    } else {
        source
    };

    let target_height = scaled_height(oriented.width(), oriented.height(), target_width_dots);
    if target_height > MAX_HEIGHT_DOTS as u64 {
        return Err(PhomemoError::InvalidDimension {
            width: target_width_dots,
            height: u32::try_from(target_height).unwrap_or(u32::MAX),
        });
    }
    let target_height = target_height as u32;
    let resized = oriented.resize_exact(target_width_dots, target_height, FilterType::Lanczos3);
    let gray = resized.to_luma8();

    let pixels = dither::quantize(&gray, algorithm);
    let bilevel = BilevelImage::new(target_width_dots, target_height, pixels)?;

    info!(
        width = bilevel.width(),
        height = bilevel.height(),
        %algorithm,
        "normalized image"
    );
    Ok(bilevel)
}

/// `round(height * target / width)`, at least one row.
fn scaled_height(width: u32, height: u32, target_width: u32) -> u64 {
    let (w, h, t) = (width as u64, height as u64, target_width as u64);
    ((h * t + w / 2) / w).max(1)
}

/// Check if the data looks like a HEIC/HEIF file by examining magic bytes.
///
/// HEIC files have an "ftyp" box at offset 4 followed by a HEIF brand.
#[cfg(feature = "heif")]
fn is_heic(data: &[u8]) -> bool {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return false;
    }
    matches!(
        &data[8..12],
        b"heic" | b"heix" | b"hevc" | b"hevx" | b"heim" | b"heis" | b"hevm" | b"hevs" | b"mif1" | b"msf1"
    )
}

#[cfg(feature = "heif")]
fn decode_heic(data: &[u8]) -> Result<DynamicImage, String> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(data).map_err(|e| format!("Failed to read HEIC: {}", e))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| format!("Failed to get primary image: {}", e))?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| format!("Failed to decode HEIC image: {}", e))?;

    let planes = decoded.planes();
    let interleaved = planes.interleaved.ok_or("No interleaved RGB data in HEIC")?;
    let (width, height) = (decoded.width(), decoded.height());
    let stride = interleaved.stride;
    let data = interleaved.data;

    let rgb = image::RgbImage::from_fn(width, height, |x, y| {
        let offset = y as usize * stride + x as usize * 3;
        match data.get(offset..offset + 3) {
            Some(px) => image::Rgb([px[0], px[1], px[2]]),
            None => image::Rgb([255, 255, 255]),
        }
    });

    Ok(DynamicImage::ImageRgb8(rgb))
}

// ============================================================================
// TESTS
// ============================================================================
