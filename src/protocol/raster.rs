//! # Raster Blocks
//!
//! The printer receives the image as a series of bounded-height blocks.
//! Each block is a `GS v 0` command followed by its packed rows.
//!
//! ## Block Layout
//!
//! | Bytes | Meaning |
//! |-------|---------|
//! | 1D 76 30 00 | GS v 0, mode 0 |
//! | w | row width in bytes |
//! | 00 | reserved |
//! | n - 1 | rows in this block, minus one |
//! | 00 | reserved |
//! | w × n bytes | row data, MSB = leftmost dot, 1 = black |
//!
//! ## Chunking
//!
//! A whole image does not fit the receive buffer, so rows are cut into
//! blocks of at most `max_block_rows`. The last block carries whatever is
//! left:
//!
//! ```text
//! // 600 rows, 256 per block:
//! // Block 0: rows   0..256  (header n-1 = 255)
//! // Block 1: rows 256..512  (header n-1 = 255)
//! // Block 2: rows 512..600  (header n-1 = 87)
//! ```
//!
//! ## Escaping
//!
//! Packed bytes equal to the profile's forbidden value (0x0A) are replaced
//! before sending. Block headers are never escaped.

use std::ops::Range;

use crate::error::PhomemoError;
use crate::printer::config::{ByteEscape, DeviceProfile};
use crate::render::BilevelImage;
use crate::render::dither::{pack_row, unpack_row};

use super::commands::{FOOTER, HEADER, PRINT_FEED, RASTER_MARKER};

/// Length of a block header in bytes.
pub const BLOCK_HEADER_LEN: usize = RASTER_MARKER.len() + 4;

/// A run of consecutive image rows sent under one block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBlock {
    /// Position of this block in the job, from 0.
    pub index: usize,
    /// First row (inclusive) and last row (exclusive) in the image.
    pub rows: Range<u32>,
    pub width_bytes: u16,
}

impl RasterBlock {
    #[inline]
    pub fn row_count(&self) -> u32 {
        self.rows.end - self.rows.start
    }

    /// `GS v 0 0 w 0 (n-1) 0`
    ///
    /// Fails with [`PhomemoError::InvalidProfile`] if the width or the row
    /// count does not fit its one-byte field.
    pub fn header(&self) -> Result<[u8; BLOCK_HEADER_LEN], PhomemoError> {
        let width = u8::try_from(self.width_bytes).map_err(|_| {
            PhomemoError::InvalidProfile(format!(
                "block {}: row width {} bytes exceeds 255",
                self.index, self.width_bytes
            ))
        })?;
        let rows = self
            .row_count()
            .checked_sub(1)
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| {
                PhomemoError::InvalidProfile(format!(
                    "block {}: {} rows does not fit one block (1..=256)",
                    self.index,
                    self.row_count()
                ))
            })?;

        let [m0, m1, m2, m3] = RASTER_MARKER;
        Ok([m0, m1, m2, m3, width, 0x00, rows, 0x00])
    }
}

/// Split `height` rows into blocks of at most `max_block_rows`, top to bottom.
///
/// Returns nothing for a zero height; callers never pass one because
/// [`BilevelImage`] cannot be empty.
pub fn partition(height: u32, max_block_rows: u16, width_bytes: u16) -> Vec<RasterBlock> {
    let step = max_block_rows.max(1) as u32;
    (0..height)
        .step_by(step as usize)
        .enumerate()
        .map(|(index, start)| RasterBlock {
            index,
            rows: start..(start + step).min(height),
            width_bytes,
        })
        .collect()
}

/// Check that `image` can be sent under `profile`: the profile validates
/// and its width equals the image's.
pub fn check_fit(image: &BilevelImage, profile: &DeviceProfile) -> Result<(), PhomemoError> {
    profile.validate()?;
    if image.width() != profile.width_dots as u32 {
        return Err(PhomemoError::InvalidProfile(format!(
            "image is {} dots wide but {} prints {} dots",
            image.width(),
            profile.name,
            profile.width_dots
        )));
    }
    Ok(())
}

/// Blocks for `image` under `profile`.
pub fn blocks(image: &BilevelImage, profile: &DeviceProfile) -> Vec<RasterBlock> {
    partition(image.height(), profile.max_block_rows, profile.width_bytes())
}

/// Pack one image row and apply the escape rule.
pub fn encode_row(image: &BilevelImage, y: u32, escape: &ByteEscape) -> Vec<u8> {
    let mut bytes = pack_row(image.row(y));
    for byte in &mut bytes {
        *byte = escape.apply(*byte);
    }
    bytes
}

/// Expand a row of wire bytes back into pixels.
///
/// The escape substitution is not reversible (0x14 is also a valid dot
/// pattern), so an escaped byte decodes as 0x14.
pub fn decode_row(bytes: &[u8]) -> Vec<bool> {
    unpack_row(bytes, bytes.len() * 8)
}

/// Build the complete device byte stream in memory.
///
/// Produces exactly the bytes [`crate::printer::transmit`] writes, without
/// pacing, and rejects the same inputs.
pub fn encode(image: &BilevelImage, profile: &DeviceProfile) -> Result<Vec<u8>, PhomemoError> {
    check_fit(image, profile)?;
    let blocks = blocks(image, profile);
    let payload = image.width_bytes() * image.height() as usize;
    let mut out = Vec::with_capacity(
        HEADER.len()
            + blocks.len() * BLOCK_HEADER_LEN
            + payload
            + 2 * PRINT_FEED.len()
            + FOOTER.len(),
    );

    out.extend_from_slice(&HEADER);
    for block in &blocks {
        out.extend_from_slice(&block.header()?);
        for y in block.rows.clone() {
            out.extend(encode_row(image, y, &profile.escape));
        }
    }
    out.extend_from_slice(&PRINT_FEED);
    out.extend_from_slice(&PRINT_FEED);
    out.extend_from_slice(&FOOTER);
    Ok(out)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn row_counts(blocks: &[RasterBlock]) -> Vec<u32> {
        blocks.iter().map(RasterBlock::row_count).collect()
    }

    #[test]
    fn test_partition_exact_multiple() {
        let blocks = partition(512, 256, 70);
        assert_eq!(row_counts(&blocks), vec![256, 256]);
    }

    #[test]
    fn test_partition_remainder() {
        let blocks = partition(600, 256, 70);
        assert_eq!(row_counts(&blocks), vec![256, 256, 88]);
        assert_eq!(blocks[2].header().unwrap()[6], 87);
    }

    #[test]
    fn test_partition_covers_rows_in_order() {
        for (height, max) in [(1, 64), (63, 64), (64, 64), (65, 64), (1000, 7), (257, 256)] {
            let blocks = partition(height, max, 1);
            let mut next = 0;
            for (i, block) in blocks.iter().enumerate() {
                assert_eq!(block.index, i);
                assert_eq!(block.rows.start, next);
                assert!(block.row_count() >= 1);
                assert!(block.row_count() <= max as u32);
                next = block.rows.end;
            }
            assert_eq!(next, height);
        }
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition(0, 64, 1).is_empty());
    }

    #[test]
    fn test_block_header_layout() {
        let block = RasterBlock {
            index: 0,
            rows: 0..256,
            width_bytes: 70,
        };
        assert_eq!(
            block.header().unwrap(),
            [0x1D, 0x76, 0x30, 0x00, 70, 0x00, 0xFF, 0x00]
        );
    }

    #[test]
    fn test_block_header_not_escaped() {
        // 11 rows → n-1 = 0x0A must stay as is in the header
        let block = RasterBlock {
            index: 0,
            rows: 0..11,
            width_bytes: 0x0A,
        };
        let header = block.header().unwrap();
        assert_eq!(header[4], 0x0A);
        assert_eq!(header[6], 0x0A);
    }

    #[test]
    fn test_block_header_rejects_oversized_fields() {
        let tall = RasterBlock {
            index: 0,
            rows: 0..300,
            width_bytes: 1,
        };
        assert!(matches!(tall.header(), Err(PhomemoError::InvalidProfile(_))));

        let largest = RasterBlock {
            index: 0,
            rows: 0..256,
            width_bytes: 255,
        };
        assert_eq!(largest.header().unwrap()[4..7], [255, 0, 255]);

        let wide = RasterBlock { width_bytes: 256, ..largest };
        assert!(wide.header().is_err());
    }

    #[test]
    fn test_encode_row_escapes_line_feed() {
        // 0000_1010 then 1111_0000
        let image = BilevelImage::from_fn(16, 1, |x, _| matches!(x, 4 | 6 | 8 | 9 | 10 | 11)).unwrap();
        let row = encode_row(&image, 0, &ByteEscape::default());
        assert_eq!(row, vec![0x14, 0xF0]);
    }

    #[test]
    fn test_decode_round_trip() {
        let image = BilevelImage::from_fn(24, 3, |x, y| (x * 7 + y * 3) % 5 == 0).unwrap();
        for y in 0..image.height() {
            let packed = pack_row(image.row(y));
            if packed.contains(&0x0A) {
                continue;
            }
            let wire = encode_row(&image, y, &ByteEscape::default());
            assert_eq!(decode_row(&wire), image.row(y));
        }
    }

    #[test]
    fn test_encode_framing() {
        let image = BilevelImage::from_fn(8, 3, |_, _| true).unwrap();
        let profile = DeviceProfile::custom(8, 2, 0);
        let bytes = encode(&image, &profile).unwrap();

        let mut expected = HEADER.to_vec();
        expected.extend([0x1D, 0x76, 0x30, 0x00, 1, 0, 1, 0, 0xFF, 0xFF]);
        expected.extend([0x1D, 0x76, 0x30, 0x00, 1, 0, 0, 0, 0xFF]);
        expected.extend(PRINT_FEED);
        expected.extend(PRINT_FEED);
        expected.extend(FOOTER);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_encode_rejects_oversized_blocks() {
        let image = BilevelImage::from_fn(8, 300, |_, _| true).unwrap();
        for rows in [300, 257] {
            assert!(matches!(
                encode(&image, &DeviceProfile::custom(8, rows, 0)),
                Err(PhomemoError::InvalidProfile(_))
            ));
        }
        assert!(encode(&image, &DeviceProfile::custom(8, 256, 0)).is_ok());
    }

    #[test]
    fn test_encode_rejects_width_mismatch() {
        let image = BilevelImage::from_fn(16, 2, |_, _| true).unwrap();
        assert!(matches!(
            encode(&image, &DeviceProfile::phomemo_560()),
            Err(PhomemoError::InvalidProfile(_))
        ));
    }
}
