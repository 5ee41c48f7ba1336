//! # Byte Stream Tests
//!
//! End-to-end checks of the device byte stream: framing, block partitioning,
//! escaping, and behaviour when the connection breaks mid-job.

use std::io::{self, Write};

use image::{DynamicImage, GrayImage, Luma};
use phomemo::error::{PhomemoError, Stage};
use phomemo::printer::{self, DeviceProfile, FixedPacing, NoPacing};
use phomemo::protocol::commands::{FOOTER, HEADER, PRINT_FEED, RASTER_MARKER};
use phomemo::protocol::raster::{self, BLOCK_HEADER_LEN};
use phomemo::render::{self, BilevelImage, DitheringAlgorithm};
use pretty_assertions::assert_eq;

// ============================================================================
// HELPERS
// ============================================================================

/// Collects everything written.
#[derive(Default)]
struct Capture {
    bytes: Vec<u8>,
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Accepts `ok_writes` write calls, then fails every call after.
struct FailingConnection {
    ok_writes: usize,
    calls: usize,
}

impl Write for FailingConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.calls += 1;
        if self.calls > self.ok_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "printer went away"));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn send(image: &BilevelImage, profile: &DeviceProfile) -> Vec<u8> {
    let mut out = Capture::default();
    printer::transmit(image, &mut out, profile, &NoPacing).unwrap();
    out.bytes
}

/// Walk the stream and return (row count, rows) for every block.
fn parse_blocks(stream: &[u8], width_bytes: usize) -> Vec<(usize, Vec<Vec<u8>>)> {
    assert_eq!(&stream[..HEADER.len()], &HEADER);
    let mut pos = HEADER.len();
    let mut blocks = Vec::new();

    while stream[pos..].starts_with(&RASTER_MARKER) {
        let header = &stream[pos..pos + BLOCK_HEADER_LEN];
        assert_eq!(header[4] as usize, width_bytes);
        assert_eq!(header[5], 0);
        assert_eq!(header[7], 0);
        let rows = header[6] as usize + 1;
        pos += BLOCK_HEADER_LEN;

        let data = (0..rows)
            .map(|r| stream[pos + r * width_bytes..pos + (r + 1) * width_bytes].to_vec())
            .collect();
        pos += rows * width_bytes;
        blocks.push((rows, data));
    }

    let mut trailer = PRINT_FEED.to_vec();
    trailer.extend(PRINT_FEED);
    trailer.extend(FOOTER);
    assert_eq!(&stream[pos..], &trailer[..]);
    blocks
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_all_black_8x8_single_block() {
    let image = BilevelImage::from_fn(8, 8, |_, _| true).unwrap();
    let stream = send(&image, &DeviceProfile::custom(8, 64, 0));

    let mut expected = HEADER.to_vec();
    expected.extend(RASTER_MARKER);
    expected.extend([0x01, 0x00, 0x07, 0x00]);
    expected.extend([0xFF; 8]);
    expected.extend(PRINT_FEED);
    expected.extend(PRINT_FEED);
    expected.extend(FOOTER);
    assert_eq!(stream, expected);
}

#[test]
fn test_failure_on_third_write_stops_after_two() {
    let image = BilevelImage::from_fn(8, 8, |_, _| true).unwrap();
    let mut conn = FailingConnection {
        ok_writes: 2,
        calls: 0,
    };

    let err = printer::transmit(&image, &mut conn, &DeviceProfile::custom(8, 64, 0), &NoPacing)
        .unwrap_err();

    // header, block header, then the first row fails
    assert_eq!(conn.calls, 3);
    match err {
        PhomemoError::Transmission { stage, source } => {
            assert_eq!(stage, Stage::Row { block: 0, row: 0 });
            assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
        }
        other => panic!("expected Transmission, got {:?}", other),
    }
}

#[test]
fn test_failure_in_later_block_aborts_remaining_blocks() {
    let image = BilevelImage::from_fn(8, 10, |_, _| false).unwrap();
    // header + (hdr + 4 rows) ok, then block 1 header fails
    let mut conn = FailingConnection {
        ok_writes: 6,
        calls: 0,
    };

    let err = printer::transmit(&image, &mut conn, &DeviceProfile::custom(8, 4, 0), &NoPacing)
        .unwrap_err();

    assert_eq!(conn.calls, 7);
    assert!(matches!(
        err,
        PhomemoError::Transmission {
            stage: Stage::BlockHeader { block: 1 },
            ..
        }
    ));
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn test_block_rows_cover_image_in_order() {
    let width_bytes = 2;
    for (height, max_rows) in [(1u32, 64u16), (64, 64), (65, 64), (200, 64), (513, 256), (37, 5)] {
        // Row y is filled with the byte y so order is visible on the wire
        let image = BilevelImage::from_fn(16, height, |x, y| {
            let byte = (y % 251) as u8;
            byte & (0x80 >> (x % 8)) != 0
        })
        .unwrap();
        let stream = send(&image, &DeviceProfile::custom(16, max_rows, 0));
        let blocks = parse_blocks(&stream, width_bytes);

        let counts: Vec<usize> = blocks.iter().map(|(n, _)| *n).collect();
        assert_eq!(counts.iter().sum::<usize>(), height as usize);
        assert!(counts.iter().all(|&n| n >= 1 && n <= max_rows as usize));

        let rows: Vec<Vec<u8>> = blocks.into_iter().flat_map(|(_, rows)| rows).collect();
        for (y, row) in rows.iter().enumerate() {
            let byte = (y % 251) as u8;
            let escaped = if byte == 0x0A { 0x14 } else { byte };
            assert_eq!(row, &vec![escaped; width_bytes], "row {}", y);
        }
    }
}

#[test]
fn test_exact_multiple_has_no_short_block() {
    let image = BilevelImage::from_fn(8, 192, |_, _| false).unwrap();
    let stream = send(&image, &DeviceProfile::custom(8, 64, 0));
    let counts: Vec<usize> = parse_blocks(&stream, 1).iter().map(|(n, _)| *n).collect();
    assert_eq!(counts, vec![64, 64, 64]);
}

#[test]
fn test_remainder_block_has_true_row_count() {
    let image = BilevelImage::from_fn(8, 200, |_, _| false).unwrap();
    let stream = send(&image, &DeviceProfile::custom(8, 64, 0));
    let counts: Vec<usize> = parse_blocks(&stream, 1).iter().map(|(n, _)| *n).collect();
    assert_eq!(counts, vec![64, 64, 64, 8]);
}

#[test]
fn test_only_line_feed_bytes_are_substituted() {
    // Widest legal row (255 bytes) holding byte values 0..=254
    let image = BilevelImage::from_fn(255 * 8, 1, |x, _| {
        let byte = (x / 8) as u8;
        byte & (0x80 >> (x % 8)) != 0
    })
    .unwrap();
    let stream = send(&image, &DeviceProfile::custom(255 * 8, 64, 0));
    let blocks = parse_blocks(&stream, 255);
    let row = &blocks[0].1[0];

    for (value, &sent) in row.iter().enumerate() {
        if value == 0x0A {
            assert_eq!(sent, 0x14);
        } else {
            assert_eq!(sent as usize, value);
        }
    }
}

#[test]
fn test_pack_unpack_round_trip() {
    let image = BilevelImage::from_fn(64, 40, |x, y| (x * 31 + y * 17) % 7 < 3).unwrap();
    let stream = send(&image, &DeviceProfile::custom(64, 16, 0));
    let rows: Vec<Vec<u8>> = parse_blocks(&stream, 8)
        .into_iter()
        .flat_map(|(_, rows)| rows)
        .collect();

    for (y, row) in rows.iter().enumerate() {
        let original = image.row(y as u32);
        if phomemo::render::dither::pack_row(original).contains(&0x0A) {
            continue;
        }
        assert_eq!(raster::decode_row(row), original);
    }
}

#[test]
fn test_encode_matches_transmit() {
    let image = BilevelImage::from_fn(560, 300, |x, y| (x ^ y) % 3 == 0).unwrap();
    let profile = DeviceProfile::phomemo_560();
    assert_eq!(raster::encode(&image, &profile).unwrap(), send(&image, &profile));
}

#[test]
fn test_encode_and_transmit_reject_the_same_inputs() {
    let cases = [
        (BilevelImage::from_fn(8, 300, |_, _| true).unwrap(), DeviceProfile::custom(8, 300, 0)),
        (BilevelImage::from_fn(8, 300, |_, _| true).unwrap(), DeviceProfile::custom(8, 257, 0)),
        (BilevelImage::from_fn(16, 2, |_, _| true).unwrap(), DeviceProfile::phomemo_560()),
    ];

    for (image, profile) in &cases {
        let mut out = Capture::default();
        let sent = printer::transmit(image, &mut out, profile, &NoPacing);
        assert!(matches!(sent, Err(PhomemoError::InvalidProfile(_))));
        assert!(out.bytes.is_empty());
        assert!(matches!(
            raster::encode(image, profile),
            Err(PhomemoError::InvalidProfile(_))
        ));
    }
}

#[test]
fn test_paced_transmission_writes_same_bytes() {
    let image = BilevelImage::from_fn(16, 20, |x, _| x < 8).unwrap();
    let profile = DeviceProfile::custom(16, 8, 1);
    let mut out = Capture::default();
    printer::transmit(&image, &mut out, &profile, &FixedPacing::from(&profile.pacing)).unwrap();
    assert_eq!(out.bytes, raster::encode(&image, &profile).unwrap());
}

// ============================================================================
// PIPELINE
// ============================================================================

#[test]
fn test_normalize_then_transmit_photo_sized_image() {
    let source = DynamicImage::ImageLuma8(GrayImage::from_fn(300, 200, |x, _| {
        Luma([(x * 255 / 299) as u8])
    }));
    let profile = DeviceProfile::phomemo_880();
    let image = render::normalize(
        &source,
        profile.width_dots as u32,
        true,
        DitheringAlgorithm::FloydSteinberg,
    )
    .unwrap();

    // Landscape → rotated to 200x300 → 880 wide, 1320 tall
    assert_eq!(image.width(), 880);
    assert_eq!(image.height(), 1320);

    let stream = raster::encode(&image, &profile).unwrap();
    let blocks = parse_blocks(&stream, 110);
    assert_eq!(blocks.len(), 21); // 20 × 64 + 40
    assert_eq!(blocks.last().unwrap().0, 40);
}
