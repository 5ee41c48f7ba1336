//! # Phomemo Protocol Commands
//!
//! Phomemo printers speak a small ESC/POS subset plus a handful of vendor
//! commands prefixed with US (0x1F).
//!
//! ## Escape Sequence Structure
//!
//! - `ESC @`, `ESC a n`, `ESC d n`: standard ESC/POS
//! - `GS v 0 m ...`: raster bit image (see [`super::raster`])
//! - `US 0x11 n ...`: vendor settings (density, paper type, status)
//!
//! A print job is always framed the same way:
//!
//! ```text
//! header | block* | feed | feed | footer
//! ```

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix (raster graphics)
pub const GS: u8 = 0x1D;

/// US (Unit Separator) - Vendor command prefix
pub const US: u8 = 0x1F;

/// LF (Line Feed)
///
/// The printer acts on this byte even in the middle of raster payload,
/// which is why packed rows escape it.
pub const LF: u8 = 0x0A;

// ============================================================================
// JOB FRAMING
// ============================================================================

/// # Job Header
///
/// Sent once before the first raster block.
///
/// ## Protocol Details
///
/// | Bytes | Meaning |
/// |-------|---------|
/// | 1B 40 | ESC @: initialize |
/// | 1B 61 01 | ESC a 1: center justification |
/// | 1F 11 02 04 | vendor: print density/heat setting |
pub const HEADER: [u8; 9] = [ESC, b'@', ESC, b'a', 0x01, US, 0x11, 0x02, 0x04];

/// # Print and Feed (ESC d n)
///
/// Prints the buffer and feeds `n` = 2 lines. Sent twice after the last
/// block so the image clears the tear bar.
pub const PRINT_FEED: [u8; 3] = [ESC, b'd', 0x02];

/// # Job Footer
///
/// Vendor status/finish sequence sent after the feeds.
///
/// | Bytes | Meaning |
/// |-------|---------|
/// | 1F 11 08 | query/ack: end of job |
/// | 1F 11 0E | query: device timer |
/// | 1F 11 07 | query: battery |
/// | 1F 11 09 | query: paper state |
pub const FOOTER: [u8; 12] = [
    US, 0x11, 0x08, US, 0x11, 0x0E, US, 0x11, 0x07, US, 0x11, 0x09,
];

/// # Raster Bit Image Marker (GS v 0 m)
///
/// Opens every raster block. `m` = 0 is normal density.
pub const RASTER_MARKER: [u8; 4] = [GS, b'v', b'0', 0x00];

// ============================================================================
// TESTS
// ============================================================================
