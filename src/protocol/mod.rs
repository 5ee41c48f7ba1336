//! # Phomemo Protocol Implementation
//!
//! Byte-level encoding of a print job.
//!
//! ## Module Structure
//!
//! - [`commands`]: Fixed command sequences (header, feed, footer, raster marker)
//! - [`raster`]: Block partitioning, row packing and escaping
//!
//! ## Usage Example
//!
//! ```
//! use phomemo::printer::DeviceProfile;
//! use phomemo::protocol::raster;
//! use phomemo::render::BilevelImage;
//!
//! let image = BilevelImage::from_fn(560, 300, |x, _| x % 2 == 0)?;
//! let bytes = raster::encode(&image, &DeviceProfile::phomemo_560())?;
//!
//! // 9 header + 2 blocks × 8 + 300 rows × 70 + 2 × 3 feed + 12 footer
//! assert_eq!(bytes.len(), 9 + 16 + 300 * 70 + 6 + 12);
//!
//! # Ok::<(), phomemo::error::PhomemoError>(())
//! ```

pub mod commands;
pub mod raster;
