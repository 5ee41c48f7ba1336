//! # Phomemo - Thermal Printer Raster Library
//!
//! Prints bitmap images on Phomemo thermal label/receipt printers over a
//! Bluetooth serial link. It provides:
//!
//! - **Image normalization**: orient, scale to the print head, dither to 1 bit
//! - **Raster encoding**: `GS v 0` blocks sized to the printer's buffer
//! - **Paced transmission**: configurable waits for a link without flow control
//! - **Transport**: Bluetooth RFCOMM communication
//!
//! ## Quick Start
//!
//! ```no_run
//! use phomemo::{
//!     printer::{self, DeviceProfile, FixedPacing},
//!     render::{self, DitheringAlgorithm},
//!     transport::BluetoothTransport,
//! };
//!
//! let profile = DeviceProfile::phomemo_560();
//!
//! // Load and reduce the image to the printer's width
//! let source = render::load_image("label.png")?;
//! let image = render::normalize(
//!     &source,
//!     profile.width_dots as u32,
//!     true,
//!     DitheringAlgorithm::FloydSteinberg,
//! )?;
//!
//! // Send it
//! let mut transport = BluetoothTransport::open("/dev/rfcomm0")?;
//! printer::transmit(&image, &mut transport, &profile, &FixedPacing::from(&profile.pacing))?;
//!
//! # Ok::<(), phomemo::error::PhomemoError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`render`] | Image loading, scaling and dithering |
//! | [`protocol`] | Command bytes and raster block encoding |
//! | [`printer`] | Device profiles, pacing, transmitter |
//! | [`transport`] | Communication backends |
//! | [`error`] | Error types |

pub mod error;
pub mod printer;
pub mod protocol;
pub mod render;
#[cfg(unix)]
pub mod transport;

// Re-exports for convenience
pub use error::PhomemoError;
pub use printer::{DeviceProfile, transmit};
pub use render::{BilevelImage, normalize};
#[cfg(unix)]
pub use transport::BluetoothTransport;
