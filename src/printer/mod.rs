//! # Printer Module
//!
//! This module provides per-model configuration and the paced transmitter.
//!
//! ## Modules
//!
//! - [`config`]: Device profiles (width, block height, pacing, escaping)
//! - [`pacing`]: Pacing policies for printers without flow control
//! - [`transmit`]: Writes a bilevel image to an open connection

pub mod config;
pub mod pacing;
pub mod transmit;

pub use config::DeviceProfile;
pub use pacing::{FixedPacing, NoPacing, PacePoint, PacingPolicy};
pub use transmit::transmit;
