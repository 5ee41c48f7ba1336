//! # Rendering Module
//!
//! This module turns source images into printable one-bit rasters.
//!
//! ## Modules
//!
//! - [`normalize`]: Load, orient, scale and quantize a source image
//! - [`dither`]: Floyd-Steinberg, Bayer and threshold quantization; bit packing
//! - [`bilevel`]: The black/white pixel grid consumed by the encoder
//!
//! ## Usage Example
//!
//! ```no_run
//! use phomemo::render::{self, DitheringAlgorithm};
//!
//! let source = render::load_image("cat.jpg")?;
//! let bilevel = render::normalize(&source, 560, true, DitheringAlgorithm::FloydSteinberg)?;
//! assert_eq!(bilevel.width(), 560);
//!
//! # Ok::<(), phomemo::error::PhomemoError>(())
//! ```

pub mod bilevel;
pub mod dither;
pub mod normalize;

pub use bilevel::BilevelImage;
pub use dither::DitheringAlgorithm;
pub use normalize::{load_image, normalize};
