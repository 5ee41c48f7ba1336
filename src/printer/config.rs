//! # Device Profiles
//!
//! This module defines the per-model parameters of the raster protocol.
//!
//! ## Built-in Profiles
//!
//! | Name | Width (dots) | Width (bytes) | Block rows | Pacing |
//! |------|--------------|---------------|------------|--------|
//! | phomemo-560 | 560 | 70 | 256 | none |
//! | phomemo-880 | 880 | 110 | 64 | 100ms / 500ms |
//!
//! ## Usage
//!
//! ```
//! use phomemo::printer::DeviceProfile;
//!
//! let profile = DeviceProfile::phomemo_560();
//! println!("Print width: {} dots ({} bytes)",
//!          profile.width_dots,
//!          profile.width_bytes());
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PhomemoError;
use crate::protocol::commands::LF;

/// Largest block height the 1-byte `rows - 1` field can describe.
pub const MAX_BLOCK_ROWS_LIMIT: u16 = 256;

/// # Device Profile
///
/// Everything the encoder and transmitter need to know about one printer
/// model.
///
/// ## Fields
///
/// - **width_dots**: printable width in dots, a multiple of 8
/// - **max_block_rows**: rows per raster block, sized to the receive buffer
/// - **pacing**: blocking delays inserted into the stream
/// - **escape**: the payload byte the printer mistakes for a control code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Human-readable name (e.g. "phomemo-560").
    pub name: String,

    /// Print width in dots (pixels).
    pub width_dots: u16,

    /// Maximum rows per raster block.
    pub max_block_rows: u16,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub escape: ByteEscape,
}

/// Pacing delays, in milliseconds. Zero disables a wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Wait before each raster block.
    #[serde(default)]
    pub block_delay_ms: u64,

    /// Wait before the feeds, before the footer, and after the footer.
    #[serde(default)]
    pub trailer_delay_ms: u64,
}

impl PacingConfig {
    pub fn block_delay(&self) -> Duration {
        Duration::from_millis(self.block_delay_ms)
    }

    pub fn trailer_delay(&self) -> Duration {
        Duration::from_millis(self.trailer_delay_ms)
    }
}

/// Single-byte substitution applied to raster payload bytes.
///
/// 0x0A is read as a line feed even inside raster data, so it is sent as
/// 0x14 instead (one-dot difference in that byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteEscape {
    pub forbidden: u8,
    pub replacement: u8,
}

impl Default for ByteEscape {
    fn default() -> Self {
        Self {
            forbidden: LF,
            replacement: 0x14,
        }
    }
}

impl ByteEscape {
    #[inline]
    pub fn apply(&self, byte: u8) -> u8 {
        if byte == self.forbidden {
            self.replacement
        } else {
            byte
        }
    }
}

impl DeviceProfile {
    /// # 560-dot Profile
    ///
    /// 70 bytes per row, 256-row blocks. The printer keeps up with the
    /// stream without any pacing.
    pub fn phomemo_560() -> Self {
        Self {
            name: "phomemo-560".to_string(),
            width_dots: 560,
            max_block_rows: 256,
            pacing: PacingConfig::default(),
            escape: ByteEscape::default(),
        }
    }

    /// # 880-dot Profile
    ///
    /// 110 bytes per row. The receive buffer fills after roughly 7KB, so
    /// blocks are kept to 64 rows and each one is preceded by a pause.
    pub fn phomemo_880() -> Self {
        Self {
            name: "phomemo-880".to_string(),
            width_dots: 880,
            max_block_rows: 64,
            pacing: PacingConfig {
                block_delay_ms: 100,
                trailer_delay_ms: 500,
            },
            escape: ByteEscape::default(),
        }
    }

    /// A profile with arbitrary geometry and a uniform delay.
    pub fn custom(width_dots: u16, max_block_rows: u16, delay_ms: u64) -> Self {
        Self {
            name: format!("custom {}x{}", width_dots, max_block_rows),
            width_dots,
            max_block_rows,
            pacing: PacingConfig {
                block_delay_ms: delay_ms,
                trailer_delay_ms: delay_ms,
            },
            escape: ByteEscape::default(),
        }
    }

    /// Print width in bytes (width_dots / 8)
    #[inline]
    pub fn width_bytes(&self) -> u16 {
        self.width_dots / 8
    }

    /// Check that the profile fits the raster block header.
    ///
    /// The width and `rows - 1` fields are one byte each, so the width must
    /// be 8..=2040 dots in steps of 8 and blocks 1..=256 rows.
    pub fn validate(&self) -> Result<(), PhomemoError> {
        if self.width_dots == 0 || self.width_dots % 8 != 0 {
            return Err(PhomemoError::InvalidProfile(format!(
                "{}: width {} is not a positive multiple of 8",
                self.name, self.width_dots
            )));
        }
        if self.width_bytes() > u8::MAX as u16 {
            return Err(PhomemoError::InvalidProfile(format!(
                "{}: width {} bytes exceeds 255",
                self.name,
                self.width_bytes()
            )));
        }
        if self.max_block_rows == 0 || self.max_block_rows > MAX_BLOCK_ROWS_LIMIT {
            return Err(PhomemoError::InvalidProfile(format!(
                "{}: block height {} must be between 1 and {}",
                self.name, self.max_block_rows, MAX_BLOCK_ROWS_LIMIT
            )));
        }
        Ok(())
    }

    /// Parse a profile string (CLI args).
    ///
    /// Formats:
    /// - `"phomemo-560"`, `"phomemo-880"` → built-in profile
    /// - `"custom:WIDTHxROWS"` → no pacing (e.g. `"custom:384x128"`)
    /// - `"custom:WIDTHxROWS@DELAY"` → uniform delay in ms (e.g. `"custom:880x64@50"`)
    pub fn parse(s: &str) -> Result<Self, PhomemoError> {
        let lower = s.to_lowercase();
        if let Some(profile) = Self::built_in().into_iter().find(|p| p.name == lower) {
            return Ok(profile);
        }

        let Some(spec) = lower.strip_prefix("custom:") else {
            return Err(PhomemoError::InvalidProfile(format!(
                "Unknown profile '{}'. Use 'phomemo-560', 'phomemo-880' or 'custom:WIDTHxROWS[@DELAY]'",
                s
            )));
        };

        let (dims, delay) = match spec.split_once('@') {
            Some((dims, delay)) => {
                let delay = delay.trim_end_matches("ms");
                let delay: u64 = delay
                    .parse()
                    .map_err(|_| PhomemoError::InvalidProfile(format!("Invalid delay: {}", delay)))?;
                (dims, delay)
            }
            None => (spec, 0),
        };

        let (w, h) = dims.split_once('x').ok_or_else(|| {
            PhomemoError::InvalidProfile(format!("Expected WIDTHxROWS, got '{}'", dims))
        })?;
        let width: u16 = w
            .parse()
            .map_err(|_| PhomemoError::InvalidProfile(format!("Invalid width: {}", w)))?;
        let rows: u16 = h
            .parse()
            .map_err(|_| PhomemoError::InvalidProfile(format!("Invalid block rows: {}", h)))?;

        let profile = Self::custom(width, rows, delay);
        profile.validate()?;
        Ok(profile)
    }

    /// Load and validate a profile from a JSON file.
    ///
    /// ```json
    /// { "name": "desk", "width_dots": 384, "max_block_rows": 128,
    ///   "pacing": { "block_delay_ms": 20 } }
    /// ```
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PhomemoError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let profile: Self = serde_json::from_str(&text).map_err(|e| {
            PhomemoError::InvalidProfile(format!("{}: {}", path.display(), e))
        })?;
        profile.validate()?;
        Ok(profile)
    }

    /// List all built-in profiles.
    pub fn built_in() -> Vec<Self> {
        vec![Self::phomemo_560(), Self::phomemo_880()]
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::phomemo_560()
    }
}

// ============================================================================
// TESTS
// ============================================================================
