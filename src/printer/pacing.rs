//! # Pacing Policies
//!
//! The printer has a small receive buffer and no flow control back to the
//! sender. When data arrives faster than it prints, the printer stops
//! accepting bytes and the print comes out silently truncated. The only
//! remedy is to wait at fixed points in the stream.
//!
//! A [`PacingPolicy`] says how long to wait at each [`PacePoint`]. The
//! transmitter asks the policy and sleeps; the encoding itself never
//! changes.

use std::time::Duration;

use super::config::PacingConfig;

/// A point in the byte stream where the transmitter may pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacePoint {
    /// Before the header of the block with this index.
    BeforeBlock(usize),
    /// After the last block, before the two feed commands.
    BeforeFeed,
    BeforeFooter,
    AfterFooter,
}

/// Supplies the wait for each pause point.
pub trait PacingPolicy {
    fn delay(&self, point: PacePoint) -> Duration;
}

/// Never waits. Used when writing to a file or stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl PacingPolicy for NoPacing {
    fn delay(&self, _point: PacePoint) -> Duration {
        Duration::ZERO
    }
}

/// One delay before every block and another at the three trailer points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedPacing {
    pub block: Duration,
    pub trailer: Duration,
}

impl PacingPolicy for FixedPacing {
    fn delay(&self, point: PacePoint) -> Duration {
        match point {
            PacePoint::BeforeBlock(_) => self.block,
            PacePoint::BeforeFeed | PacePoint::BeforeFooter | PacePoint::AfterFooter => {
                self.trailer
            }
        }
    }
}

impl From<&PacingConfig> for FixedPacing {
    fn from(config: &PacingConfig) -> Self {
        Self {
            block: config.block_delay(),
            trailer: config.trailer_delay(),
        }
    }
}
