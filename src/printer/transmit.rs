//! # Paced Transmitter
//!
//! Writes a [`BilevelImage`] to an already-open connection as a framed
//! raster job, pausing where the [`PacingPolicy`] asks.
//!
//! ## Write Sequence
//!
//! ```text
//! write header
//! for each block:
//!     pause(BeforeBlock(i))
//!     write block header
//!     for each row: pack, escape, write
//! pause(BeforeFeed)   write feed   write feed
//! pause(BeforeFooter) write footer
//! pause(AfterFooter)  flush
//! ```
//!
//! Every piece above is one `write_all` call. The first failure aborts the
//! job with [`PhomemoError::Transmission`]; nothing is retried because the
//! printer never acknowledges a block.

use std::io::Write;
use std::thread;

use tracing::{debug, info, trace};

use super::config::DeviceProfile;
use super::pacing::{PacePoint, PacingPolicy};
use crate::error::{PhomemoError, Stage};
use crate::protocol::commands::{FOOTER, HEADER, PRINT_FEED};
use crate::protocol::raster;
use crate::render::BilevelImage;

/// Send `image` to `connection` using the geometry and escape rule of
/// `profile` and the waits of `pacing`.
///
/// The connection is borrowed, never opened or closed here.
///
/// ## Errors
///
/// - [`PhomemoError::InvalidProfile`] if the profile does not validate or
///   its width differs from the image's
/// - [`PhomemoError::Transmission`] on the first failed write or flush
pub fn transmit<W, P>(
    image: &BilevelImage,
    connection: &mut W,
    profile: &DeviceProfile,
    pacing: &P,
) -> Result<(), PhomemoError>
where
    W: Write + ?Sized,
    P: PacingPolicy + ?Sized,
{
    raster::check_fit(image, profile)?;

    let blocks = raster::blocks(image, profile);
    info!(
        profile = %profile.name,
        width = image.width(),
        height = image.height(),
        blocks = blocks.len(),
        "transmitting"
    );

    send(connection, &HEADER, Stage::Header)?;

    for block in &blocks {
        pause(pacing, PacePoint::BeforeBlock(block.index));
        send(
            connection,
            &block.header()?,
            Stage::BlockHeader { block: block.index },
        )?;

        for (row, y) in block.rows.clone().enumerate() {
            let bytes = raster::encode_row(image, y, &profile.escape);
            send(
                connection,
                &bytes,
                Stage::Row {
                    block: block.index,
                    row,
                },
            )?;
        }
        debug!(block = block.index, rows = block.row_count(), "block sent");
    }

    pause(pacing, PacePoint::BeforeFeed);
    send(connection, &PRINT_FEED, Stage::Feed)?;
    send(connection, &PRINT_FEED, Stage::Feed)?;

    pause(pacing, PacePoint::BeforeFooter);
    send(connection, &FOOTER, Stage::Footer)?;

    pause(pacing, PacePoint::AfterFooter);
    connection
        .flush()
        .map_err(|e| PhomemoError::transmission(Stage::Flush, e))?;

    info!("transmission complete");
    Ok(())
}

fn send<W: Write + ?Sized>(connection: &mut W, bytes: &[u8], stage: Stage) -> Result<(), PhomemoError> {
    connection
        .write_all(bytes)
        .map_err(|e| PhomemoError::transmission(stage, e))
}

fn pause<P: PacingPolicy + ?Sized>(pacing: &P, point: PacePoint) {
    let delay = pacing.delay(point);
    if !delay.is_zero() {
        trace!(?point, ?delay, "pacing");
        thread::sleep(delay);
    }
}

// ============================================================================
// TESTS
// ============================================================================
