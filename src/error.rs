//! # Error Types
//!
//! This module defines error types used throughout the phomemo library.
//!
//! Every error is terminal for the print job it occurs in. Nothing is retried
//! internally: resending part of a raster stream would desynchronize the
//! printer's block framing.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for phomemo operations
#[derive(Debug, Error)]
pub enum PhomemoError {
    /// The source image could not be read or decoded
    #[error("Failed to load image {}: {reason}", .path.display())]
    ImageLoad { path: PathBuf, reason: String },

    /// Degenerate image geometry (zero-sized source, bad target width)
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    /// A write to the printer connection failed mid-job
    #[error("Transmission failed while sending {stage}: {source}")]
    Transmission {
        stage: Stage,
        #[source]
        source: io::Error,
    },

    /// Device profile is out of range for the raster protocol
    #[error("Invalid device profile: {0}")]
    InvalidProfile(String),

    /// Connection setup errors (device open, TTY configuration, rfcomm binding)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Where in the device byte stream a transmission failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Header,
    BlockHeader { block: usize },
    Row { block: usize, row: usize },
    Feed,
    Footer,
    Flush,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Header => write!(f, "header"),
            Stage::BlockHeader { block } => write!(f, "block {} header", block),
            Stage::Row { block, row } => write!(f, "block {} row {}", block, row),
            Stage::Feed => write!(f, "paper feed"),
            Stage::Footer => write!(f, "footer"),
            Stage::Flush => write!(f, "final flush"),
        }
    }
}

impl PhomemoError {
    pub(crate) fn transmission(stage: Stage, source: io::Error) -> Self {
        PhomemoError::Transmission { stage, source }
    }
}
