//! Error types for the snapshot pipeline

use thiserror::Error;

/// Error raised by any stage of the snapshot pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    /// A source tile could not be read or decoded
    #[error("failed to decode tile '{origin}': {reason}")]
    Decode { origin: String, reason: String },

    /// A scale factor that is not a positive integer reached the integer scaler
    #[error("invalid scale factor {0}: must be a positive integer")]
    InvalidScaleFactor(f64),

    /// A target size other than 432 or 576
    #[error("unsupported target size {0}: expected 432 or 576")]
    UnsupportedTarget(u32),

    /// A palette size outside the supported set
    #[error("unsupported palette size {0}: expected one of 8, 12, 16, 24, 32")]
    UnsupportedPaletteSize(usize),

    /// A grid with zero rows or columns
    #[error("invalid grid {rows}x{cols}: rows and cols must be at least 1")]
    InvalidGrid { rows: u32, cols: u32 },

    /// Every rung of the size guard ladder stayed over the byte cap
    #[error(
        "snapshot does not fit in {cap} bytes (smallest attempt was {smallest} bytes after {attempts} retries); reduce grid size or simplify artwork"
    )]
    CompressionExhausted { cap: usize, smallest: usize, attempts: usize },

    /// The PNG writer failed
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),

    /// File I/O failure while loading tiles or writing output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SnapshotError {
    /// Build a decode error for a tile identified by `origin` (a path or URL).
    pub fn decode(origin: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        SnapshotError::Decode { origin: origin.into(), reason: reason.to_string() }
    }
}

/// Result alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, SnapshotError>;
