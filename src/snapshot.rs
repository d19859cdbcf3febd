//! End-to-end snapshot pipeline
//!
//! Tiles → grid canvas → palette PNG → size guard → [`EncodedSnapshot`], the
//! immutable artifact handed to the external "set snapshot" contract call.

use std::fmt;
use std::str::FromStr;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{is_supported_target, DEFAULT_PALETTE_SIZE, DEFAULT_TARGET};
use crate::encode::{PaletteEncoder, SnapshotEncoder};
use crate::error::{Result, SnapshotError};
use crate::grid::{compose_slots, GridLayout};
use crate::guard::{EncodeAttempt, SizeGuard};
use crate::tile::Tile;

/// Opaque 32-byte content hash stored alongside the snapshot.
///
/// Supplied by the caller; the pipeline never computes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SnapshotHash(pub [u8; 32]);

/// Error parsing a [`SnapshotHash`] from text
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HashParseError {
    #[error("hash must be 64 hex digits, got {0}")]
    Length(usize),
    #[error("invalid hex in hash: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl SnapshotHash {
    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for SnapshotHash {
    type Err = HashParseError;

    /// Parse 64 hex digits, with or without a `0x` prefix.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        if digits.len() != 64 {
            return Err(HashParseError::Length(digits.len()));
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(digits, &mut out)?;
        Ok(SnapshotHash(out))
    }
}

impl fmt::Display for SnapshotHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Final PNG plus the metadata the on-chain consumer stores with it.
#[derive(Debug, Clone)]
pub struct EncodedSnapshot {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub hash: SnapshotHash,
    /// Target size of the accepted encoding
    pub target: u32,
    /// Palette size of the accepted encoding
    pub palette_size: usize,
    /// Retries the size guard made, in order
    pub attempts: Vec<EncodeAttempt>,
}

impl EncodedSnapshot {
    /// PNG bytes as `0x`-prefixed lowercase hex, the form the contract call takes.
    pub fn png_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.png))
    }

    pub fn payload(&self) -> SnapshotPayload {
        SnapshotPayload {
            width: self.width,
            height: self.height,
            hash: self.hash.to_hex(),
            png: self.png_hex(),
            bytes: self.png.len(),
            target: self.target,
            palette_size: self.palette_size,
        }
    }
}

/// Serializable arguments for the external "set snapshot" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub width: u32,
    pub height: u32,
    /// `0x`-prefixed 32-byte hash
    pub hash: String,
    /// `0x`-prefixed PNG bytes
    pub png: String,
    /// PNG length in bytes
    pub bytes: usize,
    pub target: u32,
    pub palette_size: usize,
}

/// Configures and runs the snapshot pipeline.
///
/// # Examples
///
/// ```
/// use gridsnap::grid::GridLayout;
/// use gridsnap::snapshot::SnapshotBuilder;
/// use gridsnap::tile::Tile;
/// use image::Rgba;
///
/// let layout = GridLayout::new(1, 2).unwrap();
/// let slots = vec![Some(Tile::solid(Rgba([255, 0, 0, 255]))), None];
/// let snapshot = SnapshotBuilder::new(layout).build(&slots).unwrap();
///
/// assert_eq!((snapshot.width, snapshot.height), (432, 216));
/// assert!(snapshot.png.len() <= 180_000);
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    layout: GridLayout,
    target: u32,
    palette_size: usize,
    background: Option<Rgba<u8>>,
    hash: SnapshotHash,
    guard: SizeGuard,
}

impl SnapshotBuilder {
    /// Builder with the default target (432), palette (32), transparent
    /// background, zero hash and the standard size guard.
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            target: DEFAULT_TARGET,
            palette_size: DEFAULT_PALETTE_SIZE,
            background: None,
            hash: SnapshotHash::default(),
            guard: SizeGuard::default(),
        }
    }

    /// Target size for the first attempt. Checked by [`build`](Self::build).
    pub fn target(mut self, target: u32) -> Self {
        self.target = target;
        self
    }

    pub fn palette_size(mut self, palette_size: usize) -> Self {
        self.palette_size = palette_size;
        self
    }

    /// Fill the canvas with `color` before placing tiles.
    pub fn background(mut self, color: Option<Rgba<u8>>) -> Self {
        self.background = color;
        self
    }

    pub fn hash(mut self, hash: SnapshotHash) -> Self {
        self.hash = hash;
        self
    }

    pub fn guard(mut self, guard: SizeGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// The unscaled composite for `slots`.
    pub fn compose(&self, slots: &[Option<Tile>]) -> RgbaImage {
        compose_slots(slots, self.layout, self.background)
    }

    /// Run the pipeline with the production encoder.
    pub fn build(&self, slots: &[Option<Tile>]) -> Result<EncodedSnapshot> {
        self.build_with(&PaletteEncoder::new(), slots)
    }

    /// Run the pipeline with a specific encoder.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::UnsupportedTarget`] unless the target is 432 or 576,
    /// before anything is encoded.
    pub fn build_with<E: SnapshotEncoder + ?Sized>(
        &self,
        encoder: &E,
        slots: &[Option<Tile>],
    ) -> Result<EncodedSnapshot> {
        if !is_supported_target(self.target) {
            return Err(SnapshotError::UnsupportedTarget(self.target));
        }

        let base = self.compose(slots);
        debug!(
            rows = self.layout.rows(),
            cols = self.layout.cols(),
            width = base.width(),
            height = base.height(),
            "composed grid"
        );

        let initial = encoder.encode(&base, self.target, self.palette_size)?;
        let outcome =
            self.guard.ensure_under_cap(encoder, initial, &base, self.target, self.palette_size)?;

        Ok(EncodedSnapshot {
            width: outcome.png.width,
            height: outcome.png.height,
            png: outcome.png.bytes,
            hash: self.hash,
            target: outcome.target,
            palette_size: outcome.palette_size,
            attempts: outcome.attempts,
        })
    }
}
