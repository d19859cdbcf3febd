//! Tile normalization and decoding
//!
//! Every source NFT image is forced to a canonical [`TILE_SIZE`] square before
//! it reaches the grid composer. The [`Tile`] type can only be built through
//! the normalizer, so holding a `Tile` means holding a 24x24 RGBA buffer.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use rayon::prelude::*;

use crate::constants::TILE_SIZE;
use crate::error::{Result, SnapshotError};
use crate::scale::resample_nearest;

/// A normalized 24x24 RGBA tile destined for one grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    image: RgbaImage,
}

impl Tile {
    /// Normalize an arbitrary RGBA image to a 24x24 tile.
    ///
    /// - 24x24 sources pass through unchanged.
    /// - 25x25 sources (a common collection art size) drop one row and one
    ///   column using the map `src = floor(dst * 25 / 24)`. The ratio is not an
    ///   integer in either direction, so the integer scaler cannot do this.
    /// - Anything else is resampled with independent X/Y ratios.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Decode`] for a zero-width or zero-height image,
    /// which has no pixels to sample.
    pub fn normalize(image: &RgbaImage) -> Result<Tile> {
        let image = match image.dimensions() {
            (0, _) | (_, 0) => {
                return Err(SnapshotError::decode("<memory>", "image has no pixels"));
            }
            (TILE_SIZE, TILE_SIZE) => image.clone(),
            (25, 25) => downscale_25(image),
            _ => resample_nearest(image, TILE_SIZE, TILE_SIZE),
        };
        Ok(Tile { image })
    }

    /// A tile filled with a single color.
    pub fn solid(color: image::Rgba<u8>) -> Tile {
        Tile { image: RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, color) }
    }

    /// Borrow the underlying 24x24 buffer.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// 25x25 -> 24x24 with `src = floor(dst * 25 / 24)` on both axes.
fn downscale_25(image: &RgbaImage) -> RgbaImage {
    RgbaImage::from_fn(TILE_SIZE, TILE_SIZE, |dx, dy| *image.get_pixel(dx * 25 / 24, dy * 25 / 24))
}

/// Decode an encoded image (PNG, GIF, JPEG, WebP, BMP, ...) and normalize it.
///
/// `origin` names the source (path or URL) in error messages.
pub fn decode_tile(bytes: &[u8], origin: &str) -> Result<Tile> {
    let decoded = image::load_from_memory(bytes).map_err(|e| SnapshotError::decode(origin, e))?;
    Tile::normalize(&decoded.to_rgba8()).map_err(|e| match e {
        SnapshotError::Decode { reason, .. } => SnapshotError::decode(origin, reason),
        other => other,
    })
}

/// Read an image file from disk and normalize it.
pub fn load_tile(path: &Path) -> Result<Tile> {
    let origin = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|e| SnapshotError::decode(&origin, e))?;
    decode_tile(&bytes, &origin)
}

/// Load a batch of tiles in parallel, keeping input order.
///
/// Failures are returned per tile; whether one bad tile aborts the whole
/// composite or becomes an empty cell is the caller's decision.
pub fn load_tiles(paths: &[PathBuf]) -> Vec<Result<Tile>> {
    paths.par_iter().map(|path| load_tile(path)).collect()
}
