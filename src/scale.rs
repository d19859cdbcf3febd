//! Nearest-neighbor scaling
//!
//! Two primitives, both without interpolation so flat pixel-art blocks stay
//! crisp and every output pixel is an exact copy of some input pixel:
//!
//! - [`scale_nearest`] - integer-factor upscaling used by the encoder
//! - [`resample_nearest`] - arbitrary target size, used by the tile normalizer
//!
//! Coordinates are mapped with integer arithmetic rather than
//! `image::imageops::resize`, whose center-sampling map differs from
//! `floor(dst * src / dst_len)` for non-integer ratios.

use image::RgbaImage;

use crate::error::{Result, SnapshotError};

/// Convert a numeric scale factor into the integer factor the scaler accepts.
///
/// Callers that compute a factor from a ratio must round first; anything that
/// is not a finite positive integer is rejected.
///
/// # Examples
///
/// ```
/// use gridsnap::scale::integer_factor;
///
/// assert_eq!(integer_factor(6.0).unwrap(), 6);
/// assert!(integer_factor(1.5).is_err());
/// assert!(integer_factor(0.0).is_err());
/// ```
pub fn integer_factor(factor: f64) -> Result<u32> {
    if !factor.is_finite() || factor < 1.0 || factor.fract() != 0.0 || factor > u32::MAX as f64 {
        return Err(SnapshotError::InvalidScaleFactor(factor));
    }
    Ok(factor as u32)
}

/// Scale an image by an integer factor using nearest-neighbor sampling.
///
/// Destination pixel `(dx, dy)` is a verbatim copy (all four channels) of
/// source pixel `(dx / factor, dy / factor)`, so each source pixel becomes a
/// `factor x factor` block.
///
/// # Errors
///
/// Returns [`SnapshotError::InvalidScaleFactor`] when `factor` is zero.
pub fn scale_nearest(image: &RgbaImage, factor: u32) -> Result<RgbaImage> {
    if factor == 0 {
        return Err(SnapshotError::InvalidScaleFactor(0.0));
    }
    if factor == 1 {
        return Ok(image.clone());
    }

    let (w, h) = image.dimensions();
    let new_w = w.checked_mul(factor).ok_or(SnapshotError::InvalidScaleFactor(factor as f64))?;
    let new_h = h.checked_mul(factor).ok_or(SnapshotError::InvalidScaleFactor(factor as f64))?;

    Ok(RgbaImage::from_fn(new_w, new_h, |dx, dy| *image.get_pixel(dx / factor, dy / factor)))
}

/// Resample an image to an exact size using nearest-neighbor sampling.
///
/// Each axis has its own ratio: `src_x = floor(dx * src_w / new_w)` and
/// `src_y = floor(dy * src_h / new_h)`. Works for up- and down-sampling and
/// for ratios that are not integral in either direction.
///
/// The caller guarantees non-zero source and destination dimensions.
pub fn resample_nearest(image: &RgbaImage, new_w: u32, new_h: u32) -> RgbaImage {
    let (src_w, src_h) = image.dimensions();
    if (src_w, src_h) == (new_w, new_h) {
        return image.clone();
    }

    RgbaImage::from_fn(new_w, new_h, |dx, dy| {
        let sx = source_coord(dx, src_w, new_w);
        let sy = source_coord(dy, src_h, new_h);
        *image.get_pixel(sx, sy)
    })
}

/// `floor(dest * src_len / dst_len)`, widened so large images cannot overflow.
fn source_coord(dest: u32, src_len: u32, dst_len: u32) -> u32 {
    let mapped = (dest as u64 * src_len as u64) / dst_len as u64;
    (mapped as u32).min(src_len - 1)
}
