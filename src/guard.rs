//! Byte-cap enforcement for encoded snapshots
//!
//! When the first encoding is too large, [`SizeGuard`] walks a fixed,
//! finite ladder of cheaper encodings and returns the first one that fits:
//!
//! 1. the initial bytes, if they already fit
//! 2. the small target with the default palette, if the initial target was larger
//! 3. the (possibly reduced) target with each palette size of the ladder; when
//!    the target was not reduced, only sizes below the initial palette
//!
//! If nothing fits, the guard fails instead of returning an oversized PNG.

use image::RgbaImage;
use tracing::{debug, info};

use crate::constants::{DEFAULT_PALETTE_SIZE, PALETTE_LADDER, SNAPSHOT_BYTE_CAP, TARGET_SMALL};
use crate::encode::{EncodedPng, SnapshotEncoder};
use crate::error::{Result, SnapshotError};

/// One retry made by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeAttempt {
    /// Target size passed to the encoder
    pub target: u32,
    /// Palette size passed to the encoder
    pub palette_size: usize,
    /// Resulting PNG length in bytes
    pub bytes: usize,
}

/// The encoding that satisfied the cap, and how the guard got there.
#[derive(Debug, Clone)]
pub struct GuardOutcome {
    pub png: EncodedPng,
    /// Target size of the accepted encoding
    pub target: u32,
    /// Palette size of the accepted encoding
    pub palette_size: usize,
    /// Retries in the order they were made (empty when the initial bytes fit)
    pub attempts: Vec<EncodeAttempt>,
}

/// Retry ladder parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeGuard {
    /// Maximum accepted PNG length in bytes
    pub cap: usize,
    /// Target size to fall back to when the initial target was larger
    pub small_target: u32,
    /// Palette size used for the target fallback
    pub default_palette: usize,
    /// Palette sizes to try after that, largest first
    pub ladder: Vec<usize>,
}

impl Default for SizeGuard {
    fn default() -> Self {
        Self {
            cap: SNAPSHOT_BYTE_CAP,
            small_target: TARGET_SMALL,
            default_palette: DEFAULT_PALETTE_SIZE,
            ladder: PALETTE_LADDER.to_vec(),
        }
    }
}

impl SizeGuard {
    /// Guard with the standard ladder and a custom cap.
    pub fn with_cap(cap: usize) -> Self {
        Self { cap, ..Self::default() }
    }

    /// Upper bound on the number of retries this guard can make.
    pub fn max_attempts(&self) -> usize {
        1 + self.ladder.len()
    }

    /// Return an encoding no larger than `self.cap`.
    ///
    /// `initial` is the encoding already produced at `initial_target`; it is
    /// returned untouched when it fits. Otherwise `base` is re-encoded through
    /// the ladder with `encoder`, stopping at the first fit.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::CompressionExhausted`] when every rung is over the cap.
    /// Encoder errors are propagated as-is.
    pub fn ensure_under_cap<E: SnapshotEncoder + ?Sized>(
        &self,
        encoder: &E,
        initial: EncodedPng,
        base: &RgbaImage,
        initial_target: u32,
        initial_palette: usize,
    ) -> Result<GuardOutcome> {
        if initial.len() <= self.cap {
            debug!(bytes = initial.len(), cap = self.cap, "initial encoding fits");
            return Ok(GuardOutcome {
                png: initial,
                target: initial_target,
                palette_size: initial_palette,
                attempts: Vec::new(),
            });
        }

        info!(
            bytes = initial.len(),
            cap = self.cap,
            target = initial_target,
            "snapshot over byte cap, degrading"
        );

        let mut attempts = Vec::with_capacity(self.max_attempts());
        let mut smallest = initial.len();
        let mut target = initial_target;

        let mut rungs: Vec<(u32, usize)> = Vec::with_capacity(self.max_attempts());
        if initial_target > self.small_target {
            target = self.small_target;
            rungs.push((target, self.default_palette));
        }
        let max_palette = if target == initial_target { initial_palette } else { usize::MAX };
        rungs.extend(
            self.ladder
                .iter()
                .filter(|&&palette_size| palette_size < max_palette)
                .map(|&palette_size| (target, palette_size)),
        );

        for (target, palette_size) in rungs {
            let png = encoder.encode(base, target, palette_size)?;
            attempts.push(EncodeAttempt { target, palette_size, bytes: png.len() });
            smallest = smallest.min(png.len());

            if png.len() <= self.cap {
                info!(target, palette_size, bytes = png.len(), retries = attempts.len(), "snapshot fits");
                return Ok(GuardOutcome { png, target, palette_size, attempts });
            }
            debug!(target, palette_size, bytes = png.len(), "still over cap");
        }

        Err(SnapshotError::CompressionExhausted {
            cap: self.cap,
            smallest,
            attempts: attempts.len(),
        })
    }
}
