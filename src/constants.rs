//! Size contract constants shared with the on-chain snapshot consumer.
//!
//! These values are part of the interoperability contract: a snapshot produced
//! with different values will not be accepted by existing consumers.

/// Edge length of a normalized tile, in pixels.
pub const TILE_SIZE: u32 = 24;

/// Smaller of the two supported square target sizes. Also the default.
pub const TARGET_SMALL: u32 = 432;

/// Larger of the two supported square target sizes.
pub const TARGET_LARGE: u32 = 576;

/// Target size used when the caller does not pick one.
pub const DEFAULT_TARGET: u32 = TARGET_SMALL;

/// All supported target sizes, ascending.
pub const SUPPORTED_TARGETS: [u32; 2] = [TARGET_SMALL, TARGET_LARGE];

/// Hard ceiling on the encoded PNG, in bytes.
pub const SNAPSHOT_BYTE_CAP: usize = 180_000;

/// Palette size for the first encode attempt.
pub const DEFAULT_PALETTE_SIZE: usize = 32;

/// Palette sizes tried by the size guard after the default, largest first.
pub const PALETTE_LADDER: [usize; 4] = [24, 16, 12, 8];

/// Every palette size the encoder accepts.
pub const SUPPORTED_PALETTE_SIZES: [usize; 5] = [8, 12, 16, 24, 32];

/// Check whether `size` is one of [`SUPPORTED_PALETTE_SIZES`].
pub fn is_supported_palette_size(size: usize) -> bool {
    SUPPORTED_PALETTE_SIZES.contains(&size)
}

/// Check whether `target` is one of [`SUPPORTED_TARGETS`].
pub fn is_supported_target(target: u32) -> bool {
    SUPPORTED_TARGETS.contains(&target)
}
