//! Palette-quantized PNG encoding of a composed canvas
//!
//! The canvas is upscaled by an integer factor, reduced to a bounded palette
//! and written as an indexed-color PNG. The output is a pure function of
//! `(canvas, target, palette_size)`, byte for byte.

use image::RgbaImage;
use tracing::debug;

use crate::constants::is_supported_palette_size;
use crate::error::{Result, SnapshotError};
use crate::palette::Palette;
use crate::scale::{integer_factor, scale_nearest};

/// PNG bytes produced by one encode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPng {
    /// The complete PNG file
    pub bytes: Vec<u8>,
    /// Pixel width of the encoded image
    pub width: u32,
    /// Pixel height of the encoded image
    pub height: u32,
    /// Number of palette entries actually written
    pub palette_len: usize,
}

impl EncodedPng {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Something that can turn a base canvas into PNG bytes at a given target
/// size and palette size. The size guard only talks to this trait.
pub trait SnapshotEncoder {
    fn encode(&self, base: &RgbaImage, target: u32, palette_size: usize) -> Result<EncodedPng>;
}

/// Production encoder: nearest-neighbor upscale, median cut palette,
/// nearest-color quantization, indexed PNG at maximum compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaletteEncoder;

impl PaletteEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotEncoder for PaletteEncoder {
    fn encode(&self, base: &RgbaImage, target: u32, palette_size: usize) -> Result<EncodedPng> {
        if !is_supported_palette_size(palette_size) {
            return Err(SnapshotError::UnsupportedPaletteSize(palette_size));
        }

        let factor = scale_factor_for(base.width(), target)?;
        let scaled = scale_nearest(base, factor)?;

        let palette = Palette::from_image(&scaled, palette_size);
        let indices = palette.quantize(&scaled);
        let bytes = write_indexed_png(&palette, &indices, scaled.width(), scaled.height())?;

        debug!(
            target_size = target,
            factor,
            palette_size,
            palette_len = palette.len(),
            bytes = bytes.len(),
            "encoded snapshot candidate"
        );

        Ok(EncodedPng {
            bytes,
            width: scaled.width(),
            height: scaled.height(),
            palette_len: palette.len(),
        })
    }
}

/// Integer upscale factor for reaching `target` from a canvas `base_width`
/// pixels wide: `round(target / base_width)`, never below 1.
///
/// Both axes use this factor, so non-square grids stay non-square.
pub fn scale_factor_for(base_width: u32, target: u32) -> Result<u32> {
    if target == 0 || base_width == 0 {
        return Err(SnapshotError::InvalidScaleFactor(0.0));
    }
    let ratio = (target as f64 / base_width as f64).round().max(1.0);
    integer_factor(ratio)
}

/// Smallest PNG bit depth able to index `palette_len` entries.
fn bit_depth_for(palette_len: usize) -> png::BitDepth {
    match palette_len {
        0..=2 => png::BitDepth::One,
        3..=4 => png::BitDepth::Two,
        5..=16 => png::BitDepth::Four,
        _ => png::BitDepth::Eight,
    }
}

/// Pack one index per pixel into rows of `bits`-wide samples, MSB first,
/// each row padded to a whole byte.
fn pack_indices(indices: &[u8], width: u32, bits: u8) -> Vec<u8> {
    if bits == 8 {
        return indices.to_vec();
    }
    let width = width as usize;
    let per_byte = (8 / bits) as usize;
    let row_bytes = width.div_ceil(per_byte);
    let rows = if width == 0 { 0 } else { indices.len() / width };

    let mut packed = vec![0u8; row_bytes * rows];
    for (y, row) in indices.chunks(width).enumerate() {
        let out = &mut packed[y * row_bytes..(y + 1) * row_bytes];
        for (x, &idx) in row.iter().enumerate() {
            let shift = 8 - bits as usize * (x % per_byte + 1);
            out[x / per_byte] |= idx << shift;
        }
    }
    packed
}

fn write_indexed_png(palette: &Palette, indices: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let depth = bit_depth_for(palette.len());

    let plte: Vec<u8> = palette.colors().iter().flat_map(|c| [c.r, c.g, c.b]).collect();
    let mut trns: Vec<u8> = palette.colors().iter().map(|c| c.a).collect();
    // Trailing opaque entries may be omitted from tRNS
    while trns.last() == Some(&255) {
        trns.pop();
    }

    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(depth);
        encoder.set_palette(plte);
        if !trns.is_empty() {
            encoder.set_trns(trns);
        }
        encoder.set_compression(png::Compression::Best);
        // Index data is written unfiltered
        encoder.set_filter(png::FilterType::NoFilter);
        encoder.set_adaptive_filter(png::AdaptiveFilterType::NonAdaptive);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&pack_indices(indices, width, depth as u8))?;
        writer.finish()?;
    }
    Ok(bytes)
}
