//! Palette extraction using the median cut algorithm, and nearest-color
//! quantization against the extracted palette.
//!
//! Everything here is deterministic: the histogram is ordered, box selection
//! and splitting only depend on that order, and no hash-map iteration order
//! reaches the output. The same image and palette size always give the same
//! palette and the same index buffer.

use std::collections::{BTreeMap, HashMap};

use image::{Rgba, RgbaImage};

/// A color represented as RGBA values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Every fully transparent pixel collapses onto this entry.
const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

impl Color {
    pub fn from_rgba(rgba: Rgba<u8>) -> Self {
        if rgba[3] == 0 {
            return TRANSPARENT;
        }
        Self { r: rgba[0], g: rgba[1], b: rgba[2], a: rgba[3] }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Squared Euclidean distance. Alpha counts as a fourth axis so that
    /// semi-transparent pixels prefer semi-transparent entries; for opaque
    /// images this is plain RGB distance.
    fn distance_sq(&self, other: &Color) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        let da = self.a as i32 - other.a as i32;
        (dr * dr + dg * dg + db * db + da * da) as u32
    }
}

/// A box of colors for median cut algorithm.
#[derive(Debug, Clone)]
struct ColorBox {
    colors: Vec<(Color, u64)>, // Color and count
}

#[derive(Debug, Clone, Copy)]
enum Channel {
    Red,
    Green,
    Blue,
}

impl ColorBox {
    fn new(colors: Vec<(Color, u64)>) -> Self {
        Self { colors }
    }

    /// Find which channel has the largest range.
    fn widest_channel(&self) -> Channel {
        let (mut min_r, mut max_r) = (255u8, 0u8);
        let (mut min_g, mut max_g) = (255u8, 0u8);
        let (mut min_b, mut max_b) = (255u8, 0u8);

        for (color, _) in &self.colors {
            min_r = min_r.min(color.r);
            max_r = max_r.max(color.r);
            min_g = min_g.min(color.g);
            max_g = max_g.max(color.g);
            min_b = min_b.min(color.b);
            max_b = max_b.max(color.b);
        }

        let range_r = max_r.saturating_sub(min_r);
        let range_g = max_g.saturating_sub(min_g);
        let range_b = max_b.saturating_sub(min_b);

        if range_r >= range_g && range_r >= range_b {
            Channel::Red
        } else if range_g >= range_b {
            Channel::Green
        } else {
            Channel::Blue
        }
    }

    /// Split the box into two along the widest channel, at the pixel-count median.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let channel = self.widest_channel();

        // Stable sort keeps the histogram order for equal channel values
        self.colors.sort_by_key(|(color, _)| match channel {
            Channel::Red => color.r,
            Channel::Green => color.g,
            Channel::Blue => color.b,
        });

        let total = self.pixel_count();
        let mut running = 0u64;
        let mut split_idx = self.colors.len() / 2;

        for (i, (_, count)) in self.colors.iter().enumerate() {
            running += count;
            if running >= total / 2 {
                split_idx = i + 1;
                break;
            }
        }

        // Never create an empty box
        split_idx = split_idx.clamp(1, self.colors.len() - 1);

        let right = self.colors.split_off(split_idx);
        (ColorBox::new(self.colors), ColorBox::new(right))
    }

    /// Average color of this box, weighted by pixel count.
    fn average_color(&self) -> Color {
        let total = self.pixel_count();
        if total == 0 {
            return Color { r: 0, g: 0, b: 0, a: 255 };
        }

        let weighted = |channel: fn(&Color) -> u8| -> u8 {
            let sum: u64 = self.colors.iter().map(|(c, count)| channel(c) as u64 * count).sum();
            ((sum + total / 2) / total) as u8
        };

        Color {
            r: weighted(|c| c.r),
            g: weighted(|c| c.g),
            b: weighted(|c| c.b),
            a: weighted(|c| c.a),
        }
    }

    fn pixel_count(&self) -> u64 {
        self.colors.iter().map(|(_, count)| count).sum()
    }
}

/// A bounded set of representative colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Build a palette of at most `max_colors` entries from every pixel of
    /// `image`.
    ///
    /// When the image has no more distinct colors than `max_colors`, those
    /// colors are the palette. Otherwise median cut splits the most populous
    /// box until the palette is full. Fully transparent pixels share a single
    /// reserved entry, which counts toward the limit.
    pub fn from_image(image: &RgbaImage, max_colors: usize) -> Palette {
        let colors = median_cut(histogram(image), max_colors.max(1));
        Palette { colors }
    }

    /// Build a palette from explicit colors (used by tests and tools).
    pub fn from_colors(colors: Vec<Color>) -> Palette {
        Palette { colors }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Index of the entry closest to `color`.
    ///
    /// Transparent pixels go to the transparent entry when there is one.
    /// Everything else takes the nearest non-transparent entry by Euclidean
    /// distance; ties go to the lowest index.
    pub fn nearest(&self, color: Color) -> usize {
        if color.is_transparent() {
            if let Some(idx) = self.colors.iter().position(Color::is_transparent) {
                return idx;
            }
        }

        let candidates = self.colors.iter().enumerate().filter(|(_, p)| !p.is_transparent());
        let mut best: Option<(usize, u32)> = None;
        for (idx, entry) in candidates {
            let d = color.distance_sq(entry);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((idx, d));
            }
        }
        best.map(|(idx, _)| idx).unwrap_or(0)
    }

    /// Map every pixel of `image` to a palette index, row-major.
    ///
    /// No dithering: each pixel independently takes its nearest entry.
    pub fn quantize(&self, image: &RgbaImage) -> Vec<u8> {
        let mut cache: HashMap<Color, u8> = HashMap::new();
        image
            .pixels()
            .map(|pixel| {
                let color = Color::from_rgba(*pixel);
                *cache.entry(color).or_insert_with(|| self.nearest(color) as u8)
            })
            .collect()
    }

    /// Render an index buffer back to RGBA.
    pub fn expand(&self, indices: &[u8], width: u32, height: u32) -> RgbaImage {
        let mut image = RgbaImage::new(width, height);
        for (pixel, &idx) in image.pixels_mut().zip(indices) {
            *pixel = self.colors[idx as usize].to_rgba();
        }
        image
    }
}

/// Pixel counts per distinct color, in ascending color order.
fn histogram(image: &RgbaImage) -> Vec<(Color, u64)> {
    let mut counts: BTreeMap<Color, u64> = BTreeMap::new();
    for pixel in image.pixels() {
        *counts.entry(Color::from_rgba(*pixel)).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}

fn median_cut(colors: Vec<(Color, u64)>, max_colors: usize) -> Vec<Color> {
    let (transparent, opaque): (Vec<_>, Vec<_>) =
        colors.into_iter().partition(|(color, _)| color.is_transparent());
    let has_transparent = !transparent.is_empty();

    let effective_max = if has_transparent { max_colors.saturating_sub(1).max(1) } else { max_colors };

    let mut result: Vec<Color> = if opaque.len() <= effective_max {
        opaque.into_iter().map(|(c, _)| c).collect()
    } else {
        let mut boxes = vec![ColorBox::new(opaque)];

        while boxes.len() < effective_max {
            // Most populous splittable box; max_by_key keeps the last of equals
            let Some((idx, _)) = boxes
                .iter()
                .enumerate()
                .filter(|(_, b)| b.colors.len() > 1)
                .max_by_key(|(_, b)| b.pixel_count())
            else {
                break;
            };

            let box_to_split = boxes.remove(idx);
            let (left, right) = box_to_split.split();
            boxes.push(left);
            boxes.push(right);
        }

        boxes.iter().map(ColorBox::average_color).collect()
    };

    if has_transparent {
        result.push(TRANSPARENT);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 255 }
    }

    fn noise(w: u32, h: u32, seed: u32) -> RgbaImage {
        let mut state = seed;
        RgbaImage::from_fn(w, h, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgba([r, g, b, 255])
        })
    }

    #[test]
    fn test_transparent_pixels_collapse() {
        assert_eq!(Color::from_rgba(Rgba([9, 8, 7, 0])), TRANSPARENT);
    }

    #[test]
    fn test_few_colors_kept_exactly() {
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        image.put_pixel(0, 0, Rgba([0, 255, 0, 255]));
        image.put_pixel(1, 0, Rgba([0, 0, 255, 255]));

        let palette = Palette::from_image(&image, 8);
        assert_eq!(palette.len(), 3);
        assert!(palette.colors().contains(&opaque(255, 0, 0)));
        assert!(palette.colors().contains(&opaque(0, 255, 0)));
        assert!(palette.colors().contains(&opaque(0, 0, 255)));
    }

    #[test]
    fn test_many_colors_fill_palette_exactly() {
        let image = noise(64, 64, 0x1234_5678);
        for size in [8, 12, 16, 24, 32] {
            let palette = Palette::from_image(&image, size);
            assert_eq!(palette.len(), size, "palette size {}", size);
        }
    }

    #[test]
    fn test_transparent_entry_reserved() {
        let mut image = noise(32, 32, 99);
        for x in 0..32 {
            image.put_pixel(x, 0, Rgba([0, 0, 0, 0]));
        }
        let palette = Palette::from_image(&image, 8);
        assert_eq!(palette.len(), 8);
        assert_eq!(palette.colors().iter().filter(|c| c.is_transparent()).count(), 1);

        let indices = palette.quantize(&image);
        let t = palette.colors().iter().position(Color::is_transparent).unwrap();
        assert!(indices[..32].iter().all(|&i| i as usize == t));
        assert!(indices[32..].iter().all(|&i| i as usize != t));
    }

    #[test]
    fn test_palette_is_deterministic() {
        let image = noise(48, 48, 7);
        let a = Palette::from_image(&image, 16);
        let b = Palette::from_image(&image, 16);
        assert_eq!(a, b);
        assert_eq!(a.quantize(&image), b.quantize(&image));
    }

    #[test]
    fn test_nearest_euclidean() {
        let palette = Palette::from_colors(vec![opaque(0, 0, 0), opaque(255, 255, 255)]);
        assert_eq!(palette.nearest(opaque(30, 30, 30)), 0);
        assert_eq!(palette.nearest(opaque(200, 200, 200)), 1);
    }

    #[test]
    fn test_nearest_tie_goes_to_lowest_index() {
        let palette = Palette::from_colors(vec![opaque(0, 0, 0), opaque(20, 0, 0)]);
        assert_eq!(palette.nearest(opaque(10, 0, 0)), 0);
    }

    #[test]
    fn test_nearest_skips_transparent_for_opaque() {
        let palette = Palette::from_colors(vec![TRANSPARENT, opaque(200, 0, 0)]);
        assert_eq!(palette.nearest(opaque(0, 0, 0)), 1);
        assert_eq!(palette.nearest(TRANSPARENT), 0);
    }

    #[test]
    fn test_quantize_expand_no_dither() {
        // Two close shades of red in a checker pattern must become one flat block
        let image = RgbaImage::from_fn(8, 8, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([250, 0, 0, 255])
            } else {
                Rgba([252, 2, 0, 255])
            }
        });
        let palette = Palette::from_colors(vec![opaque(251, 1, 0), opaque(0, 0, 255)]);
        let indices = palette.quantize(&image);
        assert!(indices.iter().all(|&i| i == 0));

        let expanded = palette.expand(&indices, 8, 8);
        assert!(expanded.pixels().all(|p| *p == Rgba([251, 1, 0, 255])));
    }

    #[test]
    fn test_split_balances_pixel_counts() {
        let colors = vec![(opaque(0, 0, 0), 10), (opaque(100, 0, 0), 10), (opaque(200, 0, 0), 10)];
        let (left, right) = ColorBox::new(colors).split();
        assert!(!left.colors.is_empty());
        assert!(!right.colors.is_empty());
        assert_eq!(left.pixel_count() + right.pixel_count(), 30);
    }
}
