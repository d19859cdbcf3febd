//! Grid composition - places normalized tiles into a rows x cols canvas

use image::{Rgba, RgbaImage};

use crate::constants::TILE_SIZE;
use crate::error::{Result, SnapshotError};
use crate::tile::Tile;

/// Transparent color used for empty cells when no background is given
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Shape of a collage grid.
///
/// Slot `i` maps to `(row, col) = (i / cols, i % cols)` (row-major).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    rows: u32,
    cols: u32,
}

impl GridLayout {
    /// Create a layout, rejecting grids with zero rows or columns.
    pub fn new(rows: u32, cols: u32) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(SnapshotError::InvalidGrid { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Number of cells in the grid.
    pub fn capacity(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Grid cell for slot `index`, or `None` when the slot is past the end.
    pub fn cell(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.capacity() {
            return None;
        }
        let cols = self.cols as usize;
        Some(((index / cols) as u32, (index % cols) as u32))
    }

    /// Base canvas size in pixels: `(cols * 24, rows * 24)`.
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.cols * TILE_SIZE, self.rows * TILE_SIZE)
    }
}

/// Compose tiles into a single canvas in row-major order.
///
/// The canvas is `(cols * 24, rows * 24)`. Missing trailing tiles leave their
/// cells transparent (or `background`); tiles past `rows * cols` are ignored.
///
/// # Examples
///
/// ```
/// use gridsnap::grid::{compose, GridLayout};
/// use gridsnap::tile::Tile;
/// use image::Rgba;
///
/// let red = Tile::solid(Rgba([255, 0, 0, 255]));
/// let layout = GridLayout::new(2, 3).unwrap();
/// let canvas = compose(&[red], layout, None);
///
/// assert_eq!(canvas.dimensions(), (72, 48));
/// assert_eq!(*canvas.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
/// assert_eq!(*canvas.get_pixel(30, 0), Rgba([0, 0, 0, 0]));
/// ```
pub fn compose(tiles: &[Tile], layout: GridLayout, background: Option<Rgba<u8>>) -> RgbaImage {
    let slots: Vec<Option<&Tile>> = tiles.iter().map(Some).collect();
    compose_refs(&slots, layout, background)
}

/// Compose a sparse layout where `None` slots are left empty.
pub fn compose_slots(
    slots: &[Option<Tile>],
    layout: GridLayout,
    background: Option<Rgba<u8>>,
) -> RgbaImage {
    let slots: Vec<Option<&Tile>> = slots.iter().map(Option::as_ref).collect();
    compose_refs(&slots, layout, background)
}

fn compose_refs(slots: &[Option<&Tile>], layout: GridLayout, background: Option<Rgba<u8>>) -> RgbaImage {
    let (width, height) = layout.canvas_size();
    let mut canvas = RgbaImage::from_pixel(width, height, background.unwrap_or(TRANSPARENT));

    for (index, slot) in slots.iter().enumerate() {
        let Some((row, col)) = layout.cell(index) else {
            break;
        };
        let Some(tile) = slot else {
            continue;
        };
        copy_tile(&mut canvas, tile.image(), col * TILE_SIZE, row * TILE_SIZE);
    }

    canvas
}

/// Overwrite the destination region with the tile's pixels, alpha included.
fn copy_tile(canvas: &mut RgbaImage, tile: &RgbaImage, x: u32, y: u32) {
    for (sx, sy, pixel) in tile.enumerate_pixels() {
        canvas.put_pixel(x + sx, y + sy, *pixel);
    }
}
