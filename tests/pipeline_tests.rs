//! End-to-end tests for the snapshot pipeline
//!
//! Tiles go through normalization, grid composition, palette encoding and the
//! size guard; the resulting PNG is decoded back and inspected.

use std::cell::RefCell;

use gridsnap::encode::{EncodedPng, SnapshotEncoder};
use gridsnap::error::{Result, SnapshotError};
use gridsnap::grid::GridLayout;
use gridsnap::guard::{EncodeAttempt, SizeGuard};
use gridsnap::snapshot::{SnapshotBuilder, SnapshotHash};
use gridsnap::tile::{decode_tile, Tile};
use image::{Rgba, RgbaImage};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const YELLOW: Rgba<u8> = Rgba([255, 255, 0, 255]);

fn decode(png: &[u8]) -> RgbaImage {
    image::load_from_memory(png).expect("snapshot should be a valid PNG").to_rgba8()
}

/// Deterministic per-pixel noise, the worst case for compression.
fn noise_tile(seed: u32) -> Tile {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    let image = RgbaImage::from_fn(24, 24, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgba([r, g, b, 255])
    });
    Tile::normalize(&image).expect("24x24 should normalize")
}

fn nine_colors() -> Vec<Rgba<u8>> {
    vec![
        RED,
        GREEN,
        BLUE,
        YELLOW,
        Rgba([255, 0, 255, 255]),
        Rgba([0, 255, 255, 255]),
        Rgba([255, 255, 255, 255]),
        Rgba([0, 0, 0, 255]),
        Rgba([128, 64, 32, 255]),
    ]
}

fn block_is(image: &RgbaImage, x0: u32, y0: u32, size: u32, color: Rgba<u8>) -> bool {
    (y0..y0 + size).all(|y| (x0..x0 + size).all(|x| *image.get_pixel(x, y) == color))
}

#[test]
fn test_three_by_three_solid_tiles() {
    let colors = nine_colors();
    let slots: Vec<Option<Tile>> = colors.iter().map(|&c| Some(Tile::solid(c))).collect();
    let layout = GridLayout::new(3, 3).expect("3x3 is a valid grid");

    let snapshot = SnapshotBuilder::new(layout).target(432).palette_size(32).build(&slots).unwrap();

    assert_eq!((snapshot.width, snapshot.height), (432, 432));
    assert!(snapshot.png.len() <= 180_000);
    assert!(snapshot.attempts.is_empty());

    let image = decode(&snapshot.png);
    assert_eq!(image.dimensions(), (432, 432));
    for (i, &color) in colors.iter().enumerate() {
        let (row, col) = (i as u32 / 3, i as u32 % 3);
        assert!(
            block_is(&image, col * 144, row * 144, 144, color),
            "tile {} should fill a 144x144 block with {:?}",
            i,
            color
        );
    }
}

#[test]
fn test_two_by_two_row_major_placement() {
    let slots = vec![
        Some(Tile::solid(RED)),
        Some(Tile::solid(GREEN)),
        Some(Tile::solid(BLUE)),
        Some(Tile::solid(YELLOW)),
    ];
    let layout = GridLayout::new(2, 2).unwrap();
    let snapshot = SnapshotBuilder::new(layout).build(&slots).unwrap();

    // 48px canvas * 9 = 432
    let image = decode(&snapshot.png);
    assert_eq!(image.dimensions(), (432, 432));
    assert_eq!(*image.get_pixel(0, 0), RED);
    assert_eq!(*image.get_pixel(300, 0), GREEN);
    assert_eq!(*image.get_pixel(0, 300), BLUE);
    assert_eq!(*image.get_pixel(300, 300), YELLOW);
}

#[test]
fn test_pipeline_is_deterministic() {
    let slots: Vec<Option<Tile>> = (0..6).map(|i| Some(noise_tile(i + 1))).collect();
    let layout = GridLayout::new(2, 3).unwrap();
    let builder = SnapshotBuilder::new(layout).palette_size(16);

    let first = builder.build(&slots).unwrap();
    let second = builder.build(&slots).unwrap();
    assert_eq!(first.png, second.png);
}

#[test]
fn test_empty_cells_are_transparent_or_background() {
    let slots = vec![Some(Tile::solid(RED)), None];
    let layout = GridLayout::new(1, 2).unwrap();

    let clear = SnapshotBuilder::new(layout).build(&slots).unwrap();
    let image = decode(&clear.png);
    assert_eq!((clear.width, clear.height), (432, 216));
    assert_eq!(*image.get_pixel(100, 100), RED);
    assert_eq!(image.get_pixel(300, 100)[3], 0);

    let filled = SnapshotBuilder::new(layout).background(Some(BLUE)).build(&slots).unwrap();
    let image = decode(&filled.png);
    assert_eq!(*image.get_pixel(300, 100), BLUE);
}

#[test]
fn test_normalize_source_sizes() {
    let pattern = |w: u32, h: u32| {
        RgbaImage::from_fn(w, h, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 7, 255]))
    };

    let exact = pattern(24, 24);
    assert_eq!(Tile::normalize(&exact).unwrap().image(), &exact);

    let tile = Tile::normalize(&pattern(25, 25)).unwrap();
    assert_eq!(tile.image().dimensions(), (24, 24));
    assert_eq!(*tile.image().get_pixel(23, 23), Rgba([23, 23, 7, 255]));
    assert_eq!(*tile.image().get_pixel(12, 0), Rgba([12, 0, 7, 255]));

    let tile = Tile::normalize(&pattern(10, 10)).unwrap();
    assert_eq!(tile.image().dimensions(), (24, 24));
    assert_eq!(*tile.image().get_pixel(23, 23), Rgba([9, 9, 7, 255]));

    let tile = Tile::normalize(&pattern(100, 50)).unwrap();
    assert_eq!(tile.image().dimensions(), (24, 24));
    // x: floor(23 * 100 / 24) = 95, y: floor(23 * 50 / 24) = 47
    assert_eq!(*tile.image().get_pixel(23, 23), Rgba([95, 47, 7, 255]));
}

#[test]
fn test_decode_tile_rejects_garbage() {
    let result = decode_tile(b"definitely not an image", "https://example.invalid/1.png");
    match result {
        Err(SnapshotError::Decode { origin, .. }) => {
            assert_eq!(origin, "https://example.invalid/1.png")
        }
        other => panic!("expected decode error, got {:?}", other),
    }
}

/// Encoder with canned sizes that records every call.
struct RecordingEncoder {
    size_for: fn(u32, usize) -> usize,
    calls: RefCell<Vec<(u32, usize)>>,
}

impl RecordingEncoder {
    fn new(size_for: fn(u32, usize) -> usize) -> Self {
        Self { size_for, calls: RefCell::new(Vec::new()) }
    }
}

impl SnapshotEncoder for RecordingEncoder {
    fn encode(&self, _base: &RgbaImage, target: u32, palette_size: usize) -> Result<EncodedPng> {
        self.calls.borrow_mut().push((target, palette_size));
        Ok(EncodedPng {
            bytes: vec![0; (self.size_for)(target, palette_size)],
            width: target,
            height: target,
            palette_len: palette_size,
        })
    }
}

#[test]
fn test_builder_degrades_target_then_palette() {
    let encoder = RecordingEncoder::new(|target, palette| match (target, palette) {
        (576, _) => 250_000,
        (432, 32) => 190_000,
        (432, 24) => 170_000,
        _ => 1,
    });
    let slots = vec![Some(Tile::solid(RED))];
    let layout = GridLayout::new(1, 1).unwrap();

    let snapshot = SnapshotBuilder::new(layout)
        .target(576)
        .hash(SnapshotHash([3; 32]))
        .build_with(&encoder, &slots)
        .unwrap();

    assert_eq!(*encoder.calls.borrow(), vec![(576, 32), (432, 32), (432, 24)]);
    assert_eq!(snapshot.target, 432);
    assert_eq!(snapshot.palette_size, 24);
    assert_eq!(snapshot.png.len(), 170_000);
    assert_eq!(snapshot.hash, SnapshotHash([3; 32]));
    assert_eq!(
        snapshot.attempts,
        vec![
            EncodeAttempt { target: 432, palette_size: 32, bytes: 190_000 },
            EncodeAttempt { target: 432, palette_size: 24, bytes: 170_000 },
        ]
    );
}

#[test]
fn test_builder_never_retries_above_requested_palette() {
    let encoder = RecordingEncoder::new(|_, palette| if palette <= 8 { 40_000 } else { 200_000 });
    let slots = vec![Some(Tile::solid(RED))];
    let layout = GridLayout::new(1, 1).unwrap();

    let snapshot =
        SnapshotBuilder::new(layout).palette_size(16).build_with(&encoder, &slots).unwrap();

    assert_eq!(*encoder.calls.borrow(), vec![(432, 16), (432, 12), (432, 8)]);
    assert_eq!(snapshot.palette_size, 8);
}

#[test]
fn test_builder_reports_exhaustion() {
    let encoder = RecordingEncoder::new(|_, _| 200_000);
    let slots = vec![Some(Tile::solid(RED))];
    let layout = GridLayout::new(1, 1).unwrap();

    let err = SnapshotBuilder::new(layout).target(576).build_with(&encoder, &slots).unwrap_err();

    assert!(matches!(
        err,
        SnapshotError::CompressionExhausted { cap: 180_000, smallest: 200_000, attempts: 5 }
    ));
    assert_eq!(encoder.calls.borrow().len(), 6);
}

#[test]
fn test_noise_exhausts_tiny_cap() {
    let slots: Vec<Option<Tile>> = (0..9).map(|i| Some(noise_tile(i + 1))).collect();
    let layout = GridLayout::new(3, 3).unwrap();

    let err = SnapshotBuilder::new(layout).guard(SizeGuard::with_cap(500)).build(&slots).unwrap_err();

    match err {
        SnapshotError::CompressionExhausted { cap, smallest, attempts } => {
            assert_eq!(cap, 500);
            assert!(smallest > 500);
            // 432 start: no target drop, one retry per ladder rung
            assert_eq!(attempts, 4);
        }
        other => panic!("expected CompressionExhausted, got {:?}", other),
    }
}

#[test]
fn test_real_encoder_respects_default_cap() {
    let slots: Vec<Option<Tile>> = (0..16).map(|i| Some(noise_tile(i + 1))).collect();
    let layout = GridLayout::new(4, 4).unwrap();

    let snapshot = SnapshotBuilder::new(layout).target(576).build(&slots).unwrap();

    assert!(snapshot.png.len() <= 180_000);
    let image = decode(&snapshot.png);
    assert_eq!(image.dimensions(), (snapshot.width, snapshot.height));
    assert_eq!(snapshot.width, snapshot.target);
}

#[test]
fn test_payload_matches_snapshot() {
    let slots = vec![Some(Tile::solid(GREEN))];
    let snapshot = SnapshotBuilder::new(GridLayout::new(1, 1).unwrap()).build(&slots).unwrap();
    let payload = snapshot.payload();

    assert_eq!(payload.bytes, snapshot.png.len());
    assert_eq!(payload.png, format!("0x{}", hex::encode(&snapshot.png)));
    assert!(payload.png.starts_with("0x89504e47"));

    let json = serde_json::to_string(&payload).unwrap();
    let back: gridsnap::snapshot::SnapshotPayload = serde_json::from_str(&json).unwrap();
    assert_eq!(back, payload);
}
