//! Compose command implementation

use std::path::Path;
use std::process::ExitCode;

use image::Rgba;
use sha2::{Digest, Sha256};
use tracing::warn;

use super::{expand_inputs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::color::format_color;
use crate::config::{load_config, merge_cli_overrides, CliOverrides, ConfigError};
use crate::grid::GridLayout;
use crate::snapshot::{EncodedSnapshot, SnapshotBuilder, SnapshotHash};
use crate::tile::{load_tiles, Tile};

const DEFAULT_OUTPUT: &str = "snapshot.png";

/// Execute the compose command
pub fn run_compose(
    tiles: &[String],
    rows: u32,
    cols: u32,
    output: Option<&Path>,
    target: Option<u32>,
    palette: Option<usize>,
    background: Option<String>,
    cap: Option<usize>,
    hash: Option<&str>,
    payload: Option<&Path>,
    skip_unreadable: bool,
    config_path: Option<&Path>,
) -> ExitCode {
    let overrides = CliOverrides {
        target,
        palette,
        byte_cap: cap,
        background,
        skip_unreadable: skip_unreadable.then_some(true),
    };

    let config = match load_config(config_path).and_then(|c| merge_cli_overrides(c, &overrides)) {
        Ok(c) => c,
        Err(e @ ConfigError::Validation(_)) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let explicit_hash = match hash.map(str::parse::<SnapshotHash>).transpose() {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error: --hash: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let layout = match GridLayout::new(rows, cols) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let paths = match expand_inputs(tiles) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    if paths.len() > layout.capacity() {
        warn!(
            tiles = paths.len(),
            capacity = layout.capacity(),
            "more tiles than grid cells, extra tiles are ignored"
        );
    }
    let paths = &paths[..paths.len().min(layout.capacity())];

    let mut slots: Vec<Option<Tile>> = Vec::with_capacity(paths.len());
    for (path, result) in paths.iter().zip(load_tiles(paths)) {
        match result {
            Ok(tile) => slots.push(Some(tile)),
            Err(e) if config.tiles.skip_unreadable => {
                warn!(path = %path.display(), error = %e, "skipping unreadable tile");
                slots.push(None);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    let builder = SnapshotBuilder::new(layout)
        .target(config.snapshot.target)
        .palette_size(config.snapshot.palette)
        .background(config.background())
        .guard(config.size_guard());

    let mut snapshot = match builder.build(&slots) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    snapshot.hash = explicit_hash.unwrap_or_else(|| content_hash(&snapshot.png));

    let output_path = output.unwrap_or(Path::new(DEFAULT_OUTPUT));
    if let Err(e) = write_file(output_path, &snapshot.png) {
        eprintln!("Error: Failed to write '{}': {}", output_path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    if let Some(payload_path) = payload {
        let json = match serde_json::to_string_pretty(&snapshot.payload()) {
            Ok(j) => j,
            Err(e) => {
                eprintln!("Error: Failed to serialize payload: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        };
        if let Err(e) = write_file(payload_path, json.as_bytes()) {
            eprintln!("Error: Failed to write '{}': {}", payload_path.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    print_summary(output_path, &snapshot, config.snapshot.byte_cap, config.background());
    ExitCode::from(EXIT_SUCCESS)
}

/// SHA-256 of the PNG bytes, used when no hash is given.
fn content_hash(png: &[u8]) -> SnapshotHash {
    SnapshotHash(Sha256::digest(png).into())
}

fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)
}

fn print_summary(path: &Path, snapshot: &EncodedSnapshot, cap: usize, background: Option<Rgba<u8>>) {
    println!(
        "Snapshot: {} ({}x{}, {} colors, {} / {} bytes)",
        path.display(),
        snapshot.width,
        snapshot.height,
        snapshot.palette_size,
        snapshot.png.len(),
        cap
    );
    println!("Hash: {}", snapshot.hash);
    if let Some(color) = background {
        println!("Background: {}", format_color(color));
    }

    if !snapshot.attempts.is_empty() {
        println!("Retries:");
        for attempt in &snapshot.attempts {
            let mark = if attempt.bytes <= cap { "fits" } else { "over" };
            println!(
                "  {}px / {} colors: {} bytes ({})",
                attempt.target, attempt.palette_size, attempt.bytes, mark
            );
        }
    }
}
