//! Normalize command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::scale::scale_nearest;
use crate::tile::load_tile;

/// Execute the normalize command
pub fn run_normalize(input: &Path, output: &Path, preview_scale: u32) -> ExitCode {
    let tile = match load_tile(input) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let image = match scale_nearest(tile.image(), preview_scale) {
        Ok(img) => img,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: Failed to create '{}': {}", parent.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = image.save_with_format(output, image::ImageFormat::Png) {
        eprintln!("Error: Failed to write '{}': {}", output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!("Normalized: {} ({}x{})", output.display(), image.width(), image.height());
    ExitCode::from(EXIT_SUCCESS)
}
