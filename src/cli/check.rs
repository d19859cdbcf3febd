//! Check command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::constants::SNAPSHOT_BYTE_CAP;

/// Execute the check command
///
/// Exits with [`EXIT_ERROR`] when the file is over the cap.
pub fn run_check(input: &Path, cap: Option<usize>) -> ExitCode {
    let cap = cap.unwrap_or(SNAPSHOT_BYTE_CAP);
    if cap == 0 {
        eprintln!("Error: --cap must be at least 1");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let bytes = match std::fs::read(input) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: Failed to read '{}': {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let (width, height) = match image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
    {
        Ok(img) => (img.width(), img.height()),
        Err(e) => {
            eprintln!("Error: '{}' is not a valid PNG: {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let verdict = if bytes.len() <= cap { "OK" } else { "OVER" };
    println!("{}: {}x{}, {} / {} bytes ({})", input.display(), width, height, bytes.len(), cap, verdict);

    if bytes.len() <= cap {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}
