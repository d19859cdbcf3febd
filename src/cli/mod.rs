//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod check;
mod compose;
mod normalize;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use glob::glob;
use tracing::level_filters::LevelFilter;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Expand tile arguments: glob patterns are expanded (sorted), plain paths
/// are kept in the order given.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut paths = Vec::new();
    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }

        let entries = glob(input).map_err(|e| format!("invalid pattern '{}': {}", input, e))?;
        let mut matched: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
        if matched.is_empty() {
            return Err(format!("pattern '{}' matched no files", input));
        }
        matched.sort();
        paths.extend(matched);
    }
    Ok(paths)
}

/// Gridsnap - compose NFT tiles into an on-chain collage snapshot
#[derive(Parser)]
#[command(name = "gridsnap")]
#[command(about = "Gridsnap - compose NFT tiles into a palette-quantized PNG snapshot")]
#[command(version)]
pub struct Cli {
    /// Verbose logging (repeat for debug output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose tiles into a grid snapshot PNG that fits the byte cap
    Compose {
        /// Tile images in row-major order (glob patterns allowed)
        #[arg(required = true)]
        tiles: Vec<String>,

        /// Number of grid rows
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        rows: u32,

        /// Number of grid columns
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        cols: u32,

        /// Output PNG path (default: snapshot.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target square size for the first attempt (432 or 576)
        #[arg(long)]
        target: Option<u32>,

        /// Palette size for the first attempt (8, 12, 16, 24 or 32)
        #[arg(long)]
        palette: Option<usize>,

        /// Background fill color (#RRGGBB, #RRGGBBAA or "transparent")
        #[arg(long)]
        background: Option<String>,

        /// Byte cap for the PNG (at most 180000)
        #[arg(long)]
        cap: Option<usize>,

        /// 32-byte snapshot hash as hex (default: SHA-256 of the PNG)
        #[arg(long)]
        hash: Option<String>,

        /// Write the set-snapshot payload (JSON) to this file
        #[arg(long)]
        payload: Option<PathBuf>,

        /// Leave cells empty for tiles that cannot be decoded instead of failing
        #[arg(long)]
        skip_unreadable: bool,

        /// Explicit config file (default: discover gridsnap.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Normalize a single image to a 24x24 tile
    Normalize {
        /// Input image
        input: PathBuf,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Upscale the normalized tile for viewing (1-32)
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=32))]
        preview_scale: u32,
    },

    /// Check a PNG against the snapshot byte cap
    Check {
        /// PNG file to inspect
        input: PathBuf,

        /// Byte cap to check against (default: 180000)
        #[arg(long)]
        cap: Option<usize>,
    },
}

/// Install the stderr tracing subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    // A second init (e.g. in tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compose {
            tiles,
            rows,
            cols,
            output,
            target,
            palette,
            background,
            cap,
            hash,
            payload,
            skip_unreadable,
            config,
        } => compose::run_compose(
            &tiles,
            rows,
            cols,
            output.as_deref(),
            target,
            palette,
            background,
            cap,
            hash.as_deref(),
            payload.as_deref(),
            skip_unreadable,
            config.as_deref(),
        ),
        Commands::Normalize { input, output, preview_scale } => {
            normalize::run_normalize(&input, &output, preview_scale)
        }
        Commands::Check { input, cap } => check::run_check(&input, cap),
    }
}
