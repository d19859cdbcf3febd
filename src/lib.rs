//! Gridsnap - compose NFT tiles into an on-chain collage snapshot
//!
//! This library provides functionality to:
//! - Normalize arbitrary NFT images to 24x24 tiles
//! - Compose tiles into a row-major grid
//! - Encode the grid as a palette-quantized, indexed PNG
//! - Keep the PNG under the on-chain byte cap by degrading target size and palette

pub mod cli;
pub mod color;
pub mod config;
pub mod constants;
pub mod encode;
pub mod error;
pub mod grid;
pub mod guard;
pub mod palette;
pub mod scale;
pub mod snapshot;
pub mod tile;
