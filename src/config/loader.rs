//! Configuration loading and discovery for `gridsnap.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::GridsnapConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for during discovery
pub const CONFIG_FILE_NAME: &str = "gridsnap.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse gridsnap.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override target size
    pub target: Option<u32>,
    /// Override first-attempt palette size
    pub palette: Option<usize>,
    /// Override byte cap
    pub byte_cap: Option<usize>,
    /// Override background color
    pub background: Option<String>,
    /// Skip tiles that fail to decode
    pub skip_unreadable: Option<bool>,
}

/// Find gridsnap.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for gridsnap.toml
/// 2. Check XDG_CONFIG_HOME/gridsnap/gridsnap.toml (or ~/.config/gridsnap/gridsnap.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find gridsnap.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("gridsnap").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find gridsnap.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration.
///
/// With an explicit path, that file must exist and parse. Without one, the
/// discovered file is used, falling back to defaults when none is found.
pub fn load_config(path: Option<&Path>) -> Result<GridsnapConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(GridsnapConfig::default()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<GridsnapConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: GridsnapConfig = toml::from_str(&contents)?;
    tracing::debug!(path = %path.display(), "loaded config");

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Apply CLI overrides on top of a loaded config, then re-validate.
pub fn merge_cli_overrides(
    mut config: GridsnapConfig,
    overrides: &CliOverrides,
) -> Result<GridsnapConfig, ConfigError> {
    if let Some(target) = overrides.target {
        config.snapshot.target = target;
    }
    if let Some(palette) = overrides.palette {
        config.snapshot.palette = palette;
    }
    if let Some(cap) = overrides.byte_cap {
        config.snapshot.byte_cap = cap;
    }
    if let Some(ref background) = overrides.background {
        config.snapshot.background = Some(background.clone());
    }
    if let Some(skip) = overrides.skip_unreadable {
        config.tiles.skip_unreadable = skip;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }
    Ok(config)
}
