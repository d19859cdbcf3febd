//! Configuration schema types for `gridsnap.toml`
//!
//! Defines the structure and validation rules for snapshot configuration.

use serde::{Deserialize, Serialize};

use crate::color::parse_color;
use crate::constants::{
    is_supported_palette_size, is_supported_target, DEFAULT_PALETTE_SIZE, DEFAULT_TARGET,
    PALETTE_LADDER, SNAPSHOT_BYTE_CAP,
};
use crate::guard::SizeGuard;

/// Snapshot encoding settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Square target size for the first attempt (432 or 576)
    #[serde(default = "default_target")]
    pub target: u32,
    /// Palette size for the first attempt
    #[serde(default = "default_palette")]
    pub palette: usize,
    /// Palette sizes the size guard falls back to, largest first
    #[serde(default = "default_palette_ladder")]
    pub palette_ladder: Vec<usize>,
    /// Maximum PNG size in bytes
    #[serde(default = "default_byte_cap")]
    pub byte_cap: usize,
    /// Canvas fill color; transparent when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

fn default_target() -> u32 {
    DEFAULT_TARGET
}

fn default_palette() -> usize {
    DEFAULT_PALETTE_SIZE
}

fn default_palette_ladder() -> Vec<usize> {
    PALETTE_LADDER.to_vec()
}

fn default_byte_cap() -> usize {
    SNAPSHOT_BYTE_CAP
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            palette: default_palette(),
            palette_ladder: default_palette_ladder(),
            byte_cap: default_byte_cap(),
            background: None,
        }
    }
}

/// Tile loading policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TilesConfig {
    /// Leave a cell empty instead of aborting when a tile cannot be decoded
    #[serde(default)]
    pub skip_unreadable: bool,
}

/// Complete gridsnap.toml configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GridsnapConfig {
    /// Encoding settings
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    /// Tile loading settings
    #[serde(default)]
    pub tiles: TilesConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "snapshot.palette_ladder")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gridsnap.toml: '{}' {}", self.field, self.message)
    }
}

impl GridsnapConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let snapshot = &self.snapshot;

        if !is_supported_target(snapshot.target) {
            errors.push(ConfigValidationError {
                field: "snapshot.target".to_string(),
                message: format!("must be 432 or 576, got {}", snapshot.target),
            });
        }

        if !is_supported_palette_size(snapshot.palette) {
            errors.push(ConfigValidationError {
                field: "snapshot.palette".to_string(),
                message: format!("must be one of 8, 12, 16, 24, 32, got {}", snapshot.palette),
            });
        }

        if snapshot.byte_cap == 0 || snapshot.byte_cap > SNAPSHOT_BYTE_CAP {
            errors.push(ConfigValidationError {
                field: "snapshot.byte_cap".to_string(),
                message: format!("must be between 1 and {}", SNAPSHOT_BYTE_CAP),
            });
        }

        if let Some(bad) =
            snapshot.palette_ladder.iter().find(|&&size| !is_supported_palette_size(size))
        {
            errors.push(ConfigValidationError {
                field: "snapshot.palette_ladder".to_string(),
                message: format!("contains unsupported palette size {}", bad),
            });
        }

        if !snapshot.palette_ladder.windows(2).all(|w| w[0] > w[1]) {
            errors.push(ConfigValidationError {
                field: "snapshot.palette_ladder".to_string(),
                message: "must be strictly descending".to_string(),
            });
        }

        if let Some(background) = &snapshot.background {
            if let Err(e) = parse_color(background) {
                errors.push(ConfigValidationError {
                    field: "snapshot.background".to_string(),
                    message: e.to_string(),
                });
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Size guard built from the snapshot section.
    pub fn size_guard(&self) -> SizeGuard {
        SizeGuard {
            cap: self.snapshot.byte_cap,
            ladder: self.snapshot.palette_ladder.clone(),
            ..SizeGuard::default()
        }
    }

    /// Parsed background color, `None` when unset or unparseable.
    pub fn background(&self) -> Option<image::Rgba<u8>> {
        self.snapshot.background.as_deref().and_then(|s| parse_color(s).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: GridsnapConfig = toml::from_str("").unwrap();
        assert_eq!(config, GridsnapConfig::default());
        assert_eq!(config.snapshot.target, 432);
        assert_eq!(config.snapshot.palette, 32);
        assert_eq!(config.snapshot.palette_ladder, vec![24, 16, 12, 8]);
        assert_eq!(config.snapshot.byte_cap, 180_000);
        assert!(config.is_valid());
    }

    #[test]
    fn test_full_toml() {
        let config: GridsnapConfig = toml::from_str(
            r##"
[snapshot]
target = 576
palette = 24
palette_ladder = [16, 8]
byte_cap = 120000
background = "#0052FF"

[tiles]
skip_unreadable = true
"##,
        )
        .unwrap();

        assert!(config.is_valid(), "{:?}", config.validate());
        assert_eq!(config.snapshot.target, 576);
        assert_eq!(config.background(), Some(image::Rgba([0, 82, 255, 255])));
        assert!(config.tiles.skip_unreadable);

        let guard = config.size_guard();
        assert_eq!(guard.cap, 120_000);
        assert_eq!(guard.ladder, vec![16, 8]);
        assert_eq!(guard.small_target, 432);
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let config = GridsnapConfig {
            snapshot: SnapshotConfig {
                target: 500,
                palette: 10,
                palette_ladder: vec![8, 16, 7],
                byte_cap: 200_000,
                background: Some("navy".to_string()),
            },
            tiles: TilesConfig::default(),
        };

        let fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "snapshot.target",
                "snapshot.palette",
                "snapshot.byte_cap",
                "snapshot.palette_ladder",
                "snapshot.palette_ladder",
                "snapshot.background",
            ]
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = ConfigValidationError {
            field: "snapshot.target".to_string(),
            message: "must be 432 or 576, got 1".to_string(),
        };
        assert_eq!(err.to_string(), "gridsnap.toml: 'snapshot.target' must be 432 or 576, got 1");
    }
}
