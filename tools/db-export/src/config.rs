//! Export settings
//!
//! Loaded from an optional TOML file and overridable from the command line.
//! Every field has a default, so an empty file is valid.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

use crate::animation::Thresholds;

/// Export configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Write bone indices/weights and the `SKEL` chunk
    pub export_skinning: bool,

    /// Write one `.dba` file per animation clip
    pub export_tracks: bool,

    /// Skip clips the host marks as muted
    pub skip_muted_tracks: bool,

    /// Target sampling rate (frames per second)
    pub resample_framerate: u32,

    /// Position tolerance (scene units)
    pub position_error: f32,

    /// Rotation tolerance (degrees)
    pub rotation_error: f32,

    /// Scale tolerance
    pub scale_error: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_skinning: true,
            export_tracks: true,
            skip_muted_tracks: true,
            resample_framerate: 15,
            position_error: 0.1,
            rotation_error: 0.5,
            scale_error: 0.1,
        }
    }
}

impl ExportConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Parse and validate config from a string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse export config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resample_framerate == 0 {
            bail!("resample_framerate must be positive");
        }
        for (name, value) in [
            ("position_error", self.position_error),
            ("rotation_error", self.rotation_error),
            ("scale_error", self.scale_error),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be a non-negative number (got {value})");
            }
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            position: self.position_error,
            rotation: self.rotation_error,
            scale: self.scale_error,
        }
    }
}
