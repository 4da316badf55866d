//! Configuration persistence for tilesnap settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::capture::{CaptureLimits, FALLBACK_TILE_BASE_URL};
use crate::domain::{DEFAULT_TILE_SIZE, Rect, TileGrid};
use crate::session::{CaptureSettings, PickTiming};

/// Where captures are saved when no output directory is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SaveLocation {
    #[default]
    Pictures,
    Documents,
    Downloads,
}

impl SaveLocation {
    /// Resolve to a directory, falling back to a folder in the home directory
    pub fn dir(self) -> Option<PathBuf> {
        match self {
            SaveLocation::Pictures => {
                dirs::picture_dir().or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
            }
            SaveLocation::Documents => {
                dirs::document_dir().or_else(|| dirs::home_dir().map(|h| h.join("Documents")))
            }
            SaveLocation::Downloads => {
                dirs::download_dir().or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
            }
        }
    }
}

/// Application configuration persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSnapConfig {
    /// Base URL tiles are fetched from, `{base}/{x}/{y}.png`
    pub tile_base_url: String,
    /// Edge length of one tile in pixels
    pub tile_size: u32,
    /// Largest width or height of a capture
    pub max_dimension: u32,
    /// Largest pixel count of a capture
    pub max_pixels: u64,
    /// How long to wait for the readout after a click
    pub readout_timeout_ms: u64,
    /// How often the readout is sampled while waiting
    pub readout_poll_ms: u64,
    /// Per-request timeout for tile downloads
    pub http_timeout_secs: u64,
    /// Treat tiles the server reports as missing (404) as blank
    pub blank_missing_tiles: bool,
    /// Standard folder captures go to
    pub save_location: SaveLocation,
    /// Explicit capture directory, overrides `save_location`
    pub output_dir: Option<PathBuf>,
    /// Where the template library lives (None = data dir)
    pub library_dir: Option<PathBuf>,
    /// File the overlay bridge writes the readout text to
    pub readout_file: Option<PathBuf>,
    /// Screen rectangle of the live surface for interactive picks
    pub surface: Rect,
}

impl Default for TileSnapConfig {
    fn default() -> Self {
        let limits = CaptureLimits::default();
        let timing = PickTiming::default();
        Self {
            tile_base_url: FALLBACK_TILE_BASE_URL.to_string(),
            tile_size: DEFAULT_TILE_SIZE,
            max_dimension: limits.max_dimension,
            max_pixels: limits.max_pixels,
            readout_timeout_ms: timing.readout_timeout.as_millis() as u64,
            readout_poll_ms: timing.poll_interval.as_millis() as u64,
            http_timeout_secs: 20,
            blank_missing_tiles: true,
            save_location: SaveLocation::Pictures,
            output_dir: None,
            library_dir: None,
            readout_file: None,
            // Accept clicks anywhere until a surface is configured
            surface: Rect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX),
        }
    }
}

impl TileSnapConfig {
    /// Application directory name under the platform config/data dirs
    pub const ID: &'static str = "tilesnap";

    /// Default location of the config file
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(Self::ID).join("config.json"))
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            log::warn!("No config directory on this platform, using defaults");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:#}", err);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn grid(&self) -> TileGrid {
        TileGrid::new(self.tile_size.max(1))
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            grid: self.grid(),
            limits: CaptureLimits {
                max_dimension: self.max_dimension,
                max_pixels: self.max_pixels,
            },
            timing: PickTiming {
                readout_timeout: Duration::from_millis(self.readout_timeout_ms),
                poll_interval: Duration::from_millis(self.readout_poll_ms.max(1)),
            },
        }
    }

    /// Directory captures are written to
    pub fn capture_dir(&self) -> Option<PathBuf> {
        self.output_dir.clone().or_else(|| self.save_location.dir())
    }

    /// Directory of the template library
    pub fn library_dir(&self) -> Option<PathBuf> {
        self.library_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(Self::ID).join("templates")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_capture_defaults() {
        let config = TileSnapConfig::default();
        assert_eq!(config.capture_settings(), CaptureSettings::default());
        assert_eq!(config.tile_base_url, FALLBACK_TILE_BASE_URL);
        assert!(config.surface.contains_point(0, 0));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "tile_size": 512, "save_location": "Downloads" }"#).unwrap();

        let config = TileSnapConfig::load_from(&path).unwrap();
        assert_eq!(config.tile_size, 512);
        assert_eq!(config.save_location, SaveLocation::Downloads);
        assert_eq!(config.max_dimension, 4096);
        assert_eq!(config.readout_timeout_ms, 6000);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = TileSnapConfig {
            output_dir: Some(dir.path().to_path_buf()),
            surface: Rect::from_xywh(0, 80, 1920, 1000),
            ..TileSnapConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(TileSnapConfig::load_from(&path).unwrap(), config);
        assert_eq!(config.capture_dir(), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(TileSnapConfig::load_from(&path).is_err());
    }
}
