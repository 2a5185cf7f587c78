// SPDX-License-Identifier: GPL-3.0-only

//! Persisted user preferences

use crate::backends::camera::{DriverKind, FocusMode, Resolution, StillFormat};
use crate::constants::{
    BitratePreset, CAPTURE_RESOLUTIONS, DEFAULT_CAPTURE_INDEX, DEFAULT_PREVIEW_INDEX,
    PREVIEW_RESOLUTIONS, focus,
};
use crate::errors::{AppError, AppResult};
use crate::pipelines::transform::ResampleFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const APP_DIR: &str = "picam";
const CONFIG_FILE: &str = "config.json";

/// Application theme preference
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum AppTheme {
    /// Night mode
    #[default]
    Dark,
    /// Day mode
    Light,
}

impl AppTheme {
    pub fn toggled(&self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// Label of the button that switches away from this theme
    pub fn toggle_label(&self) -> &'static str {
        match self {
            Self::Dark => "Day Mode",
            Self::Light => "Night Mode",
        }
    }
}

/// How the destination of a capture is chosen
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum SavePromptMode {
    /// Native save dialog
    #[default]
    Dialog,
    /// Timestamped file in the default pictures/videos directory
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application theme preference (Dark, Light)
    pub app_theme: AppTheme,
    /// Index into the preview resolution presets
    pub preview_resolution_index: usize,
    /// Index into the still resolution presets
    pub capture_resolution_index: usize,
    /// Last selected still format
    pub still_format: StillFormat,
    /// Focus mode applied on start
    pub focus_mode: FocusMode,
    /// Manual lens slider value (0 to LENS_SLIDER_MAX)
    pub lens_slider: u16,
    /// Camera driver to open
    pub driver: DriverKind,
    /// V4L2 device path; libcamera is used when unset
    pub device: Option<String>,
    /// Program used to remux recordings
    pub transcoder: String,
    /// How capture destinations are chosen
    pub save_prompt: SavePromptMode,
    /// Filter used to scale frames to the display
    pub resample_filter: ResampleFilter,
    /// Directory for temporary capture artifacts; the system temp dir when unset
    pub temp_dir: Option<PathBuf>,
    /// Video encoder bitrate preset (Low, Medium, High)
    pub bitrate_preset: BitratePreset,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_theme: AppTheme::default(),
            preview_resolution_index: DEFAULT_PREVIEW_INDEX,
            capture_resolution_index: DEFAULT_CAPTURE_INDEX,
            still_format: StillFormat::default(),
            focus_mode: FocusMode::default(),
            lens_slider: focus::LENS_SLIDER_DEFAULT,
            driver: DriverKind::default(),
            device: None,
            transcoder: "ffmpeg".to_string(),
            save_prompt: SavePromptMode::default(),
            resample_filter: ResampleFilter::default(),
            temp_dir: None,
            bitrate_preset: BitratePreset::default(),
        }
    }
}

impl Config {
    /// Default location: `<config dir>/picam/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str::<Config>(&contents) {
            Ok(config) => config.sanitized(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> AppResult<()> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::IoFailure("no config directory available".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::IoFailure(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Clamp out-of-range values from hand-edited files
    fn sanitized(mut self) -> Self {
        if self.preview_resolution_index >= PREVIEW_RESOLUTIONS.len() {
            self.preview_resolution_index = DEFAULT_PREVIEW_INDEX;
        }
        if self.capture_resolution_index >= CAPTURE_RESOLUTIONS.len() {
            self.capture_resolution_index = DEFAULT_CAPTURE_INDEX;
        }
        self.lens_slider = self.lens_slider.min(focus::LENS_SLIDER_MAX);
        self
    }

    pub fn preview_resolution(&self) -> Resolution {
        PREVIEW_RESOLUTIONS[self.preview_resolution_index.min(PREVIEW_RESOLUTIONS.len() - 1)]
    }

    pub fn capture_resolution(&self) -> Resolution {
        CAPTURE_RESOLUTIONS[self.capture_resolution_index.min(CAPTURE_RESOLUTIONS.len() - 1)]
    }

    /// Directory for temporary capture artifacts
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "app_theme": "Light", "still_format": "Png" }"#).unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.app_theme, AppTheme::Light);
        assert_eq!(config.still_format, StillFormat::Png);
        assert_eq!(config.preview_resolution_index, DEFAULT_PREVIEW_INDEX);
        assert_eq!(config.transcoder, "ffmpeg");
    }

    #[test]
    fn test_out_of_range_indices_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "preview_resolution_index": 9, "capture_resolution_index": 7, "lens_slider": 5000 }"#,
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.preview_resolution(), Resolution::new(1280, 720));
        assert_eq!(config.capture_resolution(), Resolution::new(4608, 3456));
        assert_eq!(config.lens_slider, focus::LENS_SLIDER_MAX);
    }

    #[test]
    fn test_theme_toggle_labels() {
        assert_eq!(AppTheme::Dark.toggled(), AppTheme::Light);
        assert_eq!(AppTheme::Dark.toggle_label(), "Day Mode");
        assert_eq!(AppTheme::Light.toggle_label(), "Night Mode");
    }
}
