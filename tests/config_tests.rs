// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use picam::Config;
use picam::backends::camera::{DriverKind, FocusMode, StillFormat};
use picam::config::{AppTheme, SavePromptMode};

#[test]
fn test_config_default() {
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(config.app_theme, AppTheme::Dark);
    assert_eq!(config.still_format, StillFormat::Jpeg);
    assert_eq!(config.focus_mode, FocusMode::Continuous);
    assert_eq!(config.driver, DriverKind::GStreamer);
    assert_eq!(config.save_prompt, SavePromptMode::Dialog);
    assert_eq!(config.transcoder, "ffmpeg");
}

#[test]
fn test_config_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        app_theme: AppTheme::Light,
        still_format: StillFormat::Dng,
        focus_mode: FocusMode::Manual,
        lens_slider: 250,
        device: Some("/dev/video0".to_string()),
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    assert_eq!(Config::load_from(&path), config);
}

#[test]
fn test_corrupt_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert_eq!(Config::load_from(&path), Config::default());
}

#[test]
fn test_missing_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(
        Config::load_from(&dir.path().join("absent.json")),
        Config::default()
    );
}
