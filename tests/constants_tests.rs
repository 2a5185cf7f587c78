// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use picam::backends::camera::Resolution;
use picam::constants::{
    BitratePreset, CAPTURE_RESOLUTIONS, DEFAULT_CAPTURE_INDEX, DEFAULT_PREVIEW_INDEX,
    DNG_RAW_RESOLUTION, PREVIEW_RESOLUTIONS, display,
};

#[test]
fn test_bitrate_preset_values() {
    // Test that all presets exist (Low, Medium, High)
    assert_eq!(BitratePreset::ALL.len(), 3);
}

#[test]
fn test_bitrate_preset_ordering() {
    // Presets are ordered from lowest to highest quality at every preview size
    for resolution in PREVIEW_RESOLUTIONS {
        let mut prev_bitrate = 0u32;
        for preset in BitratePreset::ALL {
            let bitrate = preset.bitrate_kbps(resolution.width);
            assert!(
                bitrate > prev_bitrate,
                "Presets should be ordered from lowest to highest"
            );
            prev_bitrate = bitrate;
        }
    }
}

#[test]
fn test_bitrate_scales_with_resolution() {
    let sd_bitrate = BitratePreset::Medium.bitrate_kbps(640);
    let hd_bitrate = BitratePreset::Medium.bitrate_kbps(1280);
    let fhd_bitrate = BitratePreset::Medium.bitrate_kbps(1920);

    assert!(sd_bitrate < hd_bitrate);
    assert!(hd_bitrate < fhd_bitrate);
}

#[test]
fn test_default_presets() {
    assert_eq!(
        PREVIEW_RESOLUTIONS[DEFAULT_PREVIEW_INDEX],
        Resolution::new(1280, 720)
    );
    assert_eq!(
        CAPTURE_RESOLUTIONS[DEFAULT_CAPTURE_INDEX],
        Resolution::new(4608, 3456)
    );
    assert_eq!(DNG_RAW_RESOLUTION, Resolution::new(4608, 2592));
}

#[test]
fn test_display_geometry() {
    assert_eq!(display::SURFACE, Resolution::new(800, 600));
    assert!(display::MAGNIFIER_REGION_SIZE < display::SURFACE.height);
    assert_eq!(display::MIN_REGION_SIZE, 10);
}
