// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use crate::backends::camera::types::Resolution;
use serde::{Deserialize, Serialize};

/// Preview stream presets offered by the resolution selector
pub const PREVIEW_RESOLUTIONS: [Resolution; 3] = [
    Resolution::new(640, 480),
    Resolution::new(1280, 720),
    Resolution::new(1920, 1080),
];

/// Index into [`PREVIEW_RESOLUTIONS`] used on first start
pub const DEFAULT_PREVIEW_INDEX: usize = 1;

/// Still capture presets offered by the capture selector
pub const CAPTURE_RESOLUTIONS: [Resolution; 3] = [
    Resolution::new(1920, 1080),
    Resolution::new(4608, 2592),
    Resolution::new(4608, 3456),
];

/// Highest still resolution is the default
pub const DEFAULT_CAPTURE_INDEX: usize = CAPTURE_RESOLUTIONS.len() - 1;

/// Sensor-native raw size used for every DNG capture
pub const DNG_RAW_RESOLUTION: Resolution = CAPTURE_RESOLUTIONS[1];

/// Video encoder bitrate presets
///
/// These presets define the target bitrate for video encoding based on resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitratePreset {
    /// Low bitrate - smaller files, reduced quality
    Low,
    /// Medium bitrate - balanced quality and file size (default)
    #[default]
    Medium,
    /// High bitrate - larger files, better quality
    High,
}

impl BitratePreset {
    pub const ALL: [BitratePreset; 3] = [
        BitratePreset::Low,
        BitratePreset::Medium,
        BitratePreset::High,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            BitratePreset::Low => "Low",
            BitratePreset::Medium => "Medium",
            BitratePreset::High => "High",
        }
    }

    /// Bitrate in kbps for a given frame width
    ///
    /// - SD (640x480): Low=1, Medium=2, High=4 Mbps
    /// - HD (1280x720): Low=2.5, Medium=5, High=10 Mbps
    /// - Full HD (1920x1080) and above: Low=4, Medium=8, High=16 Mbps
    pub fn bitrate_kbps(&self, width: u32) -> u32 {
        match (get_resolution_tier(width), self) {
            (ResolutionTier::SD, BitratePreset::Low) => 1_000,
            (ResolutionTier::SD, BitratePreset::Medium) => 2_000,
            (ResolutionTier::SD, BitratePreset::High) => 4_000,
            (ResolutionTier::HD, BitratePreset::Low) => 2_500,
            (ResolutionTier::HD, BitratePreset::Medium) => 5_000,
            (ResolutionTier::HD, BitratePreset::High) => 10_000,
            (ResolutionTier::FullHD, BitratePreset::Low) => 4_000,
            (ResolutionTier::FullHD, BitratePreset::Medium) => 8_000,
            (ResolutionTier::FullHD, BitratePreset::High) => 16_000,
        }
    }
}

/// Resolution tiers for bitrate calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    /// 640x480 and below
    SD,
    /// 1280x720
    HD,
    /// 1920x1080 and above
    FullHD,
}

pub fn get_resolution_tier(width: u32) -> ResolutionTier {
    match width {
        w if w >= 1920 => ResolutionTier::FullHD,
        w if w >= 1280 => ResolutionTier::HD,
        _ => ResolutionTier::SD,
    }
}

/// Approximate framerate label shown next to each preview preset
pub fn preview_framerate_hint(resolution: Resolution) -> u32 {
    match resolution.width {
        w if w >= 1920 => 30,
        w if w >= 1280 => 50,
        _ => 60,
    }
}

/// Display surface geometry and input thresholds
pub mod display {
    use crate::backends::camera::types::Resolution;

    /// Fixed size of the rendered preview surface
    pub const SURFACE: Resolution = Resolution::new(800, 600);

    /// Crop drafts smaller than this in either dimension are noise
    pub const MIN_REGION_SIZE: u32 = 10;

    /// Side length of the draggable magnifier rectangle
    pub const MAGNIFIER_REGION_SIZE: u32 = 150;

    /// Side length of the enlarged magnifier view
    pub const MAGNIFIER_VIEW_SIZE: u32 = 200;

    /// Outline thickness for the crop draft and magnifier rectangles
    pub const OUTLINE_WIDTH: u32 = 2;

    /// Recording indicator square, drawn at (INDICATOR_OFFSET, INDICATOR_OFFSET)
    pub const INDICATOR_SIZE: u32 = 20;
    pub const INDICATOR_OFFSET: u32 = 10;

    pub const DRAFT_COLOR: [u8; 3] = [255, 0, 0];
    pub const MAGNIFIER_COLOR: [u8; 3] = [0, 0, 255];
    pub const INDICATOR_COLOR: [u8; 3] = [255, 0, 0];
}

/// Focus control ranges
pub mod focus {
    /// Manual lens slider range (integer steps)
    pub const LENS_SLIDER_MAX: u16 = 1000;

    /// Initial slider value
    pub const LENS_SLIDER_DEFAULT: u16 = 500;

    /// Dioptres at a normalized lens position of 1.0
    pub const MAX_DIOPTRES: f32 = 10.0;
}

/// Timing constants
pub mod timing {
    use std::time::Duration;

    /// Preview tick interval (~30 fps)
    pub const PREVIEW_TICK: Duration = Duration::from_millis(33);

    /// Recording indicator blink cadence
    pub const BLINK_TICK: Duration = Duration::from_millis(500);

    /// Lifetime of short informational status messages
    pub const STATUS_SHORT: Duration = Duration::from_secs(3);

    /// Lifetime of result and error status messages
    pub const STATUS_LONG: Duration = Duration::from_secs(5);

    /// Settle time after starting the preview configuration
    pub const PREVIEW_SETTLE: Duration = Duration::from_millis(200);

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Pipeline state change timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// How long to wait for a frame from the appsink on each pull
    pub const FRAME_PULL_TIMEOUT_MS: u64 = 5;

    /// How long to wait for a still frame after reconfiguring
    pub const STILL_PULL_TIMEOUT_SECS: u64 = 3;
}

/// Application information utilities
pub mod app_info {
    /// Application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dng_resolution_is_a_capture_preset() {
        assert!(CAPTURE_RESOLUTIONS.contains(&DNG_RAW_RESOLUTION));
    }

    #[test]
    fn test_framerate_hints_match_presets() {
        let hints: Vec<u32> = PREVIEW_RESOLUTIONS
            .iter()
            .map(|r| preview_framerate_hint(*r))
            .collect();
        assert_eq!(hints, vec![60, 50, 30]);
    }
}
