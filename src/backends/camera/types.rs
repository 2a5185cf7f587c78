// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::constants::{BitratePreset, DNG_RAW_RESOLUTION};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Frame or surface size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Hardware configuration the camera can run, one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMode {
    /// Continuous low-latency frames for the live preview
    Preview,
    /// Single high-resolution still
    Still,
    /// Continuous encoded recording
    Video,
}

impl std::fmt::Display for CameraMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraMode::Preview => write!(f, "preview"),
            CameraMode::Still => write!(f, "still"),
            CameraMode::Video => write!(f, "video"),
        }
    }
}

/// Output format for still captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StillFormat {
    #[default]
    Jpeg,
    Png,
    Tiff,
    /// Raw sensor data in a DNG container
    Dng,
}

impl StillFormat {
    pub const ALL: [StillFormat; 4] = [
        StillFormat::Jpeg,
        StillFormat::Png,
        StillFormat::Tiff,
        StillFormat::Dng,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            StillFormat::Jpeg => "jpeg",
            StillFormat::Png => "png",
            StillFormat::Tiff => "tiff",
            StillFormat::Dng => "dng",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StillFormat::Jpeg => "JPEG",
            StillFormat::Png => "PNG",
            StillFormat::Tiff => "TIFF",
            StillFormat::Dng => "DNG",
        }
    }

    /// Next format in selector order, wrapping around
    pub fn next(&self) -> Self {
        let index = Self::ALL.iter().position(|f| f == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl std::str::FromStr for StillFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(StillFormat::Jpeg),
            "png" => Ok(StillFormat::Png),
            "tiff" | "tif" => Ok(StillFormat::Tiff),
            "dng" => Ok(StillFormat::Dng),
            other => Err(format!("unknown still format '{}' (jpeg, png, tiff, dng)", other)),
        }
    }
}

/// A full configuration request for the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    pub mode: CameraMode,
    pub resolution: Resolution,
    /// Request the raw sensor stream (DNG stills)
    pub raw: bool,
}

impl DriverConfig {
    pub fn preview(resolution: Resolution) -> Self {
        Self {
            mode: CameraMode::Preview,
            resolution,
            raw: false,
        }
    }

    /// Still configuration for a format; DNG always uses the sensor-native raw size
    pub fn still(resolution: Resolution, format: StillFormat) -> Self {
        if format == StillFormat::Dng {
            Self {
                mode: CameraMode::Still,
                resolution: DNG_RAW_RESOLUTION,
                raw: true,
            }
        } else {
            Self {
                mode: CameraMode::Still,
                resolution,
                raw: false,
            }
        }
    }

    pub fn video(resolution: Resolution) -> Self {
        Self {
            mode: CameraMode::Video,
            resolution,
            raw: false,
        }
    }
}

impl std::fmt::Display for DriverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.mode, self.resolution)?;
        if self.raw {
            write!(f, " (raw)")?;
        }
        Ok(())
    }
}

/// A single frame pulled from the camera
///
/// Pixels are dense and interleaved: `channels` bytes per pixel, rows packed
/// without padding.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Arc<[u8]>,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, channels: u8, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            channels,
            data: data.into(),
            captured_at: Instant::now(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    /// Buffer length implied by the metadata
    pub fn expected_len(&self) -> usize {
        self.stride() * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }
}

/// Display rotation in degrees (clockwise)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    pub fn from_degrees_int(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            270 => Rotation::Rotate270,
            _ => Rotation::None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    /// Relative step; deltas that are not a multiple of 90 leave the rotation as is
    pub fn rotated_by(&self, delta: i32) -> Self {
        if delta % 90 != 0 {
            return *self;
        }
        Self::from_degrees_int(self.degrees() as i32 + delta)
    }

    /// Rotation that undoes this one
    pub fn inverse(&self) -> Self {
        Self::from_degrees_int(360 - self.degrees() as i32)
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Lens focus behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FocusMode {
    /// Focus once when triggered
    Auto,
    /// Focus continuously
    #[default]
    Continuous,
    /// Lens position set by the user
    Manual,
}

impl FocusMode {
    pub const ALL: [FocusMode; 3] = [FocusMode::Auto, FocusMode::Continuous, FocusMode::Manual];

    pub fn display_name(&self) -> &'static str {
        match self {
            FocusMode::Auto => "Trigger Autofocus Mode",
            FocusMode::Continuous => "Continuous",
            FocusMode::Manual => "Manual",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FocusMode::Auto => FocusMode::Continuous,
            FocusMode::Continuous => FocusMode::Manual,
            FocusMode::Manual => FocusMode::Auto,
        }
    }
}

/// A named control pushed to the running configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    AfMode(FocusMode),
    AfTrigger,
    /// Normalized lens position, 0.0 (infinity) to 1.0 (closest)
    LensPosition(f32),
}

impl std::fmt::Display for ControlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlValue::AfMode(mode) => write!(f, "AfMode={:?}", mode),
            ControlValue::AfTrigger => write!(f, "AfTrigger=Start"),
            ControlValue::LensPosition(pos) => write!(f, "LensPosition={:.3}", pos),
        }
    }
}

/// Encoder settings for continuous recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderProfile {
    pub bitrate: BitratePreset,
    pub framerate: u32,
}

impl EncoderProfile {
    pub fn bitrate_kbps(&self, resolution: Resolution) -> u32 {
        self.bitrate.bitrate_kbps(resolution.width)
    }
}

impl Default for EncoderProfile {
    fn default() -> Self {
        Self {
            bitrate: BitratePreset::default(),
            framerate: 30,
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to configure or start the device
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Resolution or format not supported
    FormatNotSupported(String),
    /// Operation needs a configuration that is not active
    NotConfigured(String),
    /// Recording already in progress
    RecordingInProgress,
    /// No recording in progress
    NoRecordingInProgress,
    /// A control value was rejected
    ControlFailed(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::NotConfigured(msg) => write!(f, "Not configured: {}", msg),
            BackendError::RecordingInProgress => write!(f, "Recording already in progress"),
            BackendError::NoRecordingInProgress => write!(f, "No recording in progress"),
            BackendError::ControlFailed(msg) => write!(f, "Control failed: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps_in_both_directions() {
        assert_eq!(Rotation::None.rotated_by(-90), Rotation::Rotate270);
        assert_eq!(Rotation::Rotate270.rotated_by(90), Rotation::None);
        assert_eq!(Rotation::Rotate90.rotated_by(90), Rotation::Rotate180);
    }

    #[test]
    fn test_rotation_ignores_partial_steps() {
        assert_eq!(Rotation::Rotate180.rotated_by(45), Rotation::Rotate180);
        assert_eq!(Rotation::Rotate90.rotated_by(-100), Rotation::Rotate90);
        assert_eq!(Rotation::Rotate90.rotated_by(180), Rotation::Rotate270);
    }

    #[test]
    fn test_rotation_inverse() {
        for rotation in [
            Rotation::None,
            Rotation::Rotate90,
            Rotation::Rotate180,
            Rotation::Rotate270,
        ] {
            assert_eq!(rotation.rotated_by(rotation.inverse().degrees() as i32), Rotation::None);
        }
    }

    #[test]
    fn test_dng_forces_raw_resolution() {
        let config = DriverConfig::still(Resolution::new(1920, 1080), StillFormat::Dng);
        assert_eq!(config.resolution, DNG_RAW_RESOLUTION);
        assert!(config.raw);

        let config = DriverConfig::still(Resolution::new(1920, 1080), StillFormat::Png);
        assert_eq!(config.resolution, Resolution::new(1920, 1080));
        assert!(!config.raw);
    }

    #[test]
    fn test_still_format_cycle_visits_all() {
        let mut format = StillFormat::Jpeg;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(format);
            format = format.next();
        }
        assert_eq!(seen, StillFormat::ALL.to_vec());
        assert_eq!(format, StillFormat::Jpeg);
    }

    #[test]
    fn test_still_format_parses_common_names() {
        assert_eq!("JPG".parse::<StillFormat>(), Ok(StillFormat::Jpeg));
        assert_eq!("tif".parse::<StillFormat>(), Ok(StillFormat::Tiff));
        assert_eq!("dng".parse::<StillFormat>(), Ok(StillFormat::Dng));
        assert!("bmp".parse::<StillFormat>().is_err());
    }

    #[test]
    fn test_frame_expected_len() {
        let frame = RawFrame::new(4, 2, 3, vec![0u8; 24]);
        assert_eq!(frame.stride(), 12);
        assert_eq!(frame.expected_len(), 24);
    }
}
