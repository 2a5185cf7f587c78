// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera application

use crate::backends::camera::BackendError;
use std::fmt;
use std::path::PathBuf;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
///
/// Every hardware or file error is converted into one of these at the
/// operation boundary and then into a status message for the user.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Camera driver or module not present; camera features are disabled
    DeviceUnavailable(String),
    /// Mode or resolution switch failed
    ConfigureFailed(String),
    /// Still or video capture call failed; no file was produced
    CaptureFailed(String),
    /// External transcode step failed; the temporary artifact was kept
    ConversionFailed { temp_path: PathBuf, reason: String },
    /// File move or delete failed
    IoFailure(String),
    /// The mode state machine rejected an overlapping operation
    Busy(String),
    /// A focus control push was rejected by the device
    Control(String),
}

impl AppError {
    /// Startup-fatal errors are shown as a blocking notice
    pub fn is_blocking(&self) -> bool {
        matches!(self, AppError::DeviceUnavailable(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DeviceUnavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            AppError::ConfigureFailed(msg) => write!(f, "Failed to configure camera: {}", msg),
            AppError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            AppError::ConversionFailed { temp_path, reason } => write!(
                f,
                "Conversion failed ({}); recording kept at {}",
                reason,
                temp_path.display()
            ),
            AppError::IoFailure(msg) => write!(f, "File error: {}", msg),
            AppError::Busy(msg) => write!(f, "Camera busy: {}", msg),
            AppError::Control(msg) => write!(f, "Camera control error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoFailure(err.to_string())
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotAvailable(msg) | BackendError::DeviceNotFound(msg) => {
                AppError::DeviceUnavailable(msg)
            }
            BackendError::IoError(msg) => AppError::IoFailure(msg),
            BackendError::ControlFailed(msg) => AppError::Control(msg),
            BackendError::RecordingInProgress => {
                AppError::Busy("recording already in progress".to_string())
            }
            other => AppError::CaptureFailed(other.to_string()),
        }
    }
}
