// SPDX-License-Identifier: MPL-2.0

//! Camera driver abstraction
//!
//! The session manager talks to the camera only through the narrow
//! [`CameraDriver`] capability contract:
//!
//! ```text
//! ┌──────────────────────────┐
//! │ CaptureSessionManager    │  ← mode state machine, one config at a time
//! └────────────┬─────────────┘
//!              │
//!              ▼
//! ┌──────────────────────────┐
//! │ CameraDriver trait       │  ← configure / start / stop / frames / controls
//! └──────┬────────────┬──────┘
//!        │            │
//!        ▼            ▼
//!   ┌─────────┐  ┌───────────┐
//!   │GStreamer│  │ Simulated │
//!   └─────────┘  └───────────┘
//! ```

pub mod gst_driver;
pub mod simulated;
pub mod types;
pub mod v4l2_controls;

pub use types::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Capability contract required from a camera driver
///
/// Only one configuration can be active on the device. Callers must `stop()`
/// a started configuration before calling `configure()` again.
pub trait CameraDriver: Send {
    /// Human-readable device name for logs and status messages
    fn name(&self) -> String;

    /// Select the configuration that the next `start()` will run
    fn configure(&mut self, config: &DriverConfig) -> BackendResult<()>;

    /// Start streaming the configured mode
    fn start(&mut self) -> BackendResult<()>;

    /// Stop the active configuration; a no-op when nothing is running
    fn stop(&mut self) -> BackendResult<()>;

    /// Release the device entirely
    fn close(&mut self);

    /// Pull the next available frame without blocking for long
    ///
    /// Returns `Ok(None)` when no new frame is ready yet.
    fn next_frame(&mut self) -> BackendResult<Option<RawFrame>>;

    /// Push a control value to the running configuration
    fn set_control(&mut self, control: ControlValue) -> BackendResult<()>;

    /// Current lens position from device metadata, normalized to [0, 1]
    fn lens_position(&mut self) -> Option<f32>;

    /// Capture one still from the running still configuration into `path`
    fn capture_file(&mut self, path: &Path, format: StillFormat) -> BackendResult<()>;

    /// Start encoding the running video configuration into `path`
    fn start_encoder(&mut self, path: &Path, profile: EncoderProfile) -> BackendResult<()>;

    /// Stop the encoder and flush the file
    fn stop_encoder(&mut self) -> BackendResult<()>;
}

/// Which driver implementation to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DriverKind {
    /// Real hardware through GStreamer (libcamerasrc or v4l2src)
    #[default]
    GStreamer,
    /// Synthetic test pattern, no hardware needed
    Simulated,
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::GStreamer => write!(f, "GStreamer"),
            DriverKind::Simulated => write!(f, "simulated"),
        }
    }
}

/// Open a driver instance
///
/// `device` is a V4L2 device path for the GStreamer driver; when absent the
/// libcamera source is used.
pub fn open_driver(kind: DriverKind, device: Option<&str>) -> BackendResult<Box<dyn CameraDriver>> {
    match kind {
        DriverKind::GStreamer => Ok(Box::new(gst_driver::GstCamera::open(device)?)),
        DriverKind::Simulated => Ok(Box::new(simulated::SimulatedCamera::new())),
    }
}
