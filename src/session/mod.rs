// SPDX-License-Identifier: GPL-3.0-only

//! Capture session manager
//!
//! Sole owner of the camera driver. The camera runs one configuration at a
//! time, so every mode change goes through this state machine:
//!
//! ```text
//!            start                capture
//!   Idle ───────────▶ Previewing ─────────▶ Capturing
//!    ▲                 │      ▲                 │
//!    │ shutdown        │      └─────────────────┘ done (ok or error)
//!    │                 │ record start
//!    │                 ▼
//!    └──────────── Recording ──── record stop ──▶ Previewing
//! ```
//!
//! Each switch stops the running configuration before the next one is
//! configured. Failures never retry: the manager falls back to the last
//! working preview configuration, or to Idle when there is none.

mod recording;

pub use recording::RecordingSession;

use crate::backends::camera::{
    CameraDriver, CameraMode, ControlValue, DriverConfig, EncoderProfile, FocusMode, RawFrame,
    Resolution, StillFormat,
};
use crate::constants::timing;
use crate::errors::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Mode of the capture state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Previewing,
    Capturing,
    Recording,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Previewing => write!(f, "previewing"),
            SessionState::Capturing => write!(f, "capturing"),
            SessionState::Recording => write!(f, "recording"),
        }
    }
}

/// One still capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub resolution: Resolution,
    pub format: StillFormat,
    /// Where the driver writes the (temporary) still
    pub destination: PathBuf,
}

/// Focus settings re-applied whenever the preview restarts
#[derive(Debug, Clone, Copy, PartialEq)]
struct FocusSettings {
    mode: FocusMode,
    lens_position: Option<f32>,
}

/// Owns the driver and enforces one-configuration-at-a-time
pub struct CaptureSessionManager {
    driver: Box<dyn CameraDriver>,
    state: SessionState,
    active: Option<DriverConfig>,
    /// Last preview resolution that started successfully
    last_preview: Option<Resolution>,
    recording: Option<RecordingSession>,
    encoder_profile: EncoderProfile,
    focus: FocusSettings,
    settle_time: Duration,
}

impl CaptureSessionManager {
    pub fn new(driver: Box<dyn CameraDriver>) -> Self {
        info!(driver = %driver.name(), "Creating capture session manager");
        Self {
            driver,
            state: SessionState::Idle,
            active: None,
            last_preview: None,
            recording: None,
            encoder_profile: EncoderProfile::default(),
            focus: FocusSettings {
                mode: FocusMode::default(),
                lens_position: None,
            },
            settle_time: timing::PREVIEW_SETTLE,
        }
    }

    /// Delay after each preview start before frames are trusted
    pub fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }

    pub fn with_encoder_profile(mut self, profile: EncoderProfile) -> Self {
        self.encoder_profile = profile;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn driver_name(&self) -> String {
        self.driver.name()
    }

    /// Configuration currently running on the device
    pub fn active_config(&self) -> Option<DriverConfig> {
        self.active
    }

    pub fn preview_resolution(&self) -> Option<Resolution> {
        self.last_preview
    }

    pub fn recording(&self) -> Option<&RecordingSession> {
        self.recording.as_ref()
    }

    fn ensure_not_busy(&self, operation: &str) -> AppResult<()> {
        match self.state {
            SessionState::Capturing => Err(AppError::Busy(format!(
                "cannot {} while a capture is in progress",
                operation
            ))),
            SessionState::Recording => Err(AppError::Busy(format!(
                "cannot {} while recording",
                operation
            ))),
            SessionState::Idle | SessionState::Previewing => Ok(()),
        }
    }

    /// Stop whatever runs, then configure and start `config`
    fn switch_to(&mut self, config: DriverConfig) -> AppResult<()> {
        if let Some(previous) = self.active.take() {
            debug!(%previous, next = %config, "Stopping configuration");
            if let Err(e) = self.driver.stop() {
                // The device refuses a new configuration while the old one runs
                return Err(AppError::ConfigureFailed(format!(
                    "failed to stop {}: {}",
                    previous, e
                )));
            }
        }

        let started = self
            .driver
            .configure(&config)
            .and_then(|()| self.driver.start());

        if let Err(e) = started {
            error!(%config, error = %e, "Failed to start configuration");
            if let Err(stop_err) = self.driver.stop() {
                warn!(error = %stop_err, "Best-effort stop after failed start also failed");
            }
            return Err(AppError::ConfigureFailed(e.to_string()));
        }

        info!(%config, "Configuration started");
        self.active = Some(config);
        Ok(())
    }

    /// Start the preview at `resolution` and push the remembered focus settings
    fn start_preview(&mut self, resolution: Resolution) -> AppResult<()> {
        self.switch_to(DriverConfig::preview(resolution))?;
        self.last_preview = Some(resolution);
        self.state = SessionState::Previewing;
        self.reapply_focus();
        if !self.settle_time.is_zero() {
            std::thread::sleep(self.settle_time);
        }
        Ok(())
    }

    /// Return to the last working preview, or Idle when that is impossible
    fn restore_preview(&mut self) {
        match self.last_preview {
            Some(resolution) => {
                if let Err(e) = self.start_preview(resolution) {
                    error!(%resolution, error = %e, "Failed to restore preview");
                    self.state = SessionState::Idle;
                }
            }
            None => {
                self.halt();
            }
        }
    }

    fn halt(&mut self) {
        if self.active.take().is_some()
            && let Err(e) = self.driver.stop()
        {
            warn!(error = %e, "Failed to stop camera");
        }
        self.state = SessionState::Idle;
    }

    fn reapply_focus(&mut self) {
        let focus = self.focus;
        if let Err(e) = self.driver.set_control(ControlValue::AfMode(focus.mode)) {
            debug!(error = %e, "Focus mode not re-applied");
            return;
        }
        if focus.mode == FocusMode::Manual
            && let Some(position) = focus.lens_position
            && let Err(e) = self.driver.set_control(ControlValue::LensPosition(position))
        {
            debug!(error = %e, "Lens position not re-applied");
        }
    }

    /// Switch the hardware to a new configuration
    ///
    /// Only the preview is entered directly. Still and video configurations
    /// are entered through [`Self::capture_still`] and
    /// [`Self::start_recording`], which own their return path.
    pub fn configure_and_start(&mut self, mode: CameraMode, resolution: Resolution) -> AppResult<()> {
        self.ensure_not_busy("reconfigure")?;
        if mode != CameraMode::Preview {
            return Err(AppError::ConfigureFailed(format!(
                "{} configurations are started by capture or recording",
                mode
            )));
        }

        let previous = self.last_preview;
        match self.start_preview(resolution) {
            Ok(()) => Ok(()),
            Err(e) => {
                match previous {
                    Some(prior) if prior != resolution => {
                        warn!(%resolution, %prior, "Reverting to previous preview");
                        self.restore_preview();
                    }
                    _ => self.halt(),
                }
                Err(e)
            }
        }
    }

    /// Stop the camera without releasing it
    pub fn stop(&mut self) -> AppResult<()> {
        self.ensure_not_busy("stop the camera")?;
        self.halt();
        Ok(())
    }

    /// Latest preview frame, if one is ready
    pub fn current_frame(&mut self) -> Option<RawFrame> {
        if self.state != SessionState::Previewing {
            return None;
        }
        match self.driver.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to read frame");
                None
            }
        }
    }

    /// Capture one still into `request.destination`, then resume the preview
    ///
    /// On failure no file is left at the destination.
    pub fn capture_still(&mut self, request: &CaptureRequest) -> AppResult<PathBuf> {
        self.ensure_not_busy("capture")?;
        if self.state == SessionState::Idle {
            return Err(AppError::CaptureFailed("camera is not running".to_string()));
        }

        self.state = SessionState::Capturing;
        let config = DriverConfig::still(request.resolution, request.format);
        info!(%config, destination = %request.destination.display(), "Capturing still");

        let result = self
            .switch_to(config)
            .map_err(|e| AppError::CaptureFailed(e.to_string()))
            .and_then(|()| {
                self.driver
                    .capture_file(&request.destination, request.format)
                    .map_err(|e| AppError::CaptureFailed(e.to_string()))
            });

        if result.is_err() {
            remove_partial(&request.destination);
        }

        self.restore_preview();
        result.map(|()| request.destination.clone())
    }

    /// Start the encoder into `temp_path` at the current preview resolution
    pub fn start_recording(&mut self, temp_path: &Path) -> AppResult<()> {
        self.ensure_not_busy("start recording")?;
        let resolution = match self.last_preview {
            Some(resolution) if self.state == SessionState::Previewing => resolution,
            _ => return Err(AppError::CaptureFailed("camera is not running".to_string())),
        };

        self.state = SessionState::Recording;
        let session = RecordingSession::new(temp_path.to_path_buf());

        let started = self
            .switch_to(DriverConfig::video(resolution))
            .map_err(|e| AppError::CaptureFailed(e.to_string()))
            .and_then(|()| {
                self.driver
                    .start_encoder(temp_path, self.encoder_profile)
                    .map_err(AppError::from)
            });

        match started {
            Ok(()) => {
                info!(id = %session.id(), path = %temp_path.display(), "Recording started");
                self.recording = Some(session);
                Ok(())
            }
            Err(e) => {
                // Dropping the session removes any partial stream
                drop(session);
                self.restore_preview();
                Err(e)
            }
        }
    }

    /// Stop the encoder and return the temp stream for finalization
    pub fn stop_recording(&mut self) -> AppResult<PathBuf> {
        let Some(session) = self.recording.take() else {
            return Err(AppError::CaptureFailed("no recording in progress".to_string()));
        };

        let stopped = self.driver.stop_encoder();
        info!(
            id = %session.id(),
            elapsed_ms = session.elapsed().as_millis() as u64,
            "Recording stopped"
        );

        self.state = SessionState::Previewing;
        self.restore_preview();

        match stopped {
            Ok(()) => Ok(session.hand_off()),
            Err(e) => Err(AppError::CaptureFailed(format!(
                "failed to finish recording: {}",
                e
            ))),
        }
    }

    /// Change focus behaviour on the running configuration
    pub fn set_focus_mode(&mut self, mode: FocusMode) -> AppResult<()> {
        self.focus.mode = mode;
        self.push_control(ControlValue::AfMode(mode))
    }

    /// Move the lens; meaningful in manual focus
    pub fn set_lens_position(&mut self, position: f32) -> AppResult<()> {
        let position = position.clamp(0.0, 1.0);
        self.focus.lens_position = Some(position);
        self.push_control(ControlValue::LensPosition(position))
    }

    /// Run one autofocus cycle
    pub fn trigger_autofocus(&mut self) -> AppResult<()> {
        self.push_control(ControlValue::AfTrigger)
    }

    /// Lens position reported by the device
    pub fn lens_position(&mut self) -> Option<f32> {
        if self.active.is_none() {
            return None;
        }
        self.driver.lens_position()
    }

    fn push_control(&mut self, control: ControlValue) -> AppResult<()> {
        if self.active.is_none() {
            return Err(AppError::Control(format!(
                "{} ignored: camera is not running",
                control
            )));
        }
        self.driver.set_control(control).map_err(|e| {
            warn!(%control, error = %e, "Control push failed");
            AppError::Control(e.to_string())
        })
    }

    /// Stop everything and release the device
    ///
    /// An active recording is stopped and its temp file deleted.
    pub fn shutdown(&mut self) {
        info!(state = %self.state, "Shutting down capture session");
        if let Some(session) = self.recording.take() {
            if let Err(e) = self.driver.stop_encoder() {
                warn!(error = %e, "Failed to stop encoder on shutdown");
            }
            drop(session);
        }
        self.halt();
        self.driver.close();
    }
}

impl Drop for CaptureSessionManager {
    fn drop(&mut self) {
        if self.recording.is_some() || self.active.is_some() {
            self.shutdown();
        }
    }
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed partial capture"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial capture"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::simulated::{DriverCall, SimulatedCamera, SimulatedProbe};

    const PREVIEW: Resolution = Resolution::new(64, 48);

    fn manager() -> (CaptureSessionManager, SimulatedProbe) {
        let camera = SimulatedCamera::new().with_still_scale(64);
        let probe = camera.probe();
        let manager = CaptureSessionManager::new(Box::new(camera)).with_settle_time(Duration::ZERO);
        (manager, probe)
    }

    fn previewing() -> (CaptureSessionManager, SimulatedProbe) {
        let (mut manager, probe) = manager();
        manager
            .configure_and_start(CameraMode::Preview, PREVIEW)
            .unwrap();
        (manager, probe)
    }

    #[test]
    fn test_preview_start_reaches_previewing() {
        let (mut manager, _) = previewing();
        assert_eq!(manager.state(), SessionState::Previewing);
        assert!(manager.current_frame().is_some());
    }

    #[test]
    fn test_every_switch_stops_before_configuring() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, probe) = previewing();
        let request = CaptureRequest {
            resolution: Resolution::new(1920, 1080),
            format: StillFormat::Jpeg,
            destination: dir.path().join("still.jpeg"),
        };
        manager.capture_still(&request).unwrap();
        manager.start_recording(&dir.path().join("rec.h264")).unwrap();
        manager.stop_recording().unwrap();

        assert_eq!(probe.reconfigured_while_running(), 0);
        let modes: Vec<_> = probe.started_configs().iter().map(|c| c.mode).collect();
        assert_eq!(
            modes,
            vec![
                CameraMode::Preview,
                CameraMode::Still,
                CameraMode::Preview,
                CameraMode::Video,
                CameraMode::Preview,
            ]
        );
    }

    #[test]
    fn test_failed_switch_restores_previous_preview() {
        let (mut manager, probe) = previewing();
        probe.fail_resolution(Resolution::new(640, 480), true);

        let result = manager.configure_and_start(CameraMode::Preview, Resolution::new(640, 480));
        assert!(matches!(result, Err(AppError::ConfigureFailed(_))));
        assert_eq!(manager.state(), SessionState::Previewing);
        assert_eq!(manager.active_config(), Some(DriverConfig::preview(PREVIEW)));
        assert_eq!(manager.preview_resolution(), Some(PREVIEW));
    }

    #[test]
    fn test_failed_switch_without_working_fallback_lands_idle() {
        let (mut manager, probe) = previewing();
        probe.fail_configure(CameraMode::Preview, true);

        assert!(manager
            .configure_and_start(CameraMode::Preview, Resolution::new(640, 480))
            .is_err());
        assert_eq!(manager.state(), SessionState::Idle);
    }

    #[test]
    fn test_failed_first_start_lands_idle() {
        let (mut manager, probe) = manager();
        probe.fail_configure(CameraMode::Preview, true);
        assert!(manager.configure_and_start(CameraMode::Preview, PREVIEW).is_err());
        assert_eq!(manager.state(), SessionState::Idle);
        assert!(manager.active_config().is_none());
    }

    #[test]
    fn test_capture_failure_leaves_no_file_and_resumes_preview() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, probe) = previewing();
        probe.fail_capture(true);

        let request = CaptureRequest {
            resolution: Resolution::new(1920, 1080),
            format: StillFormat::Png,
            destination: dir.path().join("still.png"),
        };
        assert!(matches!(
            manager.capture_still(&request),
            Err(AppError::CaptureFailed(_))
        ));
        assert!(!request.destination.exists());
        assert_eq!(manager.state(), SessionState::Previewing);
        assert_eq!(manager.active_config(), Some(DriverConfig::preview(PREVIEW)));
    }

    #[test]
    fn test_recording_requires_running_preview() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, probe) = previewing();
        manager.stop().unwrap();
        assert_eq!(manager.state(), SessionState::Idle);
        probe.clear_calls();

        let path = dir.path().join("rec.h264");
        assert!(matches!(
            manager.start_recording(&path),
            Err(AppError::CaptureFailed(_))
        ));
        assert_eq!(manager.state(), SessionState::Idle);
        assert!(manager.recording().is_none());
        assert!(probe.calls().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_broken_stream_fails_stop_and_resumes_preview() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, probe) = previewing();
        let path = dir.path().join("rec.h264");
        manager.start_recording(&path).unwrap();
        probe.fail_finish(true);

        assert!(matches!(
            manager.stop_recording(),
            Err(AppError::CaptureFailed(_))
        ));
        assert_eq!(manager.state(), SessionState::Previewing);
        assert!(manager.recording().is_none());
    }

    #[test]
    fn test_capture_rejected_while_recording() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, probe) = previewing();
        manager.start_recording(&dir.path().join("rec.h264")).unwrap();
        probe.clear_calls();

        let request = CaptureRequest {
            resolution: Resolution::new(1920, 1080),
            format: StillFormat::Jpeg,
            destination: dir.path().join("still.jpeg"),
        };
        assert!(matches!(
            manager.capture_still(&request),
            Err(AppError::Busy(_))
        ));
        assert!(matches!(
            manager.start_recording(&dir.path().join("second.h264")),
            Err(AppError::Busy(_))
        ));
        assert!(matches!(
            manager.configure_and_start(CameraMode::Preview, PREVIEW),
            Err(AppError::Busy(_))
        ));
        assert!(probe.calls().is_empty());
        assert_eq!(manager.state(), SessionState::Recording);
    }

    #[test]
    fn test_dng_capture_uses_raw_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, probe) = previewing();
        let request = CaptureRequest {
            resolution: Resolution::new(1920, 1080),
            format: StillFormat::Dng,
            destination: dir.path().join("still.dng"),
        };
        manager.capture_still(&request).unwrap();

        let still = probe
            .started_configs()
            .into_iter()
            .find(|c| c.mode == CameraMode::Still)
            .unwrap();
        assert!(still.raw);
        assert_eq!(still.resolution, crate::constants::DNG_RAW_RESOLUTION);
    }

    #[test]
    fn test_encoder_failure_removes_temp_and_resumes_preview() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("rec.h264");
        let (mut manager, probe) = previewing();
        probe.fail_encoder(true);

        assert!(manager.start_recording(&temp).is_err());
        assert!(!temp.exists());
        assert!(manager.recording().is_none());
        assert_eq!(manager.state(), SessionState::Previewing);
    }

    #[test]
    fn test_shutdown_while_recording_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("rec.h264");
        let (mut manager, probe) = previewing();
        manager.start_recording(&temp).unwrap();
        assert!(temp.exists());

        manager.shutdown();
        assert!(!temp.exists());
        assert_eq!(manager.state(), SessionState::Idle);
        assert!(probe.calls().contains(&DriverCall::StopEncoder));
        assert!(probe.calls().contains(&DriverCall::Close));
    }

    #[test]
    fn test_focus_failures_are_non_fatal() {
        let (mut manager, probe) = previewing();
        probe.fail_controls(true);
        assert!(matches!(
            manager.set_focus_mode(FocusMode::Manual),
            Err(AppError::Control(_))
        ));
        assert_eq!(manager.state(), SessionState::Previewing);
    }

    #[test]
    fn test_manual_lens_position_survives_restart() {
        let (mut manager, probe) = previewing();
        manager.set_focus_mode(FocusMode::Manual).unwrap();
        manager.set_lens_position(0.25).unwrap();
        probe.clear_calls();

        manager.stop().unwrap();
        manager
            .configure_and_start(CameraMode::Preview, PREVIEW)
            .unwrap();
        let calls = probe.calls();
        assert!(calls.contains(&DriverCall::Control(ControlValue::AfMode(FocusMode::Manual))));
        assert!(calls.contains(&DriverCall::Control(ControlValue::LensPosition(0.25))));
        assert_eq!(manager.lens_position(), Some(0.25));
    }
}
