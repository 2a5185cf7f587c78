// SPDX-License-Identifier: GPL-3.0-only

//! Simulated camera driver
//!
//! Produces a synthetic test pattern (colour bars with a moving scan line) so
//! the application can run without hardware. A [`SimulatedProbe`] handle
//! records every driver call and lets tests inject failures.

use super::CameraDriver;
use super::types::*;
use crate::pipelines::photo::{CameraMetadata, PhotoEncoder};
use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

const BARS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

/// Annex-B start code the fake encoder writes before every access unit
const NAL_START_CODE: [u8; 4] = [0, 0, 0, 1];

/// One call made against the driver
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Configure(DriverConfig),
    Start,
    Stop,
    Close,
    Control(ControlValue),
    Capture(PathBuf, StillFormat),
    StartEncoder(PathBuf),
    StopEncoder,
}

#[derive(Debug, Default)]
struct ProbeState {
    calls: Vec<DriverCall>,
    fail_configure: Vec<CameraMode>,
    fail_resolutions: Vec<Resolution>,
    fail_capture: bool,
    fail_encoder: bool,
    fail_finish: bool,
    fail_controls: bool,
    reconfigured_while_running: u32,
    started: bool,
    channels: Option<u8>,
}

/// Shared inspection and fault-injection handle for a [`SimulatedCamera`]
#[derive(Debug, Clone, Default)]
pub struct SimulatedProbe {
    inner: Arc<Mutex<ProbeState>>,
}

impl SimulatedProbe {
    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        // A panicking test thread must not hide the call log from the others
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: DriverCall) {
        self.lock().calls.push(call);
    }

    /// All calls recorded so far
    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make `configure` fail for the given mode
    pub fn fail_configure(&self, mode: CameraMode, fail: bool) {
        let mut state = self.lock();
        state.fail_configure.retain(|m| *m != mode);
        if fail {
            state.fail_configure.push(mode);
        }
    }

    /// Make `configure` fail for any mode at the given resolution
    pub fn fail_resolution(&self, resolution: Resolution, fail: bool) {
        let mut state = self.lock();
        state.fail_resolutions.retain(|r| *r != resolution);
        if fail {
            state.fail_resolutions.push(resolution);
        }
    }

    pub fn fail_capture(&self, fail: bool) {
        self.lock().fail_capture = fail;
    }

    pub fn fail_encoder(&self, fail: bool) {
        self.lock().fail_encoder = fail;
    }

    /// Make `stop_encoder` report a broken stream
    pub fn fail_finish(&self, fail: bool) {
        self.lock().fail_finish = fail;
    }

    pub fn fail_controls(&self, fail: bool) {
        self.lock().fail_controls = fail;
    }

    /// Change the channel count of subsequent preview frames
    pub fn set_channels(&self, channels: u8) {
        self.lock().channels = Some(channels);
    }

    /// Number of times `configure` was called while a configuration was running
    pub fn reconfigured_while_running(&self) -> u32 {
        self.lock().reconfigured_while_running
    }

    /// Whether a configuration is currently started
    pub fn is_started(&self) -> bool {
        self.lock().started
    }

    /// Configurations that were started, in order
    pub fn started_configs(&self) -> Vec<DriverConfig> {
        let calls = self.calls();
        let mut pending = None;
        let mut started = Vec::new();
        for call in calls {
            match call {
                DriverCall::Configure(config) => pending = Some(config),
                DriverCall::Start => started.extend(pending),
                _ => {}
            }
        }
        started
    }
}

struct FakeEncoder {
    path: PathBuf,
    file: File,
    units: u64,
}

/// Synthetic camera
pub struct SimulatedCamera {
    config: Option<DriverConfig>,
    running: bool,
    channels: u8,
    still_scale: u32,
    phase: u32,
    focus_mode: FocusMode,
    lens_position: f32,
    encoder: Option<FakeEncoder>,
    probe: SimulatedProbe,
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self {
            config: None,
            running: false,
            channels: 3,
            still_scale: 1,
            phase: 0,
            focus_mode: FocusMode::default(),
            lens_position: 0.5,
            encoder: None,
            probe: SimulatedProbe::default(),
        }
    }

    /// Bytes per pixel of produced frames (1, 3 or 4 are meaningful)
    pub fn with_channels(mut self, channels: u8) -> Self {
        self.channels = channels;
        self
    }

    /// Divide still capture dimensions by `scale` to keep the encode cheap
    pub fn with_still_scale(mut self, scale: u32) -> Self {
        self.still_scale = scale.max(1);
        self
    }

    /// Inspection handle sharing state with this driver
    pub fn probe(&self) -> SimulatedProbe {
        self.probe.clone()
    }

    fn running_config(&self, mode: CameraMode) -> BackendResult<DriverConfig> {
        match self.config {
            Some(config) if self.running && config.mode == mode => Ok(config),
            Some(config) => Err(BackendError::NotConfigured(format!(
                "{} requested but {} is {}",
                mode,
                config,
                if self.running { "running" } else { "stopped" }
            ))),
            None => Err(BackendError::NotConfigured(format!(
                "{} requested but nothing is configured",
                mode
            ))),
        }
    }
}

fn encoder_unit(frame: &[u8]) -> Vec<u8> {
    let mut unit = NAL_START_CODE.to_vec();
    unit.push(0x65);
    unit.extend(frame.iter().step_by(997).take(64));
    unit
}

/// Render the test pattern into a dense buffer with `channels` bytes per pixel
pub fn test_pattern(width: u32, height: u32, channels: u8, phase: u32) -> Vec<u8> {
    let channels = channels as usize;
    let mut data = vec![0u8; width as usize * height as usize * channels];
    if width == 0 || height == 0 || channels == 0 {
        return data;
    }

    let bar_width = (width as usize).div_ceil(BARS.len()).max(1);
    let scan_line = (phase as usize * 4) % height as usize;

    for (y, row) in data.chunks_exact_mut(width as usize * channels).enumerate() {
        for (x, pixel) in row.chunks_exact_mut(channels).enumerate() {
            let rgb = if y == scan_line {
                [255, 255, 255]
            } else {
                BARS[(x / bar_width).min(BARS.len() - 1)]
            };
            match channels {
                1 => {
                    pixel[0] = ((rgb[0] as u32 * 299 + rgb[1] as u32 * 587 + rgb[2] as u32 * 114)
                        / 1000) as u8
                }
                2 => pixel.copy_from_slice(&rgb[..2]),
                _ => {
                    pixel[..3].copy_from_slice(&rgb);
                    pixel[3..].fill(255);
                }
            }
        }
    }
    data
}

impl CameraDriver for SimulatedCamera {
    fn name(&self) -> String {
        "Simulated camera".to_string()
    }

    fn configure(&mut self, config: &DriverConfig) -> BackendResult<()> {
        self.probe.record(DriverCall::Configure(*config));

        if self.running {
            self.probe.lock().reconfigured_while_running += 1;
            warn!(%config, "Configure called while a configuration is running");
            return Err(BackendError::InitializationFailed(
                "device busy: stop the running configuration first".to_string(),
            ));
        }
        let injected = {
            let state = self.probe.lock();
            state.fail_configure.contains(&config.mode)
                || state.fail_resolutions.contains(&config.resolution)
        };
        if injected {
            return Err(BackendError::InitializationFailed(format!(
                "simulated failure configuring {}",
                config
            )));
        }
        if config.resolution.width == 0 || config.resolution.height == 0 {
            return Err(BackendError::FormatNotSupported(config.to_string()));
        }

        debug!(%config, "Simulated camera configured");
        self.config = Some(*config);
        Ok(())
    }

    fn start(&mut self) -> BackendResult<()> {
        self.probe.record(DriverCall::Start);
        if self.config.is_none() {
            return Err(BackendError::NotConfigured("start before configure".into()));
        }
        self.running = true;
        self.probe.lock().started = true;
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        self.probe.record(DriverCall::Stop);
        if self.encoder.is_some() {
            self.stop_encoder()?;
        }
        self.running = false;
        self.probe.lock().started = false;
        Ok(())
    }

    fn close(&mut self) {
        self.probe.record(DriverCall::Close);
        self.encoder = None;
        self.running = false;
        self.config = None;
        self.probe.lock().started = false;
    }

    fn next_frame(&mut self) -> BackendResult<Option<RawFrame>> {
        let Some(config) = self.config.filter(|_| self.running) else {
            return Ok(None);
        };

        if let Some(channels) = self.probe.lock().channels {
            self.channels = channels;
        }
        self.phase = self.phase.wrapping_add(1);
        let Resolution { width, height } = config.resolution;
        let data = test_pattern(width, height, self.channels, self.phase);

        if self.encoder.is_some() {
            let unit = encoder_unit(&data);
            if let Some(encoder) = self.encoder.as_mut() {
                encoder.file.write_all(&unit)?;
                encoder.units += 1;
            }
        }

        Ok(Some(RawFrame::new(width, height, self.channels, data)))
    }

    fn set_control(&mut self, control: ControlValue) -> BackendResult<()> {
        self.probe.record(DriverCall::Control(control));
        if self.probe.lock().fail_controls {
            return Err(BackendError::ControlFailed(format!(
                "simulated failure for {}",
                control
            )));
        }
        match control {
            ControlValue::AfMode(mode) => self.focus_mode = mode,
            ControlValue::AfTrigger => {
                if self.focus_mode == FocusMode::Auto {
                    self.lens_position = 0.35;
                }
            }
            ControlValue::LensPosition(position) => {
                self.lens_position = position.clamp(0.0, 1.0);
            }
        }
        Ok(())
    }

    fn lens_position(&mut self) -> Option<f32> {
        self.running.then_some(self.lens_position)
    }

    fn capture_file(&mut self, path: &Path, format: StillFormat) -> BackendResult<()> {
        self.probe
            .record(DriverCall::Capture(path.to_path_buf(), format));
        let config = self.running_config(CameraMode::Still)?;
        if self.probe.lock().fail_capture {
            return Err(BackendError::Other("simulated capture failure".into()));
        }

        let width = (config.resolution.width / self.still_scale).max(1);
        let height = (config.resolution.height / self.still_scale).max(1);
        let data = test_pattern(width, height, 3, self.phase);
        let image = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| BackendError::Other("test pattern size mismatch".into()))?;

        PhotoEncoder::new()
            .with_camera_metadata(CameraMetadata {
                camera_name: Some(self.name()),
            })
            .save(&image, format, path)
            .map_err(BackendError::IoError)?;

        info!(path = %path.display(), %config, "Simulated still captured");
        Ok(())
    }

    fn start_encoder(&mut self, path: &Path, profile: EncoderProfile) -> BackendResult<()> {
        self.probe.record(DriverCall::StartEncoder(path.to_path_buf()));
        let config = self.running_config(CameraMode::Video)?;
        if self.encoder.is_some() {
            return Err(BackendError::RecordingInProgress);
        }
        if self.probe.lock().fail_encoder {
            return Err(BackendError::InitializationFailed(
                "simulated encoder failure".into(),
            ));
        }

        let mut file = File::create(path)?;
        // SPS-like header so the file is never empty
        file.write_all(&NAL_START_CODE)?;
        file.write_all(&[0x67, 0x42, 0x00, 0x1f])?;

        info!(
            path = %path.display(),
            bitrate_kbps = profile.bitrate_kbps(config.resolution),
            framerate = profile.framerate,
            "Simulated encoder started"
        );
        self.encoder = Some(FakeEncoder {
            path: path.to_path_buf(),
            file,
            units: 0,
        });
        Ok(())
    }

    fn stop_encoder(&mut self) -> BackendResult<()> {
        self.probe.record(DriverCall::StopEncoder);
        let Some(mut encoder) = self.encoder.take() else {
            return Err(BackendError::NoRecordingInProgress);
        };
        encoder.file.flush()?;
        if self.probe.lock().fail_finish {
            return Err(BackendError::Other("simulated stream error".into()));
        }
        info!(
            path = %encoder.path.display(),
            units = encoder.units,
            "Simulated encoder stopped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_has_expected_length_per_channel_count() {
        for channels in [1u8, 3, 4] {
            let data = test_pattern(16, 8, channels, 0);
            assert_eq!(data.len(), 16 * 8 * channels as usize);
        }
    }

    #[test]
    fn test_frames_follow_configured_resolution() {
        let mut camera = SimulatedCamera::new();
        assert!(camera.next_frame().unwrap().is_none());

        camera
            .configure(&DriverConfig::preview(Resolution::new(64, 48)))
            .unwrap();
        camera.start().unwrap();
        let frame = camera.next_frame().unwrap().unwrap();
        assert_eq!(frame.resolution(), Resolution::new(64, 48));
        assert_eq!(frame.data.len(), frame.expected_len());
    }

    #[test]
    fn test_channel_count_is_configurable() {
        let mut camera = SimulatedCamera::new().with_channels(4);
        camera
            .configure(&DriverConfig::preview(Resolution::new(32, 16)))
            .unwrap();
        camera.start().unwrap();
        let frame = camera.next_frame().unwrap().unwrap();
        assert_eq!(frame.channels, 4);
        assert_eq!(frame.data.len(), 32 * 16 * 4);

        camera.probe().set_channels(2);
        let frame = camera.next_frame().unwrap().unwrap();
        assert_eq!(frame.channels, 2);
        assert_eq!(frame.data.len(), 32 * 16 * 2);
    }

    #[test]
    fn test_configure_while_running_is_rejected_and_counted() {
        let mut camera = SimulatedCamera::new();
        let probe = camera.probe();
        camera
            .configure(&DriverConfig::preview(Resolution::new(64, 48)))
            .unwrap();
        camera.start().unwrap();

        let result = camera.configure(&DriverConfig::video(Resolution::new(64, 48)));
        assert!(result.is_err());
        assert_eq!(probe.reconfigured_while_running(), 1);
    }

    #[test]
    fn test_capture_requires_running_still_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        let mut camera = SimulatedCamera::new().with_still_scale(64);

        camera
            .configure(&DriverConfig::preview(Resolution::new(64, 48)))
            .unwrap();
        camera.start().unwrap();
        assert!(matches!(
            camera.capture_file(&path, StillFormat::Png),
            Err(BackendError::NotConfigured(_))
        ));
        camera.stop().unwrap();

        camera
            .configure(&DriverConfig::still(
                Resolution::new(1920, 1080),
                StillFormat::Png,
            ))
            .unwrap();
        camera.start().unwrap();
        camera.capture_file(&path, StillFormat::Png).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_encoder_writes_stream_until_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.h264");
        let mut camera = SimulatedCamera::new();

        camera
            .configure(&DriverConfig::video(Resolution::new(32, 24)))
            .unwrap();
        camera.start().unwrap();
        camera
            .start_encoder(&path, EncoderProfile::default())
            .unwrap();
        camera.next_frame().unwrap();
        camera.stop_encoder().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], &NAL_START_CODE);
        assert!(bytes.len() > 8);
        assert!(matches!(
            camera.stop_encoder(),
            Err(BackendError::NoRecordingInProgress)
        ));
    }

    #[test]
    fn test_injected_control_failure() {
        let mut camera = SimulatedCamera::new();
        camera.probe().fail_controls(true);
        assert!(matches!(
            camera.set_control(ControlValue::AfTrigger),
            Err(BackendError::ControlFailed(_))
        ));
    }
}
