// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer camera driver
//!
//! Builds one pipeline per configuration:
//!
//! ```text
//! preview / still:  src ! videoconvert ! videoscale ! RGB caps ! appsink
//! video:            src ! videoconvert ! videoscale ! caps ! h264 encoder ! h264parse ! filesink
//! ```
//!
//! The source is `libcamerasrc` unless a V4L2 device path was given. Focus is
//! pushed through `libcamerasrc` properties when present, otherwise through
//! V4L2 ioctls on the device node.

use super::CameraDriver;
use super::types::*;
use super::v4l2_controls;
use crate::constants::{focus, timing};
use crate::pipelines::photo::{CameraMetadata, PhotoEncoder};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// H.264 encoders in order of preference (hardware first)
const H264_ENCODERS: [&str; 3] = ["v4l2h264enc", "x264enc", "openh264enc"];

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Libcamera,
    V4l2(String),
}

impl SourceKind {
    fn factory(&self) -> &'static str {
        match self {
            SourceKind::Libcamera => "libcamerasrc",
            SourceKind::V4l2(_) => "v4l2src",
        }
    }

    fn description(&self) -> String {
        match self {
            SourceKind::Libcamera => "libcamerasrc name=src".to_string(),
            SourceKind::V4l2(device) => format!("v4l2src name=src device={}", device),
        }
    }
}

/// Launch description for the preview and still configurations
pub fn frame_pipeline_description(source: &SourceKind, resolution: Resolution) -> String {
    format!(
        "{} ! videoconvert ! videoscale ! video/x-raw,format=RGB,width={},height={} ! \
         appsink name=sink max-buffers=2 drop=true sync=false",
        source.description(),
        resolution.width,
        resolution.height
    )
}

/// Encoder element with its rate settings
pub fn encoder_description(factory: &str, bitrate_kbps: u32) -> String {
    match factory {
        "x264enc" => format!(
            "x264enc bitrate={} tune=zerolatency speed-preset=ultrafast",
            bitrate_kbps
        ),
        "openh264enc" => format!(
            "openh264enc rate-control=bitrate bitrate={} usage-type=camera",
            bitrate_kbps * 1000
        ),
        "v4l2h264enc" => format!(
            "v4l2h264enc extra-controls=\"controls,video_bitrate={}\"",
            bitrate_kbps * 1000
        ),
        other => other.to_string(),
    }
}

/// Launch description for the recording configuration
pub fn video_pipeline_description(
    source: &SourceKind,
    resolution: Resolution,
    encoder: &str,
    profile: EncoderProfile,
    output: &Path,
) -> String {
    format!(
        "{} ! videoconvert ! videoscale ! \
         video/x-raw,format=I420,width={},height={},framerate={}/1 ! \
         {} ! h264parse ! video/x-h264,stream-format=byte-stream ! \
         filesink name=filesink location=\"{}\"",
        source.description(),
        resolution.width,
        resolution.height,
        profile.framerate,
        encoder_description(encoder, profile.bitrate_kbps(resolution)),
        output.display()
    )
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Libcamera => write!(f, "libcamera"),
            SourceKind::V4l2(device) => write!(f, "V4L2 {}", device),
        }
    }
}

/// First installed H.264 encoder in order of preference
pub fn select_h264_encoder() -> Option<&'static str> {
    H264_ENCODERS
        .into_iter()
        .find(|name| gst::ElementFactory::find(name).is_some())
}

/// Sources usable on this system: libcamera first, then `/dev/video*` nodes
pub fn list_sources() -> BackendResult<Vec<SourceKind>> {
    gst::init().map_err(|e| {
        BackendError::NotAvailable(format!("Failed to initialize GStreamer: {}", e))
    })?;

    let mut sources = Vec::new();
    if gst::ElementFactory::find("libcamerasrc").is_some() {
        sources.push(SourceKind::Libcamera);
    }
    if gst::ElementFactory::find("v4l2src").is_some() {
        let mut nodes: Vec<String> = std::fs::read_dir("/dev")?
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.starts_with("video")
                    .then(|| entry.path().display().to_string())
            })
            .collect();
        nodes.sort();
        sources.extend(nodes.into_iter().map(SourceKind::V4l2));
    }
    debug!(count = sources.len(), "Listed camera sources");
    Ok(sources)
}

/// Camera driven through a GStreamer pipeline
pub struct GstCamera {
    source: SourceKind,
    config: Option<DriverConfig>,
    running: bool,
    pipeline: Option<gst::Pipeline>,
    appsink: Option<gst_app::AppSink>,
    encoder: Option<&'static str>,
    recording_path: Option<PathBuf>,
    frame_count: u64,
}

impl GstCamera {
    /// Initialize GStreamer and check the source is usable
    pub fn open(device: Option<&str>) -> BackendResult<Self> {
        gst::init().map_err(|e| {
            BackendError::NotAvailable(format!("Failed to initialize GStreamer: {}", e))
        })?;

        let source = match device {
            Some(path) => {
                if !Path::new(path).exists() {
                    return Err(BackendError::DeviceNotFound(path.to_string()));
                }
                SourceKind::V4l2(path.to_string())
            }
            None => SourceKind::Libcamera,
        };

        if gst::ElementFactory::find(source.factory()).is_none() {
            return Err(BackendError::NotAvailable(format!(
                "GStreamer element {} is not installed",
                source.factory()
            )));
        }

        info!(source = ?source, "GStreamer camera opened");
        Ok(Self {
            source,
            config: None,
            running: false,
            pipeline: None,
            appsink: None,
            encoder: None,
            recording_path: None,
            frame_count: 0,
        })
    }

    /// Start a pipeline and wait for it to reach PLAYING
    fn launch(&mut self, description: &str) -> BackendResult<()> {
        debug!(description, "Launching pipeline");

        let pipeline = gst::parse::launch(description)
            .map_err(|e| BackendError::InitializationFailed(format!("Invalid pipeline: {}", e)))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| BackendError::InitializationFailed("Not a pipeline".to_string()))?;

        let appsink = pipeline
            .by_name("sink")
            .and_then(|element| element.dynamic_cast::<gst_app::AppSink>().ok());

        if let Err(e) = pipeline.set_state(gst::State::Playing) {
            let _ = pipeline.set_state(gst::State::Null);
            return Err(BackendError::InitializationFailed(format!(
                "Failed to start pipeline: {}",
                e
            )));
        }

        let (result, _, _) =
            pipeline.state(gst::ClockTime::from_seconds(timing::START_TIMEOUT_SECS));
        if result.is_err() {
            let reason =
                Self::pop_error(&pipeline).unwrap_or_else(|| "state change failed".into());
            let _ = pipeline.set_state(gst::State::Null);
            return Err(BackendError::InitializationFailed(reason));
        }

        if let Some(reason) = Self::pop_error(&pipeline) {
            let _ = pipeline.set_state(gst::State::Null);
            return Err(BackendError::InitializationFailed(reason));
        }

        self.pipeline = Some(pipeline);
        self.appsink = appsink;
        Ok(())
    }

    /// Take a pending error message off the bus, if any
    fn pop_error(pipeline: &gst::Pipeline) -> Option<String> {
        let bus = pipeline.bus()?;
        let msg = bus.timed_pop_filtered(gst::ClockTime::ZERO, &[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(err) => {
                error!(
                    error = %err.error(),
                    debug = ?err.debug(),
                    source = ?err.src().map(|s| s.name()),
                    "GStreamer error"
                );
                Some(err.error().to_string())
            }
            _ => None,
        }
    }

    fn teardown(&mut self) -> BackendResult<()> {
        self.appsink = None;
        if let Some(pipeline) = self.pipeline.take() {
            pipeline
                .set_state(gst::State::Null)
                .map_err(|e| BackendError::Other(format!("Failed to stop pipeline: {}", e)))?;
            let _ = pipeline.state(gst::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS));
        }
        Ok(())
    }

    fn running_config(&self, mode: CameraMode) -> BackendResult<DriverConfig> {
        match self.config {
            Some(config) if self.running && config.mode == mode => Ok(config),
            _ => Err(BackendError::NotConfigured(format!(
                "{} configuration is not running",
                mode
            ))),
        }
    }

    fn source_element(&self) -> Option<gst::Element> {
        self.pipeline.as_ref()?.by_name("src")
    }

    fn pull_frame(&mut self, timeout: gst::ClockTime) -> BackendResult<Option<RawFrame>> {
        let Some(appsink) = self.appsink.as_ref() else {
            return Ok(None);
        };
        let Some(sample) = appsink.try_pull_sample(timeout) else {
            return Ok(None);
        };

        let buffer = sample
            .buffer()
            .ok_or_else(|| BackendError::Other("Sample without buffer".into()))?;
        let caps = sample
            .caps()
            .ok_or_else(|| BackendError::Other("Sample without caps".into()))?;
        let video_info = gstreamer_video::VideoInfo::from_caps(caps)
            .map_err(|e| BackendError::Other(format!("Unreadable caps: {}", e)))?;
        let map = buffer
            .map_readable()
            .map_err(|_| BackendError::Other("Buffer not readable".into()))?;

        let width = video_info.width();
        let height = video_info.height();
        let stride = video_info.stride()[0] as usize;
        let row_len = width as usize * 3;

        // Strip row padding so the frame is dense
        let data: Vec<u8> = if stride == row_len {
            map.as_slice().to_vec()
        } else {
            map.as_slice()
                .chunks(stride)
                .take(height as usize)
                .flat_map(|row| &row[..row_len.min(row.len())])
                .copied()
                .collect()
        };

        self.frame_count += 1;
        if self.frame_count % timing::FRAME_LOG_INTERVAL == 0 {
            debug!(frame = self.frame_count, width, height, "Frame received");
        }

        Ok(Some(RawFrame::new(width, height, 3, data)))
    }

    fn v4l2_device(&self) -> Option<&str> {
        match &self.source {
            SourceKind::V4l2(device) => Some(device),
            SourceKind::Libcamera => None,
        }
    }

    fn set_libcamera_control(
        &self,
        element: &gst::Element,
        control: ControlValue,
    ) -> BackendResult<()> {
        let unsupported = |name: &str| {
            BackendError::ControlFailed(format!("libcamerasrc has no {} property", name))
        };
        match control {
            ControlValue::AfMode(mode) => {
                if !element.has_property("af-mode") {
                    return Err(unsupported("af-mode"));
                }
                let value = match mode {
                    FocusMode::Auto => "auto",
                    FocusMode::Continuous => "continuous",
                    FocusMode::Manual => "manual",
                };
                element.set_property_from_str("af-mode", value);
            }
            ControlValue::AfTrigger => {
                if !element.has_property("af-trigger") {
                    return Err(unsupported("af-trigger"));
                }
                element.set_property_from_str("af-trigger", "start");
            }
            ControlValue::LensPosition(position) => {
                if !element.has_property("lens-position") {
                    return Err(unsupported("lens-position"));
                }
                let dioptres = position.clamp(0.0, 1.0) * focus::MAX_DIOPTRES;
                element.set_property("lens-position", dioptres);
            }
        }
        Ok(())
    }
}

impl CameraDriver for GstCamera {
    fn name(&self) -> String {
        match &self.source {
            SourceKind::Libcamera => "libcamera".to_string(),
            SourceKind::V4l2(device) => device.clone(),
        }
    }

    fn configure(&mut self, config: &DriverConfig) -> BackendResult<()> {
        if self.running {
            return Err(BackendError::InitializationFailed(
                "stop the running configuration first".to_string(),
            ));
        }
        if config.mode == CameraMode::Video {
            self.encoder = Some(select_h264_encoder().ok_or_else(|| {
                BackendError::NotAvailable("no H.264 encoder element installed".to_string())
            })?);
        }
        info!(%config, "Camera configured");
        self.config = Some(*config);
        Ok(())
    }

    fn start(&mut self) -> BackendResult<()> {
        let config = self
            .config
            .ok_or_else(|| BackendError::NotConfigured("start before configure".into()))?;

        match config.mode {
            CameraMode::Preview | CameraMode::Still => {
                let description = frame_pipeline_description(&self.source, config.resolution);
                self.launch(&description)?;
            }
            // The recording pipeline needs the output path, so it is
            // launched by start_encoder
            CameraMode::Video => {}
        }

        self.running = true;
        info!(%config, "Camera started");
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        if self.recording_path.is_some() {
            self.stop_encoder()?;
        }
        self.teardown()?;
        if self.running {
            debug!("Camera stopped");
        }
        self.running = false;
        Ok(())
    }

    fn close(&mut self) {
        if let Err(e) = self.stop() {
            warn!(?e, "Failed to stop camera on close");
        }
        self.config = None;
    }

    fn next_frame(&mut self) -> BackendResult<Option<RawFrame>> {
        self.pull_frame(gst::ClockTime::from_mseconds(timing::FRAME_PULL_TIMEOUT_MS))
    }

    fn set_control(&mut self, control: ControlValue) -> BackendResult<()> {
        debug!(%control, "Setting control");

        if let Some(device) = self.v4l2_device() {
            return match control {
                ControlValue::AfMode(mode) => v4l2_controls::set_focus_mode(device, mode),
                ControlValue::AfTrigger => v4l2_controls::trigger_autofocus(device),
                ControlValue::LensPosition(pos) => v4l2_controls::set_lens_position(device, pos),
            };
        }

        let element = self
            .source_element()
            .ok_or_else(|| BackendError::NotConfigured("no running source".into()))?;
        self.set_libcamera_control(&element, control)
    }

    fn lens_position(&mut self) -> Option<f32> {
        if let Some(device) = self.v4l2_device() {
            return v4l2_controls::lens_position(device);
        }
        let element = self.source_element()?;
        if !element.has_property("lens-position") {
            return None;
        }
        let dioptres = element.property::<f32>("lens-position");
        Some((dioptres / focus::MAX_DIOPTRES).clamp(0.0, 1.0))
    }

    fn capture_file(&mut self, path: &Path, format: StillFormat) -> BackendResult<()> {
        let config = self.running_config(CameraMode::Still)?;

        let frame = self
            .pull_frame(gst::ClockTime::from_seconds(timing::STILL_PULL_TIMEOUT_SECS))?
            .ok_or_else(|| BackendError::Other("No frame received for still".into()))?;

        let image = image::RgbImage::from_raw(frame.width, frame.height, frame.data.to_vec())
            .ok_or_else(|| BackendError::Other("Frame buffer size mismatch".into()))?;

        PhotoEncoder::new()
            .with_camera_metadata(CameraMetadata {
                camera_name: Some(self.name()),
            })
            .save(&image, format, path)
            .map_err(BackendError::IoError)?;

        info!(path = %path.display(), %config, "Still captured");
        Ok(())
    }

    fn start_encoder(&mut self, path: &Path, profile: EncoderProfile) -> BackendResult<()> {
        let config = self.running_config(CameraMode::Video)?;
        if self.recording_path.is_some() {
            return Err(BackendError::RecordingInProgress);
        }
        let encoder = self
            .encoder
            .ok_or_else(|| BackendError::NotAvailable("no H.264 encoder selected".into()))?;

        let description =
            video_pipeline_description(&self.source, config.resolution, encoder, profile, path);
        self.launch(&description)?;
        self.recording_path = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            encoder,
            bitrate_kbps = profile.bitrate_kbps(config.resolution),
            "Recording started"
        );
        Ok(())
    }

    fn stop_encoder(&mut self) -> BackendResult<()> {
        let path = self
            .recording_path
            .take()
            .ok_or(BackendError::NoRecordingInProgress)?;

        let mut finish = RecordingFinish::Eos;
        if let Some(pipeline) = self.pipeline.as_ref() {
            // EOS lets h264parse and filesink flush before teardown
            if !pipeline.send_event(gst::event::Eos::new()) {
                warn!("Failed to send EOS event to pipeline");
            }
            if let Some(bus) = pipeline.bus() {
                let msg = bus.timed_pop_filtered(
                    gst::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS),
                    &[gst::MessageType::Eos, gst::MessageType::Error],
                );
                finish = match msg.as_ref().map(|m| m.view()) {
                    Some(gst::MessageView::Error(err)) => {
                        RecordingFinish::Error(err.error().to_string())
                    }
                    None => RecordingFinish::TimedOut,
                    _ => RecordingFinish::Eos,
                };
            }
        }
        self.teardown()?;

        finish.into_result()?;
        info!(path = %path.display(), "Recording stopped");
        Ok(())
    }
}

/// How the recording pipeline answered the final EOS
#[derive(Debug, Clone, PartialEq)]
enum RecordingFinish {
    Eos,
    TimedOut,
    Error(String),
}

impl RecordingFinish {
    /// A bus error means the stream is broken; a timeout keeps what was written
    fn into_result(self) -> BackendResult<()> {
        match self {
            RecordingFinish::Eos => Ok(()),
            RecordingFinish::TimedOut => {
                warn!("Timed out waiting for EOS");
                Ok(())
            }
            RecordingFinish::Error(message) => {
                error!(error = %message, "Error while finishing recording");
                Err(BackendError::Other(format!(
                    "recording pipeline failed: {}",
                    message
                )))
            }
        }
    }
}

impl Drop for GstCamera {
    fn drop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            let _ = pipeline.set_state(gst::State::Null);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_pipeline_requests_dense_rgb() {
        let description =
            frame_pipeline_description(&SourceKind::Libcamera, Resolution::new(1280, 720));
        assert!(description.starts_with("libcamerasrc name=src"));
        assert!(description.contains("format=RGB,width=1280,height=720"));
        assert!(description.contains("appsink name=sink"));
    }

    #[test]
    fn test_v4l2_source_names_device() {
        let source = SourceKind::V4l2("/dev/video2".into());
        assert_eq!(source.description(), "v4l2src name=src device=/dev/video2");
    }

    #[test]
    fn test_video_pipeline_writes_elementary_stream() {
        let description = video_pipeline_description(
            &SourceKind::Libcamera,
            Resolution::new(1920, 1080),
            "x264enc",
            EncoderProfile::default(),
            Path::new("/tmp/picam-test.h264"),
        );
        assert!(description.contains("x264enc bitrate=8000"));
        assert!(description.contains("framerate=30/1"));
        assert!(description.contains("stream-format=byte-stream"));
        assert!(description.ends_with("location=\"/tmp/picam-test.h264\""));
    }

    #[test]
    fn test_bus_error_fails_the_recording() {
        assert!(RecordingFinish::Eos.into_result().is_ok());
        assert!(RecordingFinish::TimedOut.into_result().is_ok());
        assert!(matches!(
            RecordingFinish::Error("not-negotiated".into()).into_result(),
            Err(BackendError::Other(msg)) if msg.contains("not-negotiated")
        ));
    }

    #[test]
    fn test_encoder_bitrate_units() {
        assert!(encoder_description("openh264enc", 5000).contains("bitrate=5000000"));
        assert!(encoder_description("v4l2h264enc", 5000).contains("video_bitrate=5000000"));
    }
}
