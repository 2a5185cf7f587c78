// SPDX-License-Identifier: GPL-3.0-only

//! Application state types

use super::roi::{PointerButton, RegionInput};
use super::save_prompt::SavePrompt;
use crate::backends::camera::{FocusMode, Resolution, Rotation, StillFormat};
use crate::config::{AppTheme, Config};
use crate::constants::{CAPTURE_RESOLUTIONS, PREVIEW_RESOLUTIONS, focus, timing};
use crate::errors::AppError;
use crate::pipelines::finalize::Transcoder;
use crate::pipelines::geometry::Point;
use crate::pipelines::transform::{FrameTransformPipeline, RenderedFrame, ViewState};
use crate::session::CaptureSessionManager;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Status text shown when no message is active
pub const READY_TEXT: &str = "Ready";

/// Overlay text while a still capture is in progress
pub const CAPTURING_TEXT: &str = "Capturing picture...";

/// How prominently a status message is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    /// Stays until replaced; camera features are unusable
    Blocking,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub severity: Severity,
    /// `None` keeps the message until it is replaced
    pub expires_at: Option<Instant>,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>, severity: Severity, lifetime: Option<Duration>) -> Self {
        Self {
            text: text.into(),
            severity,
            expires_at: lifetime.map(|d| Instant::now() + d),
        }
    }

    /// Short-lived informational message
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Info, Some(timing::STATUS_SHORT))
    }

    /// Result of a completed operation
    pub fn result(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Info, Some(timing::STATUS_LONG))
    }

    /// Message that stays until replaced
    pub fn sticky(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Info, None)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

impl From<&AppError> for StatusMessage {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::DeviceUnavailable(_) => {
                StatusMessage::new(err.to_string(), Severity::Blocking, None)
            }
            AppError::Control(_) | AppError::Busy(_) => {
                StatusMessage::new(err.to_string(), Severity::Warning, Some(timing::STATUS_SHORT))
            }
            _ => StatusMessage::new(err.to_string(), Severity::Error, Some(timing::STATUS_LONG)),
        }
    }
}

/// Focus selector and lens slider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusState {
    pub mode: FocusMode,
    /// Lens slider, 0 to `LENS_SLIDER_MAX`
    pub slider: u16,
}

impl Default for FocusState {
    fn default() -> Self {
        Self {
            mode: FocusMode::default(),
            slider: focus::LENS_SLIDER_DEFAULT,
        }
    }
}

impl FocusState {
    /// Normalized lens position of the slider
    pub fn lens_position(&self) -> f32 {
        self.slider.min(focus::LENS_SLIDER_MAX) as f32 / focus::LENS_SLIDER_MAX as f32
    }

    /// Move the slider to a normalized position
    pub fn set_lens_position(&mut self, position: f32) {
        let position = position.clamp(0.0, 1.0);
        self.slider = (position * focus::LENS_SLIDER_MAX as f32).round() as u16;
    }

    /// The autofocus trigger is offered only in Auto
    pub fn shows_af_trigger(&self) -> bool {
        self.mode == FocusMode::Auto
    }

    /// The lens slider is offered only in Manual
    pub fn shows_slider(&self) -> bool {
        self.mode == FocusMode::Manual
    }

    /// Focus distance for the slider, e.g. `"200.00 mm"` or `"∞"`
    pub fn distance_label(&self) -> String {
        let dioptres = self.lens_position() * focus::MAX_DIOPTRES;
        if dioptres <= 0.0 {
            "∞".to_string()
        } else {
            format!("{:.2} mm", 1000.0 / dioptres)
        }
    }
}

/// Widget-facing state, owned by the model and lent to the pipeline
#[derive(Debug, Clone)]
pub struct UiState {
    pub rotation: Rotation,
    pub region: RegionInput,
    pub focus: FocusState,
    pub preview_index: usize,
    pub still_index: usize,
    pub still_format: StillFormat,
    pub theme: AppTheme,
    /// Preview ticks are disarmed while paused
    pub paused: bool,
    /// A still capture is in progress
    pub capturing: bool,
    /// Recording indicator phase
    pub blink_on: bool,
    pub status: Option<StatusMessage>,
    /// Last bitmap handed to the display surface
    pub frame: Option<RenderedFrame>,
}

impl UiState {
    pub fn from_config(config: &Config) -> Self {
        let mut focus = FocusState {
            mode: config.focus_mode,
            slider: config.lens_slider,
        };
        focus.slider = focus.slider.min(focus::LENS_SLIDER_MAX);

        Self {
            rotation: Rotation::default(),
            region: RegionInput::default(),
            focus,
            preview_index: config
                .preview_resolution_index
                .min(PREVIEW_RESOLUTIONS.len() - 1),
            still_index: config
                .capture_resolution_index
                .min(CAPTURE_RESOLUTIONS.len() - 1),
            still_format: config.still_format,
            theme: config.app_theme,
            paused: false,
            capturing: false,
            blink_on: false,
            status: None,
            frame: None,
        }
    }

    pub fn preview_resolution(&self) -> Resolution {
        PREVIEW_RESOLUTIONS[self.preview_index]
    }

    pub fn still_resolution(&self) -> Resolution {
        CAPTURE_RESOLUTIONS[self.still_index]
    }

    /// View parameters for the transform pipeline
    pub fn view(&self) -> ViewState<'_> {
        ViewState {
            rotation: self.rotation,
            crop: self.region.applied(),
            draft: self.region.draft(),
            magnifier: self.region.magnifier(),
        }
    }

    pub fn set_status(&mut self, status: StatusMessage) {
        self.status = Some(status);
    }

    /// Drop an expired status message
    pub fn expire_status(&mut self, now: Instant) {
        if self.status.as_ref().is_some_and(|s| s.is_expired(now)) {
            self.status = None;
        }
    }

    /// Text for the status bar at `now`
    pub fn status_text(&self, now: Instant) -> &str {
        match &self.status {
            Some(status) if !status.is_expired(now) => &status.text,
            _ => READY_TEXT,
        }
    }
}

/// All user commands and internal follow-ups
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // ===== Resolution & Format =====
    /// Select a preview preset by index
    SelectPreviewResolution(usize),
    /// Next still resolution preset
    CycleStillResolution,
    /// Next still format
    CycleStillFormat,

    // ===== Capture =====
    /// Take a picture; shows the busy overlay first
    Capture,
    /// Runs the capture after the overlay has been drawn
    PerformCapture,
    StartRecording,
    StopRecording,
    /// Start or stop depending on the current state
    ToggleRecording,

    // ===== Region of interest =====
    ApplyCrop,
    ClearCrop,
    ToggleMagnifier,
    PointerPressed(Point, PointerButton),
    PointerMoved(Point),
    PointerReleased(Point),

    // ===== Focus =====
    CycleFocusMode,
    TriggerAutofocus,
    /// Lens slider value, 0 to `LENS_SLIDER_MAX`
    SetLensSlider(u16),
    /// Move the lens slider by a signed step
    AdjustLensSlider(i32),

    // ===== View =====
    /// Rotate the preview by the given number of degrees (±90)
    Rotate(i32),
    TogglePause,
    ToggleTheme,

    Quit,
}

/// Main application state
pub struct AppModel {
    pub config: Config,
    pub ui: UiState,
    /// `None` when the camera could not be opened
    pub(crate) manager: Option<CaptureSessionManager>,
    pub(crate) pipeline: FrameTransformPipeline,
    pub(crate) transcoder: Box<dyn Transcoder>,
    pub(crate) save_prompt: Box<dyn SavePrompt>,
    pub(crate) temp_dir: PathBuf,
    pub(crate) quit_requested: bool,
}
