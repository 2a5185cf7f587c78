// SPDX-License-Identifier: MPL-2.0

//! Main application module for picam
//!
//! This module contains the application state, message handling and the
//! event loop that schedules preview and blink ticks between user commands.
//!
//! # Architecture
//!
//! - `state`: Application state types (AppModel, UiState, Message, StatusMessage)
//! - `roi`: Crop draft, applied crop and magnifier input model
//! - `save_prompt`: Destination prompts for finished captures
//! - `event_loop`: Single-threaded scheduler for ticks and commands
//! - `update`: Message dispatch
//! - `handlers`: Message handlers grouped by domain
//!
//! The display surface (terminal or headless) only reads [`AppModel::frame`]
//! and the status text, and feeds [`Message`]s back in.

pub mod event_loop;
mod handlers;
pub mod roi;
pub mod save_prompt;
mod state;
mod update;

pub use roi::{PointerButton, RegionInput};
pub use save_prompt::{AutoSavePrompt, DeclineSavePrompt, DialogSavePrompt, SavePrompt};
pub use state::{
    AppModel, CAPTURING_TEXT, FocusState, Message, READY_TEXT, Severity, StatusMessage, UiState,
};

use crate::backends::camera::{CameraDriver, CameraMode, EncoderProfile};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::pipelines::finalize::{FfmpegTranscoder, Transcoder};
use crate::pipelines::transform::{FrameTransformPipeline, RenderedFrame};
use crate::session::{CaptureSessionManager, SessionState};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

impl AppModel {
    /// Build the model around an opened driver, or a failure to open one
    ///
    /// Without a driver the UI still runs and shows a blocking notice.
    pub fn new(config: Config, driver: AppResult<Box<dyn CameraDriver>>) -> Self {
        let mut ui = UiState::from_config(&config);

        let manager = match driver {
            Ok(driver) => Some(
                CaptureSessionManager::new(driver).with_encoder_profile(EncoderProfile {
                    bitrate: config.bitrate_preset,
                    ..EncoderProfile::default()
                }),
            ),
            Err(e) => {
                error!(error = %e, "Camera unavailable");
                ui.set_status(StatusMessage::from(&e));
                None
            }
        };

        Self {
            pipeline: FrameTransformPipeline::default().with_filter(config.resample_filter),
            transcoder: Box::new(FfmpegTranscoder::new(config.transcoder.clone())),
            save_prompt: save_prompt::from_mode(config.save_prompt),
            temp_dir: config.temp_dir(),
            manager,
            ui,
            config,
            quit_requested: false,
        }
    }

    pub fn with_transcoder(mut self, transcoder: Box<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    pub fn with_save_prompt(mut self, save_prompt: Box<dyn SavePrompt>) -> Self {
        self.save_prompt = save_prompt;
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    /// Delay after each preview start; zero in tests
    pub fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.manager = self.manager.map(|m| m.with_settle_time(settle_time));
        self
    }

    /// Start the preview at the configured resolution and push focus settings
    pub fn init(&mut self) {
        let resolution = self.ui.preview_resolution();
        let Some(manager) = self.manager.as_mut() else {
            return;
        };

        match manager.configure_and_start(CameraMode::Preview, resolution) {
            Ok(()) => {
                info!(%resolution, driver = %manager.driver_name(), "Preview started");
                self.push_focus_settings();
                self.ui.set_status(StatusMessage::info(format!(
                    "Preview started at {}",
                    resolution
                )));
            }
            Err(e) => self.report(&e),
        }
    }

    /// Push the UI focus mode (and lens position in Manual) to the device
    fn push_focus_settings(&mut self) {
        let Some(manager) = self.manager.as_mut() else {
            return;
        };
        if self.ui.focus.shows_slider()
            && let Err(e) = manager.set_lens_position(self.ui.focus.lens_position())
        {
            warn!(error = %e, "Initial lens position rejected");
        }
        if let Err(e) = manager.set_focus_mode(self.ui.focus.mode) {
            warn!(error = %e, "Initial focus mode rejected");
        }
    }

    /// Log an error and show it in the status bar
    pub(crate) fn report(&mut self, err: &AppError) {
        match err {
            AppError::Control(_) | AppError::Busy(_) => warn!(error = %err, "Operation rejected"),
            _ => error!(error = %err, "Operation failed"),
        }
        self.ui.set_status(StatusMessage::from(err));
    }

    pub(crate) fn report_unavailable(&mut self) {
        self.ui.set_status(StatusMessage::new(
            "Camera not initialized",
            Severity::Blocking,
            None,
        ));
    }

    pub fn session_state(&self) -> SessionState {
        self.manager
            .as_ref()
            .map_or(SessionState::Idle, |m| m.state())
    }

    pub fn camera_available(&self) -> bool {
        self.manager.is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.session_state() == SessionState::Recording
    }

    /// Preview ticks run only while previewing, not paused and not capturing
    pub fn preview_armed(&self) -> bool {
        self.session_state() == SessionState::Previewing && !self.ui.paused && !self.ui.capturing
    }

    /// Blink ticks run only while recording
    pub fn blink_armed(&self) -> bool {
        self.is_recording()
    }

    pub fn should_quit(&self) -> bool {
        self.quit_requested
    }

    /// Bitmap currently shown on the display surface
    pub fn frame(&self) -> Option<&RenderedFrame> {
        self.ui.frame.as_ref()
    }

    /// Copy persisted UI choices back into the config
    pub fn sync_config(&mut self) {
        self.config.app_theme = self.ui.theme;
        self.config.preview_resolution_index = self.ui.preview_index;
        self.config.capture_resolution_index = self.ui.still_index;
        self.config.still_format = self.ui.still_format;
        self.config.focus_mode = self.ui.focus.mode;
        self.config.lens_slider = self.ui.focus.slider;
    }

    /// Stop the camera, discarding any active recording, and sync the config
    pub fn shutdown(&mut self) {
        if let Some(manager) = self.manager.as_mut() {
            manager.shutdown();
        }
        self.ui.frame = None;
        self.sync_config();
        info!("Application shut down");
    }
}
