// SPDX-License-Identifier: GPL-3.0-only

//! Camera handlers
//!
//! Preview resolution presets, still settings, pause, and the timer ticks.

use crate::app::state::{AppModel, Message, StatusMessage};
use crate::backends::camera::{CameraMode, StillFormat};
use crate::constants::{CAPTURE_RESOLUTIONS, PREVIEW_RESOLUTIONS};
use crate::pipelines::overlay::recording_placard;
use crate::pipelines::transform::RenderedFrame;
use crate::session::SessionState;
use std::time::Instant;
use tracing::{debug, info, warn};

impl AppModel {
    // =========================================================================
    // Resolution & Format Handlers
    // =========================================================================

    /// Restart the preview at another preset
    ///
    /// Success clears the crop, whose display rectangle no longer matches the
    /// new frame. Failure reverts the selector.
    pub(crate) fn handle_select_preview_resolution(&mut self, index: usize) -> Option<Message> {
        let Some(&resolution) = PREVIEW_RESOLUTIONS.get(index) else {
            warn!(index, "Preview resolution index out of range");
            return None;
        };
        if index == self.ui.preview_index && self.session_state() == SessionState::Previewing {
            return None;
        }

        let previous = self.ui.preview_index;
        let Some(manager) = self.manager.as_mut() else {
            self.report_unavailable();
            return None;
        };

        info!(%resolution, "Changing preview resolution");
        self.ui.preview_index = index;
        match manager.configure_and_start(CameraMode::Preview, resolution) {
            Ok(()) => {
                self.ui.region.clear();
                self.ui.frame = None;
                self.ui.set_status(StatusMessage::info(format!(
                    "Preview resolution: {}",
                    resolution
                )));
            }
            Err(e) => {
                self.ui.preview_index = previous;
                self.report(&e);
            }
        }
        None
    }

    pub(crate) fn handle_cycle_still_resolution(&mut self) -> Option<Message> {
        self.ui.still_index = (self.ui.still_index + 1) % CAPTURE_RESOLUTIONS.len();
        let resolution = self.ui.still_resolution();
        debug!(%resolution, "Still resolution selected");
        self.ui
            .set_status(StatusMessage::info(format!("Still resolution: {}", resolution)));
        None
    }

    pub(crate) fn handle_cycle_still_format(&mut self) -> Option<Message> {
        self.ui.still_format = self.ui.still_format.next();
        let format = self.ui.still_format;
        debug!(?format, "Still format selected");
        let text = if format == StillFormat::Dng {
            format!(
                "Still format: {} (raw {})",
                format.display_name(),
                crate::constants::DNG_RAW_RESOLUTION
            )
        } else {
            format!("Still format: {}", format.display_name())
        };
        self.ui.set_status(StatusMessage::info(text));
        None
    }

    // =========================================================================
    // Preview Handlers
    // =========================================================================

    pub(crate) fn handle_toggle_pause(&mut self) -> Option<Message> {
        self.ui.paused = !self.ui.paused;
        let text = if self.ui.paused {
            "Preview Paused"
        } else {
            "Preview Resumed"
        };
        info!(paused = self.ui.paused, "Preview pause toggled");
        self.ui.set_status(StatusMessage::info(text));
        None
    }

    /// Pull a frame and render it for the display surface
    ///
    /// A tick without a new frame, or with a frame the pipeline rejects, keeps
    /// the previous bitmap on screen.
    pub fn preview_tick(&mut self) {
        self.ui.expire_status(Instant::now());
        if !self.preview_armed() {
            return;
        }
        let Some(manager) = self.manager.as_mut() else {
            return;
        };
        let Some(frame) = manager.current_frame() else {
            return;
        };

        match self.pipeline.render(&frame, &self.ui.view()) {
            Ok(rendered) => self.ui.frame = Some(rendered),
            Err(e) => debug!(error = %e, "Skipping preview tick"),
        }
    }

    /// Toggle the recording indicator on the placard
    pub fn blink_tick(&mut self) {
        self.ui.expire_status(Instant::now());
        if !self.blink_armed() {
            return;
        }
        self.ui.blink_on = !self.ui.blink_on;
        self.show_placard();
    }

    pub(crate) fn show_placard(&mut self) {
        self.ui.frame = Some(RenderedFrame {
            bitmap: recording_placard(self.pipeline.display(), self.ui.blink_on),
            magnifier: None,
        });
    }
}
