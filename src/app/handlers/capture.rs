// SPDX-License-Identifier: GPL-3.0-only

//! Capture operations handlers
//!
//! Handles still capture and video recording. Both write a temporary
//! artifact first and ask the save prompt for a destination afterwards.

use crate::app::state::{AppModel, CAPTURING_TEXT, Message, StatusMessage};
use crate::errors::AppError;
use crate::pipelines::finalize::{ArtifactKind, FinalizeOutcome, finalize_capture};
use crate::session::{CaptureRequest, SessionState};
use crate::storage;
use std::path::Path;
use tracing::{info, warn};

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl AppModel {
    // =========================================================================
    // Still Capture Handlers
    // =========================================================================

    /// Show the busy overlay, then capture on the follow-up message
    pub(crate) fn handle_capture(&mut self) -> Option<Message> {
        if self.manager.is_none() {
            self.report_unavailable();
            return None;
        }
        if self.session_state() != SessionState::Previewing {
            // Let the manager produce the precise rejection
            return self.handle_perform_capture();
        }

        self.ui.capturing = true;
        self.ui.set_status(StatusMessage::sticky(CAPTURING_TEXT));
        Some(Message::PerformCapture)
    }

    pub(crate) fn handle_perform_capture(&mut self) -> Option<Message> {
        let format = self.ui.still_format;
        let request = CaptureRequest {
            resolution: self.ui.still_resolution(),
            format,
            destination: storage::temp_still_path(&self.temp_dir, format),
        };

        let Some(manager) = self.manager.as_mut() else {
            self.ui.capturing = false;
            self.report_unavailable();
            return None;
        };
        let result = manager.capture_still(&request);
        self.ui.capturing = false;

        let temp = match result {
            Ok(temp) => temp,
            Err(e) => {
                self.report(&e);
                return None;
            }
        };

        info!(temp = %temp.display(), "Picture captured, prompting for destination");
        self.ui.set_status(StatusMessage::result(
            "Picture captured. Prompting to save...",
        ));
        let target = self.save_prompt.still_destination(format);

        match finalize_capture(
            &temp,
            target.as_deref(),
            ArtifactKind::Still,
            self.transcoder.as_ref(),
        ) {
            Ok(FinalizeOutcome::Saved(path)) => {
                self.ui.set_status(StatusMessage::result(format!(
                    "{} saved: {}",
                    format.display_name(),
                    file_name(&path)
                )));
            }
            Ok(FinalizeOutcome::Discarded) => {
                self.ui.set_status(StatusMessage::info("Picture discarded."));
            }
            Err(e) => self.report(&e),
        }
        None
    }

    // =========================================================================
    // Recording Handlers
    // =========================================================================

    pub(crate) fn handle_start_recording(&mut self) -> Option<Message> {
        let temp = storage::temp_video_path(&self.temp_dir);
        let Some(manager) = self.manager.as_mut() else {
            self.report_unavailable();
            return None;
        };

        match manager.start_recording(&temp) {
            Ok(()) => {
                self.ui.blink_on = true;
                self.show_placard();
                self.ui.set_status(StatusMessage::sticky("Recording..."));
            }
            Err(e) => self.report(&e),
        }
        None
    }

    pub(crate) fn handle_stop_recording(&mut self) -> Option<Message> {
        let Some(manager) = self.manager.as_mut() else {
            self.report_unavailable();
            return None;
        };
        if manager.state() != SessionState::Recording {
            self.report(&AppError::CaptureFailed(
                "no recording in progress".to_string(),
            ));
            return None;
        }

        let result = manager.stop_recording();
        self.ui.blink_on = false;
        self.ui.frame = None;

        let temp = match result {
            Ok(temp) => temp,
            Err(e) => {
                self.report(&e);
                return None;
            }
        };

        self.ui
            .set_status(StatusMessage::sticky("Recording stopped. Saving file..."));
        let target = self.save_prompt.video_destination();
        if target.is_some() {
            self.ui
                .set_status(StatusMessage::sticky("Converting to MP4, please wait..."));
        }

        match finalize_capture(
            &temp,
            target.as_deref(),
            ArtifactKind::Video,
            self.transcoder.as_ref(),
        ) {
            Ok(FinalizeOutcome::Saved(path)) => {
                self.ui.set_status(StatusMessage::result(format!(
                    "MP4 saved to {}",
                    file_name(&path)
                )));
            }
            Ok(FinalizeOutcome::Discarded) => {
                self.ui.set_status(StatusMessage::info("Video not saved."));
            }
            Err(e) => {
                if let AppError::ConversionFailed { temp_path, .. } = &e {
                    warn!(temp = %temp_path.display(), "Recording kept after failed conversion");
                }
                self.report(&e);
            }
        }
        None
    }
}
