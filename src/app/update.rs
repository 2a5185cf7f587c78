// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! The `update()` dispatcher routes each message to a handler in the
//! `handlers` submodules. A handler may return a follow-up message, which
//! the event loop runs after redrawing the display once.
//!
//! # Handler Modules
//!
//! - `handlers::camera`: Resolution presets, still format, pause, ticks
//! - `handlers::capture`: Still capture and video recording
//! - `handlers::focus`: Focus mode, autofocus trigger, lens slider
//! - `handlers::view`: Crop, magnifier, rotation, theme

use crate::app::state::{AppModel, Message};
use tracing::{debug, info};

impl AppModel {
    /// Handle one message; returns a follow-up to run after the next redraw
    pub fn update(&mut self, message: Message) -> Option<Message> {
        debug!(?message, "Handling message");
        match message {
            // ===== Resolution & Format =====
            Message::SelectPreviewResolution(index) => self.handle_select_preview_resolution(index),
            Message::CycleStillResolution => self.handle_cycle_still_resolution(),
            Message::CycleStillFormat => self.handle_cycle_still_format(),

            // ===== Capture =====
            Message::Capture => self.handle_capture(),
            Message::PerformCapture => self.handle_perform_capture(),
            Message::StartRecording => self.handle_start_recording(),
            Message::StopRecording => self.handle_stop_recording(),
            Message::ToggleRecording => {
                if self.is_recording() {
                    self.handle_stop_recording()
                } else {
                    self.handle_start_recording()
                }
            }

            // ===== Region of interest =====
            Message::ApplyCrop => self.handle_apply_crop(),
            Message::ClearCrop => self.handle_clear_crop(),
            Message::ToggleMagnifier => self.handle_toggle_magnifier(),
            Message::PointerPressed(point, button) => {
                self.ui.region.press(point, button);
                None
            }
            Message::PointerMoved(point) => {
                self.ui.region.motion(point);
                None
            }
            Message::PointerReleased(point) => {
                self.ui.region.release(point);
                None
            }

            // ===== Focus =====
            Message::CycleFocusMode => self.handle_cycle_focus_mode(),
            Message::TriggerAutofocus => self.handle_trigger_autofocus(),
            Message::SetLensSlider(value) => self.handle_set_lens_slider(value),
            Message::AdjustLensSlider(step) => {
                let value = (self.ui.focus.slider as i32 + step).clamp(0, u16::MAX as i32);
                self.handle_set_lens_slider(value as u16)
            }

            // ===== View =====
            Message::Rotate(delta) => self.handle_rotate(delta),
            Message::TogglePause => self.handle_toggle_pause(),
            Message::ToggleTheme => self.handle_toggle_theme(),

            Message::Quit => {
                info!("Quit requested");
                self.quit_requested = true;
                None
            }
        }
    }
}
