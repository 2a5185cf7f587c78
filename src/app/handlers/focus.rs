// SPDX-License-Identifier: GPL-3.0-only

//! Focus control handlers

use crate::app::state::{AppModel, Message, StatusMessage};
use crate::backends::camera::FocusMode;
use crate::constants::focus;
use tracing::{debug, info, warn};

impl AppModel {
    /// Advance the focus mode selector
    ///
    /// Entering Manual seeds the slider from the device's lens position so
    /// the lens does not jump.
    pub(crate) fn handle_cycle_focus_mode(&mut self) -> Option<Message> {
        let mode = self.ui.focus.mode.next();
        self.ui.focus.mode = mode;

        let Some(manager) = self.manager.as_mut() else {
            self.report_unavailable();
            return None;
        };

        if mode == FocusMode::Manual {
            if let Some(position) = manager.lens_position() {
                debug!(position, "Seeding lens slider from device");
                self.ui.focus.set_lens_position(position);
            }
            if let Err(e) = manager.set_lens_position(self.ui.focus.lens_position()) {
                warn!(error = %e, "Lens position rejected");
            }
        }

        match manager.set_focus_mode(mode) {
            Ok(()) => {
                info!(?mode, "Focus mode changed");
                self.ui.set_status(StatusMessage::info(format!(
                    "Focus mode: {}",
                    mode.display_name()
                )));
            }
            Err(e) => self.report(&e),
        }
        None
    }

    pub(crate) fn handle_trigger_autofocus(&mut self) -> Option<Message> {
        if !self.ui.focus.shows_af_trigger() {
            self.ui.set_status(StatusMessage::info(
                "Autofocus can only be triggered in 'Trigger Autofocus Mode'.",
            ));
            return None;
        }
        let Some(manager) = self.manager.as_mut() else {
            self.report_unavailable();
            return None;
        };

        match manager.trigger_autofocus() {
            Ok(()) => self
                .ui
                .set_status(StatusMessage::info("Autofocus triggered.")),
            Err(e) => self.report(&e),
        }
        None
    }

    /// Move the lens slider; only pushed to the device in Manual
    pub(crate) fn handle_set_lens_slider(&mut self, value: u16) -> Option<Message> {
        self.ui.focus.slider = value.min(focus::LENS_SLIDER_MAX);
        if !self.ui.focus.shows_slider() {
            debug!(value, "Lens slider moved outside manual focus");
            return None;
        }
        let Some(manager) = self.manager.as_mut() else {
            self.report_unavailable();
            return None;
        };

        if let Err(e) = manager.set_lens_position(self.ui.focus.lens_position()) {
            self.report(&e);
        }
        None
    }
}
