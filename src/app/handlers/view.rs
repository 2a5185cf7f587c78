// SPDX-License-Identifier: GPL-3.0-only

//! View handlers: crop, magnifier, rotation and theme

use crate::app::state::{AppModel, Message, StatusMessage};
use crate::constants::display;
use tracing::{debug, info};

impl AppModel {
    pub(crate) fn handle_apply_crop(&mut self) -> Option<Message> {
        if self.ui.region.apply() {
            info!(crop = ?self.ui.region.applied(), "Crop applied");
            self.ui.set_status(StatusMessage::info("Crop applied."));
        } else {
            self.ui.set_status(StatusMessage::info(format!(
                "Draw a region larger than {0}x{0} px on the preview first.",
                display::MIN_REGION_SIZE
            )));
        }
        None
    }

    pub(crate) fn handle_clear_crop(&mut self) -> Option<Message> {
        self.ui.region.clear();
        self.ui
            .set_status(StatusMessage::info("Crop cleared. Full view restored."));
        None
    }

    pub(crate) fn handle_toggle_magnifier(&mut self) -> Option<Message> {
        let visible = !self.ui.region.magnifier_visible();
        self.ui.region.set_magnifier_visible(visible);
        debug!(visible, "Magnifier toggled");
        None
    }

    /// Rotate the preview by a ±90° step
    pub(crate) fn handle_rotate(&mut self, delta: i32) -> Option<Message> {
        self.ui.rotation = self.ui.rotation.rotated_by(delta);
        self.ui.set_status(StatusMessage::info(format!(
            "Rotation: {}",
            self.ui.rotation
        )));
        None
    }

    pub(crate) fn handle_toggle_theme(&mut self) -> Option<Message> {
        self.ui.theme = self.ui.theme.toggled();
        info!(theme = ?self.ui.theme, "Theme changed");
        None
    }
}
