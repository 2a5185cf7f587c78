// SPDX-License-Identifier: GPL-3.0-only

//! Region-of-interest input model
//!
//! Translates pointer events on the display surface into a crop draft, an
//! applied crop and a draggable magnifier rectangle. All coordinates are in
//! display space.
//!
//! A press inside the visible magnifier always starts a magnifier drag, even
//! when a crop is applied or drafted. Any other primary press anchors a new
//! crop draft.

use crate::backends::camera::Resolution;
use crate::constants::display;
use crate::pipelines::geometry::{Point, Rect};
use tracing::debug;

/// Pointer button of a press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    None,
    /// Drawing a crop draft from `anchor`
    Crop { anchor: Point },
    /// Moving the magnifier; `offset` is pointer minus rectangle origin
    Magnifier { offset: Point },
}

#[derive(Debug, Clone)]
pub struct RegionInput {
    surface: Resolution,
    min_size: u32,
    draft: Option<Rect>,
    applied: Option<Rect>,
    magnifier: Rect,
    magnifier_visible: bool,
    drag: Drag,
}

impl Default for RegionInput {
    fn default() -> Self {
        Self::new(display::SURFACE)
    }
}

impl RegionInput {
    pub fn new(surface: Resolution) -> Self {
        Self {
            surface,
            min_size: display::MIN_REGION_SIZE,
            draft: None,
            applied: None,
            magnifier: Rect::centered(display::MAGNIFIER_REGION_SIZE, surface),
            magnifier_visible: false,
            drag: Drag::None,
        }
    }

    pub fn press(&mut self, point: Point, button: PointerButton) {
        if self.magnifier_visible && self.magnifier.contains(point) {
            let offset = Point::new(
                point.x - self.magnifier.x as i32,
                point.y - self.magnifier.y as i32,
            );
            self.drag = Drag::Magnifier { offset };
            return;
        }

        if button != PointerButton::Primary {
            return;
        }

        let anchor = point.clamped_to(self.surface);
        self.drag = Drag::Crop { anchor };
        self.draft = Some(Rect::from_corners(anchor, anchor, self.surface));
    }

    pub fn motion(&mut self, point: Point) {
        match self.drag {
            Drag::None => {}
            Drag::Crop { anchor } => {
                self.draft = Some(Rect::from_corners(anchor, point, self.surface));
            }
            Drag::Magnifier { offset } => {
                let origin = Point::new(point.x - offset.x, point.y - offset.y);
                self.magnifier = self.magnifier.moved_to(origin, self.surface);
            }
        }
    }

    pub fn release(&mut self, point: Point) {
        match self.drag {
            Drag::None => {}
            Drag::Crop { .. } => {
                self.motion(point);
                if self.draft.is_some_and(|d| !d.meets_minimum(self.min_size)) {
                    self.draft = None;
                }
            }
            Drag::Magnifier { .. } => {
                self.motion(point);
                debug!(magnifier = ?self.magnifier, "Magnifier moved");
            }
        }
        self.drag = Drag::None;
    }

    /// Whether the current draft is large enough to apply
    ///
    /// A draft of exactly the minimum size survives release but cannot be
    /// applied.
    pub fn can_apply(&self) -> bool {
        self.draft
            .is_some_and(|draft| draft.exceeds_minimum(self.min_size))
    }

    /// Promote the draft to the applied crop
    ///
    /// Returns `false` and leaves everything untouched when there is no valid
    /// draft.
    pub fn apply(&mut self) -> bool {
        if !self.can_apply() {
            return false;
        }
        self.applied = self.draft.take();
        true
    }

    /// Remove the applied crop and any draft
    pub fn clear(&mut self) {
        self.applied = None;
        self.draft = None;
        if matches!(self.drag, Drag::Crop { .. }) {
            self.drag = Drag::None;
        }
    }

    /// Show or hide the magnifier; showing re-centres it
    pub fn set_magnifier_visible(&mut self, visible: bool) {
        if visible && !self.magnifier_visible {
            self.magnifier = Rect::centered(display::MAGNIFIER_REGION_SIZE, self.surface);
        }
        if !visible && matches!(self.drag, Drag::Magnifier { .. }) {
            self.drag = Drag::None;
        }
        self.magnifier_visible = visible;
    }

    pub fn magnifier_visible(&self) -> bool {
        self.magnifier_visible
    }

    pub fn draft(&self) -> Option<&Rect> {
        self.draft.as_ref()
    }

    pub fn applied(&self) -> Option<&Rect> {
        self.applied.as_ref()
    }

    /// Magnifier rectangle while it is visible
    pub fn magnifier(&self) -> Option<&Rect> {
        self.magnifier_visible.then_some(&self.magnifier)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != Drag::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    fn drag(input: &mut RegionInput, from: Point, to: Point) {
        input.press(from, PointerButton::Primary);
        input.motion(to);
        input.release(to);
    }

    #[test]
    fn test_drag_builds_normalized_draft() {
        let mut input = RegionInput::default();
        input.press(p(300, 200), PointerButton::Primary);
        input.motion(p(100, 50));

        assert_eq!(input.draft(), Some(&Rect::new(100, 50, 200, 150)));
        assert!(input.can_apply());
    }

    #[test]
    fn test_small_draft_is_discarded_on_release() {
        let mut input = RegionInput::default();
        drag(&mut input, p(100, 100), p(109, 300));

        assert!(input.draft().is_none());
        assert!(!input.apply());
        assert!(input.applied().is_none());
    }

    #[test]
    fn test_minimum_sized_draft_is_kept_but_not_applicable() {
        let mut input = RegionInput::default();
        drag(&mut input, p(100, 100), p(110, 110));
        assert_eq!(input.draft(), Some(&Rect::new(100, 100, 10, 10)));
        assert!(!input.can_apply());
        assert!(!input.apply());
        assert!(input.applied().is_none());

        drag(&mut input, p(100, 100), p(111, 111));
        assert!(input.can_apply());
        assert!(input.apply());
        assert_eq!(input.applied(), Some(&Rect::new(100, 100, 11, 11)));
        assert!(input.draft().is_none());
    }

    #[test]
    fn test_apply_without_draft_is_rejected() {
        let mut input = RegionInput::default();
        assert!(!input.apply());
    }

    #[test]
    fn test_pointer_outside_surface_is_clamped() {
        let mut input = RegionInput::default();
        drag(&mut input, p(-50, -20), p(900, 700));
        assert_eq!(input.draft(), Some(&Rect::new(0, 0, 800, 600)));
    }

    #[test]
    fn test_secondary_press_does_not_start_a_draft() {
        let mut input = RegionInput::default();
        input.press(p(10, 10), PointerButton::Secondary);
        input.motion(p(200, 200));
        assert!(input.draft().is_none());
        assert!(!input.is_dragging());
    }

    #[test]
    fn test_magnifier_press_wins_over_crop() {
        let mut input = RegionInput::default();
        drag(&mut input, p(0, 0), p(800, 600));
        assert!(input.apply());
        input.set_magnifier_visible(true);

        // Magnifier is centred at (325, 225)
        input.press(p(400, 300), PointerButton::Primary);
        input.motion(p(450, 320));
        input.release(p(450, 320));

        assert_eq!(input.magnifier(), Some(&Rect::new(375, 245, 150, 150)));
        assert!(input.draft().is_none());
        assert_eq!(input.applied(), Some(&Rect::new(0, 0, 800, 600)));
    }

    #[test]
    fn test_magnifier_drag_is_clamped_inside_surface() {
        let mut input = RegionInput::default();
        input.set_magnifier_visible(true);
        input.press(p(330, 230), PointerButton::Primary);
        input.motion(p(2000, -500));
        input.release(p(2000, -500));

        assert_eq!(input.magnifier(), Some(&Rect::new(650, 0, 150, 150)));
    }

    #[test]
    fn test_hidden_magnifier_does_not_capture_presses() {
        let mut input = RegionInput::default();
        input.press(p(400, 300), PointerButton::Primary);
        input.motion(p(500, 400));
        assert!(input.draft().is_some());
        assert!(input.magnifier().is_none());
    }

    #[test]
    fn test_showing_magnifier_recentres_it() {
        let mut input = RegionInput::default();
        input.set_magnifier_visible(true);
        drag(&mut input, p(400, 300), p(10, 10));
        input.set_magnifier_visible(false);
        input.set_magnifier_visible(true);
        assert_eq!(input.magnifier(), Some(&Rect::new(325, 225, 150, 150)));
    }

    #[test]
    fn test_clear_removes_applied_and_draft() {
        let mut input = RegionInput::default();
        drag(&mut input, p(10, 10), p(100, 100));
        input.apply();
        input.press(p(200, 200), PointerButton::Primary);
        input.motion(p(300, 300));

        input.clear();
        assert!(input.applied().is_none());
        assert!(input.draft().is_none());
        assert!(!input.is_dragging());
    }
}
