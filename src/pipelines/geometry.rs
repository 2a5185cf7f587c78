// SPDX-License-Identifier: GPL-3.0-only

//! Display-space and sensor-space rectangles

use crate::backends::camera::types::Resolution;

/// Pointer position in display space; may lie outside the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Clamp into `[0, width] x [0, height]`
    pub fn clamped_to(&self, surface: Resolution) -> Self {
        Self {
            x: self.x.clamp(0, surface.width as i32),
            y: self.y.clamp(0, surface.height as i32),
        }
    }
}

/// Axis-aligned rectangle in display space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized bounding box of two corners, both clamped to the surface
    pub fn from_corners(a: Point, b: Point, surface: Resolution) -> Self {
        let a = a.clamped_to(surface);
        let b = b.clamped_to(surface);
        let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
        let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
        Self::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
    }

    /// Square of side `size` centred on the surface
    pub fn centered(size: u32, surface: Resolution) -> Self {
        Self::new(
            surface.width.saturating_sub(size) / 2,
            surface.height.saturating_sub(size) / 2,
            size,
            size,
        )
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Half-open containment test
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x as i32
            && point.y >= self.y as i32
            && point.x < self.right() as i32
            && point.y < self.bottom() as i32
    }

    /// Both sides at least `min` pixels
    pub fn meets_minimum(&self, min: u32) -> bool {
        self.width >= min && self.height >= min
    }

    /// Both sides strictly larger than `min` pixels
    pub fn exceeds_minimum(&self, min: u32) -> bool {
        self.width > min && self.height > min
    }

    /// Move the top-left corner to `origin`, keeping the rectangle inside the surface
    pub fn moved_to(&self, origin: Point, surface: Resolution) -> Self {
        let max_x = surface.width.saturating_sub(self.width) as i32;
        let max_y = surface.height.saturating_sub(self.height) as i32;
        Self {
            x: origin.x.clamp(0, max_x) as u32,
            y: origin.y.clamp(0, max_y) as u32,
            ..*self
        }
    }
}

/// Region in sensor (frame) pixels with exclusive end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl SensorRect {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Map a display-space rectangle onto a frame of size `sensor`
///
/// Each axis scales independently by `sensor / display`; the result is
/// clamped to `[0, sensor]`.
pub fn display_to_sensor(rect: &Rect, display: Resolution, sensor: Resolution) -> SensorRect {
    let scale_x = sensor.width as f64 / display.width.max(1) as f64;
    let scale_y = sensor.height as f64 / display.height.max(1) as f64;

    let map = |value: u32, scale: f64, limit: u32| ((value as f64 * scale) as u32).min(limit);

    SensorRect {
        x0: map(rect.x, scale_x, sensor.width),
        y0: map(rect.y, scale_y, sensor.height),
        x1: map(rect.right(), scale_x, sensor.width),
        y1: map(rect.bottom(), scale_y, sensor.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPLAY: Resolution = Resolution::new(800, 600);

    #[test]
    fn test_corners_normalize_in_any_drag_direction() {
        let rect = Rect::from_corners(Point::new(300, 250), Point::new(100, 50), DISPLAY);
        assert_eq!(rect, Rect::new(100, 50, 200, 200));
    }

    #[test]
    fn test_corners_clamp_to_surface() {
        let rect = Rect::from_corners(Point::new(-20, 590), Point::new(900, 700), DISPLAY);
        assert_eq!(rect, Rect::new(0, 590, 800, 10));
    }

    #[test]
    fn test_minimum_size_checks() {
        let exact = Rect::new(0, 0, 10, 10);
        assert!(exact.meets_minimum(10));
        assert!(!exact.exceeds_minimum(10));
        assert!(Rect::new(0, 0, 11, 11).exceeds_minimum(10));
        assert!(!Rect::new(0, 0, 11, 9).meets_minimum(10));
    }

    #[test]
    fn test_mapping_scales_axes_independently() {
        let rect = Rect::new(100, 150, 200, 300);
        let sensor = display_to_sensor(&rect, DISPLAY, Resolution::new(1600, 900));
        assert_eq!(
            sensor,
            SensorRect {
                x0: 200,
                y0: 225,
                x1: 600,
                y1: 675
            }
        );
    }

    #[test]
    fn test_mapping_stays_within_sensor_bounds() {
        let sensors = [
            Resolution::new(1, 1),
            Resolution::new(640, 480),
            Resolution::new(720, 1280),
            Resolution::new(4608, 3456),
        ];
        let rects = [
            Rect::new(0, 0, 800, 600),
            Rect::new(799, 599, 1, 1),
            Rect::new(790, 590, 50, 50),
            Rect::new(0, 0, 0, 0),
        ];
        for sensor in sensors {
            for rect in rects {
                let mapped = display_to_sensor(&rect, DISPLAY, sensor);
                assert!(mapped.x0 <= mapped.x1 && mapped.x1 <= sensor.width);
                assert!(mapped.y0 <= mapped.y1 && mapped.y1 <= sensor.height);
            }
        }
    }

    #[test]
    fn test_moved_rect_stays_inside_surface() {
        let rect = Rect::new(0, 0, 150, 150);
        assert_eq!(
            rect.moved_to(Point::new(700, -40), DISPLAY),
            Rect::new(650, 0, 150, 150)
        );
    }

    #[test]
    fn test_centered_square() {
        assert_eq!(Rect::centered(150, DISPLAY), Rect::new(325, 225, 150, 150));
    }
}
