// SPDX-License-Identifier: GPL-3.0-only

//! Overlay drawing on display bitmaps

use super::geometry::Rect;
use crate::backends::camera::types::Resolution;
use crate::constants::display;
use image::{Rgb, RgbImage};

/// Draw a hollow rectangle of `thickness` pixels inside `rect`, clipped to the image
pub fn draw_outline(image: &mut RgbImage, rect: &Rect, color: [u8; 3], thickness: u32) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let x_end = rect.right().min(image.width());
    let y_end = rect.bottom().min(image.height());
    let t = thickness.max(1);

    for y in rect.y..y_end {
        for x in rect.x..x_end {
            let on_edge = x < rect.x + t
                || y < rect.y + t
                || x + t >= rect.right()
                || y + t >= rect.bottom();
            if on_edge {
                image.put_pixel(x, y, Rgb(color));
            }
        }
    }
}

/// Fill `rect` with a solid colour, clipped to the image
pub fn fill_rect(image: &mut RgbImage, rect: &Rect, color: [u8; 3]) {
    let x_end = rect.right().min(image.width());
    let y_end = rect.bottom().min(image.height());
    for y in rect.y..y_end {
        for x in rect.x..x_end {
            image.put_pixel(x, y, Rgb(color));
        }
    }
}

/// Solid black frame
pub fn black_frame(size: Resolution) -> RgbImage {
    RgbImage::new(size.width, size.height)
}

/// Static bitmap shown while the preview is suspended for recording
///
/// The indicator square blinks by toggling `indicator_on`.
pub fn recording_placard(size: Resolution, indicator_on: bool) -> RgbImage {
    let mut image = black_frame(size);
    if indicator_on {
        let indicator = Rect::new(
            display::INDICATOR_OFFSET,
            display::INDICATOR_OFFSET,
            display::INDICATOR_SIZE,
            display::INDICATOR_SIZE,
        );
        fill_rect(&mut image, &indicator, display::INDICATOR_COLOR);
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 3] = [255, 0, 0];

    #[test]
    fn test_outline_leaves_interior_untouched() {
        let mut image = RgbImage::new(20, 20);
        draw_outline(&mut image, &Rect::new(2, 2, 10, 10), RED, 2);

        assert_eq!(image.get_pixel(2, 2).0, RED);
        assert_eq!(image.get_pixel(3, 7).0, RED);
        assert_eq!(image.get_pixel(11, 11).0, RED);
        assert_eq!(image.get_pixel(7, 7).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(12, 12).0, [0, 0, 0]);
    }

    #[test]
    fn test_outline_is_clipped_at_image_edge() {
        let mut image = RgbImage::new(10, 10);
        draw_outline(&mut image, &Rect::new(5, 5, 50, 50), RED, 2);
        assert_eq!(image.get_pixel(5, 9).0, RED);
    }

    #[test]
    fn test_placard_indicator_blinks() {
        let size = Resolution::new(800, 600);
        let on = recording_placard(size, true);
        let off = recording_placard(size, false);

        assert_eq!(on.get_pixel(10, 10).0, display::INDICATOR_COLOR);
        assert_eq!(on.get_pixel(29, 29).0, display::INDICATOR_COLOR);
        assert_eq!(on.get_pixel(30, 30).0, [0, 0, 0]);
        assert_eq!(off.get_pixel(10, 10).0, [0, 0, 0]);
    }
}
