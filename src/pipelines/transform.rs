// SPDX-License-Identifier: GPL-3.0-only

//! Frame transform pipeline
//!
//! Turns a raw camera frame into the display bitmap:
//!
//! 1. normalize to 3-channel RGB
//! 2. rotate in 90° steps
//! 3. crop (display-space crop mapped onto the rotated frame)
//! 4. scale to the display surface
//! 5. draw the crop draft and magnifier outlines
//!
//! The magnifier view is cut from the same rotated and cropped image before
//! any overlay is drawn.

use super::geometry::{Rect, display_to_sensor};
use super::overlay::{black_frame, draw_outline};
use crate::backends::camera::types::{RawFrame, Resolution, Rotation};
use crate::constants::{display, timing};
use image::RgbImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often an over-budget summary may be logged
const BUDGET_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Resampling filter used to scale frames to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Why a tick produced no bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Channel count other than 1 or at least 3
    UnsupportedChannels(u8),
    /// Buffer shorter than `width * height * channels`
    MalformedBuffer { expected: usize, actual: usize },
    /// Zero-sized frame
    EmptyFrame,
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformError::UnsupportedChannels(n) => {
                write!(f, "Unsupported channel count: {}", n)
            }
            TransformError::MalformedBuffer { expected, actual } => write!(
                f,
                "Malformed frame buffer: expected {} bytes, got {}",
                expected, actual
            ),
            TransformError::EmptyFrame => write!(f, "Empty frame"),
        }
    }
}

impl std::error::Error for TransformError {}

/// View parameters for one render, borrowed from the UI state
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewState<'a> {
    pub rotation: Rotation,
    pub crop: Option<&'a Rect>,
    pub draft: Option<&'a Rect>,
    /// Magnifier rectangle, present only while the magnifier is visible
    pub magnifier: Option<&'a Rect>,
}

/// Output of one render
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    /// Display-sized bitmap with overlays
    pub bitmap: RgbImage,
    /// Enlarged magnifier view, when the magnifier is visible
    pub magnifier: Option<RgbImage>,
}

/// Renders raw frames for a fixed-size display surface
#[derive(Debug)]
pub struct FrameTransformPipeline {
    display: Resolution,
    filter: ResampleFilter,
    budget: Duration,
    over_budget: u64,
    last_budget_log: Option<Instant>,
}

impl Default for FrameTransformPipeline {
    fn default() -> Self {
        Self::new(display::SURFACE)
    }
}

impl FrameTransformPipeline {
    pub fn new(display: Resolution) -> Self {
        Self {
            display,
            filter: ResampleFilter::default(),
            budget: timing::PREVIEW_TICK,
            over_budget: 0,
            last_budget_log: None,
        }
    }

    pub fn with_filter(mut self, filter: ResampleFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn display(&self) -> Resolution {
        self.display
    }

    pub fn render(
        &mut self,
        frame: &RawFrame,
        view: &ViewState<'_>,
    ) -> Result<RenderedFrame, TransformError> {
        let started = Instant::now();

        let rgb = normalize(frame)?;
        let rotated = rotate(rgb, view.rotation);
        let rendered = match crop(&rotated, view.crop, self.display) {
            Some(region) => {
                let mut bitmap = imageops::resize(
                    &*region,
                    self.display.width,
                    self.display.height,
                    self.filter.into(),
                );
                let magnifier = view
                    .magnifier
                    .and_then(|rect| magnify(&region, rect, self.display));

                if let Some(draft) = view.draft {
                    draw_outline(&mut bitmap, draft, display::DRAFT_COLOR, display::OUTLINE_WIDTH);
                }
                if let Some(rect) = view.magnifier {
                    draw_outline(
                        &mut bitmap,
                        rect,
                        display::MAGNIFIER_COLOR,
                        display::OUTLINE_WIDTH,
                    );
                }
                RenderedFrame { bitmap, magnifier }
            }
            None => RenderedFrame {
                bitmap: black_frame(self.display),
                magnifier: None,
            },
        };

        self.account(started.elapsed());
        Ok(rendered)
    }

    fn account(&mut self, elapsed: Duration) {
        if elapsed <= self.budget {
            return;
        }
        self.over_budget += 1;
        let due = self
            .last_budget_log
            .is_none_or(|last| last.elapsed() >= BUDGET_LOG_INTERVAL);
        if due {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.budget.as_millis() as u64,
                over_budget_total = self.over_budget,
                "Preview render exceeded its budget"
            );
            self.last_budget_log = Some(Instant::now());
        }
    }
}

/// Dense 3-channel copy of the frame
pub fn normalize(frame: &RawFrame) -> Result<RgbImage, TransformError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(TransformError::EmptyFrame);
    }
    let channels = frame.channels as usize;
    if channels == 0 || channels == 2 {
        return Err(TransformError::UnsupportedChannels(frame.channels));
    }
    let expected = frame.expected_len();
    if frame.data.len() < expected {
        return Err(TransformError::MalformedBuffer {
            expected,
            actual: frame.data.len(),
        });
    }

    let pixels = &frame.data[..expected];
    let data: Vec<u8> = if channels == 3 {
        pixels.to_vec()
    } else if channels == 1 {
        pixels.iter().flat_map(|&v| [v, v, v]).collect()
    } else {
        pixels
            .chunks_exact(channels)
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect()
    };

    RgbImage::from_raw(frame.width, frame.height, data).ok_or(TransformError::MalformedBuffer {
        expected,
        actual: frame.data.len(),
    })
}

/// Rotate clockwise by whole quarter turns
pub fn rotate(image: RgbImage, rotation: Rotation) -> RgbImage {
    match rotation {
        Rotation::None => image,
        Rotation::Rotate90 => imageops::rotate90(&image),
        Rotation::Rotate180 => imageops::rotate180(&image),
        Rotation::Rotate270 => imageops::rotate270(&image),
    }
}

/// Apply the display-space crop to the rotated frame
///
/// Returns `None` when the mapped region is empty.
fn crop<'a>(
    image: &'a RgbImage,
    crop: Option<&Rect>,
    display: Resolution,
) -> Option<Cow<'a, RgbImage>> {
    let Some(rect) = crop else {
        return Some(Cow::Borrowed(image));
    };
    let sensor = Resolution::new(image.width(), image.height());
    let region = display_to_sensor(rect, display, sensor);
    if region.is_empty() {
        debug!(?rect, %sensor, "Crop maps to an empty region");
        return None;
    }
    let cropped = imageops::crop_imm(image, region.x0, region.y0, region.width(), region.height());
    Some(Cow::Owned(cropped.to_image()))
}

/// Nearest-neighbour enlargement of the area under the magnifier rectangle
fn magnify(image: &RgbImage, rect: &Rect, display: Resolution) -> Option<RgbImage> {
    let sensor = Resolution::new(image.width(), image.height());
    let region = display_to_sensor(rect, display, sensor);
    if region.is_empty() {
        return None;
    }
    let patch =
        imageops::crop_imm(image, region.x0, region.y0, region.width(), region.height()).to_image();
    Some(imageops::resize(
        &patch,
        display::MAGNIFIER_VIEW_SIZE,
        display::MAGNIFIER_VIEW_SIZE,
        FilterType::Nearest,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::RawFrame;

    const DISPLAY: Resolution = Resolution::new(80, 60);

    /// Frame where each pixel encodes its own coordinates
    fn coordinate_frame(width: u32, height: u32) -> RawFrame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 7]);
            }
        }
        RawFrame::new(width, height, 3, data)
    }

    fn pipeline() -> FrameTransformPipeline {
        FrameTransformPipeline::new(DISPLAY).with_filter(ResampleFilter::Nearest)
    }

    #[test]
    fn test_output_is_always_display_sized() {
        let mut pipeline = pipeline();
        for rotation in [
            Rotation::None,
            Rotation::Rotate90,
            Rotation::Rotate180,
            Rotation::Rotate270,
        ] {
            let view = ViewState {
                rotation,
                ..Default::default()
            };
            let out = pipeline.render(&coordinate_frame(40, 20), &view).unwrap();
            assert_eq!(out.bitmap.dimensions(), (80, 60));
        }
    }

    #[test]
    fn test_four_quarter_turns_restore_the_frame() {
        let original = normalize(&coordinate_frame(7, 5)).unwrap();
        let mut image = original.clone();
        for _ in 0..4 {
            image = rotate(image, Rotation::Rotate90);
        }
        assert_eq!(image, original);
    }

    #[test]
    fn test_rotation_is_clockwise() {
        let image = normalize(&coordinate_frame(4, 2)).unwrap();
        let rotated = rotate(image, Rotation::Rotate90);
        assert_eq!(rotated.dimensions(), (2, 4));
        // Bottom-left source pixel (0, 1) lands top-left after a clockwise turn
        assert_eq!(rotated.get_pixel(0, 0).0, [0, 1, 7]);
    }

    #[test]
    fn test_single_channel_is_replicated() {
        let frame = RawFrame::new(2, 1, 1, vec![10u8, 200]);
        let image = normalize(&frame).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [10, 10, 10]);
        assert_eq!(image.get_pixel(1, 0).0, [200, 200, 200]);
    }

    #[test]
    fn test_extra_channels_are_dropped() {
        let frame = RawFrame::new(1, 1, 4, vec![1u8, 2, 3, 4]);
        assert_eq!(normalize(&frame).unwrap().get_pixel(0, 0).0, [1, 2, 3]);
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        let mut pipeline = pipeline();
        let view = ViewState::default();

        let two_channel = RawFrame::new(2, 2, 2, vec![0u8; 8]);
        assert_eq!(
            pipeline.render(&two_channel, &view).unwrap_err(),
            TransformError::UnsupportedChannels(2)
        );

        let short = RawFrame::new(4, 4, 3, vec![0u8; 10]);
        assert!(matches!(
            pipeline.render(&short, &view),
            Err(TransformError::MalformedBuffer { expected: 48, actual: 10 })
        ));
    }

    #[test]
    fn test_crop_selects_mapped_region() {
        let mut pipeline = pipeline();
        // Right half of the display maps to the right half of a 40x30 frame
        let crop = Rect::new(40, 0, 40, 60);
        let view = ViewState {
            crop: Some(&crop),
            ..Default::default()
        };
        let out = pipeline.render(&coordinate_frame(40, 30), &view).unwrap();
        assert_eq!(out.bitmap.get_pixel(0, 0).0[0], 20);
    }

    #[test]
    fn test_empty_crop_yields_black_frame() {
        let mut pipeline = pipeline();
        let crop = Rect::new(0, 0, 0, 0);
        let view = ViewState {
            crop: Some(&crop),
            ..Default::default()
        };
        let out = pipeline.render(&coordinate_frame(40, 30), &view).unwrap();
        assert_eq!(out.bitmap.dimensions(), (80, 60));
        assert!(out.bitmap.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_overlays_are_drawn_in_display_space() {
        let mut pipeline = pipeline();
        let draft = Rect::new(10, 10, 20, 20);
        let magnifier = Rect::new(40, 20, 15, 15);
        let view = ViewState {
            draft: Some(&draft),
            magnifier: Some(&magnifier),
            ..Default::default()
        };
        let out = pipeline.render(&coordinate_frame(40, 30), &view).unwrap();
        assert_eq!(out.bitmap.get_pixel(10, 10).0, display::DRAFT_COLOR);
        assert_eq!(out.bitmap.get_pixel(40, 20).0, display::MAGNIFIER_COLOR);
    }

    #[test]
    fn test_magnifier_view_is_fixed_size_and_overlay_free() {
        let mut pipeline = pipeline();
        let magnifier = Rect::new(0, 0, 15, 15);
        let view = ViewState {
            magnifier: Some(&magnifier),
            ..Default::default()
        };
        let out = pipeline.render(&coordinate_frame(40, 30), &view).unwrap();
        let zoom = out.magnifier.unwrap();
        assert_eq!(
            zoom.dimensions(),
            (display::MAGNIFIER_VIEW_SIZE, display::MAGNIFIER_VIEW_SIZE)
        );
        assert_eq!(zoom.get_pixel(0, 0).0, [0, 0, 7]);
    }

    #[test]
    fn test_magnifier_follows_rotation() {
        let mut pipeline = pipeline();
        let magnifier = Rect::new(0, 0, 10, 10);
        let view = ViewState {
            rotation: Rotation::Rotate180,
            magnifier: Some(&magnifier),
            ..Default::default()
        };
        let out = pipeline.render(&coordinate_frame(40, 30), &view).unwrap();
        // Top-left after a half turn is the source's bottom-right pixel
        assert_eq!(out.magnifier.unwrap().get_pixel(0, 0).0, [39, 29, 7]);
    }
}
