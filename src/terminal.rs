// SPDX-License-Identifier: GPL-3.0-only

//! Terminal display surface
//!
//! Renders the display bitmap to the terminal using Unicode half-block
//! characters for improved vertical resolution, forwards mouse drags in
//! display space and maps keys to [`Message`]s.
//!
//! ```text
//! ┌──────────────────────────────────┬─────────────┐
//! │                                  │ settings    │
//! │        display bitmap            │ focus       │
//! │        (half-blocks)             │ magnifier   │
//! │                                  │ keys        │
//! ├──────────────────────────────────┴─────────────┤
//! │ status bar                                     │
//! └────────────────────────────────────────────────┘
//! ```

use crate::app::event_loop::EventLoop;
use crate::app::{AppModel, CAPTURING_TEXT, Message, PointerButton, Severity};
use crate::backends::camera::Resolution;
use crate::config::AppTheme;
use crate::constants::{PREVIEW_RESOLUTIONS, display};
use crate::pipelines::geometry::Point;
use crate::session::SessionState;

use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use image::RgbImage;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};
use std::cell::Cell;
use std::io::{self, stdout};
use std::rc::Rc;
use std::time::Instant;
use tracing::info;

/// Width of the side panel in cells
const PANEL_WIDTH: u16 = 34;

/// Lens slider steps for `[`/`]` and `{`/`}`
const LENS_STEP: i32 = 10;
const LENS_STEP_LARGE: i32 = 100;

/// Run the terminal UI around an initialised model
///
/// The caller owns the tokio runtime; this future must be driven on a
/// current-thread runtime.
pub async fn run(model: &mut AppModel) -> Result<(), Box<dyn std::error::Error>> {
    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, model).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result.map_err(Into::into)
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: &mut AppModel,
) -> io::Result<()> {
    let layout = Rc::new(Cell::new(FrameLayout::default()));

    let input_layout = Rc::clone(&layout);
    let inputs = EventStream::new()
        .filter_map(move |event| {
            let message = match event {
                Ok(Event::Key(key)) => map_key(key),
                Ok(Event::Mouse(mouse)) => map_mouse(mouse, input_layout.get()),
                _ => None,
            };
            futures::future::ready(message)
        })
        .boxed_local();

    info!("Terminal UI started");
    let mut event_loop = EventLoop::new();
    event_loop
        .run(model, inputs, |model| {
            terminal.draw(|f| {
                let area = f.area();
                let frame_layout = draw(f.buffer_mut(), area, model);
                layout.set(frame_layout);
            })?;
            Ok(())
        })
        .await
}

/// Map a key press to a command
pub fn map_key(key: KeyEvent) -> Option<Message> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return (key.code == KeyCode::Char('c')).then_some(Message::Quit);
    }

    let message = match key.code {
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            if index >= PREVIEW_RESOLUTIONS.len() {
                return None;
            }
            Message::SelectPreviewResolution(index)
        }
        KeyCode::Char('s') => Message::CycleStillResolution,
        KeyCode::Char('f') => Message::CycleStillFormat,
        KeyCode::Char('c') | KeyCode::Char(' ') => Message::Capture,
        KeyCode::Char('v') => Message::ToggleRecording,
        KeyCode::Char('a') | KeyCode::Enter => Message::ApplyCrop,
        KeyCode::Char('x') | KeyCode::Backspace => Message::ClearCrop,
        KeyCode::Char('m') => Message::ToggleMagnifier,
        KeyCode::Char('o') => Message::CycleFocusMode,
        KeyCode::Char('t') => Message::TriggerAutofocus,
        KeyCode::Char('[') => Message::AdjustLensSlider(-LENS_STEP),
        KeyCode::Char(']') => Message::AdjustLensSlider(LENS_STEP),
        KeyCode::Char('{') => Message::AdjustLensSlider(-LENS_STEP_LARGE),
        KeyCode::Char('}') => Message::AdjustLensSlider(LENS_STEP_LARGE),
        KeyCode::Char('l') | KeyCode::Left => Message::Rotate(-90),
        KeyCode::Char('r') | KeyCode::Right => Message::Rotate(90),
        KeyCode::Char('p') => Message::TogglePause,
        KeyCode::Char('n') => Message::ToggleTheme,
        KeyCode::Char('q') | KeyCode::Esc => Message::Quit,
        _ => return None,
    };
    Some(message)
}

/// Map a mouse event over the preview to a pointer command in display space
pub fn map_mouse(mouse: MouseEvent, layout: FrameLayout) -> Option<Message> {
    let point = layout.to_display(mouse.column, mouse.row, display::SURFACE)?;
    match mouse.kind {
        MouseEventKind::Down(button) => {
            if !layout.contains(mouse.column, mouse.row) {
                return None;
            }
            let button = match button {
                MouseButton::Left => PointerButton::Primary,
                MouseButton::Right => PointerButton::Secondary,
                MouseButton::Middle => PointerButton::Middle,
            };
            Some(Message::PointerPressed(point, button))
        }
        MouseEventKind::Drag(_) | MouseEventKind::Moved => Some(Message::PointerMoved(point)),
        MouseEventKind::Up(_) => Some(Message::PointerReleased(point)),
        _ => None,
    }
}

/// Where the display bitmap landed on the terminal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLayout {
    pub x: u16,
    pub y: u16,
    /// Width in cells
    pub width: u16,
    /// Height in cells; each cell shows two pixel rows
    pub height: u16,
}

impl FrameLayout {
    /// Fit a bitmap of `size` into `area` keeping its aspect ratio
    pub fn fit(area: Rect, size: Resolution) -> Self {
        if area.width == 0 || area.height == 0 || size.width == 0 || size.height == 0 {
            return Self::default();
        }
        let frame_aspect = size.width as f64 / size.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height as f64) * 2.0;

        let (width, height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let w = term_height * frame_aspect;
            (w as u16, area.height)
        } else {
            // Terminal is taller - fit to width
            let h = term_width / frame_aspect;
            (area.width, (h / 2.0) as u16)
        };

        Self {
            x: area.x + area.width.saturating_sub(width) / 2,
            y: area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        }
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.x
            && row >= self.y
            && column < self.x + self.width
            && row < self.y + self.height
    }

    /// Display-space point under a cell; may lie outside the surface
    pub fn to_display(&self, column: u16, row: u16, surface: Resolution) -> Option<Point> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let cx = column as f64 - self.x as f64 + 0.5;
        let cy = (row as f64 - self.y as f64) * 2.0 + 1.0;
        let x = cx * surface.width as f64 / self.width as f64;
        let y = cy * surface.height as f64 / (self.height as f64 * 2.0);
        Some(Point::new(x.floor() as i32, y.floor() as i32))
    }
}

struct Palette {
    fg: Color,
    bg: Color,
    accent: Color,
    muted: Color,
}

impl Palette {
    fn for_theme(theme: AppTheme) -> Self {
        match theme {
            AppTheme::Dark => Self {
                fg: Color::White,
                bg: Color::Black,
                accent: Color::LightBlue,
                muted: Color::DarkGray,
            },
            AppTheme::Light => Self {
                fg: Color::Black,
                bg: Color::White,
                accent: Color::Blue,
                muted: Color::Gray,
            },
        }
    }
}

/// Draw the whole screen; returns where the bitmap was placed
fn draw(buf: &mut Buffer, area: Rect, model: &AppModel) -> FrameLayout {
    let palette = Palette::for_theme(model.ui.theme);
    let base = Style::default().fg(palette.fg).bg(palette.bg);
    buf.set_style(area, base);

    let panel_width = PANEL_WIDTH.min(area.width / 2);
    let body_height = area.height.saturating_sub(1);
    let preview_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width.saturating_sub(panel_width),
        height: body_height,
    };
    let panel_area = Rect {
        x: area.x + preview_area.width,
        y: area.y,
        width: panel_width,
        height: body_height,
    };
    let status_area = Rect {
        x: area.x,
        y: area.y + body_height,
        width: area.width,
        height: area.height.min(1),
    };

    let layout = FrameLayout::fit(preview_area, display::SURFACE);
    match model.frame() {
        Some(frame) => draw_bitmap(buf, layout, &frame.bitmap),
        None => {
            let msg = match model.session_state() {
                SessionState::Idle if !model.camera_available() => "Camera unavailable",
                SessionState::Idle => "Camera stopped",
                _ => "Waiting for camera...",
            };
            draw_centered(buf, preview_area, msg, base);
        }
    }
    if model.ui.capturing {
        draw_centered(
            buf,
            preview_area,
            CAPTURING_TEXT,
            Style::default().fg(Color::White).bg(Color::Red),
        );
    }

    draw_panel(buf, panel_area, model, &palette);
    StatusBar {
        message: model.ui.status_text(Instant::now()),
        severity: model.ui.status.as_ref().map(|s| s.severity),
        palette: &palette,
    }
    .render(status_area, buf);

    layout
}

/// Render `image` into `layout` using half-block characters
///
/// Each terminal cell represents 2 vertical pixels:
/// - Upper half (▀) colored with fg
/// - Lower half colored with bg
fn draw_bitmap(buf: &mut Buffer, layout: FrameLayout, image: &RgbImage) {
    if layout.width == 0 || layout.height == 0 || image.width() == 0 || image.height() == 0 {
        return;
    }
    let x_scale = image.width() as f64 / layout.width as f64;
    let y_scale = image.height() as f64 / (layout.height as f64 * 2.0);

    for ty in 0..layout.height {
        for tx in 0..layout.width {
            let src_x = ((tx as f64 * x_scale) as u32).min(image.width() - 1);
            let src_y_top = ((ty as f64 * 2.0 * y_scale) as u32).min(image.height() - 1);
            let src_y_bottom = (((ty as f64 * 2.0 + 1.0) * y_scale) as u32).min(image.height() - 1);

            let top = image.get_pixel(src_x, src_y_top).0;
            let bottom = image.get_pixel(src_x, src_y_bottom).0;

            if let Some(cell) = buf.cell_mut((layout.x + tx, layout.y + ty)) {
                cell.set_char('▀');
                cell.set_fg(Color::Rgb(top[0], top[1], top[2]));
                cell.set_bg(Color::Rgb(bottom[0], bottom[1], bottom[2]));
            }
        }
    }
}

fn draw_centered(buf: &mut Buffer, area: Rect, text: &str, style: Style) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let len = text.chars().count() as u16;
    let x = area.x + area.width.saturating_sub(len) / 2;
    let y = area.y + area.height / 2;
    buf.set_stringn(x, y, text, area.width as usize, style);
}

fn draw_panel(buf: &mut Buffer, area: Rect, model: &AppModel, palette: &Palette) {
    if area.width < 4 || area.height == 0 {
        return;
    }
    let ui = &model.ui;
    let text = Style::default().fg(palette.fg).bg(palette.bg);
    let heading = Style::default().fg(palette.accent).bg(palette.bg);
    let muted = Style::default().fg(palette.muted).bg(palette.bg);

    let mut lines: Vec<(String, Style)> = vec![
        ("Camera".to_string(), heading),
        (format!(" State    {}", model.session_state()), text),
        (format!(" Preview  {}", ui.preview_resolution()), text),
        (format!(" Still    {}", ui.still_resolution()), text),
        (format!(" Format   {}", ui.still_format.display_name()), text),
        (format!(" Rotation {}", ui.rotation), text),
        (
            format!(" Crop     {}", if ui.region.applied().is_some() { "applied" } else { "none" }),
            text,
        ),
        (
            format!(" Preview  {}", if ui.paused { "paused" } else { "live" }),
            text,
        ),
        (String::new(), text),
        ("Focus".to_string(), heading),
        (format!(" {}", ui.focus.mode.display_name()), text),
    ];
    if ui.focus.shows_af_trigger() {
        lines.push((" [t] trigger autofocus".to_string(), text));
    }
    if ui.focus.shows_slider() {
        lines.push((
            format!(
                " Lens {:>4}/1000  {}",
                ui.focus.slider,
                ui.focus.distance_label()
            ),
            text,
        ));
    }
    lines.push((String::new(), text));
    lines.push(("Keys".to_string(), heading));
    for help in [
        " 1-3 preview  s still res  f format",
        " c capture  v record  p pause",
        " a apply crop  x clear  m magnifier",
        " o focus  t AF  [ ] { } lens",
        " l/r rotate  n day/night  q quit",
    ] {
        lines.push((help.to_string(), muted));
    }
    lines.push((
        format!(" theme: {}", ui.theme.toggle_label()),
        muted,
    ));

    let mut y = area.y;
    for (line, style) in &lines {
        if y >= area.y + area.height {
            return;
        }
        buf.set_stringn(area.x + 1, y, line, area.width as usize - 1, *style);
        y += 1;
    }

    // Magnifier view below the text
    if let Some(magnifier) = model.frame().and_then(|f| f.magnifier.as_ref()) {
        y += 1;
        if y >= area.y + area.height {
            return;
        }
        buf.set_stringn(area.x + 1, y, "Magnifier", area.width as usize - 1, heading);
        let mag_area = Rect {
            x: area.x + 1,
            y: y + 1,
            width: area.width - 2,
            height: (area.y + area.height).saturating_sub(y + 1),
        };
        let size = Resolution::new(magnifier.width(), magnifier.height());
        draw_bitmap(buf, FrameLayout::fit(mag_area, size), magnifier);
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    severity: Option<Severity>,
    palette: &'a Palette,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let (fg, bg) = match self.severity {
            Some(Severity::Blocking) | Some(Severity::Error) => (Color::White, Color::Red),
            Some(Severity::Warning) => (Color::Black, Color::Yellow),
            _ => (self.palette.fg, self.palette.muted),
        };
        let style = Style::default().fg(fg).bg(bg);

        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_style(style);
            }
        }

        buf.set_stringn(area.x, area.y, self.message, area.width as usize, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_map() {
        assert_eq!(
            map_key(press(KeyCode::Char('2'))),
            Some(Message::SelectPreviewResolution(1))
        );
        assert_eq!(map_key(press(KeyCode::Char('9'))), None);
        assert_eq!(map_key(press(KeyCode::Char('v'))), Some(Message::ToggleRecording));
        assert_eq!(map_key(press(KeyCode::Right)), Some(Message::Rotate(90)));
        assert_eq!(
            map_key(press(KeyCode::Char('['))),
            Some(Message::AdjustLensSlider(-LENS_STEP))
        );
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Message::Quit)
        );
        assert_eq!(map_key(press(KeyCode::Char('c'))), Some(Message::Capture));
    }

    #[test]
    fn test_layout_keeps_aspect_ratio() {
        // 100x30 cells = 100x60 half-block pixels; 4:3 fits to height
        let layout = FrameLayout::fit(Rect::new(0, 0, 100, 30), display::SURFACE);
        assert_eq!(layout.height, 30);
        assert_eq!(layout.width, 80);
        assert_eq!(layout.x, 10);
        assert_eq!(layout.y, 0);
    }

    #[test]
    fn test_cells_map_to_display_space() {
        let layout = FrameLayout {
            x: 10,
            y: 0,
            width: 80,
            height: 30,
        };
        let surface = display::SURFACE;

        assert_eq!(layout.to_display(10, 0, surface), Some(Point::new(5, 10)));
        assert_eq!(layout.to_display(89, 29, surface), Some(Point::new(795, 590)));
        // Left of the bitmap maps outside the surface
        let outside = layout.to_display(0, 0, surface).unwrap();
        assert!(outside.x < 0);
    }

    #[test]
    fn test_press_outside_bitmap_is_ignored() {
        let layout = FrameLayout {
            x: 10,
            y: 0,
            width: 80,
            height: 30,
        };
        let mouse = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 2,
            row: 5,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(map_mouse(mouse, layout), None);

        let inside = MouseEvent { column: 50, ..mouse };
        assert!(matches!(
            map_mouse(inside, layout),
            Some(Message::PointerPressed(_, PointerButton::Primary))
        ));
    }
}
