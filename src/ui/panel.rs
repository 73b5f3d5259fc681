//! Panel - a bordered, optionally scrollable content area.
//!
//! A panel shows either text (split into lines, scrolled and padded to the
//! content region) or an opaque raster blob written at the content origin.
//!
//! # Redraw rules
//!
//! `draw()` compares the current state against the panel's draw cache:
//!
//! | Change since last draw | Work done                                      |
//! |------------------------|------------------------------------------------|
//! | content value          | rebuild every row, scroll reset to the origin  |
//! | horizontal scroll      | rebuild every row                              |
//! | vertical scroll only   | reuse cached rows that shifted, build the rest |
//! | nothing                | no terminal writes                             |
//!
//! The border and title are written once per panel instance. A new
//! geometry means a new panel.

use std::io;

use bitflags::bitflags;
use tracing::debug;

use super::geometry::{GeometryError, Rect};
use super::style::{paint, PanelStyle};
use super::surface::{DrawLock, Surface};
use super::text::{display_width, fit_to_width, slice_columns};

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct PanelFlags: u8 {
        /// Draw a box-drawing border (and title)
        const OUTLINE    = 0b0001;
        /// Reserve a gutter column for a scrollbar
        const SCROLLBAR  = 0b0010;
        /// Allow scroll offsets other than the origin
        const SCROLLABLE = 0b0100;
        /// Content is a raster blob, not text
        const IMAGE      = 0b1000;
    }
}

/// Construction options for a [`Panel`]
#[derive(Debug, Clone)]
pub struct PanelOptions {
    pub rect: Rect,
    /// Title shown centered in the top border (may be styled)
    pub title: Option<String>,
    pub flags: PanelFlags,
    pub padding_x: u16,
    pub padding_y: u16,
    pub style: PanelStyle,
}

impl PanelOptions {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            title: None,
            flags: PanelFlags::empty(),
            padding_x: 0,
            padding_y: 0,
            style: PanelStyle::default(),
        }
    }
}

/// Inclusive span of scrollbar rows that make up the thumb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollThumb {
    pub top: usize,
    pub bottom: usize,
}

impl ScrollThumb {
    pub fn contains(&self, row: usize) -> bool {
        self.top <= row && row <= self.bottom
    }
}

/// Place the scrollbar thumb on a track of `track + 1` rows.
///
/// Only the first `content_height` rows of the track are drawn, so the
/// thumb never extends past them. It covers every drawn row when
/// everything fits on one page.
pub fn scrollbar_thumb(
    track: usize,
    content_height: usize,
    total_lines: usize,
    scroll_y: usize,
) -> ScrollThumb {
    let last = track.min(content_height.saturating_sub(1));
    if content_height == 0 || total_lines <= content_height {
        return ScrollThumb {
            top: 0,
            bottom: last,
        };
    }

    let bin_size = total_lines as f64 / content_height as f64;
    let scalar = track as f64 / content_height as f64;
    let top = ((scroll_y as f64 * scalar) / bin_size).round() as usize;
    let length = (content_height as f64 * scalar) / bin_size;

    let top = top.min(last);
    let bottom = ((top as f64 + length) as usize).clamp(top, last);
    ScrollThumb { top, bottom }
}

/// Snapshot of what the last `draw()` put on screen
#[derive(Debug, Default)]
struct DrawCache {
    content: String,
    buffer: Vec<String>,
    scroll_x: i32,
    scroll_y: i32,
    outline_drawn: bool,
    /// Rows taken from `buffer` by the last vertical scroll
    reused_rows: usize,
}

/// Bordered content panel
pub struct Panel {
    rect: Rect,
    title: Option<String>,
    flags: PanelFlags,
    style: PanelStyle,

    border: u16,
    content_left: u16,
    content_top: u16,
    content_width: usize,
    content_height: usize,

    content: String,
    lines: Vec<String>,
    widest_line: usize,
    scroll_x: i32,
    scroll_y: i32,

    cache: DrawCache,
}

impl Panel {
    /// Create a panel, computing its content region once.
    ///
    /// Fails when borders, padding and the scrollbar gutter leave no room
    /// for content.
    pub fn new(options: PanelOptions) -> Result<Self, GeometryError> {
        let PanelOptions {
            rect,
            title,
            flags,
            padding_x,
            padding_y,
            style,
        } = options;

        let border: u16 = if flags.contains(PanelFlags::OUTLINE) { 1 } else { 0 };
        let gutter: i32 = if flags.contains(PanelFlags::SCROLLBAR) { 1 } else { 0 };

        let width = rect.width() as i32 - 2 * border as i32 - 2 * padding_x as i32 - gutter;
        let height = rect.height() as i32 - 2 * border as i32 - 2 * padding_y as i32;
        if width < 1 || height < 1 {
            return Err(GeometryError::DegenerateContent { width, height });
        }

        Ok(Self {
            rect,
            title,
            flags,
            style,
            border,
            content_left: rect.left + border + padding_x,
            content_top: rect.top + border + padding_y,
            content_width: width as usize,
            content_height: height as usize,
            content: String::new(),
            lines: Vec::new(),
            widest_line: 0,
            scroll_x: 0,
            scroll_y: 0,
            cache: DrawCache::default(),
        })
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn content_width(&self) -> usize {
        self.content_width
    }

    pub fn content_height(&self) -> usize {
        self.content_height
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn scroll_x(&self) -> i32 {
        self.scroll_x
    }

    pub fn scroll_y(&self) -> i32 {
        self.scroll_y
    }

    /// Replace the content. Takes effect on the next `draw()`.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        if self.flags.contains(PanelFlags::IMAGE) {
            self.lines.clear();
            self.widest_line = 0;
        } else {
            self.lines = self
                .content
                .split('\n')
                .map(|line| line.trim_end_matches('\r').to_string())
                .collect();
            self.widest_line = self.lines.iter().map(|l| display_width(l)).max().unwrap_or(0);
        }
        // Keep offsets valid for the new line count until draw() resets them
        self.scroll_x = self.scroll_x.clamp(0, self.max_scroll_x());
        self.scroll_y = self.scroll_y.clamp(0, self.max_scroll_y());
    }

    fn max_scroll_x(&self) -> i32 {
        if !self.flags.contains(PanelFlags::SCROLLABLE) {
            return 0;
        }
        self.widest_line.saturating_sub(self.content_width) as i32
    }

    fn max_scroll_y(&self) -> i32 {
        if !self.flags.contains(PanelFlags::SCROLLABLE) {
            return 0;
        }
        self.lines.len().saturating_sub(self.content_height) as i32
    }

    pub fn set_scroll_x(&mut self, x: i32) {
        self.scroll_x = x.clamp(0, self.max_scroll_x());
    }

    pub fn move_scroll_x(&mut self, delta: i32) {
        self.set_scroll_x(self.scroll_x.saturating_add(delta));
    }

    pub fn set_scroll_y(&mut self, y: i32) {
        self.scroll_y = y.clamp(0, self.max_scroll_y());
    }

    pub fn move_scroll_y(&mut self, delta: i32) {
        self.set_scroll_y(self.scroll_y.saturating_add(delta));
    }

    /// Content line `index` fitted to one row, blank when out of range
    fn display_row(&self, index: i64) -> String {
        let line = usize::try_from(index)
            .ok()
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
            .unwrap_or("");
        fit_to_width(line, self.scroll_x as usize, self.content_width)
    }

    fn build_rows(&self) -> Vec<String> {
        (0..self.content_height)
            .map(|i| self.display_row(i as i64 + self.scroll_y as i64))
            .collect()
    }

    /// Work out the rows to put on screen, or `None` when nothing changed
    fn plan_redraw(&mut self) -> Option<Vec<String>> {
        if self.content != self.cache.content {
            self.scroll_x = 0;
            self.scroll_y = 0;
            self.cache.content.clone_from(&self.content);
            return Some(self.build_rows());
        }

        if self.scroll_x != self.cache.scroll_x {
            return Some(self.build_rows());
        }

        if self.scroll_y != self.cache.scroll_y {
            let shift = self.scroll_y as i64 - self.cache.scroll_y as i64;
            let previous = &self.cache.buffer;
            let mut reused = 0;
            let rows: Vec<String> = (0..self.content_height)
                .map(|i| {
                    let prev_index = i as i64 + shift;
                    match usize::try_from(prev_index).ok().and_then(|p| previous.get(p)) {
                        Some(row) => {
                            reused += 1;
                            row.clone()
                        }
                        None => self.display_row(i as i64 + self.scroll_y as i64),
                    }
                })
                .collect();
            self.cache.reused_rows = reused;
            debug!(shift, reused, "panel scrolled");
            return Some(rows);
        }

        None
    }

    /// Render the panel. Writes nothing when neither content nor scroll
    /// position changed since the previous call.
    pub async fn draw(&mut self, lock: &DrawLock) -> io::Result<()> {
        let mut surface = lock.lock().await;

        if self.flags.contains(PanelFlags::OUTLINE) && !self.cache.outline_drawn {
            self.draw_outline(&mut surface)?;
            self.cache.outline_drawn = true;
        }

        if let Some(rows) = self.plan_redraw() {
            if self.flags.contains(PanelFlags::IMAGE) {
                surface.move_cursor_to(self.content_left, self.content_top)?;
                surface.write_raw(&self.content)?;
            } else {
                for (i, row) in rows.iter().enumerate() {
                    surface.move_cursor_to(self.content_left, self.content_top + i as u16)?;
                    surface.write_raw(row)?;
                }
            }

            if self.flags.contains(PanelFlags::SCROLLBAR) {
                self.draw_scrollbar(&mut surface)?;
            }

            self.cache.buffer = rows;
            self.cache.scroll_x = self.scroll_x;
            self.cache.scroll_y = self.scroll_y;
        }

        surface.flush()
    }

    fn draw_outline(&self, surface: &mut Surface) -> io::Result<()> {
        let Rect {
            top,
            left,
            bottom,
            right,
        } = self.rect;
        let width = self.rect.width() as usize;
        let rule = "─".repeat(width.saturating_sub(2));
        let outline = self.style.outline;

        surface.move_cursor_to(left, top)?;
        surface.write_raw(&paint(outline, &format!("┌{}┐", rule)))?;

        if let Some(title) = &self.title {
            let title = slice_columns(title, 0, width.saturating_sub(4));
            let padding = ((width as i32 - display_width(&title) as i32) / 2 - 2).max(1);
            surface.move_cursor_to(left + padding as u16, top)?;
            surface.write_raw(&format!(" {} ", title))?;
        }

        let side = paint(outline, "│");
        for y in top + 1..bottom {
            surface.move_cursor_to(left, y)?;
            surface.write_raw(&side)?;
            surface.move_cursor_to(right, y)?;
            surface.write_raw(&side)?;
        }

        surface.move_cursor_to(left, bottom)?;
        surface.write_raw(&paint(outline, &format!("└{}┘", rule)))?;
        Ok(())
    }

    fn draw_scrollbar(&self, surface: &mut Surface) -> io::Result<()> {
        let track = self.rect.height().saturating_sub(2) as usize;
        let thumb = scrollbar_thumb(
            track,
            self.content_height,
            self.lines.len(),
            self.scroll_y.max(0) as usize,
        );
        let col = self.rect.right - self.border;
        for i in 0..self.content_height {
            surface.move_cursor_to(col, self.content_top + i as u16)?;
            if thumb.contains(i) {
                surface.write_raw(&self.style.scrollbar_fg)?;
            } else {
                surface.write_raw(&self.style.scrollbar_bg)?;
            }
        }
        Ok(())
    }
}
