//! Menu bar - a single centered row of labeled items.
//!
//! Items are joined by a fill glyph and centered in the bar. A selectable
//! bar highlights the selected item; every other item gets its first
//! matching action key highlighted.

use std::io;

use super::geometry::Rect;
use super::style::{paint, MenuBarStyle};
use super::surface::DrawLock;
use super::text::{display_width, slice_columns};

/// Construction options for a [`MenuBar`]
#[derive(Debug, Clone)]
pub struct MenuBarOptions {
    /// Always one row tall
    pub rect: Rect,
    pub items: Vec<String>,
    /// Number of fill glyphs between items
    pub spacing: usize,
    pub selectable: bool,
    /// Substrings to highlight, tried in order
    pub action_keys: Vec<String>,
    pub style: MenuBarStyle,
}

impl MenuBarOptions {
    pub fn new(rect: Rect, items: Vec<String>) -> Self {
        Self {
            rect,
            items,
            spacing: 1,
            selectable: false,
            action_keys: Vec::new(),
            style: MenuBarStyle::default(),
        }
    }
}

/// Left padding that centers `content_width` columns in `width`
pub fn left_padding(width: usize, content_width: usize) -> usize {
    width.saturating_sub(content_width) / 2
}

/// Horizontal menu bar
pub struct MenuBar {
    rect: Rect,
    items: Vec<String>,
    spacing: usize,
    selectable: bool,
    action_keys: Vec<String>,
    style: MenuBarStyle,
    selected: usize,
    background_drawn: bool,
}

impl MenuBar {
    pub fn new(options: MenuBarOptions) -> Self {
        let MenuBarOptions {
            rect,
            items,
            spacing,
            selectable,
            action_keys,
            style,
        } = options;
        Self {
            // One row, whatever bottom the caller passed
            rect: Rect { bottom: rect.top, ..rect },
            items,
            spacing,
            selectable,
            action_keys,
            style,
            selected: 0,
            background_drawn: false,
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Select item `index`. Out-of-range indices are ignored.
    pub fn set_selected_index(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.selected = index;
        true
    }

    /// Move the selection by `delta`, only if it stays on an item
    pub fn move_selected_index(&mut self, delta: isize) -> bool {
        match self.selected.checked_add_signed(delta) {
            Some(index) if index < self.items.len() => {
                self.selected = index;
                true
            }
            _ => false,
        }
    }

    fn render_item(&self, index: usize, label: &str) -> String {
        if self.selectable && index == self.selected {
            return paint(self.style.selected, label);
        }
        self.action_keys
            .iter()
            .filter(|key| !key.is_empty())
            .find(|key| label.contains(key.as_str()))
            .map(|key| label.replacen(key.as_str(), &paint(self.style.action_key, key), 1))
            .unwrap_or_else(|| label.to_string())
    }

    /// The styled row content, before centering
    pub fn render_content(&self) -> String {
        let separator = self.style.fill.repeat(self.spacing);
        self.items
            .iter()
            .enumerate()
            .map(|(i, label)| self.render_item(i, label))
            .collect::<Vec<_>>()
            .join(&separator)
    }

    /// Render the bar. The fill on either side of the content is written
    /// on the first draw only.
    pub async fn draw(&mut self, lock: &DrawLock) -> io::Result<()> {
        let width = self.rect.width() as usize;
        let mut content = self.render_content();
        if display_width(&content) > width {
            content = slice_columns(&content, 0, width);
        }
        let content_width = display_width(&content);
        let padding = left_padding(width, content_width);
        let left = self.rect.left;
        let top = self.rect.top;

        let mut surface = lock.lock().await;
        surface.move_cursor_to(left + padding as u16, top)?;
        surface.write_raw(&content)?;

        if !self.background_drawn {
            surface.move_cursor_to(left, top)?;
            surface.write_raw(&self.style.fill.repeat(padding))?;
            surface.move_cursor_to(left + (padding + content_width) as u16, top)?;
            surface.write_raw(&self.style.fill.repeat(width - padding - content_width))?;
            self.background_drawn = true;
        }

        surface.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::surface::Surface;
    use crossterm::style::{ContentStyle, Stylize};

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn day_menu(width: u16) -> MenuBar {
        let rect = Rect::row(0, 0, width - 1).unwrap();
        MenuBar::new(MenuBarOptions {
            spacing: 2,
            selectable: true,
            action_keys: labels(&["1", "2", "3", "4"]),
            style: MenuBarStyle {
                fill: "-".to_string(),
                ..MenuBarStyle::default()
            },
            ..MenuBarOptions::new(rect, labels(&["day 1", "day 2", "day 3"]))
        })
    }

    #[test]
    fn test_left_padding() {
        assert_eq!(left_padding(40, 10), 15);
        assert_eq!(left_padding(41, 10), 15);
        assert_eq!(left_padding(10, 40), 0);
    }

    #[test]
    fn test_move_selection_bounds() {
        let mut menu = day_menu(40);
        assert!(!menu.move_selected_index(-1));
        assert_eq!(menu.selected_index(), 0);
        assert!(menu.move_selected_index(2));
        assert_eq!(menu.selected_index(), 2);
        assert!(!menu.move_selected_index(1));
        assert_eq!(menu.selected_index(), 2);
        assert!(menu.move_selected_index(-2));
        assert_eq!(menu.selected_index(), 0);
    }

    #[test]
    fn test_set_selection_out_of_range_ignored() {
        let mut menu = day_menu(40);
        assert!(menu.set_selected_index(1));
        assert!(!menu.set_selected_index(3));
        assert_eq!(menu.selected_index(), 1);
    }

    #[test]
    fn test_selected_item_styled_whole() {
        let menu = day_menu(40);
        let style = MenuBarStyle::default();
        let content = menu.render_content();
        assert!(content.starts_with(&paint(style.selected, "day 1")));
        assert!(content.contains(&format!("day {}", paint(style.action_key, "2"))));
        assert_eq!(display_width(&content), 19);
    }

    #[test]
    fn test_only_first_action_key_highlighted() {
        let rect = Rect::row(0, 0, 39).unwrap();
        let accent = ContentStyle::new().red();
        let menu = MenuBar::new(MenuBarOptions {
            action_keys: labels(&["o", "q"]),
            ..MenuBarOptions::new(rect, labels(&["quit", "outlook"]))
        });
        let content = menu.render_content();
        // "quit" has no "o", so "q" wins; "outlook" only gets its first "o"
        assert!(content.starts_with(&format!("{}uit", paint(accent, "q"))));
        assert!(content.ends_with(&format!("{}utlook", paint(accent, "o"))));
    }

    #[tokio::test]
    async fn test_draw_centers_and_fills_once() {
        let (lock, buffer) = Surface::capture();
        let rect = Rect::row(5, 0, 39).unwrap();
        let mut menu = MenuBar::new(MenuBarOptions {
            style: MenuBarStyle {
                fill: "-".to_string(),
                ..MenuBarStyle::default()
            },
            ..MenuBarOptions::new(rect, labels(&["abcd", "efgh"]))
        });

        menu.draw(&lock).await.unwrap();
        // "abcd-efgh" is 9 wide: 15 columns of fill on the left, 16 on the right
        let out = buffer.contents();
        assert!(out.starts_with("\x1b[6;16Habcd-efgh"));
        assert!(out.contains(&format!("\x1b[6;1H{}", "-".repeat(15))));
        assert!(out.ends_with(&format!("\x1b[6;25H{}", "-".repeat(16))));

        buffer.reset();
        menu.draw(&lock).await.unwrap();
        assert_eq!(buffer.contents(), "\x1b[6;16Habcd-efgh");
    }

    #[tokio::test]
    async fn test_selection_change_needs_draw() {
        let (lock, buffer) = Surface::capture();
        let mut menu = day_menu(40);
        menu.draw(&lock).await.unwrap();
        let written = buffer.len();

        menu.set_selected_index(2);
        assert_eq!(buffer.len(), written);
        menu.draw(&lock).await.unwrap();
        let style = MenuBarStyle::default();
        assert!(buffer.contents()[written..].contains(&paint(style.selected, "day 3")));
    }

    #[test]
    fn test_single_row() {
        let rect = Rect::new(3, 0, 9, 19).unwrap();
        let menu = MenuBar::new(MenuBarOptions::new(rect, Vec::new()));
        assert_eq!(menu.rect.height(), 1);
        assert_eq!(menu.render_content(), "");
    }
}
