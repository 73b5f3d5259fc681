//! Style bundles for the widgets.
//!
//! Each widget takes one explicit style struct. `Default` gives the stock
//! look; callers override individual fields with struct update syntax:
//!
//! ```ignore
//! let style = PanelStyle {
//!     outline: ContentStyle::new().blue(),
//!     ..PanelStyle::default()
//! };
//! ```

use crossterm::style::{Color, ContentStyle, Stylize};

/// Apply a style to text, producing an ANSI-styled string
pub fn paint(style: ContentStyle, text: &str) -> String {
    style.apply(text).to_string()
}

/// Parse a color name ("red", "dark_grey", ...) or `#rrggbb`
pub fn parse_color(name: &str) -> Option<Color> {
    let name = name.trim();
    if let Some(hex) = name.strip_prefix('#') {
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return Some(Color::Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        });
    }
    Color::try_from(name).ok()
}

/// Panel style bundle
#[derive(Debug, Clone)]
pub struct PanelStyle {
    /// Style of the box-drawing border
    pub outline: ContentStyle,
    /// Pre-styled glyph for rows inside the scrollbar thumb
    pub scrollbar_fg: String,
    /// Pre-styled glyph for the rest of the scrollbar track
    pub scrollbar_bg: String,
}

impl Default for PanelStyle {
    fn default() -> Self {
        Self {
            outline: ContentStyle::new().grey(),
            scrollbar_fg: paint(ContentStyle::new().on_white(), " "),
            scrollbar_bg: paint(ContentStyle::new().on_grey(), " "),
        }
    }
}

/// Menu bar style bundle
#[derive(Debug, Clone)]
pub struct MenuBarStyle {
    /// Pre-styled fill glyph used between items and around the content
    pub fill: String,
    /// Applied to the whole label of the selected item
    pub selected: ContentStyle,
    /// Applied to the action key inside unselected labels
    pub action_key: ContentStyle,
}

impl Default for MenuBarStyle {
    fn default() -> Self {
        Self {
            fill: " ".to_string(),
            selected: ContentStyle::new().black().on_white(),
            action_key: ContentStyle::new().red(),
        }
    }
}
