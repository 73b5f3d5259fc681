//! Configuration and theme management for spcview.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.spcview/config.toml`
//! - Conversion of the configured colors into widget style bundles
//!
//! # Configuration File
//!
//! Every field is optional:
//!
//! ```toml
//! spc_url = "https://www.spc.noaa.gov"
//! log_level = "info"
//! # auto: inline images on iTerm2/WezTerm, half blocks elsewhere
//! image_mode = "auto"        # auto, inline, blocks, off
//!
//! [layout]
//! forecast_width = 76
//! menu_spacing = 2
//!
//! [style]
//! forecast_outline = "blue"
//! outlook_outline = "green"
//! accent = "red"
//! menu_fill = "─"
//! menu_fill_color = "grey"
//! scrollbar_thumb = "grey"
//! ```
//!
//! Colors are crossterm color names (`red`, `dark_grey`, ...) or `#rrggbb`.
//! Unknown names fall back to the default for that field.

use std::fs;
use std::path::PathBuf;

use crossterm::style::{Color, ContentStyle, Stylize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::image::terminal_supports_inline_images;
use crate::source::spc::DEFAULT_SPC_URL;
use crate::source::MapDisplay;
use crate::ui::style::{paint, parse_color};
use crate::ui::{MenuBarStyle, PanelStyle};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the SPC website
    pub spc_url: String,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// How the outlook map is shown
    pub image_mode: ImageMode,
    pub layout: LayoutConfig,
    pub style: StyleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spc_url: DEFAULT_SPC_URL.to_string(),
            log_level: "info".to_string(),
            image_mode: ImageMode::Auto,
            layout: LayoutConfig::default(),
            style: StyleConfig::default(),
        }
    }
}

/// Outlook map display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// Inline images when the terminal is known to support them,
    /// half blocks otherwise
    Auto,
    /// Always emit inline images
    Inline,
    /// Always draw half-block cells
    Blocks,
    /// Never fetch images; show the map URL instead
    Off,
}

impl ImageMode {
    /// Resolve against the host terminal (`TERM_PROGRAM`)
    pub fn display(self, term_program: Option<&str>) -> MapDisplay {
        match self {
            ImageMode::Auto if terminal_supports_inline_images(term_program) => MapDisplay::Inline,
            ImageMode::Auto | ImageMode::Blocks => MapDisplay::Blocks,
            ImageMode::Inline => MapDisplay::Inline,
            ImageMode::Off => MapDisplay::Off,
        }
    }
}

/// Layout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Columns given to the forecast panel when both panels are shown
    pub forecast_width: u16,
    /// Fill glyphs between menu items
    pub menu_spacing: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            forecast_width: 76,
            menu_spacing: 2,
        }
    }
}

/// Color settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub forecast_outline: String,
    pub outlook_outline: String,
    /// Action key highlight
    pub accent: String,
    /// Menu bar fill glyph
    pub menu_fill: String,
    pub menu_fill_color: String,
    /// Background of the scrollbar thumb
    pub scrollbar_thumb: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            forecast_outline: "blue".to_string(),
            outlook_outline: "green".to_string(),
            accent: "red".to_string(),
            menu_fill: "─".to_string(),
            menu_fill_color: "grey".to_string(),
            scrollbar_thumb: "grey".to_string(),
        }
    }
}

/// Resolved widget styles
#[derive(Debug, Clone)]
pub struct Theme {
    pub forecast: PanelStyle,
    pub outlook: PanelStyle,
    pub forecast_color: Color,
    pub outlook_color: Color,
    pub accent: ContentStyle,
    pub day_menu: MenuBarStyle,
    pub key_menu: MenuBarStyle,
}

impl Theme {
    /// Panel title: bold in the panel color, first letter accented
    pub fn title(&self, name: &str, color: Color) -> String {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return String::new();
        };
        let head = paint(self.accent, &first.to_string());
        let tail = paint(ContentStyle::new().with(color).bold(), chars.as_str());
        paint(ContentStyle::new().bold(), &format!("{}{}", head, tail))
    }
}

impl Config {
    /// Load configuration from `~/.spcview/config.toml`.
    ///
    /// A missing file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::get_config_path() {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?
            }
            _ => Self::default(),
        };
        if let Ok(url) = std::env::var("SPC_URL") {
            if !url.is_empty() {
                config.spc_url = url;
            }
        }
        Ok(config)
    }

    /// `~/.spcview`, created on demand
    pub fn data_dir() -> Option<PathBuf> {
        let dir = home_dir()?.join(".spcview");
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Some(dir)
    }

    fn get_config_path() -> Option<PathBuf> {
        Self::data_dir().map(|dir| dir.join("config.toml"))
    }

    /// Build the widget styles from the configured colors
    pub fn theme(&self) -> Theme {
        let defaults = StyleConfig::default();
        let color = |value: &str, fallback: &str| {
            parse_color(value)
                .or_else(|| parse_color(fallback))
                .unwrap_or(Color::Reset)
        };
        let style = &self.style;

        let forecast_color = color(&style.forecast_outline, &defaults.forecast_outline);
        let outlook_color = color(&style.outlook_outline, &defaults.outlook_outline);
        let accent = ContentStyle::new().with(color(&style.accent, &defaults.accent));
        let fill_glyph = if style.menu_fill.is_empty() {
            defaults.menu_fill.as_str()
        } else {
            style.menu_fill.as_str()
        };
        let fill = paint(
            ContentStyle::new().with(color(&style.menu_fill_color, &defaults.menu_fill_color)),
            fill_glyph,
        );
        let thumb = paint(
            ContentStyle::new().on(color(&style.scrollbar_thumb, &defaults.scrollbar_thumb)),
            " ",
        );

        Theme {
            forecast: PanelStyle {
                outline: ContentStyle::new().with(forecast_color),
                scrollbar_fg: thumb,
                scrollbar_bg: " ".to_string(),
            },
            outlook: PanelStyle {
                outline: ContentStyle::new().with(outlook_color),
                ..PanelStyle::default()
            },
            forecast_color,
            outlook_color,
            accent,
            day_menu: MenuBarStyle {
                fill: fill.clone(),
                selected: ContentStyle::new().bold().reverse(),
                action_key: accent,
            },
            key_menu: MenuBarStyle {
                fill,
                action_key: accent,
                ..MenuBarStyle::default()
            },
        }
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::text::display_width;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.spc_url, DEFAULT_SPC_URL);
        assert_eq!(config.image_mode, ImageMode::Auto);
        assert_eq!(config.layout.forecast_width, 76);
        assert_eq!(config.layout.menu_spacing, 2);
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
            image_mode = "off"

            [layout]
            forecast_width = 90

            [style]
            accent = "yellow"
            "#,
        )
        .unwrap();
        assert_eq!(config.image_mode, ImageMode::Off);
        assert_eq!(config.layout.forecast_width, 90);
        assert_eq!(config.layout.menu_spacing, 2);
        assert_eq!(config.style.accent, "yellow");
        assert_eq!(config.style.outlook_outline, "green");
    }

    #[test]
    fn test_bad_image_mode_rejected() {
        assert!(toml::from_str::<Config>("image_mode = \"sixel\"").is_err());
    }

    #[test]
    fn test_image_mode_resolution() {
        assert_eq!(ImageMode::Auto.display(Some("iTerm.app")), MapDisplay::Inline);
        assert_eq!(ImageMode::Auto.display(Some("xterm")), MapDisplay::Blocks);
        assert_eq!(ImageMode::Auto.display(None), MapDisplay::Blocks);
        assert_eq!(ImageMode::Inline.display(None), MapDisplay::Inline);
        assert_eq!(ImageMode::Blocks.display(Some("iTerm.app")), MapDisplay::Blocks);
        assert_eq!(ImageMode::Off.display(Some("iTerm.app")), MapDisplay::Off);
    }

    #[test]
    fn test_blocks_mode_parses() {
        let config: Config = toml::from_str("image_mode = \"blocks\"").unwrap();
        assert_eq!(config.image_mode, ImageMode::Blocks);
    }

    #[test]
    fn test_theme_falls_back_on_unknown_colors() {
        let mut config = Config::default();
        config.style.forecast_outline = "ultraviolet".to_string();
        config.style.menu_fill = String::new();
        let theme = config.theme();
        assert_eq!(theme.forecast_color, Color::Blue);
        assert_eq!(display_width(&theme.day_menu.fill), 1);
        assert!(theme.day_menu.fill.contains('─'));
        assert_eq!(display_width(&theme.forecast.scrollbar_fg), 1);
    }

    #[test]
    fn test_title_width() {
        let theme = Config::default().theme();
        let title = theme.title("forecast", theme.forecast_color);
        assert_eq!(display_width(&title), 8);
        assert_eq!(theme.title("", Color::Red), "");
    }
}
