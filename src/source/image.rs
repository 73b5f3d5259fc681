//! Map image renderers.
//!
//! A renderer turns raw image bytes into something the outlook panel can
//! show. [`InlineImageRenderer`] produces one escape sequence that an
//! image panel writes verbatim at its content origin.
//! [`BlockImageRenderer`] produces colored half-block text lines for a
//! plain text panel, which works on any truecolor terminal. With maps
//! turned off, [`PlaceholderRenderer`] refuses and the panel shows the map
//! URL instead.

use base64::Engine;
use crossterm::style::{Color, ContentStyle, Stylize};
use image::imageops::FilterType;
use image::Rgba;
use thiserror::Error;

use crate::ui::style::paint;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("terminal cannot display images")]
    Unsupported,

    #[error("image is empty")]
    Empty,

    #[error("cannot decode image: {0}")]
    Decode(String),
}

/// How outlook maps reach the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapDisplay {
    /// Inline image escape over an image panel
    Inline,
    /// Half-block cells in a text panel
    Blocks,
    /// No map, only its URL
    Off,
}

impl MapDisplay {
    pub fn renderer(self) -> Box<dyn ImageRenderer> {
        match self {
            MapDisplay::Inline => Box::new(InlineImageRenderer),
            MapDisplay::Blocks => Box::new(BlockImageRenderer),
            MapDisplay::Off => Box::new(PlaceholderRenderer),
        }
    }

    /// Whether map images are worth downloading
    pub fn fetches_images(self) -> bool {
        self != MapDisplay::Off
    }
}

/// Turns image bytes into terminal-displayable raster data
pub trait ImageRenderer: Send + Sync {
    /// Render `bytes` to fit `width` x `height` cells
    fn render(&self, bytes: &[u8], width: usize, height: usize) -> Result<String, RenderError>;
}

/// iTerm2 inline image protocol (also understood by WezTerm and others)
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineImageRenderer;

impl ImageRenderer for InlineImageRenderer {
    fn render(&self, bytes: &[u8], width: usize, height: usize) -> Result<String, RenderError> {
        if bytes.is_empty() {
            return Err(RenderError::Empty);
        }
        let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!(
            "\x1b]1337;File=inline=1;size={};width={};height={};preserveAspectRatio=1:{}\x07",
            bytes.len(),
            width,
            height,
            payload
        ))
    }
}

/// Half-block renderer.
///
/// The image is shrunk to fit `width` x `2 * height` pixels, keeping its
/// aspect ratio. Each cell then shows two stacked pixels: the upper one as
/// the foreground of `▀`, the lower one as its background. Transparent
/// pixels are left to the terminal background.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockImageRenderer;

impl ImageRenderer for BlockImageRenderer {
    fn render(&self, bytes: &[u8], width: usize, height: usize) -> Result<String, RenderError> {
        if bytes.is_empty() || width == 0 || height == 0 {
            return Err(RenderError::Empty);
        }
        let image =
            image::load_from_memory(bytes).map_err(|e| RenderError::Decode(e.to_string()))?;

        let (max_width, max_height) = (width as u32, 2 * height as u32);
        let image = if image.width() > max_width || image.height() > max_height {
            image.resize(max_width, max_height, FilterType::Triangle)
        } else {
            image
        };

        let pixels = image.to_rgba8();
        let (w, h) = pixels.dimensions();
        let rows: Vec<String> = (0..h)
            .step_by(2)
            .map(|y| {
                (0..w)
                    .map(|x| {
                        let upper = opaque(pixels.get_pixel(x, y));
                        let lower = if y + 1 < h {
                            opaque(pixels.get_pixel(x, y + 1))
                        } else {
                            None
                        };
                        half_block(upper, lower)
                    })
                    .collect()
            })
            .collect();
        Ok(rows.join("\n"))
    }
}

fn opaque(pixel: &Rgba<u8>) -> Option<Color> {
    let [r, g, b, a] = pixel.0;
    (a >= 128).then_some(Color::Rgb { r, g, b })
}

/// One cell showing an upper and a lower pixel
fn half_block(upper: Option<Color>, lower: Option<Color>) -> String {
    match (upper, lower) {
        (Some(upper), Some(lower)) => paint(ContentStyle::new().with(upper).on(lower), "▀"),
        (Some(upper), None) => paint(ContentStyle::new().with(upper), "▀"),
        (None, Some(lower)) => paint(ContentStyle::new().with(lower), "▄"),
        (None, None) => " ".to_string(),
    }
}

/// Renderer used when maps are turned off
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderRenderer;

impl ImageRenderer for PlaceholderRenderer {
    fn render(&self, _bytes: &[u8], _width: usize, _height: usize) -> Result<String, RenderError> {
        Err(RenderError::Unsupported)
    }
}

/// Whether the host terminal speaks the inline image protocol
pub fn terminal_supports_inline_images(term_program: Option<&str>) -> bool {
    term_program
        .map(|program| program.contains("iTerm") || program.contains("WezTerm"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbaImage};

    use crate::ui::text::display_width;

    fn png(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_fn(width, height, |x, y| Rgba(pixel(x, y)));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_inline_escape() {
        let blob = InlineImageRenderer.render(b"GIF89a", 42, 20).unwrap();
        assert!(blob.starts_with("\x1b]1337;File=inline=1;size=6;width=42;height=20;"));
        assert!(blob.ends_with(":R0lGODlh\x07"));
        // The whole blob is one OSC sequence
        assert_eq!(display_width(&blob), 0);
    }

    #[test]
    fn test_empty_image() {
        assert_eq!(InlineImageRenderer.render(&[], 10, 10), Err(RenderError::Empty));
    }

    #[test]
    fn test_placeholder_never_renders() {
        assert_eq!(
            PlaceholderRenderer.render(b"GIF89a", 10, 10),
            Err(RenderError::Unsupported)
        );
    }

    #[test]
    fn test_blocks_pair_pixels() {
        // Top half red, bottom half blue
        let bytes = png(4, 4, |_, y| if y < 2 { [255, 0, 0, 255] } else { [0, 0, 255, 255] });
        let out = BlockImageRenderer.render(&bytes, 4, 2).unwrap();
        let rows: Vec<&str> = out.split('\n').collect();

        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(display_width(row), 4);
            assert_eq!(row.matches('▀').count(), 4);
        }
        assert!(rows[0].contains("38;2;255;0;0"));
        assert!(rows[0].contains("48;2;255;0;0"));
        assert!(rows[1].contains("38;2;0;0;255"));
        assert!(!rows[1].contains("255;0;0"));
    }

    #[test]
    fn test_blocks_shrink_to_fit() {
        let bytes = png(40, 20, |_, _| [0, 128, 0, 255]);
        let out = BlockImageRenderer.render(&bytes, 10, 5).unwrap();
        let rows: Vec<&str> = out.split('\n').collect();

        // 40x20 fits 10x10 pixels as 10x5: three rows, the last one half filled
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| display_width(row) == 10));
        assert!(rows[1].contains("48;2;"));
        assert!(!rows[2].contains("48;2;"));
    }

    #[test]
    fn test_blocks_transparent_pixels() {
        let bytes = png(2, 2, |x, _| if x == 0 { [0, 0, 0, 0] } else { [9, 9, 9, 255] });
        let out = BlockImageRenderer.render(&bytes, 2, 1).unwrap();
        assert!(out.starts_with(' '));
        assert_eq!(display_width(&out), 2);
    }

    #[test]
    fn test_blocks_reject_bad_input() {
        assert_eq!(BlockImageRenderer.render(&[], 10, 10), Err(RenderError::Empty));
        assert!(matches!(
            BlockImageRenderer.render(b"not an image", 10, 10),
            Err(RenderError::Decode(_))
        ));
    }

    #[test]
    fn test_map_display_renderers() {
        let bytes = png(2, 2, |_, _| [1, 2, 3, 255]);
        assert!(MapDisplay::Inline.renderer().render(&bytes, 2, 1).unwrap().starts_with("\x1b]1337"));
        assert!(MapDisplay::Blocks.renderer().render(&bytes, 2, 1).unwrap().contains('▀'));
        assert!(MapDisplay::Off.renderer().render(&bytes, 2, 1).is_err());
        assert!(!MapDisplay::Off.fetches_images());
        assert!(MapDisplay::Blocks.fetches_images());
    }

    #[test]
    fn test_terminal_detection() {
        assert!(terminal_supports_inline_images(Some("iTerm.app")));
        assert!(terminal_supports_inline_images(Some("WezTerm")));
        assert!(!terminal_supports_inline_images(Some("Apple_Terminal")));
        assert!(!terminal_supports_inline_images(None));
    }
}
