//! Widget rectangles in absolute terminal coordinates.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("inverted rectangle: top={top} left={left} bottom={bottom} right={right}")]
    Inverted {
        top: u16,
        left: u16,
        bottom: u16,
        right: u16,
    },

    #[error("no room for content: {width}x{height} after borders and padding")]
    DegenerateContent { width: i32, height: i32 },
}

/// Inclusive rectangle: `top..=bottom`, `left..=right`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub top: u16,
    pub left: u16,
    pub bottom: u16,
    pub right: u16,
}

impl Rect {
    pub fn new(top: u16, left: u16, bottom: u16, right: u16) -> Result<Self, GeometryError> {
        if bottom < top || right < left {
            return Err(GeometryError::Inverted {
                top,
                left,
                bottom,
                right,
            });
        }
        Ok(Self {
            top,
            left,
            bottom,
            right,
        })
    }

    /// A single row spanning `left..=right`
    pub fn row(top: u16, left: u16, right: u16) -> Result<Self, GeometryError> {
        Self::new(top, left, top, right)
    }

    pub fn width(&self) -> u16 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u16 {
        self.bottom - self.top + 1
    }
}
