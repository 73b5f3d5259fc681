//! Terminal rendering engine.
//!
//! This module provides the widgets and the surface they draw on:
//!
//! - **surface**: Cursor-addressed output behind the shared draw lock
//! - **panel**: Bordered, scrollable text/image panel with diffed redraws
//! - **menubar**: Centered single-row menu with selection and action keys
//! - **style**: Style bundles with defaults
//! - **text**: ANSI-aware width measurement and column slicing
//! - **geometry**: Validated widget rectangles
//!
//! # Drawing Model
//!
//! Widgets are mutated first (`set_content`, `move_scroll_y`,
//! `set_selected_index`, ...) and rendered second (`draw`). Mutation never
//! touches the terminal; `draw` takes the [`DrawLock`] for its whole run.

pub mod geometry;
pub mod menubar;
pub mod panel;
pub mod style;
pub mod surface;
pub mod text;

pub use geometry::{GeometryError, Rect};
pub use menubar::{MenuBar, MenuBarOptions};
pub use panel::{Panel, PanelFlags, PanelOptions};
pub use style::{MenuBarStyle, PanelStyle};
pub use surface::{DrawLock, Surface};
