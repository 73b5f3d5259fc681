//! Terminal surface adapter.
//!
//! Every byte that reaches the terminal goes through a [`Surface`], and the
//! only way to reach a `Surface` is through the shared [`DrawLock`]. Widgets
//! hold the lock for the whole of a draw, so two draws never interleave
//! their cursor moves and writes on the one output stream.
//!
//! ```text
//! widget.draw(&lock)
//!     ↓
//! lock.lock().await   → FIFO queue of pending draws
//!     ↓
//! move_cursor_to / write_raw ...
//!     ↓
//! flush()             → guard dropped, next draw proceeds
//! ```

use std::io::{self, Write};
use std::sync::Arc;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, ResetColor, SetAttribute},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tokio::sync::Mutex;

/// The single lock guarding all terminal writes.
///
/// `tokio::sync::Mutex` hands the lock out in the order it was requested,
/// which is the queueing behavior draws rely on.
pub type DrawLock = Arc<Mutex<Surface>>;

/// Cursor-addressable write surface
pub struct Surface {
    out: Box<dyn Write + Send>,
    /// Whether raw mode / alternate screen are active
    initialized: bool,
}

impl Surface {
    /// Create a surface writing to stdout
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            initialized: false,
        }
    }

    /// Wrap the surface in the shared draw lock
    pub fn into_lock(self) -> DrawLock {
        Arc::new(Mutex::new(self))
    }

    /// Enter raw mode and the alternate screen, hide the cursor
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.out,
            EnterAlternateScreen,
            Hide,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        self.initialized = true;
        Ok(())
    }

    /// Restore the terminal. Safe to call more than once.
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        // Reset attributes first so the restored screen is not left styled
        let _ = execute!(self.out, ResetColor, SetAttribute(Attribute::Reset));
        execute!(
            self.out,
            Clear(ClearType::All),
            Show,
            LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Move the cursor to a 0-based column/row
    pub fn move_cursor_to(&mut self, col: u16, row: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(col, row))
    }

    /// Write text (possibly containing escape sequences) at the cursor
    pub fn write_raw(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())
    }

    /// Clear the whole screen
    pub fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, ResetColor, Clear(ClearType::All), MoveTo(0, 0))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Terminal size as (cols, rows)
    pub fn size() -> io::Result<(u16, u16)> {
        terminal::size()
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
pub use capture::CaptureBuffer;
