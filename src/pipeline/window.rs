//! Window handles.
//!
//! A `Window` is a cheap, clonable handle naming one window of a session.
//! Each method takes the display lock for its own duration; to batch several
//! operations under one lock use [`TerminalSession::with_screen`].

use std::sync::Arc;

use super::session::{Screen, TerminalSession, STDSCR};
use crate::error::Result;
use crate::types::{Rect, Style};

#[derive(Clone)]
pub struct Window {
    session: Arc<TerminalSession>,
    id: usize,
}

impl Window {
    pub(crate) fn from_id(session: Arc<TerminalSession>, id: usize) -> Self {
        Self { session, id }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn session(&self) -> &Arc<TerminalSession> {
        &self.session
    }

    pub fn is_stdscr(&self) -> bool {
        self.id == STDSCR
    }

    fn with<T>(&self, f: impl FnOnce(&mut Screen, usize) -> Result<T>) -> Result<T> {
        self.session.with_screen(|screen| f(screen, self.id))
    }

    pub fn rect(&self) -> Result<Rect> {
        self.with(|s, id| s.window_rect(id))
    }

    /// `(height, width)`.
    pub fn size(&self) -> Result<(u16, u16)> {
        self.rect().map(|r| (r.height, r.width))
    }

    /// `(top, left)` on the screen.
    pub fn origin(&self) -> Result<(u16, u16)> {
        self.rect().map(|r| (r.top, r.left))
    }

    pub fn cursor(&self) -> Result<(u16, u16)> {
        self.with(|s, id| s.cursor(id))
    }

    pub fn move_to(&self, row: u16, col: u16) -> Result<()> {
        self.with(|s, id| s.move_cursor(id, row, col))
    }

    pub fn put_char(&self, ch: char) -> Result<()> {
        self.with(|s, id| s.put_char(id, ch))
    }

    pub fn put_str(&self, text: &str) -> Result<()> {
        self.with(|s, id| s.put_str(id, text))
    }

    pub fn put_styled(&self, text: &str, style: Style) -> Result<()> {
        self.with(|s, id| s.put_styled(id, text, style))
    }

    pub fn put_str_at(&self, row: u16, col: u16, text: &str) -> Result<()> {
        self.with(|s, id| s.put_str_at(id, row, col, text))
    }

    pub fn backspace(&self) -> Result<()> {
        self.with(|s, id| s.backspace(id))
    }

    pub fn clear(&self) -> Result<()> {
        self.with(|s, id| s.clear_window(id))
    }

    pub fn resize(&self, height: u16, width: u16) -> Result<()> {
        self.with(|s, id| s.resize_window(id, height, width))
    }

    pub fn move_window(&self, top: u16, left: u16) -> Result<()> {
        self.with(|s, id| s.move_window(id, top, left))
    }

    pub fn set_background(&self, style: Style) -> Result<()> {
        self.with(|s, id| s.set_background(id, style))
    }

    pub fn set_style(&self, style: Style) -> Result<()> {
        self.with(|s, id| s.set_style(id, style))
    }

    pub fn set_scroll(&self, scroll: bool) -> Result<()> {
        self.with(|s, id| s.set_scroll(id, scroll))
    }

    /// Copy into the screen frame without drawing.
    pub fn refresh_frame(&self) -> Result<()> {
        self.with(|s, id| s.refresh_window(id))
    }

    /// Copy into the screen frame and draw.
    pub fn refresh(&self) -> Result<()> {
        self.with(|s, id| s.refresh(id))
    }

    /// The text of one window row, trailing blanks included.
    pub fn row_text(&self, row: u16) -> Result<String> {
        self.with(|s, id| {
            let width = s.window_rect(id)?.width;
            let mut text = String::with_capacity(width as usize);
            for col in 0..width {
                if let Some(cell) = s.cell_at(id, row, col)? {
                    text.push(cell.ch);
                }
            }
            Ok(text)
        })
    }

    /// Free the window. The handle and its clones become invalid.
    pub fn delete(self) {
        let id = self.id;
        let _ = self.session.with_screen(|s| {
            s.delete_window(id);
            Ok(())
        });
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window").field("id", &self.id).finish()
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.session, &other.session)
    }
}

impl Eq for Window {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test::{ScriptedInput, TestBackend};
    use crate::config::SessionConfig;
    use crate::error::Error;

    fn session() -> Arc<TerminalSession> {
        TerminalSession::new(
            TestBackend::new(10, 40),
            ScriptedInput::new(),
            SessionConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_window_geometry() {
        let session = session();
        let win = session.new_window(Rect::new(2, 3, 4, 10));
        assert_eq!(win.size().unwrap(), (4, 10));
        assert_eq!(win.origin().unwrap(), (2, 3));
        win.move_window(1, 1).unwrap();
        win.resize(3, 5).unwrap();
        assert_eq!(win.rect().unwrap(), Rect::new(1, 1, 3, 5));
    }

    #[test]
    fn test_window_text() {
        let session = session();
        let win = session.new_window(Rect::new(0, 0, 2, 6));
        win.put_str("hello\nyou").unwrap();
        assert_eq!(win.row_text(0).unwrap(), "hello ");
        assert_eq!(win.row_text(1).unwrap(), "you   ");
        assert_eq!(win.cursor().unwrap(), (1, 3));
    }

    #[test]
    fn test_stdscr_identity() {
        let session = session();
        assert!(session.stdscr().is_stdscr());
        assert_eq!(session.stdscr(), session.stdscr());
    }

    #[test]
    fn test_deleted_window_errors() {
        let session = session();
        let win = session.new_window(Rect::new(0, 0, 1, 1));
        let copy = win.clone();
        win.delete();
        assert!(matches!(copy.put_str("x"), Err(Error::NoSuchWindow(_))));
    }
}
