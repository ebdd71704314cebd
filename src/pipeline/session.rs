//! Terminal session - the lock, the windows and the cursor tracker.
//!
//! A `TerminalSession` owns everything that touches the terminal: the
//! backend and frame behind one global lock (`Screen`), the input source
//! behind a second lock that only one reader may hold, and the key and
//! mouse registries. It is shared by `Arc` between the threads of an
//! application; every display mutation goes through the screen lock.
//!
//! # Example
//!
//! ```ignore
//! use gridterm::{run, SessionConfig};
//!
//! run(SessionConfig::default(), |session| {
//!     let stdscr = session.stdscr();
//!     // Log from another thread without moving the user's cursor
//!     let s = session.clone();
//!     std::thread::spawn(move || {
//!         s.with_preserved_cursor(|screen| screen.put_str(0, "tick\n"))
//!     });
//!     gridterm::getline(&stdscr)?;
//!     Ok(())
//! })
//! ```

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Instant;

use super::window::Window;
use crate::backend::{Backend, EventSource, MouseReport, RawInput};
use crate::config::SessionConfig;
use crate::error::{lock, Error, Result};
use crate::renderer::{DiffRenderer, FrameBuffer};
use crate::state::mouse::{ClickTracker, MouseEvent};
use crate::state::{FunctionKeyRegistry, MouseRouter};
use crate::types::{Cell, Rect, Style};

/// Window id of the full-screen window.
pub const STDSCR: usize = 0;

const TAB_WIDTH: u16 = 8;

// =============================================================================
// Window state
// =============================================================================

/// One curses-style window: a cell buffer positioned on the screen.
#[derive(Debug, Clone)]
pub(crate) struct WindowState {
    rect: Rect,
    cells: Vec<Cell>,
    cursor: (u16, u16),
    scroll: bool,
    background: Style,
    style: Style,
    /// Changed since it was last copied into the frame.
    touched: bool,
}

impl WindowState {
    fn new(rect: Rect) -> Self {
        Self {
            rect,
            cells: vec![Cell::BLANK; rect.area() as usize],
            cursor: (0, 0),
            scroll: false,
            background: Style::new(),
            style: Style::new(),
            touched: true,
        }
    }

    fn blank(&self) -> Cell {
        Cell::new(' ', self.background)
    }

    fn index(&self, row: u16, col: u16) -> Option<usize> {
        (row < self.rect.height && col < self.rect.width)
            .then(|| row as usize * self.rect.width as usize + col as usize)
    }

    fn set(&mut self, row: u16, col: u16, cell: Cell) {
        if let Some(idx) = self.index(row, col) {
            self.cells[idx] = cell;
        }
    }

    fn get(&self, row: u16, col: u16) -> Option<Cell> {
        self.index(row, col).map(|idx| self.cells[idx])
    }

    fn put_char(&mut self, ch: char, style: Style) {
        if self.rect.is_empty() {
            return;
        }
        match ch {
            '\n' => {
                self.clear_to_eol();
                self.newline();
            }
            '\r' => self.cursor.1 = 0,
            '\x08' => self.cursor.1 = self.cursor.1.saturating_sub(1),
            '\t' => {
                let stop = (self.cursor.1 / TAB_WIDTH + 1) * TAB_WIDTH;
                while self.cursor.1 < stop.min(self.rect.width) {
                    self.put_char(' ', style);
                    if self.cursor.1 == 0 {
                        break;
                    }
                }
            }
            c if c.is_control() => {}
            c => {
                let (row, col) = self.cursor;
                self.set(row, col, Cell::new(c, self.background.patch(style)));
                if col + 1 < self.rect.width {
                    self.cursor.1 += 1;
                } else {
                    self.newline();
                }
            }
        }
    }

    fn newline(&mut self) {
        self.cursor.1 = 0;
        if self.cursor.0 + 1 < self.rect.height {
            self.cursor.0 += 1;
        } else if self.scroll {
            self.scroll_up();
        }
    }

    fn scroll_up(&mut self) {
        let width = self.rect.width as usize;
        let blank = self.blank();
        self.cells.drain(..width.min(self.cells.len()));
        self.cells.extend(std::iter::repeat_n(blank, width));
    }

    fn clear_to_eol(&mut self) {
        let (row, col) = self.cursor;
        let blank = self.blank();
        for c in col..self.rect.width {
            self.set(row, c, blank);
        }
    }

    /// Delete the character under the cursor, shifting the rest of the line left.
    fn delete_char(&mut self) {
        let (row, col) = self.cursor;
        for c in col..self.rect.width.saturating_sub(1) {
            if let Some(next) = self.get(row, c + 1) {
                self.set(row, c, next);
            }
        }
        let blank = self.blank();
        self.set(row, self.rect.width.saturating_sub(1), blank);
    }

    fn clear(&mut self) {
        let blank = self.blank();
        self.cells.fill(blank);
        self.cursor = (0, 0);
    }

    /// Resize keeping the top-left content.
    fn resize(&mut self, height: u16, width: u16) {
        let blank = self.blank();
        let mut cells = vec![blank; height as usize * width as usize];
        for row in 0..height.min(self.rect.height) {
            for col in 0..width.min(self.rect.width) {
                if let Some(cell) = self.get(row, col) {
                    cells[row as usize * width as usize + col as usize] = cell;
                }
            }
        }
        self.cells = cells;
        self.rect.height = height;
        self.rect.width = width;
        self.cursor = (
            self.cursor.0.min(height.saturating_sub(1)),
            self.cursor.1.min(width.saturating_sub(1)),
        );
    }
}

// =============================================================================
// Screen
// =============================================================================

/// Everything behind the global display lock.
///
/// Obtained through [`TerminalSession::with_screen`] or
/// [`TerminalSession::with_preserved_cursor`]. Window operations take the
/// window id; `Window` handles wrap them one lock at a time.
pub struct Screen {
    backend: Box<dyn Backend>,
    frame: FrameBuffer,
    renderer: DiffRenderer,
    windows: Vec<Option<WindowState>>,
    cursor_win: usize,
}

impl Screen {
    fn new(backend: Box<dyn Backend>) -> io::Result<Self> {
        let (rows, cols) = backend.size()?;
        Ok(Self {
            backend,
            frame: FrameBuffer::new(rows, cols),
            renderer: DiffRenderer::new(),
            windows: vec![Some(WindowState::new(Rect::new(0, 0, rows, cols)))],
            cursor_win: STDSCR,
        })
    }

    fn win(&self, id: usize) -> Result<&WindowState> {
        self.windows
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(Error::NoSuchWindow(id))
    }

    fn win_mut(&mut self, id: usize) -> Result<&mut WindowState> {
        let win = self
            .windows
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(Error::NoSuchWindow(id))?;
        win.touched = true;
        Ok(win)
    }

    /// Terminal size as `(rows, cols)`.
    pub fn size(&self) -> (u16, u16) {
        (self.frame.rows(), self.frame.cols())
    }

    // -------------------------------------------------------------------------
    // Windows
    // -------------------------------------------------------------------------

    pub fn new_window(&mut self, rect: Rect) -> usize {
        let state = WindowState::new(rect);
        if let Some(slot) = self.windows.iter().position(Option::is_none) {
            self.windows[slot] = Some(state);
            slot
        } else {
            self.windows.push(Some(state));
            self.windows.len() - 1
        }
    }

    /// Free a window. `stdscr` cannot be deleted.
    pub fn delete_window(&mut self, id: usize) {
        if id != STDSCR {
            if let Some(slot) = self.windows.get_mut(id) {
                *slot = None;
            }
            if self.cursor_win == id {
                self.cursor_win = STDSCR;
            }
        }
    }

    pub fn window_rect(&self, id: usize) -> Result<Rect> {
        Ok(self.win(id)?.rect)
    }

    pub fn put_char(&mut self, id: usize, ch: char) -> Result<()> {
        let win = self.win_mut(id)?;
        let style = win.style;
        win.put_char(ch, style);
        Ok(())
    }

    pub fn put_str(&mut self, id: usize, text: &str) -> Result<()> {
        let win = self.win_mut(id)?;
        let style = win.style;
        text.chars().for_each(|c| win.put_char(c, style));
        Ok(())
    }

    /// Write `text` in `style` regardless of the window's current style.
    pub fn put_styled(&mut self, id: usize, text: &str, style: Style) -> Result<()> {
        let win = self.win_mut(id)?;
        text.chars().for_each(|c| win.put_char(c, style));
        Ok(())
    }

    pub fn put_str_at(&mut self, id: usize, row: u16, col: u16, text: &str) -> Result<()> {
        self.move_cursor(id, row, col)?;
        self.put_str(id, text)
    }

    /// Set one cell without moving the cursor. Out-of-window cells are ignored.
    pub fn put_cell_at(&mut self, id: usize, row: u16, col: u16, cell: Cell) -> Result<()> {
        self.win_mut(id)?.set(row, col, cell);
        Ok(())
    }

    pub fn cell_at(&self, id: usize, row: u16, col: u16) -> Result<Option<Cell>> {
        Ok(self.win(id)?.get(row, col))
    }

    /// Move the window cursor, clamped to the window.
    pub fn move_cursor(&mut self, id: usize, row: u16, col: u16) -> Result<()> {
        let win = self.win_mut(id)?;
        win.cursor = (
            row.min(win.rect.height.saturating_sub(1)),
            col.min(win.rect.width.saturating_sub(1)),
        );
        Ok(())
    }

    pub fn cursor(&self, id: usize) -> Result<(u16, u16)> {
        Ok(self.win(id)?.cursor)
    }

    /// Step back one cell and delete the character there.
    pub fn backspace(&mut self, id: usize) -> Result<()> {
        let win = self.win_mut(id)?;
        if win.cursor.1 > 0 {
            win.cursor.1 -= 1;
        } else if win.cursor.0 > 0 {
            win.cursor = (win.cursor.0 - 1, win.rect.width.saturating_sub(1));
        } else {
            return Ok(());
        }
        win.delete_char();
        Ok(())
    }

    pub fn clear_window(&mut self, id: usize) -> Result<()> {
        self.win_mut(id)?.clear();
        Ok(())
    }

    pub fn resize_window(&mut self, id: usize, height: u16, width: u16) -> Result<()> {
        self.win_mut(id)?.resize(height, width);
        Ok(())
    }

    pub fn move_window(&mut self, id: usize, top: u16, left: u16) -> Result<()> {
        let win = self.win_mut(id)?;
        win.rect.top = top;
        win.rect.left = left;
        Ok(())
    }

    /// Set the style blank cells are filled with and text is layered on.
    pub fn set_background(&mut self, id: usize, style: Style) -> Result<()> {
        let win = self.win_mut(id)?;
        let old = win.background;
        for cell in &mut win.cells {
            if cell.ch == ' ' && cell.style == old {
                cell.style = style;
            }
        }
        win.background = style;
        Ok(())
    }

    /// Set the style used by `put_char` / `put_str`.
    pub fn set_style(&mut self, id: usize, style: Style) -> Result<()> {
        self.win_mut(id)?.style = style;
        Ok(())
    }

    pub fn set_scroll(&mut self, id: usize, scroll: bool) -> Result<()> {
        self.win_mut(id)?.scroll = scroll;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Cursor tracking
    // -------------------------------------------------------------------------

    /// The window whose cursor the terminal cursor follows.
    pub fn cursor_window(&self) -> usize {
        self.cursor_win
    }

    pub fn set_cursor_window(&mut self, id: usize) -> Result<()> {
        self.win(id)?;
        self.cursor_win = id;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    /// Mark a window so the next refresh copies it even if unchanged.
    pub fn touch(&mut self, id: usize) -> Result<()> {
        self.win_mut(id).map(|_| ())
    }

    /// Copy a window into the screen frame without drawing.
    ///
    /// Only windows changed since their last copy are copied, so refreshing
    /// a window that lies under others does not paint over them.
    pub fn refresh_window(&mut self, id: usize) -> Result<()> {
        let win = self.windows.get_mut(id).and_then(Option::as_mut);
        let win = win.ok_or(Error::NoSuchWindow(id))?;
        if win.touched && !win.rect.is_empty() {
            self.frame
                .blit((win.rect.top, win.rect.left), win.rect.width, &win.cells);
        }
        win.touched = false;
        Ok(())
    }

    /// Draw the frame changes and park the terminal cursor on the cursor window.
    pub fn update(&mut self) -> Result<()> {
        self.renderer.render(self.backend.as_mut(), &self.frame)?;
        self.place_cursor()?;
        Ok(())
    }

    /// `refresh_window` followed by `update`.
    pub fn refresh(&mut self, id: usize) -> Result<()> {
        self.refresh_window(id)?;
        self.update()
    }

    /// Repaint every cell, for a corrupted screen.
    pub fn redraw(&mut self) -> Result<()> {
        self.renderer
            .render_full(self.backend.as_mut(), &self.frame)?;
        self.place_cursor()?;
        Ok(())
    }

    fn place_cursor(&mut self) -> Result<()> {
        let (row, col) = match self.win(self.cursor_win) {
            Ok(win) => (win.rect.top + win.cursor.0, win.rect.left + win.cursor.1),
            Err(_) => (0, 0),
        };
        self.backend.set_cursor(row, col)?;
        self.backend.flush()?;
        Ok(())
    }

    /// Follow a terminal resize: new frame size, `stdscr` resized, full repaint next.
    pub(crate) fn resize_terminal(&mut self, rows: u16, cols: u16) -> Result<()> {
        self.frame.resize(rows, cols);
        self.renderer.invalidate();
        self.backend.clear()?;
        self.win_mut(STDSCR)?.resize(rows, cols);
        Ok(())
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("size", &self.size())
            .field("windows", &self.windows.iter().flatten().count())
            .field("cursor_win", &self.cursor_win)
            .finish()
    }
}

// =============================================================================
// Session
// =============================================================================

struct InputState {
    source: Box<dyn EventSource>,
    clicks: ClickTracker,
}

/// A terminal under management, shared between threads by `Arc`.
pub struct TerminalSession {
    screen: Mutex<Screen>,
    input: Mutex<InputState>,
    keys: FunctionKeyRegistry,
    mouse: MouseRouter,
    config: SessionConfig,
}

impl TerminalSession {
    /// Build a session over a backend and an input source.
    ///
    /// The terminal is not put into application mode; [`run_with`](crate::run_with)
    /// does that. Tests drive a session over the headless backend directly.
    pub fn new<B, E>(backend: B, events: E, config: SessionConfig) -> Result<Arc<Self>>
    where
        B: Backend + 'static,
        E: EventSource + 'static,
    {
        let screen = Screen::new(Box::new(backend))?;
        let clicks = ClickTracker::new(config.click_interval, config.click_distance);
        Ok(Arc::new(Self {
            screen: Mutex::new(screen),
            input: Mutex::new(InputState {
                source: Box::new(events),
                clicks,
            }),
            keys: FunctionKeyRegistry::new(),
            mouse: MouseRouter::new(),
            config,
        }))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn keys(&self) -> &FunctionKeyRegistry {
        &self.keys
    }

    pub fn mouse(&self) -> &MouseRouter {
        &self.mouse
    }

    /// The full-screen window.
    pub fn stdscr(self: &Arc<Self>) -> Window {
        Window::from_id(self.clone(), STDSCR)
    }

    /// Create a window at `rect`.
    pub fn new_window(self: &Arc<Self>, rect: Rect) -> Window {
        let id = lock(&self.screen).new_window(rect);
        Window::from_id(self.clone(), id)
    }

    pub(crate) fn screen(&self) -> MutexGuard<'_, Screen> {
        lock(&self.screen)
    }

    /// Run `body` holding the display lock.
    pub fn with_screen<T>(&self, body: impl FnOnce(&mut Screen) -> Result<T>) -> Result<T> {
        body(&mut self.screen())
    }

    /// Run `body` holding the display lock, then put the tracked cursor back
    /// where it was, whether `body` returned, failed or panicked.
    ///
    /// Background threads draw through this so the user's input cursor
    /// never jumps.
    pub fn with_preserved_cursor<T>(
        &self,
        body: impl FnOnce(&mut Screen) -> Result<T>,
    ) -> Result<T> {
        let mut screen = self.screen();
        let win = screen.cursor_win;
        let saved = screen.cursor(win).ok();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut screen)));

        // The body may have deleted or switched windows; restore what still exists.
        screen.cursor_win = win;
        let restored = match saved {
            Some((row, col)) if screen.win(win).is_ok() => screen
                .move_cursor(win, row, col)
                .and_then(|()| screen.place_cursor()),
            _ => Ok(()),
        };

        match outcome {
            Ok(result) => {
                let value = result?;
                restored?;
                Ok(value)
            }
            Err(payload) => {
                drop(screen);
                panic::resume_unwind(payload)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Terminal mode
    // -------------------------------------------------------------------------

    pub(crate) fn enter(&self) -> Result<()> {
        let mut screen = self.screen();
        screen.backend.enter(&self.config)?;
        screen.renderer.invalidate();
        Ok(())
    }

    /// Restore the terminal. Safe to call more than once.
    pub(crate) fn leave(&self) -> io::Result<()> {
        self.screen().backend.leave()
    }

    /// Like `leave`, but gives up instead of waiting if the lock is held.
    pub(crate) fn try_leave(&self) -> bool {
        let mut screen = match self.screen.try_lock() {
            Ok(screen) => screen,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        screen.backend.leave().is_ok()
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    /// Read one raw input unit, decoding mouse reports.
    ///
    /// Holds the input lock, never the display lock. A second thread reading
    /// at the same time gets `Error::ConcurrentRead`.
    pub(crate) fn read_input(&self) -> Result<Input> {
        let mut input = match self.input.try_lock() {
            Ok(input) => input,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(Error::ConcurrentRead),
        };
        let raw = input.source.read(self.config.read_timeout())?;
        tracing::trace!(?raw, "input");
        Ok(match raw {
            RawInput::Key(key) => Input::Key(key),
            RawInput::Mouse(report) => Input::Mouse(input.clicks.decode(report, Instant::now())),
            RawInput::Resize { rows, cols } => Input::Resize { rows, cols },
            RawInput::Eof => Input::Eof,
            RawInput::Timeout => Input::Timeout,
        })
    }

    /// Decode and route a raw mouse report as if it had been read.
    pub fn inject_mouse(&self, report: MouseReport) -> bool {
        let event = lock(&self.input).clicks.decode(report, Instant::now());
        self.mouse.dispatch(&event)
    }
}

impl std::fmt::Debug for TerminalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("config", &self.config)
            .field("keys", &self.keys)
            .field("mouse", &self.mouse)
            .finish_non_exhaustive()
    }
}

/// Input after mouse decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Input {
    Key(crate::types::Key),
    Mouse(MouseEvent),
    Resize { rows: u16, cols: u16 },
    Eof,
    Timeout,
}

// =============================================================================
// Tests
// =============================================================================
