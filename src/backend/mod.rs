//! Terminal backends.
//!
//! The session only talks to the terminal through these two traits, so the
//! rest of the crate never mentions crossterm. `Backend` is the output half
//! (cells, cursor, mode switches) and `EventSource` the input half.

use std::io;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::state::mouse::MouseState;
use crate::types::{Cell, Key};

pub mod terminal;

/// A raw mouse report before click counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseReport {
    pub row: u16,
    pub col: u16,
    pub state: MouseState,
}

/// One unit read from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    Key(Key),
    Mouse(MouseReport),
    Resize { rows: u16, cols: u16 },
    /// The input stream ended.
    Eof,
    /// Nothing arrived within the read timeout.
    Timeout,
}

pub trait Backend: Send {
    /// Put the terminal into application mode (raw, mouse, alternate screen).
    fn enter(&mut self, config: &SessionConfig) -> io::Result<()>;

    /// Undo everything `enter` did. Must be safe to call more than once.
    fn leave(&mut self) -> io::Result<()>;

    /// Terminal size as `(rows, cols)`.
    fn size(&self) -> io::Result<(u16, u16)>;

    fn draw(&mut self, cells: &[(u16, u16, Cell)]) -> io::Result<()>;

    fn set_cursor(&mut self, row: u16, col: u16) -> io::Result<()>;

    fn clear(&mut self) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

pub trait EventSource: Send {
    /// Read one input unit. `None` blocks until something arrives.
    fn read(&mut self, timeout: Option<Duration>) -> io::Result<RawInput>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn enter(&mut self, config: &SessionConfig) -> io::Result<()> {
        (**self).enter(config)
    }

    fn leave(&mut self) -> io::Result<()> {
        (**self).leave()
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        (**self).size()
    }

    fn draw(&mut self, cells: &[(u16, u16, Cell)]) -> io::Result<()> {
        (**self).draw(cells)
    }

    fn set_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        (**self).set_cursor(row, col)
    }

    fn clear(&mut self) -> io::Result<()> {
        (**self).clear()
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<E: EventSource + ?Sized> EventSource for Box<E> {
    fn read(&mut self, timeout: Option<Duration>) -> io::Result<RawInput> {
        (**self).read(timeout)
    }
}
