//! crossterm driver.
//!
//! `CrosstermBackend` writes cells to stdout and `CrosstermEvents` turns
//! crossterm events into [`RawInput`]: keys become curses-style key codes
//! (Ctrl+letter is its control code, Enter is CR) and mouse events become
//! raw button/modifier bitmasks for the click decoder.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::cursor::{MoveTo, Show};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::style::{
    Attribute, Color as CtColor, Print, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, queue};

use super::{Backend, EventSource, MouseReport, RawInput};
use crate::config::SessionConfig;
use crate::state::mouse::MouseState;
use crate::types::{Attr, Cell, Color, Key, Style};

// =============================================================================
// Output
// =============================================================================

pub struct CrosstermBackend {
    out: Stdout,
    raw: bool,
    mouse: bool,
    alternate: bool,
    /// Style of the last cell written, so runs of equal style are not re-sent.
    pen: Option<Style>,
    /// Where the terminal cursor sits after the last write.
    at: Option<(u16, u16)>,
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            raw: false,
            mouse: false,
            alternate: false,
            pen: None,
            at: None,
        }
    }

    fn set_pen(&mut self, style: Style) -> io::Result<()> {
        if self.pen == Some(style) {
            return Ok(());
        }
        queue!(self.out, SetAttribute(Attribute::Reset))?;
        for (flag, attr) in ATTRIBUTES {
            if style.attrs.contains(flag) {
                queue!(self.out, SetAttribute(attr))?;
            }
        }
        queue!(
            self.out,
            SetForegroundColor(convert_color(style.fg)),
            SetBackgroundColor(convert_color(style.bg))
        )?;
        self.pen = Some(style);
        Ok(())
    }
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

const ATTRIBUTES: [(Attr, Attribute); 8] = [
    (Attr::BOLD, Attribute::Bold),
    (Attr::DIM, Attribute::Dim),
    (Attr::ITALIC, Attribute::Italic),
    (Attr::UNDERLINE, Attribute::Underlined),
    (Attr::BLINK, Attribute::SlowBlink),
    (Attr::REVERSE, Attribute::Reverse),
    (Attr::HIDDEN, Attribute::Hidden),
    (Attr::STRIKE, Attribute::CrossedOut),
];

fn convert_color(color: Color) -> CtColor {
    match color {
        Color::Default => CtColor::Reset,
        Color::Black => CtColor::Black,
        Color::Red => CtColor::DarkRed,
        Color::Green => CtColor::DarkGreen,
        Color::Yellow => CtColor::DarkYellow,
        Color::Blue => CtColor::DarkBlue,
        Color::Magenta => CtColor::DarkMagenta,
        Color::Cyan => CtColor::DarkCyan,
        Color::White => CtColor::Grey,
        Color::Indexed(n) => CtColor::AnsiValue(n),
    }
}

impl Backend for CrosstermBackend {
    fn enter(&mut self, config: &SessionConfig) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        self.raw = true;
        if config.alternate_screen {
            execute!(self.out, EnterAlternateScreen)?;
            self.alternate = true;
        }
        if config.mouse {
            execute!(self.out, EnableMouseCapture)?;
            self.mouse = true;
        }
        execute!(self.out, Clear(ClearType::All), Show)?;
        self.pen = None;
        self.at = None;
        Ok(())
    }

    fn leave(&mut self) -> io::Result<()> {
        // Undo as much as possible and report the first failure.
        let mut first: io::Result<()> = Ok(());
        let mut keep = |r: io::Result<()>| {
            if first.is_ok() {
                first = r;
            }
        };
        keep(execute!(self.out, SetAttribute(Attribute::Reset), Show));
        if self.mouse {
            keep(execute!(self.out, DisableMouseCapture));
            self.mouse = false;
        }
        if self.alternate {
            keep(execute!(self.out, LeaveAlternateScreen));
            self.alternate = false;
        }
        if self.raw {
            keep(terminal::disable_raw_mode());
            self.raw = false;
        }
        first
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        let (cols, rows) = terminal::size()?;
        Ok((rows, cols))
    }

    fn draw(&mut self, cells: &[(u16, u16, Cell)]) -> io::Result<()> {
        for &(row, col, cell) in cells {
            if self.at != Some((row, col)) {
                queue!(self.out, MoveTo(col, row))?;
            }
            self.set_pen(cell.style)?;
            queue!(self.out, Print(cell.ch))?;
            self.at = Some((row, col.saturating_add(1)));
        }
        Ok(())
    }

    fn set_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(col, row))?;
        self.at = Some((row, col));
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            SetAttribute(Attribute::Reset),
            Clear(ClearType::All)
        )?;
        self.pen = None;
        self.at = None;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

// =============================================================================
// Input
// =============================================================================

#[derive(Debug, Default)]
pub struct CrosstermEvents;

impl CrosstermEvents {
    pub fn new() -> Self {
        Self
    }
}

impl EventSource for CrosstermEvents {
    fn read(&mut self, timeout: Option<Duration>) -> io::Result<RawInput> {
        loop {
            if let Some(timeout) = timeout {
                if !event::poll(timeout)? {
                    return Ok(RawInput::Timeout);
                }
            }
            if let Some(input) = convert_event(event::read()?) {
                return Ok(input);
            }
        }
    }
}

/// Convert a crossterm event. Events with no curses equivalent yield `None`.
pub(crate) fn convert_event(event: Event) -> Option<RawInput> {
    match event {
        Event::Key(key) => convert_key(key).map(RawInput::Key),
        Event::Mouse(mouse) => convert_mouse(mouse).map(RawInput::Mouse),
        Event::Resize(cols, rows) => Some(RawInput::Resize { rows, cols }),
        _ => None,
    }
}

pub(crate) fn convert_key(event: KeyEvent) -> Option<Key> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let key = match event.code {
        KeyCode::Char(c) if ctrl && is_control_letter(c) => Key::ctrl(c.to_ascii_uppercase()),
        KeyCode::Char(c) => Key::from(c),
        KeyCode::Enter => Key::CR,
        KeyCode::Tab => Key::TAB,
        KeyCode::BackTab => Key::BACK_TAB,
        KeyCode::Backspace => Key::BACKSPACE,
        KeyCode::Delete => Key::DELETE,
        KeyCode::Insert => Key::INSERT,
        KeyCode::Esc => Key::ESC,
        KeyCode::Up => Key::UP,
        KeyCode::Down => Key::DOWN,
        KeyCode::Left => Key::LEFT,
        KeyCode::Right => Key::RIGHT,
        KeyCode::Home => Key::HOME,
        KeyCode::End => Key::END,
        KeyCode::PageUp => Key::PAGE_UP,
        KeyCode::PageDown => Key::PAGE_DOWN,
        KeyCode::F(n) => Key::f(n),
        _ => return None,
    };
    Some(key)
}

fn is_control_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '[' | '\\' | ']' | '^' | '_')
}

pub(crate) fn convert_mouse(event: MouseEvent) -> Option<MouseReport> {
    let mut state = match event.kind {
        MouseEventKind::Down(button) => button_flag(button) | MouseState::PRESSED,
        MouseEventKind::Up(button) => button_flag(button) | MouseState::RELEASED,
        MouseEventKind::Drag(button) => button_flag(button) | MouseState::MOTION,
        MouseEventKind::Moved => MouseState::MOTION,
        MouseEventKind::ScrollUp => MouseState::BUTTON4 | MouseState::PRESSED,
        MouseEventKind::ScrollDown => MouseState::BUTTON5 | MouseState::PRESSED,
        MouseEventKind::ScrollLeft | MouseEventKind::ScrollRight => return None,
    };
    if event.modifiers.contains(KeyModifiers::ALT) {
        state |= MouseState::ALT;
    }
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        state |= MouseState::CTRL;
    }
    if event.modifiers.contains(KeyModifiers::SHIFT) {
        state |= MouseState::SHIFT;
    }
    Some(MouseReport {
        row: event.row,
        col: event.column,
        state,
    })
}

fn button_flag(button: MouseButton) -> MouseState {
    match button {
        MouseButton::Left => MouseState::BUTTON1,
        MouseButton::Middle => MouseState::BUTTON2,
        MouseButton::Right => MouseState::BUTTON3,
    }
}

// =============================================================================
// Tests
// =============================================================================
