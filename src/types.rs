//! Core types for gridterm.
//!
//! Key codes, screen geometry and styled cells. The input reader, the
//! callback registries, the layout engine and the renderer all speak in
//! these types.

use std::fmt;

use bitflags::bitflags;

// =============================================================================
// Key
// =============================================================================

/// A key code read from the terminal.
///
/// Printable characters are their Unicode scalar value and control keys are
/// their ASCII control code, so `Key::from('a')` and `Key::ctrl('u')` compare
/// the way a curses application expects. Named keys that have no character
/// (arrows, function keys, the resize notification) live above the Unicode
/// range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub u32);

const NAMED: u32 = 0x11_0000;
const FUNCTION: u32 = NAMED + 0x100;
const MAX_FUNCTION: u8 = 24;

impl Key {
    /// Registry wildcard. Handlers registered for `ANY` fire on every key.
    pub const ANY: Self = Self(0);

    // Control codes
    pub const EOT: Self = Self(0x04);
    pub const BACKSPACE: Self = Self(0x08);
    pub const TAB: Self = Self(0x09);
    pub const LF: Self = Self(0x0a);
    pub const FF: Self = Self(0x0c);
    pub const CR: Self = Self(0x0d);
    pub const NAK: Self = Self(0x15);
    pub const ESC: Self = Self(0x1b);
    pub const DEL: Self = Self(0x7f);

    // Named keys
    pub const UP: Self = Self(NAMED + 1);
    pub const DOWN: Self = Self(NAMED + 2);
    pub const LEFT: Self = Self(NAMED + 3);
    pub const RIGHT: Self = Self(NAMED + 4);
    pub const HOME: Self = Self(NAMED + 5);
    pub const END: Self = Self(NAMED + 6);
    pub const PAGE_UP: Self = Self(NAMED + 7);
    pub const PAGE_DOWN: Self = Self(NAMED + 8);
    pub const INSERT: Self = Self(NAMED + 9);
    pub const DELETE: Self = Self(NAMED + 10);
    pub const BACK_TAB: Self = Self(NAMED + 11);
    /// Keypad Enter, distinct from CR/LF.
    pub const ENTER: Self = Self(NAMED + 12);
    /// The terminal was resized.
    pub const RESIZE: Self = Self(NAMED + 13);
    /// A mouse report, only returned by `getkey` when mouse dispatch is off.
    pub const MOUSE: Self = Self(NAMED + 14);
    /// Redraw request.
    pub const REFRESH: Self = Self(NAMED + 15);

    /// Function key `F<n>`, `n` in `1..=24`.
    pub const fn f(n: u8) -> Self {
        Self(FUNCTION + n as u32)
    }

    /// The control code produced by Ctrl + `c` (`Key::ctrl('u') == Key::NAK`).
    pub const fn ctrl(c: char) -> Self {
        Self(c as u32 & 0x1f)
    }

    /// The character this key types, if it is a character at all.
    pub fn as_char(self) -> Option<char> {
        if self.0 < NAMED {
            char::from_u32(self.0)
        } else {
            None
        }
    }

    /// True for keys that echo as a visible character.
    pub fn is_printable(self) -> bool {
        self.as_char().is_some_and(|c| !c.is_control())
    }

    /// True for CR, LF and keypad Enter.
    pub fn is_enter(self) -> bool {
        matches!(self, Self::CR | Self::LF | Self::ENTER)
    }

    /// True for BS and DEL; terminals disagree on which one Backspace sends.
    pub fn is_backspace(self) -> bool {
        matches!(self, Self::BACKSPACE | Self::DEL)
    }

    /// The `n` of `F<n>`, if this is a function key.
    pub fn function_number(self) -> Option<u8> {
        let n = self.0.checked_sub(FUNCTION)?;
        (1..=MAX_FUNCTION as u32).contains(&n).then_some(n as u8)
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Self(c as u32)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::UP => "Up",
            Self::DOWN => "Down",
            Self::LEFT => "Left",
            Self::RIGHT => "Right",
            Self::HOME => "Home",
            Self::END => "End",
            Self::PAGE_UP => "PageUp",
            Self::PAGE_DOWN => "PageDown",
            Self::INSERT => "Insert",
            Self::DELETE => "Delete",
            Self::BACK_TAB => "BackTab",
            Self::ENTER => "Enter",
            Self::RESIZE => "Resize",
            Self::MOUSE => "Mouse",
            Self::REFRESH => "Refresh",
            Self::ESC => "Esc",
            Self::DEL => "Del",
            _ => {
                if let Some(n) = self.function_number() {
                    return write!(f, "F{}", n);
                }
                return match self.as_char() {
                    Some(c) if (c as u32) < 0x20 => write!(f, "^{}", (c as u8 + b'@') as char),
                    Some(c) => write!(f, "{}", c),
                    None => write!(f, "Key({:#x})", self.0),
                };
            }
        };
        f.write_str(name)
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// A rectangle of screen cells in absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub top: u16,
    pub left: u16,
    pub height: u16,
    pub width: u16,
}

impl Rect {
    pub const fn new(top: u16, left: u16, height: u16, width: u16) -> Self {
        Self {
            top,
            left,
            height,
            width,
        }
    }

    /// Last row covered by the rectangle.
    pub const fn bottom(&self) -> u16 {
        (self.top + self.height).saturating_sub(1)
    }

    /// Last column covered by the rectangle.
    pub const fn right(&self) -> u16 {
        (self.left + self.width).saturating_sub(1)
    }

    pub const fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }

    pub const fn area(&self) -> u32 {
        self.height as u32 * self.width as u32
    }

    pub const fn contains(&self, row: u16, col: u16) -> bool {
        !self.is_empty()
            && row >= self.top
            && row <= self.bottom()
            && col >= self.left
            && col <= self.right()
    }

    /// The rectangle one cell in from every side (a bordered box's window).
    pub const fn inner(&self) -> Self {
        if self.height < 2 || self.width < 2 {
            return Self::new(self.top, self.left, 0, 0);
        }
        Self::new(self.top + 1, self.left + 1, self.height - 2, self.width - 2)
    }

    pub fn intersect(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::default();
        }
        let top = self.top.max(other.top);
        let left = self.left.max(other.left);
        let bottom = self.bottom().min(other.bottom());
        let right = self.right().min(other.right());
        if bottom < top || right < left {
            return Self::default();
        }
        Self::new(top, left, bottom - top + 1, right - left + 1)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !self.intersect(other).is_empty()
    }
}

// =============================================================================
// Style
// =============================================================================

/// Terminal color. `Default` lets the terminal pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    /// 256-color palette index.
    Indexed(u8),
}

bitflags! {
    /// Text attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attr: u16 {
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK = 1 << 4;
        const REVERSE = 1 << 5;
        const HIDDEN = 1 << 6;
        const STRIKE = 1 << 7;
    }
}

/// Foreground, background and attributes of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attr,
}

impl Style {
    pub const fn new() -> Self {
        Self {
            fg: Color::Default,
            bg: Color::Default,
            attrs: Attr::empty(),
        }
    }

    pub const fn fg(mut self, fg: Color) -> Self {
        self.fg = fg;
        self
    }

    pub const fn bg(mut self, bg: Color) -> Self {
        self.bg = bg;
        self
    }

    pub const fn attrs(mut self, attrs: Attr) -> Self {
        self.attrs = attrs;
        self
    }

    /// Layer `other` over `self`: non-default colors win, attributes add up.
    pub fn patch(self, other: Self) -> Self {
        Self {
            fg: if other.fg == Color::Default { self.fg } else { other.fg },
            bg: if other.bg == Color::Default { self.bg } else { other.bg },
            attrs: self.attrs | other.attrs,
        }
    }
}

/// One character cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Cell {
    pub const BLANK: Self = Self {
        ch: ' ',
        style: Style::new(),
    };

    pub const fn new(ch: char, style: Style) -> Self {
        Self { ch, style }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_chars_and_controls() {
        assert_eq!(Key::from('a').as_char(), Some('a'));
        assert!(Key::from('a').is_printable());
        assert_eq!(Key::ctrl('u'), Key::NAK);
        assert_eq!(Key::ctrl('d'), Key::EOT);
        assert_eq!(Key::ctrl('l'), Key::FF);
        assert!(!Key::NAK.is_printable());
        assert!(!Key::UP.is_printable());
        assert_eq!(Key::UP.as_char(), None);
    }

    #[test]
    fn test_key_predicates() {
        assert!(Key::CR.is_enter());
        assert!(Key::LF.is_enter());
        assert!(Key::ENTER.is_enter());
        assert!(!Key::from('x').is_enter());
        assert!(Key::BACKSPACE.is_backspace());
        assert!(Key::DEL.is_backspace());
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(Key::f(1).function_number(), Some(1));
        assert_eq!(Key::f(12).function_number(), Some(12));
        assert_eq!(Key::UP.function_number(), None);
        assert_ne!(Key::f(1), Key::f(2));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::from('q').to_string(), "q");
        assert_eq!(Key::NAK.to_string(), "^U");
        assert_eq!(Key::f(5).to_string(), "F5");
        assert_eq!(Key::RESIZE.to_string(), "Resize");
        assert_eq!(Key::ESC.to_string(), "Esc");
    }

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(2, 3, 5, 10);
        assert_eq!(r.bottom(), 6);
        assert_eq!(r.right(), 12);
        assert!(r.contains(2, 3));
        assert!(r.contains(6, 12));
        assert!(!r.contains(7, 12));
        assert_eq!(r.inner(), Rect::new(3, 4, 3, 8));
        assert_eq!(r.area(), 50);
    }

    #[test]
    fn test_rect_intersect() {
        let a = Rect::new(0, 0, 5, 5);
        let b = Rect::new(0, 4, 5, 5);
        assert_eq!(a.intersect(&b), Rect::new(0, 4, 5, 1));
        let c = Rect::new(10, 10, 2, 2);
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_style_patch() {
        let base = Style::new().fg(Color::Red).attrs(Attr::BOLD);
        let over = Style::new().bg(Color::Blue).attrs(Attr::REVERSE);
        let s = base.patch(over);
        assert_eq!(s.fg, Color::Red);
        assert_eq!(s.bg, Color::Blue);
        assert_eq!(s.attrs, Attr::BOLD | Attr::REVERSE);
    }
}
