//! Mouse Module - Mouse events and the coordinate handler router
//!
//! Raw reports from the backend are decoded into `MouseEvent`s (button,
//! click count, modifier flags) by a `ClickTracker`, then routed by
//! `MouseRouter` to the handlers registered at the event's cell.
//!
//! # API
//!
//! - `MouseRouter::add_handler(row, col, fn)` - Handler at one cell
//! - `MouseRouter::add_span_handler(row, col, ncols, fn)` - Handler over a run of cells
//! - `MouseRouter::remove_handler(id)` - Remove one handler
//! - `MouseRouter::clear_handlers()` - Remove every coordinate handler
//! - `MouseRouter::dispatch(event)` - Route an event
//!
//! # Example
//!
//! ```ignore
//! use gridterm::MouseRouter;
//!
//! let mouse = MouseRouter::new();
//! mouse.add_handler(0, 10, |event| {
//!     tracing::info!(%event, "clicked the title");
//!     true
//! });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bitflags::bitflags;

use super::HandlerId;
use crate::backend::MouseReport;
use crate::error::lock;

// =============================================================================
// TYPES
// =============================================================================

bitflags! {
    /// Raw mouse state as reported by the terminal.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseState: u32 {
        const BUTTON1 = 1 << 0;
        const BUTTON2 = 1 << 1;
        const BUTTON3 = 1 << 2;
        /// Wheel up / forward.
        const BUTTON4 = 1 << 3;
        /// Wheel down / backward.
        const BUTTON5 = 1 << 4;
        const PRESSED = 1 << 5;
        const RELEASED = 1 << 6;
        const MOTION = 1 << 7;
        const ALT = 1 << 8;
        const CTRL = 1 << 9;
        const SHIFT = 1 << 10;
    }
}

impl MouseState {
    /// Lowest button number set, or 0.
    pub fn button(self) -> u8 {
        const BUTTONS: [MouseState; 5] = [
            MouseState::BUTTON1,
            MouseState::BUTTON2,
            MouseState::BUTTON3,
            MouseState::BUTTON4,
            MouseState::BUTTON5,
        ];
        BUTTONS
            .iter()
            .position(|b| self.contains(*b))
            .map_or(0, |i| i as u8 + 1)
    }
}

/// A decoded mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub row: u16,
    pub col: u16,
    pub state: MouseState,
    /// 1-3 for buttons, 4/5 for the wheel, 0 for none.
    pub button: u8,
    /// 1-3 for presses, 0 for releases and plain motion.
    pub clicks: u8,
    pub pressed: bool,
    pub released: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub moving: bool,
}

impl MouseEvent {
    /// Decode a single report with no click history.
    pub fn new(row: u16, col: u16, state: MouseState) -> Self {
        let pressed = state.contains(MouseState::PRESSED);
        Self {
            row,
            col,
            state,
            button: state.button(),
            clicks: u8::from(pressed),
            pressed,
            released: state.contains(MouseState::RELEASED),
            alt: state.contains(MouseState::ALT),
            ctrl: state.contains(MouseState::CTRL),
            shift: state.contains(MouseState::SHIFT),
            moving: state.contains(MouseState::MOTION),
        }
    }

    /// True for scroll-wheel events.
    pub fn is_wheel(&self) -> bool {
        matches!(self.button, 4 | 5)
    }
}

impl fmt::Display for MouseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alt {
            f.write_str("Alt+")?;
        }
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        write!(f, "M{}", self.button)?;
        if self.clicks > 1 {
            write!(f, "*{}", self.clicks)?;
        }
        Ok(())
    }
}

// =============================================================================
// CLICK TRACKING
// =============================================================================

const MAX_CLICKS: u8 = 3;

/// Turns raw reports into events, counting multi-clicks and remembering the
/// held button for motion reports that do not carry one.
#[derive(Debug, Clone)]
pub struct ClickTracker {
    interval: Duration,
    distance: u16,
    last_press: Option<(Instant, u8, u16, u16)>,
    count: u8,
    held: Option<u8>,
}

impl ClickTracker {
    pub fn new(interval: Duration, distance: u16) -> Self {
        Self {
            interval,
            distance,
            last_press: None,
            count: 0,
            held: None,
        }
    }

    pub fn decode(&mut self, report: MouseReport, now: Instant) -> MouseEvent {
        let mut event = MouseEvent::new(report.row, report.col, report.state);

        if event.moving {
            if event.button == 0 {
                event.button = self.held.unwrap_or(0);
            }
            event.pressed = self.held.is_some();
            event.clicks = if event.pressed { self.count } else { 0 };
        } else if event.pressed && event.is_wheel() {
            event.clicks = 1;
        } else if event.pressed {
            event.clicks = self.count_press(event.button, report.row, report.col, now);
            self.held = Some(event.button);
        } else if event.released {
            self.held = None;
            event.clicks = 0;
        }
        event
    }

    fn count_press(&mut self, button: u8, row: u16, col: u16, now: Instant) -> u8 {
        let repeat = self.last_press.is_some_and(|(at, b, r, c)| {
            b == button
                && now.saturating_duration_since(at) <= self.interval
                && r.abs_diff(row) <= self.distance
                && c.abs_diff(col) <= self.distance
        });
        self.count = if repeat {
            (self.count + 1).min(MAX_CLICKS)
        } else {
            1
        };
        self.last_press = Some((now, button, row, col));
        self.count
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Handler for a mouse event. Returns true if it handled the event.
pub type MouseCallback = Arc<dyn Fn(&MouseEvent) -> bool + Send + Sync>;

struct Entry {
    id: HandlerId,
    first_col: u16,
    last_col: u16,
    callback: MouseCallback,
}

#[derive(Default)]
struct RouterInner {
    by_row: HashMap<u16, Vec<Entry>>,
    hooks: Vec<(HandlerId, MouseCallback)>,
    next_id: u64,
}

impl RouterInner {
    fn next_id(&mut self) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Screen coordinate → ordered callback list.
///
/// Internal hooks run first and may consume an event; otherwise every
/// handler registered at the event's cell runs, in registration order.
#[derive(Default)]
pub struct MouseRouter {
    inner: Mutex<RouterInner>,
}

impl fmt::Debug for MouseRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("MouseRouter")
            .field("handlers", &inner.by_row.values().map(Vec::len).sum::<usize>())
            .field("hooks", &inner.hooks.len())
            .finish()
    }
}

impl MouseRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for events at exactly `(row, col)`.
    pub fn add_handler<F>(&self, row: u16, col: u16, handler: F) -> HandlerId
    where
        F: Fn(&MouseEvent) -> bool + Send + Sync + 'static,
    {
        self.add_span_handler(row, col, 1, handler)
    }

    /// Call `handler` for events on `row` in columns `col..col + ncols`.
    pub fn add_span_handler<F>(&self, row: u16, col: u16, ncols: u16, handler: F) -> HandlerId
    where
        F: Fn(&MouseEvent) -> bool + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let id = inner.next_id();
        inner.by_row.entry(row).or_default().push(Entry {
            id,
            first_col: col,
            last_col: col.saturating_add(ncols.max(1) - 1),
            callback: Arc::new(handler),
        });
        id
    }

    /// Remove one coordinate handler or hook. Returns false if not found.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut inner = lock(&self.inner);
        let mut found = false;
        inner.by_row.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            found |= entries.len() != before;
            !entries.is_empty()
        });
        let before = inner.hooks.len();
        inner.hooks.retain(|(hook_id, _)| *hook_id != id);
        found || inner.hooks.len() != before
    }

    /// Remove every coordinate handler, application and grid alike.
    /// Hooks stay.
    pub fn clear_handlers(&self) {
        lock(&self.inner).by_row.clear();
    }

    /// Number of coordinate handlers covering `(row, col)`.
    pub fn handlers_at(&self, row: u16, col: u16) -> usize {
        lock(&self.inner)
            .by_row
            .get(&row)
            .map_or(0, |entries| {
                entries
                    .iter()
                    .filter(|e| (e.first_col..=e.last_col).contains(&col))
                    .count()
            })
    }

    pub fn handler_count(&self) -> usize {
        lock(&self.inner).by_row.values().map(Vec::len).sum()
    }

    /// Register a hook tried before any coordinate handler.
    pub(crate) fn add_hook<F>(&self, hook: F) -> HandlerId
    where
        F: Fn(&MouseEvent) -> bool + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let id = inner.next_id();
        inner.hooks.push((id, Arc::new(hook)));
        id
    }

    /// Route `event`. Returns true if any hook or handler handled it.
    ///
    /// Handlers run without the router lock held.
    pub fn dispatch(&self, event: &MouseEvent) -> bool {
        tracing::trace!(%event, row = event.row, col = event.col, "mouse");

        let hooks: Vec<MouseCallback> = lock(&self.inner)
            .hooks
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        if hooks.iter().any(|hook| hook(event)) {
            return true;
        }

        let handlers: Vec<MouseCallback> = lock(&self.inner)
            .by_row
            .get(&event.row)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| (e.first_col..=e.last_col).contains(&event.col))
                    .map(|e| e.callback.clone())
                    .collect()
            })
            .unwrap_or_default();

        let mut handled = false;
        for handler in &handlers {
            handled |= handler(event);
        }
        handled
    }
}

// =============================================================================
// TESTS
// =============================================================================
