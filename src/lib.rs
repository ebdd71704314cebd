//! # gridterm
//!
//! Thread-safe terminal I/O with key and mouse dispatch, and grids of
//! windows that share borders the user can drag to resize.
//!
//! ## Architecture
//!
//! Every drawing operation goes through one display lock; reading input
//! takes a separate lock, so a background thread can draw while the main
//! thread waits for a key:
//!
//! ```text
//! EventSource → getkey ─┬→ FunctionKeyRegistry (function keys)
//!                       └→ MouseRouter (hooks, then coordinate handlers)
//!                              → Grid (border drag / resize mode)
//!                                  → Screen (windows → frame → diff) → Backend
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Keys, rectangles, cells and styles
//! - [`backend`] - Terminal driver traits, crossterm driver, headless driver
//! - [`renderer`] - Frame buffer and diff renderer
//! - [`pipeline`] - Session, windows and the `run` wrapper
//! - [`state`] - Function keys, mouse routing, `getkey` / `getline`
//! - [`layout`] - Constraint-placed boxes with shared, draggable borders
//! - [`log`] - `tracing` output into a window
//!
//! ## Example
//!
//! ```ignore
//! use gridterm::{getkey, run, BoxRef, BoxSpec, Grid, Key, KeyRead, SessionConfig};
//!
//! run(SessionConfig::default(), |session| {
//!     let grid = Grid::new(&session.stdscr())?;
//!     grid.layout(vec![
//!         BoxSpec::new("left", 0, 30)
//!             .top(BoxRef::Grid).bottom(BoxRef::Grid).left(BoxRef::Grid),
//!         BoxSpec::new("right", 0, 0)
//!             .top(BoxRef::Grid).bottom(BoxRef::Grid)
//!             .left2r("left").right(BoxRef::Grid),
//!     ])?;
//!     let stdscr = session.stdscr();
//!     while let KeyRead::Key(key) = getkey(&stdscr, false)? {
//!         if key == Key::from('q') {
//!             break;
//!         }
//!     }
//!     Ok(())
//! })
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod layout;
pub mod log;
pub mod pipeline;
pub mod renderer;
pub mod state;
pub mod types;

pub use types::{Attr, Cell, Color, Key, Rect, Style};

pub use error::{ConfigError, Error, Result};

pub use config::SessionConfig;

pub use backend::{Backend, EventSource, MouseReport, RawInput};

pub use pipeline::{run, run_with, Screen, TerminalSession, Window, STDSCR};

pub use state::{
    getkey, getline, FunctionKeyRegistry, HandlerId, KeyRead, MouseEvent, MouseRouter, MouseState,
};

pub use layout::{
    Axis, BorderSegment, BoxRef, BoxSpec, EdgeConstraint, Grid, GridBuilder, Orientation,
    ResizeState, Side, MIN_EXTENT,
};

pub use log::{color_for, WindowSink};
