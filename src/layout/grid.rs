//! Grid - named boxes tiling a window, with shared draggable borders.
//!
//! A `Grid` owns a window (usually `stdscr`), draws the border lines of the
//! boxes added to it and gives each box its own window one cell inside its
//! border. Borders shared by two boxes can be dragged with the mouse, or
//! stepped with the wheel and arrow keys after a double-click.
//!
//! The grid hooks into the session when created:
//!
//! - `Key::RESIZE` rebuilds the layout for the new terminal size
//! - `Ctrl-L` and `Key::REFRESH` repaint the screen
//! - a mouse hook starts a resize on a movable border and drives it
//! - a key interceptor drives modal resizing
//!
//! Border presses never go through coordinate handlers, so
//! `MouseRouter::clear_handlers` leaves every grid working. Dropping the last
//! clone of a grid unregisters all of this and deletes the box windows.
//!
//! # Example
//!
//! ```ignore
//! use gridterm::{run, BoxRef, BoxSpec, Grid, SessionConfig};
//!
//! run(SessionConfig::default(), |session| {
//!     let grid = Grid::with_builder(&session.stdscr(), |grid| {
//!         grid.add_box(BoxSpec::new("menu", 0, 20)
//!             .top(BoxRef::Grid).bottom(BoxRef::Grid).left(BoxRef::Grid))?;
//!         grid.add_box(BoxSpec::new("main", 0, 0)
//!             .top(BoxRef::Grid).bottom(BoxRef::Grid)
//!             .left2r("menu").right(BoxRef::Grid))?;
//!         Ok(())
//!     })?;
//!     let main = grid.window("main").unwrap();
//!     while let Some(line) = gridterm::getline(&main)? {
//!         main.put_str(&format!("{line}\n"))?;
//!     }
//!     Ok(())
//! })
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use super::borders::BorderSegment;
use super::constraint::BoxSpec;
use super::resize::{Layout, ResizeState, Response};
use super::solver;
use crate::error::{lock, ConfigError, Result};
use crate::pipeline::{TerminalSession, Window};
use crate::state::{HandlerId, MouseEvent};
use crate::types::{Attr, Cell, Key, Rect, Style};

/// Rebuilds a grid from scratch; called again after every terminal resize.
pub type GridBuilder = Arc<dyn Fn(&Grid) -> Result<()> + Send + Sync>;

#[derive(Default)]
struct Registrations {
    keys: Vec<HandlerId>,
    interceptor: Option<HandlerId>,
    hook: Option<HandlerId>,
}

struct GridInner {
    window: Window,
    specs: Vec<BoxSpec>,
    /// One per spec: the box interior.
    windows: Vec<Window>,
    layout: Layout,
    builder: Option<GridBuilder>,
    border_style: Style,
    background: Style,
    /// Windows of the previous build, by name, while a builder runs.
    retired: Option<HashMap<String, Window>>,
    handlers: Registrations,
}

impl Drop for GridInner {
    fn drop(&mut self) {
        let session = self.window.session();
        for id in self.handlers.keys.drain(..) {
            session.keys().remove(id);
        }
        if let Some(id) = self.handlers.interceptor.take() {
            session.keys().remove_interceptor(id);
        }
        if let Some(id) = self.handlers.hook.take() {
            session.mouse().remove_handler(id);
        }
        let retired = self.retired.take().into_iter().flat_map(HashMap::into_values);
        for window in self.windows.drain(..).chain(retired) {
            window.delete();
        }
    }
}

/// A set of boxes laid out in a window. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Grid {
    inner: Arc<Mutex<GridInner>>,
    session: Arc<TerminalSession>,
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let g = lock(&self.inner);
        f.debug_struct("Grid")
            .field("root", &g.layout.root())
            .field("boxes", &g.specs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>())
            .field("state", g.layout.state())
            .finish()
    }
}

// =============================================================================
// Construction
// =============================================================================

impl Grid {
    /// An empty grid covering `window`.
    pub fn new(window: &Window) -> Result<Self> {
        let session = window.session().clone();
        let root = window.rect()?;
        let inner = GridInner {
            window: window.clone(),
            specs: Vec::new(),
            windows: Vec::new(),
            layout: Layout::new(root, Vec::new()),
            builder: None,
            border_style: Style::new(),
            background: Style::new(),
            retired: None,
            handlers: Registrations::default(),
        };
        let grid = Self {
            inner: Arc::new(Mutex::new(inner)),
            session,
        };
        grid.install();
        grid.redraw()?;
        tracing::debug!(?root, "grid created");
        Ok(grid)
    }

    /// A grid populated by `builder`, which runs again after every terminal
    /// resize.
    pub fn with_builder<F>(window: &Window, builder: F) -> Result<Self>
    where
        F: Fn(&Grid) -> Result<()> + Send + Sync + 'static,
    {
        let grid = Self::new(window)?;
        grid.set_builder(builder)?;
        Ok(grid)
    }

    /// Replace the builder and rebuild with it.
    pub fn set_builder<F>(&self, builder: F) -> Result<()>
    where
        F: Fn(&Grid) -> Result<()> + Send + Sync + 'static,
    {
        lock(&self.inner).builder = Some(Arc::new(builder));
        self.rebuild()
    }

    fn upgrade(weak: &Weak<Mutex<GridInner>>) -> Option<Self> {
        let inner = weak.upgrade()?;
        let session = lock(&inner).window.session().clone();
        Some(Self { inner, session })
    }

    fn install(&self) {
        let weak = Arc::downgrade(&self.inner);
        let keys = self.session.keys();

        let on_key = |action: fn(&Grid) -> Result<()>, what: &'static str| {
            let weak = weak.clone();
            move |key: Key| {
                if let Some(grid) = Grid::upgrade(&weak) {
                    if let Err(err) = action(&grid) {
                        tracing::warn!(error = %err, %key, "grid {what} failed");
                    }
                }
            }
        };
        let mut ids = vec![keys.register(Key::RESIZE, on_key(Grid::rebuild, "rebuild"))];
        for key in [Key::FF, Key::REFRESH] {
            ids.push(keys.register(key, on_key(Grid::repaint, "repaint")));
        }

        let interceptor = keys.add_interceptor({
            let weak = weak.clone();
            move |key: Key| Grid::upgrade(&weak).is_some_and(|grid| grid.on_key(key))
        });
        let hook = self.session.mouse().add_hook({
            let weak = weak.clone();
            move |event: &MouseEvent| {
                Grid::upgrade(&weak).is_some_and(|grid| grid.on_mouse(event))
            }
        });

        let mut g = lock(&self.inner);
        g.handlers.keys = ids;
        g.handlers.interceptor = Some(interceptor);
        g.handlers.hook = Some(hook);
    }
}

// =============================================================================
// Boxes
// =============================================================================

impl Grid {
    /// Add a box and return its window.
    ///
    /// The box is checked against the grid and the boxes already in it; on
    /// error the grid is left unchanged. During a rebuild the window of the
    /// previous box with the same name is reused, so its content survives.
    pub fn add_box(&self, spec: BoxSpec) -> Result<Window> {
        solver::validate(&spec)?;
        let mut g = lock(&self.inner);

        if g.specs.iter().any(|s| s.name == spec.name) {
            return Err(ConfigError::DuplicateBox(spec.name).into());
        }
        if let Some(missing) = spec
            .references()
            .find(|r| !g.specs.iter().any(|s| s.name == *r))
        {
            return Err(ConfigError::UnknownBox {
                name: spec.name.clone(),
                reference: missing.to_string(),
            }
            .into());
        }

        let rebuilding = g.retired.is_some();
        let rect = if rebuilding {
            // placed once the builder is done
            Rect::default()
        } else {
            let root = g.layout.root();
            let placed: HashMap<String, Rect> = g
                .specs
                .iter()
                .map(|s| s.name.clone())
                .zip(g.layout.rects().iter().copied())
                .collect();
            let placement = solver::resolve(&spec, root, &placed)?;
            let others = g
                .specs
                .iter()
                .zip(g.layout.rects())
                .filter(|(_, r)| !r.is_empty())
                .map(|(s, r)| (s.name.as_str(), *r));
            solver::check_placement(&spec, &placement, root, others)?
        };

        let reused = g.retired.as_mut().and_then(|r| r.remove(&spec.name));
        let window = match reused {
            Some(window) => window,
            None => self.session.new_window(rect.inner()),
        };
        window.set_background(spec.background.unwrap_or(g.background))?;

        tracing::debug!(name = %spec.name, ?rect, "box added");
        g.layout.push(rect);
        g.specs.push(spec);
        g.windows.push(window.clone());
        drop(g);

        if !rebuilding {
            self.redraw()?;
        }
        Ok(window)
    }

    /// Add several boxes in any order; references are resolved first.
    ///
    /// Returns the windows in the order the specs were given.
    pub fn layout(&self, specs: Vec<BoxSpec>) -> Result<Vec<Window>> {
        let existing: Vec<BoxSpec> = lock(&self.inner).specs.clone();
        let offset = existing.len();
        let all: Vec<BoxSpec> = existing.into_iter().chain(specs.iter().cloned()).collect();
        let order = solver::dependency_order(&all)?;

        let mut windows: Vec<Option<Window>> = vec![None; specs.len()];
        for i in order.into_iter().filter(|&i| i >= offset) {
            windows[i - offset] = Some(self.add_box(all[i].clone())?);
        }
        Ok(windows.into_iter().flatten().collect())
    }

    /// The window of a box.
    pub fn window(&self, name: &str) -> Option<Window> {
        let g = lock(&self.inner);
        let i = g.specs.iter().position(|s| s.name == name)?;
        Some(g.windows[i].clone())
    }

    /// Outer rectangle of a box, border included.
    pub fn rect(&self, name: &str) -> Option<Rect> {
        let g = lock(&self.inner);
        let i = g.specs.iter().position(|s| s.name == name)?;
        g.layout.rect(i)
    }

    pub fn names(&self) -> Vec<String> {
        lock(&self.inner).specs.iter().map(|s| s.name.clone()).collect()
    }

    /// The box window whose interior holds a screen cell.
    pub fn window_at(&self, row: u16, col: u16) -> Option<Window> {
        let g = lock(&self.inner);
        let i = g.layout.box_at(row, col)?;
        Some(g.windows[i].clone())
    }

    pub fn root(&self) -> Rect {
        lock(&self.inner).layout.root()
    }

    pub fn segments(&self) -> Vec<BorderSegment> {
        lock(&self.inner).layout.segments().to_vec()
    }

    pub fn resize_state(&self) -> ResizeState {
        lock(&self.inner).layout.state().clone()
    }

    /// Style of the border lines.
    pub fn set_border_style(&self, style: Style) -> Result<()> {
        lock(&self.inner).border_style = style;
        self.redraw()
    }

    /// Default background of box windows added from now on.
    pub fn set_background(&self, style: Style) {
        lock(&self.inner).background = style;
    }
}

// =============================================================================
// Rebuild and drawing
// =============================================================================

impl Grid {
    /// Lay the boxes out again for the current size of the grid window.
    ///
    /// With a builder the grid is emptied and the builder re-adds the boxes;
    /// otherwise the stored specs are resolved again. Either way boxes that
    /// no longer fit are shrunk, then clipped, then hidden.
    pub fn rebuild(&self) -> Result<()> {
        let (root, builder) = {
            let mut g = lock(&self.inner);
            let root = g.window.rect()?;
            g.layout.cancel();
            (root, g.builder.clone())
        };
        tracing::debug!(?root, "grid rebuild");

        let mut outcome = Ok(());
        if let Some(builder) = builder {
            {
                let mut g = lock(&self.inner);
                let specs = std::mem::take(&mut g.specs);
                let windows = std::mem::take(&mut g.windows);
                let retired = specs.into_iter().map(|s| s.name).zip(windows).collect();
                g.retired = Some(retired);
                g.layout.reset(root, Vec::new());
            }
            outcome = builder(self);
            let leftover = lock(&self.inner).retired.take();
            for (name, window) in leftover.into_iter().flatten() {
                tracing::debug!(%name, "box dropped by rebuild");
                window.delete();
            }
        }

        self.fit(root)?;
        self.redraw()?;
        outcome
    }

    fn fit(&self, root: Rect) -> Result<()> {
        let mut g = lock(&self.inner);
        let fitted = solver::solve_fitting(root, &g.specs)?;
        if !fitted.shrunk.is_empty() || !fitted.hidden.is_empty() {
            tracing::warn!(
                shrunk = ?fitted.shrunk,
                hidden = ?fitted.hidden,
                "grid does not fit, boxes reduced"
            );
        }
        for (window, rect) in g.windows.iter().zip(&fitted.rects) {
            place(window, *rect)?;
        }
        g.layout.reset(root, fitted.rects);
        Ok(())
    }

    /// Draw borders and boxes.
    pub fn redraw(&self) -> Result<()> {
        self.draw(false)
    }

    /// Draw and repaint every cell of the terminal.
    pub fn repaint(&self) -> Result<()> {
        self.draw(true)
    }

    fn draw(&self, full: bool) -> Result<()> {
        let g = lock(&self.inner);
        let id = g.window.id();
        let root = g.layout.root();
        let normal = g.border_style;
        let lit = normal.patch(Style::new().attrs(Attr::REVERSE));
        let boxes: Vec<usize> = g
            .windows
            .iter()
            .zip(g.layout.rects())
            .filter(|(_, r)| !r.is_empty())
            .map(|(w, _)| w.id())
            .collect();

        self.session.with_screen(|screen| {
            screen.clear_window(id)?;
            for (row, col, ch, highlighted) in g.layout.borders().cells() {
                let style = if highlighted { lit } else { normal };
                screen.put_cell_at(id, row - root.top, col - root.left, Cell::new(ch, style))?;
            }
            screen.refresh_window(id)?;
            for b in boxes {
                screen.touch(b)?;
                screen.refresh_window(b)?;
            }
            if full {
                screen.redraw()
            } else {
                screen.update()
            }
        })
    }
}

// =============================================================================
// Events
// =============================================================================

impl Grid {
    fn on_mouse(&self, event: &MouseEvent) -> bool {
        let response = {
            let mut g = lock(&self.inner);
            if g.layout.state().is_idle() {
                match g.layout.segment_at(event.row, event.col) {
                    Some(segment) => g.layout.begin(segment, event),
                    None => Response::default(),
                }
            } else {
                g.layout.handle_mouse(event)
            }
        };
        self.apply(response)
    }

    fn on_key(&self, key: Key) -> bool {
        let response = lock(&self.inner).layout.handle_key(key);
        self.apply(response)
    }

    fn apply(&self, response: Response) -> bool {
        if response.moved {
            let g = lock(&self.inner);
            for (window, rect) in g.windows.iter().zip(g.layout.rects()) {
                if let Err(err) = place(window, *rect) {
                    tracing::warn!(error = %err, "moving box window failed");
                }
            }
        }
        if response.redraw || response.moved {
            if let Err(err) = self.redraw() {
                tracing::warn!(error = %err, "grid redraw failed");
            }
        }
        response.consumed
    }
}

/// Fit a box window to the interior of its outer rectangle.
fn place(window: &Window, rect: Rect) -> Result<()> {
    let inner = rect.inner();
    window.resize(inner.height, inner.width)?;
    window.move_window(inner.top, inner.left)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test::{ScriptedInput, TestBackend};
    use crate::config::SessionConfig;
    use crate::error::Error;
    use crate::layout::BoxRef;
    use crate::state::MouseState;

    fn setup(rows: u16, cols: u16) -> (Arc<TerminalSession>, TestBackend) {
        let backend = TestBackend::new(rows, cols);
        let session =
            TerminalSession::new(backend.clone(), ScriptedInput::new(), SessionConfig::default())
                .unwrap();
        (session, backend)
    }

    fn halves(grid: &Grid) -> Result<()> {
        grid.add_box(
            BoxSpec::new("left", 0, 10)
                .top(BoxRef::Grid)
                .bottom(BoxRef::Grid)
                .left(BoxRef::Grid),
        )?;
        grid.add_box(
            BoxSpec::new("right", 0, 0)
                .top(BoxRef::Grid)
                .bottom(BoxRef::Grid)
                .left2r("left")
                .right(BoxRef::Grid),
        )?;
        Ok(())
    }

    #[test]
    fn test_boxes_draw_shared_border() {
        let (session, backend) = setup(5, 20);
        let grid = Grid::new(&session.stdscr()).unwrap();
        halves(&grid).unwrap();
        assert_eq!(backend.row_text(0), "┌────────┬─────────┐");
        assert_eq!(backend.row_text(2), "│        │         │");
        assert_eq!(backend.row_text(4), "└────────┴─────────┘");
        assert_eq!(grid.window("right").unwrap().rect().unwrap(), Rect::new(1, 10, 3, 9));
    }

    #[test]
    fn test_add_box_errors_leave_grid_unchanged() {
        let (session, _) = setup(5, 20);
        let grid = Grid::new(&session.stdscr()).unwrap();
        halves(&grid).unwrap();
        let dup = grid.add_box(BoxSpec::new("left", 3, 3));
        assert!(matches!(dup, Err(Error::Config(ConfigError::DuplicateBox(_)))));
        let unknown = grid.add_box(BoxSpec::new("x", 3, 3).left2r("nope"));
        assert!(matches!(unknown, Err(Error::Config(ConfigError::UnknownBox { .. }))));
        let overlap = grid.add_box(BoxSpec::new("x", 3, 3).offset(1, 1));
        assert!(matches!(overlap, Err(Error::Config(ConfigError::Overlap { .. }))));
        assert_eq!(grid.names(), vec!["left", "right"]);
    }

    fn press_at(row: u16, col: u16) -> MouseEvent {
        MouseEvent::new(row, col, MouseState::BUTTON1 | MouseState::PRESSED)
    }

    fn release_at(row: u16, col: u16) -> MouseEvent {
        MouseEvent::new(row, col, MouseState::BUTTON1 | MouseState::RELEASED)
    }

    #[test]
    fn test_border_press_starts_drag_without_coordinate_handlers() {
        let (session, _) = setup(5, 20);
        let grid = Grid::new(&session.stdscr()).unwrap();
        halves(&grid).unwrap();
        assert_eq!(session.mouse().handlers_at(2, 9), 0);

        assert!(!session.mouse().dispatch(&press_at(2, 5)));
        assert!(grid.resize_state().is_idle());
        // corner of the outer frame, not movable
        assert!(!session.mouse().dispatch(&press_at(0, 9)));
        assert!(grid.resize_state().is_idle());

        assert!(session.mouse().dispatch(&press_at(2, 9)));
        assert!(matches!(grid.resize_state(), ResizeState::Dragging(_)));
    }

    #[test]
    fn test_clear_handlers_keeps_borders_movable() {
        let (session, _) = setup(5, 20);
        let grid = Grid::new(&session.stdscr()).unwrap();
        halves(&grid).unwrap();
        session.mouse().clear_handlers();

        assert!(session.mouse().dispatch(&press_at(2, 9)));
        assert!(matches!(grid.resize_state(), ResizeState::Dragging(_)));
    }

    #[test]
    fn test_rebuild_keeps_other_grids_and_app_handlers() {
        let (session, _) = setup(10, 20);
        let top = session.new_window(Rect::new(0, 0, 5, 20));
        let bottom = session.new_window(Rect::new(5, 0, 5, 20));
        let upper = Grid::with_builder(&top, halves).unwrap();
        let lower = Grid::with_builder(&bottom, halves).unwrap();
        session.mouse().add_handler(7, 3, |_| true);

        session.keys().dispatch(Key::RESIZE);
        assert_eq!(session.mouse().handlers_at(7, 3), 1);

        assert!(session.mouse().dispatch(&press_at(2, 9)));
        assert!(matches!(upper.resize_state(), ResizeState::Dragging(_)));
        assert!(lower.resize_state().is_idle());
        session.mouse().dispatch(&release_at(2, 9));

        assert!(session.mouse().dispatch(&press_at(7, 9)));
        assert!(matches!(lower.resize_state(), ResizeState::Dragging(_)));
    }

    #[test]
    fn test_drag_resizes_windows() {
        let (session, backend) = setup(5, 20);
        let grid = Grid::new(&session.stdscr()).unwrap();
        halves(&grid).unwrap();
        assert!(session.mouse().dispatch(&press_at(2, 9)));
        assert!(matches!(grid.resize_state(), ResizeState::Dragging(_)));

        let motion = MouseEvent::new(
            2,
            13,
            MouseState::BUTTON1 | MouseState::PRESSED | MouseState::MOTION,
        );
        session.mouse().dispatch(&motion);
        session.mouse().dispatch(&release_at(2, 13));

        assert!(grid.resize_state().is_idle());
        assert_eq!(grid.rect("left").unwrap(), Rect::new(0, 0, 5, 14));
        assert_eq!(grid.window("right").unwrap().rect().unwrap(), Rect::new(1, 14, 3, 5));
        assert_eq!(backend.row_text(0), "┌────────────┬─────┐");

        // the border now lives at column 13
        assert!(!session.mouse().dispatch(&press_at(2, 9)));
        assert!(session.mouse().dispatch(&press_at(2, 13)));
        assert!(matches!(grid.resize_state(), ResizeState::Dragging(_)));
    }

    #[test]
    fn test_rebuild_with_builder_reuses_windows() {
        let (session, backend) = setup(5, 20);
        let grid = Grid::with_builder(&session.stdscr(), halves).unwrap();
        let right = grid.window("right").unwrap();

        backend.resize(6, 30);
        session.with_screen(|s| s.resize_terminal(6, 30)).unwrap();
        session.keys().dispatch(Key::RESIZE);

        assert_eq!(grid.window("right").unwrap(), right);
        assert_eq!(grid.rect("right").unwrap(), Rect::new(0, 9, 6, 21));
        assert_eq!(backend.row_text(5), "└────────┴───────────────────┘");
    }

    #[test]
    fn test_window_at() {
        let (session, _) = setup(5, 20);
        let grid = Grid::new(&session.stdscr()).unwrap();
        halves(&grid).unwrap();
        assert_eq!(grid.window_at(2, 3), grid.window("left"));
        assert_eq!(grid.window_at(2, 15), grid.window("right"));
        assert_eq!(grid.window_at(2, 9), None);
    }

    #[test]
    fn test_dropped_grid_unregisters() {
        let (session, _) = setup(5, 20);
        let grid = Grid::new(&session.stdscr()).unwrap();
        halves(&grid).unwrap();
        let left = grid.window("left").unwrap();
        let right = grid.window("right").unwrap();
        drop(grid);
        assert!(!session.keys().is_registered(Key::RESIZE));
        assert_eq!(session.mouse().handler_count(), 0);
        assert!(!session.mouse().dispatch(&press_at(2, 9)));
        assert!(left.rect().is_err());
        assert!(right.rect().is_err());
        assert!(session.stdscr().rect().is_ok());
    }
}
