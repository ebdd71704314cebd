//! Interactive border resizing.
//!
//! `Layout` holds the current box rectangles, their border map and the
//! resize state machine. It is pure geometry: the grid feeds it mouse events
//! and keys and acts on the returned `Response`.
//!
//! ```text
//!                 press                     release / Enter / Esc
//!        Idle ------------> Dragging -------------------------------> Idle
//!         |                  (motion moves the border)
//!         | double-click or Ctrl+press
//!         +---------------> ModalResize ----------------------------> Idle
//!                            (wheel and arrows step one cell)   click / Enter / Esc
//! ```

use super::borders::{flanking, BorderMap, BorderSegment, Orientation};
use super::solver::{overlaps, MIN_EXTENT};
use crate::state::MouseEvent;
use crate::types::{Key, Rect};

/// A border being moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeSession {
    /// The segment that was grabbed.
    pub segment: BorderSegment,
    pub orientation: Orientation,
    /// Boxes that grow when the line moves down or right.
    pub before: Vec<usize>,
    /// Boxes that shrink when the line moves down or right.
    pub after: Vec<usize>,
    /// Current row (horizontal line) or column (vertical line).
    pub position: u16,
    /// Where the line was when the session started.
    pub origin: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResizeState {
    #[default]
    Idle,
    /// Following the pointer until the button is released.
    Dragging(ResizeSession),
    /// Stepping with the wheel or arrow keys until a click, Enter or Esc.
    ModalResize(ResizeSession),
}

impl ResizeState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn session(&self) -> Option<&ResizeSession> {
        match self {
            Self::Idle => None,
            Self::Dragging(s) | Self::ModalResize(s) => Some(s),
        }
    }

    fn session_mut(&mut self) -> Option<&mut ResizeSession> {
        match self {
            Self::Idle => None,
            Self::Dragging(s) | Self::ModalResize(s) => Some(s),
        }
    }
}

/// What the caller should do after feeding an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Response {
    /// The event was used and must not reach other handlers.
    pub consumed: bool,
    /// Box rectangles changed.
    pub moved: bool,
    /// Borders need repainting.
    pub redraw: bool,
    /// The session ended; segments may have changed.
    pub finished: bool,
}

impl Response {
    fn consumed() -> Self {
        Self {
            consumed: true,
            ..Self::default()
        }
    }
}

// =============================================================================
// Layout
// =============================================================================

#[derive(Debug, Clone)]
pub struct Layout {
    root: Rect,
    rects: Vec<Rect>,
    borders: BorderMap,
    segments: Vec<BorderSegment>,
    state: ResizeState,
}

impl Layout {
    pub fn new(root: Rect, rects: Vec<Rect>) -> Self {
        let borders = BorderMap::new(root, &rects);
        let segments = borders.segments(&rects);
        Self {
            root,
            rects,
            borders,
            segments,
            state: ResizeState::Idle,
        }
    }

    pub fn root(&self) -> Rect {
        self.root
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn rect(&self, id: usize) -> Option<Rect> {
        self.rects.get(id).copied()
    }

    pub fn borders(&self) -> &BorderMap {
        &self.borders
    }

    pub fn segments(&self) -> &[BorderSegment] {
        &self.segments
    }

    pub fn state(&self) -> &ResizeState {
        &self.state
    }

    /// Replace every rectangle. Any resize in progress is dropped.
    pub fn reset(&mut self, root: Rect, rects: Vec<Rect>) {
        *self = Self::new(root, rects);
    }

    /// Append a box.
    pub fn push(&mut self, rect: Rect) -> usize {
        self.rects.push(rect);
        self.rebuild_borders();
        self.rects.len() - 1
    }

    /// Index of the segment covering a cell.
    pub fn segment_at(&self, row: u16, col: u16) -> Option<usize> {
        self.segments.iter().position(|s| s.contains(row, col))
    }

    /// Index of the box whose interior holds a cell.
    pub fn box_at(&self, row: u16, col: u16) -> Option<usize> {
        self.rects.iter().position(|r| r.inner().contains(row, col))
    }

    fn rebuild_borders(&mut self) {
        self.borders = BorderMap::new(self.root, &self.rects);
        self.segments = self.borders.segments(&self.rects);
        if let Some(session) = self.state.session() {
            let (lo, hi) = extent(&self.rects, session);
            let (orientation, line) = (session.orientation, session.position);
            for along in lo..=hi {
                let (row, col) = match orientation {
                    Orientation::Horizontal => (line, along),
                    Orientation::Vertical => (along, line),
                };
                if self.borders.is_border(row, col) {
                    self.borders.set_highlight(row, col, true);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // State machine
    // -------------------------------------------------------------------------

    /// A press on a border cell. Starts a drag, or a modal resize on a
    /// double-click or Ctrl+press.
    pub fn begin(&mut self, segment: usize, event: &MouseEvent) -> Response {
        if !self.state.is_idle() || event.button != 1 || !event.pressed || event.moving {
            return Response::default();
        }
        let Some(segment) = self.segments.get(segment).cloned() else {
            return Response::default();
        };
        if !segment.is_draggable() {
            return Response::default();
        }

        let (before, after) = group(&self.rects, &segment);
        let session = ResizeSession {
            orientation: segment.orientation,
            position: segment.line,
            origin: segment.line,
            segment,
            before,
            after,
        };
        tracing::debug!(
            line = session.position,
            orientation = ?session.orientation,
            modal = event.clicks >= 2 || event.ctrl,
            "border resize started"
        );
        self.state = if event.clicks >= 2 || event.ctrl {
            ResizeState::ModalResize(session)
        } else {
            ResizeState::Dragging(session)
        };
        self.rebuild_borders();
        Response {
            consumed: true,
            redraw: true,
            ..Response::default()
        }
    }

    /// Mouse events while a resize is active. Idle events pass through.
    pub fn handle_mouse(&mut self, event: &MouseEvent) -> Response {
        match &self.state {
            ResizeState::Idle => Response::default(),
            ResizeState::Dragging(session) => {
                if event.released {
                    return self.finish();
                }
                if event.moving {
                    let target = match session.orientation {
                        Orientation::Horizontal => event.row,
                        Orientation::Vertical => event.col,
                    };
                    let delta = i32::from(target) - i32::from(session.position);
                    return self.step(delta);
                }
                Response::consumed()
            }
            ResizeState::ModalResize(_) => {
                if event.is_wheel() {
                    return self.step(if event.button == 4 { -1 } else { 1 });
                }
                if event.pressed && !event.moving && (1..=3).contains(&event.button) {
                    return self.finish();
                }
                Response::consumed()
            }
        }
    }

    /// Keys while a resize is active. Redraw and resize keys pass through.
    pub fn handle_key(&mut self, key: Key) -> Response {
        let Some(session) = self.state.session() else {
            return Response::default();
        };
        if matches!(key, Key::FF | Key::REFRESH | Key::RESIZE) {
            return Response::default();
        }
        if key.is_enter() || key == Key::ESC {
            return self.finish();
        }
        if let ResizeState::ModalResize(_) = self.state {
            let delta = match (session.orientation, key) {
                (Orientation::Vertical, Key::LEFT) | (Orientation::Horizontal, Key::UP) => -1,
                (Orientation::Vertical, Key::RIGHT) | (Orientation::Horizontal, Key::DOWN) => 1,
                _ => 0,
            };
            if delta != 0 {
                return self.step(delta);
            }
        }
        Response::consumed()
    }

    /// Abandon any resize in progress, keeping the geometry reached so far.
    pub fn cancel(&mut self) {
        if !self.state.is_idle() {
            self.state = ResizeState::Idle;
            self.rebuild_borders();
        }
    }

    fn finish(&mut self) -> Response {
        if let Some(session) = self.state.session() {
            tracing::debug!(
                from = session.origin,
                to = session.position,
                "border resize finished"
            );
        }
        self.state = ResizeState::Idle;
        self.rebuild_borders();
        Response {
            consumed: true,
            redraw: true,
            finished: true,
            ..Response::default()
        }
    }

    fn step(&mut self, delta: i32) -> Response {
        let moved = self.move_by(delta) != 0;
        Response {
            consumed: true,
            moved,
            redraw: moved,
            finished: false,
        }
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    /// Move the active border by up to `delta` cells; returns the distance
    /// actually moved.
    ///
    /// Movement stops where a box on either side would drop below the
    /// minimum extent or run into a box outside the group.
    pub fn move_by(&mut self, delta: i32) -> i32 {
        let Some(session) = self.state.session() else {
            return 0;
        };
        let delta = self.clamp_delta(session, delta);
        if delta == 0 {
            return 0;
        }
        let moved = moved_rects(&self.rects, session, delta);
        for (id, rect) in moved {
            self.rects[id] = rect;
        }
        if let Some(session) = self.state.session_mut() {
            session.position = (i32::from(session.position) + delta) as u16;
        }
        self.rebuild_borders();
        delta
    }

    fn clamp_delta(&self, session: &ResizeSession, delta: i32) -> i32 {
        let extent = |id: &usize| {
            let r = self.rects[*id];
            i32::from(match session.orientation {
                Orientation::Horizontal => r.height,
                Orientation::Vertical => r.width,
            })
        };
        let low = session.before.iter().map(|id| MIN_EXTENT - extent(id)).max();
        let high = session.after.iter().map(|id| extent(id) - MIN_EXTENT).min();
        let (Some(low), Some(high)) = (low, high) else {
            return 0;
        };
        if low > high {
            return 0;
        }
        let mut delta = delta.clamp(low.min(0), high.max(0));
        while delta != 0 && !self.fits(session, delta) {
            delta -= delta.signum();
        }
        delta
    }

    fn fits(&self, session: &ResizeSession, delta: i32) -> bool {
        let moved = moved_rects(&self.rects, session, delta);
        let mut rects = self.rects.clone();
        for (id, rect) in &moved {
            rects[*id] = *rect;
        }
        moved.iter().all(|(id, rect)| {
            rect.intersect(&self.root) == *rect
                && rects
                    .iter()
                    .enumerate()
                    .all(|(other, r)| other == *id || r.is_empty() || !overlaps(*rect, *r))
        })
    }
}

/// Close the flanking sets of a segment over the whole line: every box
/// that borders the line alongside a box already in the group joins it.
fn group(rects: &[Rect], segment: &BorderSegment) -> (Vec<usize>, Vec<usize>) {
    let (mut lo, mut hi) = (segment.start, segment.end);
    loop {
        let (before, after) = flanking(rects, segment.orientation, segment.line, lo, hi);
        let (mut next_lo, mut next_hi) = (lo, hi);
        for id in before.iter().chain(&after) {
            let (from, to) = along(rects[*id], segment.orientation);
            next_lo = next_lo.min(from);
            next_hi = next_hi.max(to);
        }
        if (next_lo, next_hi) == (lo, hi) {
            return (before, after);
        }
        lo = next_lo;
        hi = next_hi;
    }
}

/// Outer extent of a box along a line of the given orientation.
fn along(rect: Rect, orientation: Orientation) -> (u16, u16) {
    match orientation {
        Orientation::Horizontal => (rect.left, rect.right()),
        Orientation::Vertical => (rect.top, rect.bottom()),
    }
}

/// Cells along the active line covered by its group.
fn extent(rects: &[Rect], session: &ResizeSession) -> (u16, u16) {
    session
        .before
        .iter()
        .chain(&session.after)
        .map(|id| along(rects[*id], session.orientation))
        .fold((u16::MAX, 0), |(lo, hi), (from, to)| (lo.min(from), hi.max(to)))
}

fn moved_rects(rects: &[Rect], session: &ResizeSession, delta: i32) -> Vec<(usize, Rect)> {
    let grow = |r: Rect| match session.orientation {
        Orientation::Horizontal => Rect {
            height: (i32::from(r.height) + delta) as u16,
            ..r
        },
        Orientation::Vertical => Rect {
            width: (i32::from(r.width) + delta) as u16,
            ..r
        },
    };
    let shift = |r: Rect| match session.orientation {
        Orientation::Horizontal => Rect {
            top: (i32::from(r.top) + delta) as u16,
            height: (i32::from(r.height) - delta) as u16,
            ..r
        },
        Orientation::Vertical => Rect {
            left: (i32::from(r.left) + delta) as u16,
            width: (i32::from(r.width) - delta) as u16,
            ..r
        },
    };
    session
        .before
        .iter()
        .map(|id| (*id, grow(rects[*id])))
        .chain(session.after.iter().map(|id| (*id, shift(rects[*id]))))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
