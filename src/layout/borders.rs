//! Border map - which cells are border lines, how they join, and the
//! segments a user can drag.
//!
//! Every box outline (and the root perimeter) is stamped into a per-cell
//! link mask. Where outlines meet the masks combine, so two boxes sharing an
//! edge produce tees and crosses instead of doubled lines.
//!
//! # API
//!
//! - `BorderMap::new(root, rects)` - Stamp the root and every visible box
//! - `BorderMap::glyph_at(row, col)` - Line-drawing character for a cell
//! - `BorderMap::segments(rects)` - Split interior borders into segments

use bitflags::bitflags;

use crate::types::Rect;

bitflags! {
    /// Directions a border cell connects in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Links: u8 {
        const UP = 1;
        const RIGHT = 2;
        const DOWN = 4;
        const LEFT = 8;
    }
}

/// Box-drawing character for a link mask.
pub fn glyph(links: Links) -> Option<char> {
    Some(match links.bits() {
        3 => '└',
        5 => '│',
        6 => '┌',
        7 => '├',
        9 => '┘',
        10 => '─',
        11 => '┴',
        12 => '┐',
        13 => '┤',
        14 => '┬',
        15 => '┼',
        _ => return None,
    })
}

/// Direction a border line runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// A row of cells; dragging moves it up and down.
    Horizontal,
    /// A column of cells; dragging moves it left and right.
    Vertical,
}

/// A maximal straight run of interior border cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderSegment {
    pub orientation: Orientation,
    /// Row of a horizontal segment, column of a vertical one.
    pub line: u16,
    /// First and last cell along the line, inclusive.
    pub start: u16,
    pub end: u16,
    /// Boxes above (or left of) the line whose interior touches the run.
    pub before: Vec<usize>,
    /// Boxes below (or right of) the line.
    pub after: Vec<usize>,
    /// Box that draws the segment.
    pub owner: Option<usize>,
}

impl BorderSegment {
    pub fn contains(&self, row: u16, col: u16) -> bool {
        let (line, along) = match self.orientation {
            Orientation::Horizontal => (row, col),
            Orientation::Vertical => (col, row),
        };
        line == self.line && along >= self.start && along <= self.end
    }

    /// `(row, col)` of every cell in the segment.
    pub fn cells(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        (self.start..=self.end).map(move |along| match self.orientation {
            Orientation::Horizontal => (self.line, along),
            Orientation::Vertical => (along, self.line),
        })
    }

    /// Only a border with boxes on both sides can be moved.
    pub fn is_draggable(&self) -> bool {
        !self.before.is_empty() && !self.after.is_empty()
    }
}

// =============================================================================
// BorderMap
// =============================================================================

#[derive(Debug, Clone)]
pub struct BorderMap {
    root: Rect,
    links: Vec<Links>,
    highlight: Vec<bool>,
}

impl BorderMap {
    /// Stamp the root perimeter and every non-empty rectangle.
    pub fn new(root: Rect, rects: &[Rect]) -> Self {
        let size = root.area() as usize;
        let mut map = Self {
            root,
            links: vec![Links::empty(); size],
            highlight: vec![false; size],
        };
        map.stamp(root);
        for rect in rects {
            map.stamp(*rect);
        }
        map
    }

    pub fn root(&self) -> Rect {
        self.root
    }

    fn index(&self, row: u16, col: u16) -> Option<usize> {
        if !self.root.contains(row, col) {
            return None;
        }
        let r = (row - self.root.top) as usize;
        let c = (col - self.root.left) as usize;
        Some(r * self.root.width as usize + c)
    }

    fn stamp(&mut self, rect: Rect) {
        if rect.height < 2 || rect.width < 2 {
            return;
        }
        let (top, bottom, left, right) = (rect.top, rect.bottom(), rect.left, rect.right());
        for col in left..=right {
            let mut links = Links::empty();
            if col > left {
                links |= Links::LEFT;
            }
            if col < right {
                links |= Links::RIGHT;
            }
            self.add(top, col, links);
            self.add(bottom, col, links);
        }
        for row in top..=bottom {
            let mut links = Links::empty();
            if row > top {
                links |= Links::UP;
            }
            if row < bottom {
                links |= Links::DOWN;
            }
            self.add(row, left, links);
            self.add(row, right, links);
        }
    }

    fn add(&mut self, row: u16, col: u16, links: Links) {
        if let Some(i) = self.index(row, col) {
            self.links[i] |= links;
        }
    }

    pub fn links(&self, row: u16, col: u16) -> Links {
        self.index(row, col).map_or(Links::empty(), |i| self.links[i])
    }

    pub fn is_border(&self, row: u16, col: u16) -> bool {
        !self.links(row, col).is_empty()
    }

    /// Border cells off the root perimeter.
    pub fn is_interior(&self, row: u16, col: u16) -> bool {
        let r = self.root;
        self.is_border(row, col)
            && row != r.top
            && row != r.bottom()
            && col != r.left
            && col != r.right()
    }

    pub fn glyph_at(&self, row: u16, col: u16) -> Option<char> {
        glyph(self.links(row, col))
    }

    pub fn set_highlight(&mut self, row: u16, col: u16, on: bool) {
        if let Some(i) = self.index(row, col) {
            self.highlight[i] = on;
        }
    }

    pub fn clear_highlight(&mut self) {
        self.highlight.fill(false);
    }

    pub fn is_highlighted(&self, row: u16, col: u16) -> bool {
        self.index(row, col).is_some_and(|i| self.highlight[i])
    }

    /// Every border cell as `(row, col, glyph, highlighted)`.
    pub fn cells(&self) -> impl Iterator<Item = (u16, u16, char, bool)> + '_ {
        let width = self.root.width as usize;
        self.links.iter().enumerate().filter_map(move |(i, links)| {
            let ch = glyph(*links)?;
            let row = self.root.top + (i / width) as u16;
            let col = self.root.left + (i % width) as u16;
            Some((row, col, ch, self.highlight[i]))
        })
    }

    // -------------------------------------------------------------------------
    // Segments
    // -------------------------------------------------------------------------

    fn is_horizontal_cell(&self, row: u16, col: u16) -> bool {
        self.is_interior(row, col) && self.links(row, col).intersects(Links::LEFT | Links::RIGHT)
    }

    fn is_vertical_cell(&self, row: u16, col: u16) -> bool {
        self.is_interior(row, col) && !self.links(row, col).intersects(Links::LEFT | Links::RIGHT)
    }

    /// Split interior border cells into maximal straight runs.
    ///
    /// Junctions belong to the horizontal run through them, so each interior
    /// border cell lands in exactly one segment.
    pub fn segments(&self, rects: &[Rect]) -> Vec<BorderSegment> {
        let r = self.root;
        let mut segments = Vec::new();
        if r.is_empty() {
            return segments;
        }

        for row in r.top..=r.bottom() {
            let mut col = r.left;
            while col <= r.right() {
                if !self.is_horizontal_cell(row, col) {
                    col += 1;
                    continue;
                }
                let start = col;
                while col < r.right()
                    && self.links(row, col).contains(Links::RIGHT)
                    && self.is_horizontal_cell(row, col + 1)
                {
                    col += 1;
                }
                segments.push(self.segment(Orientation::Horizontal, row, start, col, rects));
                col += 1;
            }
        }

        for col in r.left..=r.right() {
            let mut row = r.top;
            while row <= r.bottom() {
                if !self.is_vertical_cell(row, col) {
                    row += 1;
                    continue;
                }
                let start = row;
                while row < r.bottom()
                    && self.links(row, col).contains(Links::DOWN)
                    && self.is_vertical_cell(row + 1, col)
                {
                    row += 1;
                }
                segments.push(self.segment(Orientation::Vertical, col, start, row, rects));
                row += 1;
            }
        }
        segments
    }

    fn segment(
        &self,
        orientation: Orientation,
        line: u16,
        start: u16,
        end: u16,
        rects: &[Rect],
    ) -> BorderSegment {
        let (before, after) = flanking(rects, orientation, line, start, end);
        let owner = before.iter().chain(&after).min().copied();
        BorderSegment {
            orientation,
            line,
            start,
            end,
            before,
            after,
            owner,
        }
    }
}

/// Boxes whose edge lies on `line` and whose interior overlaps
/// `start..=end` along it, split into `(before, after)`.
pub fn flanking(
    rects: &[Rect],
    orientation: Orientation,
    line: u16,
    start: u16,
    end: u16,
) -> (Vec<usize>, Vec<usize>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    for (i, rect) in rects.iter().enumerate() {
        if rect.is_empty() {
            continue;
        }
        let (low, high, from, to) = match orientation {
            Orientation::Horizontal => (rect.top, rect.bottom(), rect.left, rect.right()),
            Orientation::Vertical => (rect.left, rect.right(), rect.top, rect.bottom()),
        };
        // interior along the line
        if to < from + 2 || from + 1 > end || to - 1 < start {
            continue;
        }
        if high == line {
            before.push(i);
        } else if low == line {
            after.push(i);
        }
    }
    (before, after)
}

// =============================================================================
// Tests
// =============================================================================
