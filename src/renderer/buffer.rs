//! Screen frame buffer.
//!
//! A row-major grid of cells holding what the terminal should show. Windows
//! are composed into it on refresh and the diff renderer compares it with the
//! previous frame.

use crate::types::{Cell, Rect};

/// A 2D buffer of terminal cells, indexed `row * cols + col`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    rows: u16,
    cols: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::BLANK; rows as usize * cols as usize],
        }
    }

    #[inline]
    pub fn rows(&self) -> u16 {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.rows, self.cols)
    }

    #[inline]
    fn index(&self, row: u16, col: u16) -> usize {
        row as usize * self.cols as usize + col as usize
    }

    #[inline]
    pub fn in_bounds(&self, row: u16, col: u16) -> bool {
        row < self.rows && col < self.cols
    }

    pub fn get(&self, row: u16, col: u16) -> Option<&Cell> {
        if self.in_bounds(row, col) {
            self.cells.get(self.index(row, col))
        } else {
            None
        }
    }

    pub fn set(&mut self, row: u16, col: u16, cell: Cell) {
        if self.in_bounds(row, col) {
            let idx = self.index(row, col);
            self.cells[idx] = cell;
        }
    }

    /// Copy a `height` x `width` block of cells (row-major) to `origin`,
    /// clipped to the buffer.
    pub fn blit(&mut self, origin: (u16, u16), width: u16, cells: &[Cell]) {
        if width == 0 {
            return;
        }
        for (i, cell) in cells.iter().enumerate() {
            let row = origin.0 as usize + i / width as usize;
            let col = origin.1 as usize + i % width as usize;
            if row < self.rows as usize && col < self.cols as usize {
                self.set(row as u16, col as u16, *cell);
            }
        }
    }

    /// Iterate cells with their `(row, col)`.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16, &Cell)> {
        let cols = self.cols.max(1) as usize;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| ((i / cols) as u16, (i % cols) as u16, cell))
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    /// Resize the buffer. Content is cleared.
    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.rows = rows;
        self.cols = cols;
        self.cells = vec![Cell::BLANK; rows as usize * cols as usize];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Style;

    #[test]
    fn test_set_and_get() {
        let mut buf = FrameBuffer::new(3, 4);
        buf.set(2, 3, Cell::new('z', Style::new()));
        assert_eq!(buf.get(2, 3).unwrap().ch, 'z');
        assert!(buf.get(3, 0).is_none());
        buf.set(9, 9, Cell::new('q', Style::new()));
    }

    #[test]
    fn test_blit_clips() {
        let mut buf = FrameBuffer::new(2, 3);
        let block = [Cell::new('a', Style::new()); 4];
        buf.blit((1, 2), 2, &block);
        assert_eq!(buf.get(1, 2).unwrap().ch, 'a');
        assert_eq!(buf.get(0, 0).unwrap().ch, ' ');
        assert_eq!(buf.iter().filter(|(_, _, c)| c.ch == 'a').count(), 1);
    }

    #[test]
    fn test_iter_coordinates() {
        let buf = FrameBuffer::new(2, 3);
        let coords: Vec<_> = buf.iter().map(|(r, c, _)| (r, c)).collect();
        assert_eq!(coords[4], (1, 1));
        assert_eq!(coords.len(), 6);
    }
}
