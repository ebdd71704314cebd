//! Differential renderer.
//!
//! The DiffRenderer compares the current frame to the previous frame and only
//! sends cells that changed to the backend.
//!
//! # Algorithm
//!
//! 1. For each cell in the new frame:
//!    - If a previous frame of the same size exists and the cell is unchanged: skip
//!    - Otherwise: queue the cell
//! 2. Hand the queued cells to the backend in one `draw` call
//! 3. Store the current frame as previous for the next comparison

use std::io;

use super::buffer::FrameBuffer;
use crate::backend::Backend;

#[derive(Debug, Default)]
pub struct DiffRenderer {
    previous: Option<FrameBuffer>,
}

impl DiffRenderer {
    pub fn new() -> Self {
        Self { previous: None }
    }

    /// Render a frame, sending only changed cells.
    ///
    /// Returns true if any cells were changed.
    pub fn render(&mut self, backend: &mut dyn Backend, frame: &FrameBuffer) -> io::Result<bool> {
        let same_size = self
            .previous
            .as_ref()
            .is_some_and(|prev| prev.rows() == frame.rows() && prev.cols() == frame.cols());

        let changed: Vec<_> = frame
            .iter()
            .filter(|&(row, col, cell)| {
                if !same_size {
                    return true;
                }
                self.previous
                    .as_ref()
                    .and_then(|prev| prev.get(row, col))
                    .is_none_or(|prev| prev != cell)
            })
            .map(|(row, col, cell)| (row, col, *cell))
            .collect();

        if !changed.is_empty() {
            backend.draw(&changed)?;
        }
        self.previous = Some(frame.clone());
        Ok(!changed.is_empty())
    }

    /// Clear the terminal and send every cell.
    ///
    /// Use this after a terminal resize or when the screen is corrupted.
    pub fn render_full(&mut self, backend: &mut dyn Backend, frame: &FrameBuffer) -> io::Result<()> {
        backend.clear()?;
        self.invalidate();
        self.render(backend, frame)?;
        Ok(())
    }

    /// Forget the previous frame; the next render sends everything.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test::TestBackend;
    use crate::types::{Cell, Style};

    #[test]
    fn test_diff_renderer_creation() {
        let renderer = DiffRenderer::new();
        assert!(!renderer.has_previous());
    }

    #[test]
    fn test_first_render_sends_everything() {
        let mut backend = TestBackend::new(2, 2);
        let mut renderer = DiffRenderer::new();
        let mut frame = FrameBuffer::new(2, 2);
        frame.set(0, 0, Cell::new('a', Style::new()));
        assert!(renderer.render(&mut backend, &frame).unwrap());
        assert_eq!(backend.row_text(0), "a ");
        assert!(renderer.has_previous());
    }

    #[test]
    fn test_unchanged_frame_sends_nothing() {
        let mut backend = TestBackend::new(2, 2);
        let mut renderer = DiffRenderer::new();
        let frame = FrameBuffer::new(2, 2);
        renderer.render(&mut backend, &frame).unwrap();
        assert!(!renderer.render(&mut backend, &frame).unwrap());
    }

    #[test]
    fn test_only_changed_cells_sent() {
        let mut backend = TestBackend::new(1, 3);
        let probe = backend.clone();
        let mut renderer = DiffRenderer::new();
        let mut frame = FrameBuffer::new(1, 3);
        renderer.render(&mut backend, &frame).unwrap();

        // Draw behind the renderer's back; an unchanged cell must not be resent.
        backend
            .draw(&[(0, 0, Cell::new('#', Style::new()))])
            .unwrap();
        frame.set(0, 2, Cell::new('b', Style::new()));
        renderer.render(&mut backend, &frame).unwrap();
        assert_eq!(probe.row_text(0), "# b");
    }

    #[test]
    fn test_invalidate() {
        let mut renderer = DiffRenderer::new();
        let mut backend = TestBackend::new(1, 1);
        renderer
            .render(&mut backend, &FrameBuffer::new(1, 1))
            .unwrap();
        assert!(renderer.has_previous());

        renderer.invalidate();
        assert!(!renderer.has_previous());
    }
}
