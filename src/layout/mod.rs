//! Layout Module - constraint-placed boxes with shared, draggable borders
//!
//! Boxes are declared with a size and edge constraints relative to the grid
//! or to other boxes. Adjacent boxes share a single border line; the line
//! can be dragged to trade space between the boxes on either side.
//!
//! # Architecture
//!
//! 1. `constraint` - `BoxSpec` and its edge constraints
//! 2. `solver` - validation, dependency ordering and resolution to rectangles
//! 3. `borders` - border glyphs and the segments between boxes
//! 4. `resize` - the drag / modal-resize state machine over the rectangles
//! 5. `grid` - ties the above to windows, handlers and drawing
//!
//! # Example
//!
//! ```ignore
//! use gridterm::{BoxRef, BoxSpec, Grid};
//!
//! let grid = Grid::new(&session.stdscr())?;
//! grid.layout(vec![
//!     BoxSpec::new("log", 0, 0)
//!         .top2b("cmd").bottom(BoxRef::Grid)
//!         .left(BoxRef::Grid).right(BoxRef::Grid),
//!     BoxSpec::new("cmd", 3, 0)
//!         .top(BoxRef::Grid).left(BoxRef::Grid).right(BoxRef::Grid),
//! ])?;
//! ```

pub mod borders;
pub mod constraint;
pub mod grid;
pub mod resize;
pub mod solver;

pub use borders::{BorderMap, BorderSegment, Orientation};
pub use constraint::{Axis, BoxRef, BoxSpec, EdgeConstraint, Side};
pub use grid::{Grid, GridBuilder};
pub use resize::{Layout, ResizeSession, ResizeState};
pub use solver::MIN_EXTENT;
