//! Edge constraints and box specifications.
//!
//! A box is described by its size and up to one constraint per side. A
//! "same" constraint puts an edge on the same line as the reference's edge;
//! an "opposite" constraint (`left2r`, `top2b`, ...) puts it on the
//! reference's facing edge so the two boxes share that border.
//!
//! ```text
//!     +--------+                 +--------+
//!     |   a    |<---- left2r ----|   b    |
//!     +--------+                 +--------+
//!
//!     BoxSpec::new("b", 3, 5).left2r("a")
//! ```

use std::fmt;

use crate::types::Style;

/// A dimension of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Rows: top and bottom edges, height.
    Vertical,
    /// Columns: left and right edges, width.
    Horizontal,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    pub fn axis(self) -> Axis {
        match self {
            Self::Top | Self::Bottom => Axis::Vertical,
            Self::Left | Self::Right => Axis::Horizontal,
        }
    }

    /// True for the top and left sides, where a span begins.
    pub fn is_low(self) -> bool {
        matches!(self, Self::Top | Self::Left)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// What a constraint is relative to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoxRef {
    /// The grid's root rectangle.
    Grid,
    /// Another box, by name.
    Box(String),
}

impl From<&str> for BoxRef {
    fn from(name: &str) -> Self {
        Self::Box(name.to_string())
    }
}

impl From<String> for BoxRef {
    fn from(name: String) -> Self {
        Self::Box(name)
    }
}

impl From<&String> for BoxRef {
    fn from(name: &String) -> Self {
        Self::Box(name.clone())
    }
}

/// Pins one edge of a box to an edge of another box or of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeConstraint {
    /// My top is the reference's top.
    Top(BoxRef),
    Bottom(BoxRef),
    Left(BoxRef),
    Right(BoxRef),
    /// My top border is the reference's bottom border.
    TopToBottom(BoxRef),
    BottomToTop(BoxRef),
    LeftToRight(BoxRef),
    RightToLeft(BoxRef),
}

impl EdgeConstraint {
    /// The side of the constrained box this pins.
    pub fn side(&self) -> Side {
        match self {
            Self::Top(_) | Self::TopToBottom(_) => Side::Top,
            Self::Bottom(_) | Self::BottomToTop(_) => Side::Bottom,
            Self::Left(_) | Self::LeftToRight(_) => Side::Left,
            Self::Right(_) | Self::RightToLeft(_) => Side::Right,
        }
    }

    /// True for the `*2*` forms that attach to the reference's facing edge.
    pub fn is_opposite(&self) -> bool {
        matches!(
            self,
            Self::TopToBottom(_) | Self::BottomToTop(_) | Self::LeftToRight(_) | Self::RightToLeft(_)
        )
    }

    pub fn reference(&self) -> &BoxRef {
        match self {
            Self::Top(r)
            | Self::Bottom(r)
            | Self::Left(r)
            | Self::Right(r)
            | Self::TopToBottom(r)
            | Self::BottomToTop(r)
            | Self::LeftToRight(r)
            | Self::RightToLeft(r) => r,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Top(_) => "top",
            Self::Bottom(_) => "bottom",
            Self::Left(_) => "left",
            Self::Right(_) => "right",
            Self::TopToBottom(_) => "top2b",
            Self::BottomToTop(_) => "bottom2t",
            Self::LeftToRight(_) => "left2r",
            Self::RightToLeft(_) => "right2l",
        }
    }
}

/// Declarative description of one box: size, constraints, offset.
///
/// Sizes include the border ring; the box's window is one cell in from each
/// side. A size of 0 on an axis means "fill the gap between the two
/// constrained edges".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxSpec {
    pub name: String,
    pub height: u16,
    pub width: u16,
    /// Added to the resolved top and left.
    pub offset: (i32, i32),
    pub constraints: Vec<EdgeConstraint>,
    /// Background for the box's window; the grid default when `None`.
    pub background: Option<Style>,
}

impl BoxSpec {
    pub fn new(name: impl Into<String>, height: u16, width: u16) -> Self {
        Self {
            name: name.into(),
            height,
            width,
            offset: (0, 0),
            constraints: Vec::new(),
            background: None,
        }
    }

    pub fn constrain(mut self, constraint: EdgeConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn top(self, reference: impl Into<BoxRef>) -> Self {
        self.constrain(EdgeConstraint::Top(reference.into()))
    }

    pub fn bottom(self, reference: impl Into<BoxRef>) -> Self {
        self.constrain(EdgeConstraint::Bottom(reference.into()))
    }

    pub fn left(self, reference: impl Into<BoxRef>) -> Self {
        self.constrain(EdgeConstraint::Left(reference.into()))
    }

    pub fn right(self, reference: impl Into<BoxRef>) -> Self {
        self.constrain(EdgeConstraint::Right(reference.into()))
    }

    pub fn top2b(self, reference: impl Into<BoxRef>) -> Self {
        self.constrain(EdgeConstraint::TopToBottom(reference.into()))
    }

    pub fn bottom2t(self, reference: impl Into<BoxRef>) -> Self {
        self.constrain(EdgeConstraint::BottomToTop(reference.into()))
    }

    pub fn left2r(self, reference: impl Into<BoxRef>) -> Self {
        self.constrain(EdgeConstraint::LeftToRight(reference.into()))
    }

    pub fn right2l(self, reference: impl Into<BoxRef>) -> Self {
        self.constrain(EdgeConstraint::RightToLeft(reference.into()))
    }

    /// Shift the resolved position by `(rows, cols)`.
    pub fn offset(mut self, rows: i32, cols: i32) -> Self {
        self.offset = (rows, cols);
        self
    }

    pub fn background(mut self, style: Style) -> Self {
        self.background = Some(style);
        self
    }

    pub fn size(&self, axis: Axis) -> u16 {
        match axis {
            Axis::Vertical => self.height,
            Axis::Horizontal => self.width,
        }
    }

    pub(crate) fn size_mut(&mut self, axis: Axis) -> &mut u16 {
        match axis {
            Axis::Vertical => &mut self.height,
            Axis::Horizontal => &mut self.width,
        }
    }

    /// Names of the boxes this spec refers to.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().filter_map(|c| match c.reference() {
            BoxRef::Box(name) => Some(name.as_str()),
            BoxRef::Grid => None,
        })
    }

    /// The constraint on `side`, if any.
    pub fn on_side(&self, side: Side) -> Option<&EdgeConstraint> {
        self.constraints.iter().find(|c| c.side() == side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_constraints() {
        let spec = BoxSpec::new("b", 3, 0)
            .left2r("a")
            .right(BoxRef::Grid)
            .offset(1, 0);
        assert_eq!(spec.constraints.len(), 2);
        assert_eq!(spec.offset, (1, 0));
        assert_eq!(spec.on_side(Side::Left), Some(&EdgeConstraint::LeftToRight("a".into())));
        assert_eq!(spec.references().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_constraint_sides() {
        assert_eq!(EdgeConstraint::TopToBottom(BoxRef::Grid).side(), Side::Top);
        assert_eq!(EdgeConstraint::RightToLeft(BoxRef::Grid).side(), Side::Right);
        assert!(EdgeConstraint::BottomToTop(BoxRef::Grid).is_opposite());
        assert!(!EdgeConstraint::Bottom(BoxRef::Grid).is_opposite());
        assert_eq!(EdgeConstraint::LeftToRight("x".into()).name(), "left2r");
        assert_eq!(Side::Bottom.axis(), Axis::Vertical);
        assert!(Side::Left.is_low());
    }
}
