//! Constraint resolution.
//!
//! Each axis of a box resolves independently from at most one low-edge and
//! one high-edge constraint. Rectangles are outer rectangles (border ring
//! included) in absolute screen coordinates; neighbours that share a border
//! overlap by exactly that one row or column.
//!
//! `solve` is the strict path used when boxes are added. `solve_fitting` is
//! used after a terminal resize and shrinks explicit sizes until the layout
//! fits the new root.

use std::collections::{HashMap, VecDeque};

use super::constraint::{Axis, BoxRef, BoxSpec, EdgeConstraint, Side};
use crate::error::ConfigError;
use crate::types::Rect;

/// Smallest outer extent of a box: a border on each side and one cell inside.
pub const MIN_EXTENT: i32 = 3;

/// Resolved `(begin, length)` of a box on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub begin: i32,
    pub len: i32,
}

impl Span {
    pub fn last(&self) -> i32 {
        self.begin + self.len - 1
    }

    fn of(rect: Rect, axis: Axis) -> Self {
        match axis {
            Axis::Vertical => Self {
                begin: i32::from(rect.top),
                len: i32::from(rect.height),
            },
            Axis::Horizontal => Self {
                begin: i32::from(rect.left),
                len: i32::from(rect.width),
            },
        }
    }
}

/// An unclamped resolution, possibly outside the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub rows: Span,
    pub cols: Span,
}

impl Placement {
    pub fn span(&self, axis: Axis) -> Span {
        match axis {
            Axis::Vertical => self.rows,
            Axis::Horizontal => self.cols,
        }
    }

    /// The placement as a rectangle, if it lies entirely inside `root`.
    pub fn to_rect(&self, root: Rect) -> Option<Rect> {
        let fits = |span: Span, outer: Span| {
            span.len > 0 && span.begin >= outer.begin && span.last() <= outer.last()
        };
        if !fits(self.rows, Span::of(root, Axis::Vertical))
            || !fits(self.cols, Span::of(root, Axis::Horizontal))
        {
            return None;
        }
        Some(Rect::new(
            self.rows.begin as u16,
            self.cols.begin as u16,
            self.rows.len as u16,
            self.cols.len as u16,
        ))
    }

    /// Clip to `root`; empty when nothing is left.
    pub fn clamp(&self, root: Rect) -> Rect {
        let clip = |span: Span, outer: Span| {
            let begin = span.begin.max(outer.begin);
            let last = span.last().min(outer.last());
            (begin, (last - begin + 1).max(0))
        };
        let (top, height) = clip(self.rows, Span::of(root, Axis::Vertical));
        let (left, width) = clip(self.cols, Span::of(root, Axis::Horizontal));
        if height == 0 || width == 0 {
            return Rect::new(root.top, root.left, 0, 0);
        }
        Rect::new(top as u16, left as u16, height as u16, width as u16)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Structural checks that do not need any geometry.
pub fn validate(spec: &BoxSpec) -> Result<(), ConfigError> {
    let name = || spec.name.clone();

    for side in [Side::Top, Side::Bottom, Side::Left, Side::Right] {
        if spec.constraints.iter().filter(|c| c.side() == side).count() > 1 {
            return Err(ConfigError::ConflictingConstraints {
                name: name(),
                side: side.name(),
            });
        }
    }

    if let Some(c) = spec
        .constraints
        .iter()
        .find(|c| c.is_opposite() && *c.reference() == BoxRef::Grid)
    {
        return Err(ConfigError::GridNotAllowed {
            name: name(),
            constraint: c.name(),
        });
    }

    if spec.references().any(|r| r == spec.name) {
        return Err(ConfigError::Cycle {
            names: vec![name(), name()],
        });
    }

    for (axis, low, high) in [
        (Axis::Vertical, Side::Top, Side::Bottom),
        (Axis::Horizontal, Side::Left, Side::Right),
    ] {
        let both = spec.on_side(low).is_some() && spec.on_side(high).is_some();
        let size = spec.size(axis);
        if both && size != 0 {
            return Err(ConfigError::SizeWithBothEnds { name: name(), axis });
        }
        if !both && size == 0 {
            return Err(ConfigError::MissingEnd { name: name(), axis });
        }
        if size != 0 && i32::from(size) < MIN_EXTENT {
            return Err(ConfigError::TooSmall {
                name: name(),
                axis,
                extent: i32::from(size),
                min: MIN_EXTENT,
            });
        }
    }
    Ok(())
}

/// Order specs so every box comes after the boxes it references.
///
/// Reports the first unknown reference, or the boxes left on a cycle.
pub fn dependency_order(specs: &[BoxSpec]) -> Result<Vec<usize>, ConfigError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        if index.insert(spec.name.as_str(), i).is_some() {
            return Err(ConfigError::DuplicateBox(spec.name.clone()));
        }
    }

    let mut pending = vec![0usize; specs.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];
    for (i, spec) in specs.iter().enumerate() {
        for reference in spec.references() {
            let Some(&j) = index.get(reference) else {
                return Err(ConfigError::UnknownBox {
                    name: spec.name.clone(),
                    reference: reference.to_string(),
                });
            };
            pending[i] += 1;
            dependents[j].push(i);
        }
    }

    let mut ready: VecDeque<usize> = (0..specs.len()).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(specs.len());
    while let Some(i) = ready.pop_front() {
        order.push(i);
        for &d in &dependents[i] {
            pending[d] -= 1;
            if pending[d] == 0 {
                ready.push_back(d);
            }
        }
    }

    if order.len() < specs.len() {
        return Err(ConfigError::Cycle {
            names: cycle_names(specs, &index, &pending),
        });
    }
    Ok(order)
}

/// Walk references among the unresolved boxes until one repeats.
fn cycle_names(specs: &[BoxSpec], index: &HashMap<&str, usize>, pending: &[usize]) -> Vec<String> {
    let Some(start) = (0..specs.len()).find(|&i| pending[i] > 0) else {
        return Vec::new();
    };
    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = specs[current]
            .references()
            .filter_map(|r| index.get(r).copied())
            .find(|&j| pending[j] > 0);
        let Some(next) = next else { break };
        if let Some(pos) = path.iter().position(|&p| p == next) {
            let mut names: Vec<String> = path[pos..].iter().map(|&i| specs[i].name.clone()).collect();
            names.push(specs[next].name.clone());
            return names;
        }
        path.push(next);
        current = next;
    }
    path.iter().map(|&i| specs[i].name.clone()).collect()
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve one spec against the root and already-placed boxes.
///
/// `placed` maps box names to their current outer rectangles.
pub fn resolve(
    spec: &BoxSpec,
    root: Rect,
    placed: &HashMap<String, Rect>,
) -> Result<Placement, ConfigError> {
    Ok(Placement {
        rows: resolve_axis(spec, Axis::Vertical, spec.height, spec.offset.0, root, placed)?,
        cols: resolve_axis(spec, Axis::Horizontal, spec.width, spec.offset.1, root, placed)?,
    })
}

fn resolve_axis(
    spec: &BoxSpec,
    axis: Axis,
    size: u16,
    offset: i32,
    root: Rect,
    placed: &HashMap<String, Rect>,
) -> Result<Span, ConfigError> {
    let (low_side, high_side) = match axis {
        Axis::Vertical => (Side::Top, Side::Bottom),
        Axis::Horizontal => (Side::Left, Side::Right),
    };
    let reference = |c: &EdgeConstraint| -> Result<Span, ConfigError> {
        match c.reference() {
            BoxRef::Grid => Ok(Span::of(root, axis)),
            BoxRef::Box(name) => placed
                .get(name)
                .map(|r| Span::of(*r, axis))
                .ok_or_else(|| ConfigError::UnknownBox {
                    name: spec.name.clone(),
                    reference: name.clone(),
                }),
        }
    };

    // Opposite constraints land on the reference's facing border line.
    let begin = match spec.on_side(low_side) {
        Some(c) => {
            let r = reference(c)?;
            Some(if c.is_opposite() { r.last() } else { r.begin })
        }
        None => None,
    };
    let last = match spec.on_side(high_side) {
        Some(c) => {
            let r = reference(c)?;
            Some(if c.is_opposite() { r.begin } else { r.last() })
        }
        None => None,
    };

    let size = i32::from(size);
    let span = match (begin, last) {
        (Some(begin), Some(last)) => Span {
            begin,
            len: last - begin + 1,
        },
        (Some(begin), None) => Span { begin, len: size },
        (None, Some(last)) => Span {
            begin: last - size + 1,
            len: size,
        },
        (None, None) => Span {
            begin: Span::of(root, axis).begin,
            len: size,
        },
    };
    Ok(Span {
        begin: span.begin + offset,
        len: span.len,
    })
}

// =============================================================================
// Strict solve
// =============================================================================

/// Check a resolved placement against the root and the other boxes.
///
/// `others` are `(name, rect)` pairs of boxes already in the layout.
pub fn check_placement<'a>(
    spec: &BoxSpec,
    placement: &Placement,
    root: Rect,
    others: impl IntoIterator<Item = (&'a str, Rect)>,
) -> Result<Rect, ConfigError> {
    for axis in [Axis::Vertical, Axis::Horizontal] {
        let extent = placement.span(axis).len;
        if extent < MIN_EXTENT {
            return Err(ConfigError::TooSmall {
                name: spec.name.clone(),
                axis,
                extent,
                min: MIN_EXTENT,
            });
        }
    }
    let rect = placement.to_rect(root).ok_or_else(|| ConfigError::OutOfBounds {
        name: spec.name.clone(),
    })?;
    for (other, other_rect) in others {
        if overlaps(rect, other_rect) {
            return Err(ConfigError::Overlap {
                name: spec.name.clone(),
                other: other.to_string(),
            });
        }
    }
    Ok(rect)
}

/// Two boxes overlap when either one's interior reaches into the other.
/// Sharing a border row or column is fine.
pub fn overlaps(a: Rect, b: Rect) -> bool {
    a.inner().intersects(&b) || b.inner().intersects(&a)
}

/// Resolve and check every spec. Rectangles come back in spec order.
pub fn solve(root: Rect, specs: &[BoxSpec]) -> Result<Vec<Rect>, ConfigError> {
    for spec in specs {
        validate(spec)?;
    }
    let order = dependency_order(specs)?;
    let mut placed: HashMap<String, Rect> = HashMap::with_capacity(specs.len());
    let mut rects = vec![Rect::default(); specs.len()];
    for i in order {
        let spec = &specs[i];
        let placement = resolve(spec, root, &placed)?;
        let others = placed.iter().map(|(n, r)| (n.as_str(), *r));
        let rect = check_placement(spec, &placement, root, others)?;
        placed.insert(spec.name.clone(), rect);
        rects[i] = rect;
    }
    Ok(rects)
}

// =============================================================================
// Fitting solve
// =============================================================================

/// Result of fitting a layout into a root it may not fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fitted {
    /// One rectangle per spec, in spec order. Empty for hidden boxes.
    pub rects: Vec<Rect>,
    /// Boxes whose explicit size was reduced.
    pub shrunk: Vec<String>,
    /// Boxes that could not be given the minimum extent.
    pub hidden: Vec<String>,
}

/// Resolve every spec into `root`, shrinking explicit sizes when needed.
///
/// While some box falls outside the root or below the minimum extent, the
/// smallest-area box with an explicit size on the offending axis that shares
/// a row (or column) band with the offender gives up one cell. When no box
/// can give, remaining boxes are clipped to the root and those still too
/// small are hidden.
pub fn solve_fitting(root: Rect, specs: &[BoxSpec]) -> Result<Fitted, ConfigError> {
    let order = dependency_order(specs)?;
    let mut sizes: Vec<BoxSpec> = specs.to_vec();
    let mut shrunk = vec![false; specs.len()];

    let limit: usize = specs
        .iter()
        .map(|s| usize::from(s.height) + usize::from(s.width))
        .sum::<usize>()
        + 1;

    let mut placements = place_all(root, &sizes, &order)?;
    for _ in 0..limit {
        let Some((offender, axis)) = first_violation(root, &placements, &order) else {
            break;
        };
        let Some(victim) = shrink_candidate(&sizes, &placements, offender, axis) else {
            break;
        };
        *sizes[victim].size_mut(axis) -= 1;
        shrunk[victim] = true;
        placements = place_all(root, &sizes, &order)?;
    }

    let mut rects = Vec::with_capacity(specs.len());
    let mut hidden = Vec::new();
    for (i, placement) in placements.iter().enumerate() {
        let rect = placement.clamp(root);
        if i32::from(rect.height) < MIN_EXTENT || i32::from(rect.width) < MIN_EXTENT {
            hidden.push(specs[i].name.clone());
            rects.push(Rect::new(root.top, root.left, 0, 0));
        } else {
            rects.push(rect);
        }
    }

    let shrunk = specs
        .iter()
        .zip(&shrunk)
        .filter(|(_, s)| **s)
        .map(|(spec, _)| spec.name.clone())
        .collect();
    Ok(Fitted {
        rects,
        shrunk,
        hidden,
    })
}

fn place_all(root: Rect, specs: &[BoxSpec], order: &[usize]) -> Result<Vec<Placement>, ConfigError> {
    let mut placed: HashMap<String, Rect> = HashMap::with_capacity(specs.len());
    let mut placements = vec![
        Placement {
            rows: Span { begin: 0, len: 0 },
            cols: Span { begin: 0, len: 0 },
        };
        specs.len()
    ];
    for &i in order {
        let placement = resolve(&specs[i], root, &placed)?;
        // Unclipped so dependents keep their relative position; negative
        // coordinates saturate at 0.
        placed.insert(
            specs[i].name.clone(),
            Rect::new(
                placement.rows.begin.clamp(0, i32::from(u16::MAX)) as u16,
                placement.cols.begin.clamp(0, i32::from(u16::MAX)) as u16,
                placement.rows.len.clamp(0, i32::from(u16::MAX)) as u16,
                placement.cols.len.clamp(0, i32::from(u16::MAX)) as u16,
            ),
        );
        placements[i] = placement;
    }
    Ok(placements)
}

fn first_violation(root: Rect, placements: &[Placement], order: &[usize]) -> Option<(usize, Axis)> {
    for &i in order {
        for axis in [Axis::Vertical, Axis::Horizontal] {
            let span = placements[i].span(axis);
            let outer = Span::of(root, axis);
            if span.len < MIN_EXTENT || span.begin < outer.begin || span.last() > outer.last() {
                return Some((i, axis));
            }
        }
    }
    None
}

fn shrink_candidate(
    specs: &[BoxSpec],
    placements: &[Placement],
    offender: usize,
    axis: Axis,
) -> Option<usize> {
    let cross = match axis {
        Axis::Vertical => Axis::Horizontal,
        Axis::Horizontal => Axis::Vertical,
    };
    let band = placements[offender].span(cross);
    let in_band = |p: &Placement| {
        let s = p.span(cross);
        s.begin <= band.last() && band.begin <= s.last()
    };
    (0..specs.len())
        .filter(|&i| i32::from(specs[i].size(axis)) > MIN_EXTENT)
        .filter(|&i| i == offender || in_band(&placements[i]))
        .min_by_key(|&i| {
            let area = i64::from(specs[i].height) * i64::from(specs[i].width);
            (area, i)
        })
}

// =============================================================================
// Tests
// =============================================================================
