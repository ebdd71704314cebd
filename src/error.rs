//! Error types.
//!
//! `Error` is what every fallible operation in the crate returns.
//! `ConfigError` covers the ways a grid box can be rejected at construction
//! time; the grid is left without the offending box when one is returned.

use std::io;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::layout::Axis;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid grid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A second thread called `getkey`/`getline` while another read was in progress.
    #[error("input is already being read by another thread")]
    ConcurrentRead,

    #[error("no window with id {0}")]
    NoSuchWindow(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("box `{0}` already exists")]
    DuplicateBox(String),

    #[error("box `{name}` references unknown box `{reference}`")]
    UnknownBox { name: String, reference: String },

    #[error("box `{name}` has two constraints for its {side} edge")]
    ConflictingConstraints { name: String, side: &'static str },

    #[error("box `{name}`: `{constraint}` cannot reference the grid itself")]
    GridNotAllowed {
        name: String,
        constraint: &'static str,
    },

    #[error("box `{name}` has an explicit {axis} size and constraints on both {axis} edges")]
    SizeWithBothEnds { name: String, axis: Axis },

    #[error("box `{name}` has {axis} size 0 but not both {axis} edges constrained")]
    MissingEnd { name: String, axis: Axis },

    #[error("box `{name}` {axis} extent {extent} is below the minimum of {min}")]
    TooSmall {
        name: String,
        axis: Axis,
        extent: i32,
        min: i32,
    },

    #[error("box `{name}` does not fit inside the grid")]
    OutOfBounds { name: String },

    #[error("box `{name}` overlaps box `{other}`")]
    Overlap { name: String, other: String },

    #[error("cyclic box references: {}", names.join(" -> "))]
    Cycle { names: Vec<String> },
}

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every mutation in this crate completes while the lock is held, so the
/// data behind a poisoned lock is still consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
