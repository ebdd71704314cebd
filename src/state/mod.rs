//! State Module - Input dispatch
//!
//! - **Keyboard** - Function-key handler registry
//! - **Mouse** - Event decoding, click counting, coordinate router
//! - **Input** - `getkey` / `getline` readers feeding both

pub mod input;
pub mod keyboard;
pub mod mouse;

pub use input::{getkey, getline, KeyRead};
pub use keyboard::{FunctionKeyRegistry, KeyCallback};
pub use mouse::{ClickTracker, MouseCallback, MouseEvent, MouseRouter, MouseState};

/// Identifies one registered handler so it can be removed on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub(crate) u64);
