//! Terminal pipeline
//!
//! The session layer between the backend and the application:
//!
//! ```text
//! run / run_with → TerminalSession (display lock, cursor window, input lock)
//!                    → Screen (windows → frame → diff renderer → backend)
//! ```
//!
//! - **session** - `TerminalSession`, `Screen`, cursor preservation
//! - **window** - `Window` handles
//! - **run** - setup and teardown on every exit path

pub mod run;
pub mod session;
pub mod window;

pub use run::{run, run_with};
pub use session::{Screen, TerminalSession, STDSCR};
pub use window::Window;
