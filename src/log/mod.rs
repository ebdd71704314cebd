//! Log Module - `tracing` output into a window
//!
//! - **sink** - `WindowSink`, a `MakeWriter` printing one line per event
//! - **colormap** - level name to style
//!
//! The library never installs a subscriber. Applications that want their
//! log in a window plug the sink into their own:
//!
//! ```ignore
//! let sink = WindowSink::new(grid.window("log").unwrap())?;
//! tracing_subscriber::fmt()
//!     .with_writer(sink.clone())
//!     .with_ansi(false)
//!     .init();
//! ```
//!
//! Events are drawn under the display lock, so they must not be emitted
//! from code already holding it.

pub mod colormap;
pub mod sink;

pub use colormap::{color_for, color_for_level, parse_style};
pub use sink::{SinkWriter, WindowSink};
