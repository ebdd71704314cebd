//! A `tracing-subscriber` writer that prints into a window.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing::level_filters::LevelFilter;
use tracing::Metadata;
use tracing_subscriber::fmt::MakeWriter;

use super::colormap::color_for_level;
use crate::error::{lock, Result};
use crate::pipeline::Window;
use crate::types::Style;

/// Verbosity ladder for `-v` style flags: none, `-v`, `-vv`.
const VERBOSITY: [LevelFilter; 3] = [LevelFilter::INFO, LevelFilter::DEBUG, LevelFilter::TRACE];

/// Log destination writing one line per event into a scrolling window.
///
/// Lines are colored by level and drawn with the cursor preserved, so
/// logging from a background thread leaves the input cursor where it is.
#[derive(Clone)]
pub struct WindowSink {
    window: Window,
    level: Arc<Mutex<LevelFilter>>,
}

impl WindowSink {
    /// Log into `window` at `INFO` and above. Turns on scrolling.
    pub fn new(window: Window) -> Result<Self> {
        window.set_scroll(true)?;
        Ok(Self {
            window,
            level: Arc::new(Mutex::new(LevelFilter::INFO)),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn level(&self) -> LevelFilter {
        *lock(&self.level)
    }

    /// Change the most verbose level written. Clones share the setting.
    pub fn set_level(&self, level: LevelFilter) {
        *lock(&self.level) = level;
    }

    /// Map a repeat count of `-v` to a level: INFO, DEBUG, then TRACE.
    pub fn set_verbose(&self, verbose: usize) -> LevelFilter {
        let level = VERBOSITY[verbose.min(VERBOSITY.len() - 1)];
        self.set_level(level);
        level
    }

    /// Write one line, starting a new one unless the cursor is at the origin.
    pub fn write_line(&self, line: &str, style: Style) -> Result<()> {
        let id = self.window.id();
        self.window.session().with_preserved_cursor(|screen| {
            if screen.cursor(id)? != (0, 0) {
                screen.put_char(id, '\n')?;
            }
            screen.put_styled(id, line.trim_end(), style)?;
            screen.refresh(id)
        })
    }
}

impl std::fmt::Debug for WindowSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowSink")
            .field("window", &self.window)
            .field("level", &self.level())
            .finish()
    }
}

impl<'a> MakeWriter<'a> for WindowSink {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> SinkWriter {
        SinkWriter::new(Some(self.clone()), Style::new())
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> SinkWriter {
        if *meta.level() <= self.level() {
            SinkWriter::new(Some(self.clone()), color_for_level(meta.level()))
        } else {
            SinkWriter::new(None, Style::new())
        }
    }
}

/// Buffers one formatted event and prints its lines when dropped.
pub struct SinkWriter {
    sink: Option<WindowSink>,
    style: Style,
    buf: Vec<u8>,
}

impl SinkWriter {
    fn new(sink: Option<WindowSink>, style: Style) -> Self {
        Self {
            sink,
            style,
            buf: Vec::with_capacity(256),
        }
    }

    fn emit(&mut self) -> io::Result<()> {
        let Some(sink) = &self.sink else {
            self.buf.clear();
            return Ok(());
        };
        if self.buf.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        for line in text.lines() {
            sink.write_line(line, self.style).map_err(io::Error::other)?;
        }
        Ok(())
    }
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.sink.is_some() {
            self.buf.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit()
    }
}

impl Drop for SinkWriter {
    fn drop(&mut self) {
        let _ = self.emit();
    }
}
