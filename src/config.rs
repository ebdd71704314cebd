//! Session configuration.

use std::time::Duration;

/// How a terminal session is set up by [`run`](crate::run).
///
/// ```ignore
/// let config = SessionConfig {
///     blocking: false,
///     input_timeout: Duration::from_millis(50),
///     ..SessionConfig::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// `getkey` waits for input forever. When false it returns
    /// `KeyRead::NoInput` after `input_timeout`.
    pub blocking: bool,
    pub input_timeout: Duration,
    /// Enable mouse reporting.
    pub mouse: bool,
    pub alternate_screen: bool,
    /// Maximum gap between clicks counted as one multi-click.
    pub click_interval: Duration,
    /// How many cells the pointer may drift between clicks of a multi-click.
    pub click_distance: u16,
    /// Restore the terminal on SIGINT, SIGTERM and SIGHUP (Unix only).
    pub handle_signals: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            blocking: true,
            input_timeout: Duration::from_millis(100),
            mouse: true,
            alternate_screen: true,
            click_interval: Duration::from_millis(300),
            click_distance: 0,
            handle_signals: true,
        }
    }
}

impl SessionConfig {
    /// The read timeout to pass to the event source.
    pub(crate) fn read_timeout(&self) -> Option<Duration> {
        if self.blocking {
            None
        } else {
            Some(self.input_timeout)
        }
    }
}
