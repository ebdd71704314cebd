//! Run wrapper - terminal setup and teardown around an application body.
//!
//! `run` puts the terminal into application mode, hands the session to the
//! body and restores the terminal on every way out: normal return, error,
//! panic (unwinding through the teardown guard, plus a panic hook so the
//! message lands on a sane terminal) and, on Unix, SIGINT/SIGTERM/SIGHUP.
//!
//! # Example
//!
//! ```ignore
//! use gridterm::{run, getkey, KeyRead, SessionConfig};
//!
//! run(SessionConfig::default(), |session| {
//!     let stdscr = session.stdscr();
//!     stdscr.put_str("press any key")?;
//!     while let KeyRead::NoInput = getkey(&stdscr, false)? {}
//!     Ok(())
//! })?;
//! ```

use std::io;
use std::sync::{Arc, Mutex, OnceLock, Weak};

use super::session::TerminalSession;
use crate::backend::terminal::{CrosstermBackend, CrosstermEvents};
use crate::backend::{Backend, EventSource};
use crate::config::SessionConfig;
use crate::error::{lock, Result};

/// The session the panic hook restores.
static ACTIVE: Mutex<Option<Weak<TerminalSession>>> = Mutex::new(None);

// =============================================================================
// Run
// =============================================================================

/// Drive the real terminal through crossterm.
pub fn run<T, F>(config: SessionConfig, body: F) -> Result<T>
where
    F: FnOnce(&Arc<TerminalSession>) -> Result<T>,
{
    run_with(CrosstermBackend::new(), CrosstermEvents::new(), config, body)
}

/// Drive any backend.
///
/// If both the body and the teardown fail, the body's error is returned and
/// the teardown error is logged.
pub fn run_with<B, E, T, F>(backend: B, events: E, config: SessionConfig, body: F) -> Result<T>
where
    B: Backend + 'static,
    E: EventSource + 'static,
    F: FnOnce(&Arc<TerminalSession>) -> Result<T>,
{
    let session = TerminalSession::new(backend, events, config)?;
    install_panic_hook();

    let guard = TeardownGuard::new(&session);
    #[cfg(unix)]
    let signals = if session.config().handle_signals {
        Some(SignalGuard::new(&session)?)
    } else {
        None
    };

    session.enter()?;
    tracing::debug!("terminal session started");

    let outcome = body(&session);

    #[cfg(unix)]
    drop(signals);
    let teardown = guard.finish();
    tracing::debug!("terminal session ended");

    match (outcome, teardown) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(teardown)) => {
            tracing::warn!(error = %teardown, "terminal teardown failed after body error");
            Err(err)
        }
    }
}

// =============================================================================
// Teardown guard
// =============================================================================

/// Leaves application mode when dropped, including while unwinding.
struct TeardownGuard {
    session: Arc<TerminalSession>,
    done: bool,
}

impl TeardownGuard {
    fn new(session: &Arc<TerminalSession>) -> Self {
        *lock(&ACTIVE) = Some(Arc::downgrade(session));
        Self {
            session: session.clone(),
            done: false,
        }
    }

    fn finish(mut self) -> io::Result<()> {
        self.done = true;
        *lock(&ACTIVE) = None;
        self.session.leave()
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if !self.done {
            *lock(&ACTIVE) = None;
            let _ = self.session.leave();
        }
    }
}

fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            // A panic while the display lock is held is left to the guard.
            let active = ACTIVE.try_lock().ok().and_then(|slot| slot.clone());
            if let Some(session) = active.and_then(|weak| weak.upgrade()) {
                session.try_leave();
            }
            previous(info);
        }));
    });
}

// =============================================================================
// Signals
// =============================================================================

#[cfg(unix)]
struct SignalGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(unix)]
impl SignalGuard {
    fn new(session: &Arc<TerminalSession>) -> io::Result<Self> {
        use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
        let handle = signals.handle();
        let session = Arc::downgrade(session);
        let thread = std::thread::spawn(move || {
            if let Some(signal) = signals.forever().next() {
                tracing::warn!(signal, "termination signal received, restoring terminal");
                if let Some(session) = session.upgrade() {
                    let _ = session.leave();
                }
                std::process::exit(128 + signal);
            }
        });
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

#[cfg(unix)]
impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test::{ScriptedInput, TestBackend};
    use crate::error::Error;
    use std::panic::{self, AssertUnwindSafe};

    fn config() -> SessionConfig {
        SessionConfig {
            handle_signals: false,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_run_returns_body_value() {
        let backend = TestBackend::new(4, 10);
        let probe = backend.clone();
        let value = run_with(backend, ScriptedInput::new(), config(), |session| {
            assert!(probe.is_entered());
            session.stdscr().put_str("hi")?;
            Ok(7)
        })
        .unwrap();
        assert_eq!(value, 7);
        assert!(!probe.is_entered());
        assert_eq!(probe.leave_count(), 1);
    }

    #[test]
    fn test_run_tears_down_on_error() {
        let backend = TestBackend::new(4, 10);
        let probe = backend.clone();
        let result: Result<()> = run_with(backend, ScriptedInput::new(), config(), |_| {
            Err(Error::ConcurrentRead)
        });
        assert!(matches!(result, Err(Error::ConcurrentRead)));
        assert!(!probe.is_entered());
        assert_eq!(probe.leave_count(), 1);
    }

    #[test]
    fn test_run_tears_down_on_panic() {
        let backend = TestBackend::new(4, 10);
        let probe = backend.clone();
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<()> = run_with(backend, ScriptedInput::new(), config(), |_| {
                panic!("body failed");
            });
        }));
        assert!(caught.is_err());
        assert!(!probe.is_entered());
        assert!(probe.leave_count() >= 1);
    }
}
