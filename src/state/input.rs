//! Input Module - Key and line readers
//!
//! `getkey` reads one input unit for a window: mouse reports are routed to
//! the session's `MouseRouter` and reading continues, a terminal resize
//! surfaces as `Key::RESIZE`, and every key runs the handlers of the
//! `FunctionKeyRegistry` before it is returned. An active border resize may
//! then swallow the key; its handlers have still run. `getline` builds an edited
//! line on top of it.
//!
//! The display lock is taken only to refresh the window and track the
//! cursor; the read itself runs without it, so other threads keep drawing
//! while a reader blocks.
//!
//! # Example
//!
//! ```ignore
//! use gridterm::{getline, run, SessionConfig};
//!
//! run(SessionConfig::default(), |session| {
//!     let stdscr = session.stdscr();
//!     while let Some(line) = getline(&stdscr)? {
//!         stdscr.put_str(&format!("got {line:?}\n"))?;
//!     }
//!     Ok(())
//! })?;
//! ```

use crate::error::Result;
use crate::pipeline::session::Input;
use crate::pipeline::Window;
use crate::types::Key;

use super::mouse::MouseEvent;

/// What `getkey` read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRead {
    Key(Key),
    /// Non-blocking mode and nothing arrived in time.
    NoInput,
    /// End of input, or Ctrl-D.
    Eof,
    /// A mouse event, only when the caller asked to handle mouse events itself.
    Mouse(MouseEvent),
}

// =============================================================================
// getkey
// =============================================================================

/// Read one key for `win`.
///
/// `win` becomes the cursor window: the terminal cursor is parked on its
/// cursor while waiting. With `no_mouse`, mouse events are returned instead
/// of dispatched.
pub fn getkey(win: &Window, no_mouse: bool) -> Result<KeyRead> {
    let session = win.session();
    let id = win.id();
    session.with_screen(|screen| screen.set_cursor_window(id))?;

    loop {
        session.with_screen(|screen| screen.refresh(id))?;

        match session.read_input()? {
            Input::Timeout => return Ok(KeyRead::NoInput),
            Input::Eof | Input::Key(Key::EOT) => return Ok(KeyRead::Eof),
            Input::Mouse(event) if no_mouse => return Ok(KeyRead::Mouse(event)),
            Input::Mouse(event) => {
                session.mouse().dispatch(&event);
            }
            Input::Resize { rows, cols } => {
                tracing::debug!(rows, cols, "terminal resized");
                session.with_screen(|screen| screen.resize_terminal(rows, cols))?;
                session.keys().dispatch(Key::RESIZE);
                return Ok(KeyRead::Key(Key::RESIZE));
            }
            Input::Key(key) => {
                tracing::trace!(%key, "key");
                session.keys().dispatch(key);
                if session.keys().intercept(key) {
                    continue;
                }
                return Ok(KeyRead::Key(key));
            }
        }
    }
}

// =============================================================================
// getline
// =============================================================================

/// Read a line for `win`, echoing as it is typed.
///
/// CR, LF or Enter ends the line; the echo is erased and the line returned.
/// Backspace deletes one character and Ctrl-U the whole line. A key with a
/// registered handler repaints the line (the handler may have drawn over
/// it) and never becomes part of it. Returns `None` on end of input,
/// discarding a partial line.
pub fn getline(win: &Window) -> Result<Option<String>> {
    let (row, col) = win.cursor()?;
    let mut line = String::new();

    loop {
        let key = match getkey(win, true)? {
            KeyRead::Eof => return Ok(None),
            KeyRead::NoInput => continue,
            KeyRead::Mouse(event) => {
                win.session().mouse().dispatch(&event);
                continue;
            }
            KeyRead::Key(key) => key,
        };

        if key.is_enter() {
            erase(win, line.chars().count())?;
            return Ok(Some(line));
        } else if key.is_backspace() {
            if line.pop().is_some() {
                win.backspace()?;
            }
        } else if key == Key::NAK {
            erase(win, line.chars().count())?;
            line.clear();
        } else if win.session().keys().is_registered(key) {
            win.put_str_at(row, col, &line)?;
        } else if let Some(c) = key.as_char().filter(|_| key.is_printable()) {
            win.put_char(c)?;
            line.push(c);
        } else {
            tracing::trace!(%key, "getline ignoring key");
        }
    }
}

fn erase(win: &Window, count: usize) -> Result<()> {
    for _ in 0..count {
        win.backspace()?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test::{ScriptedInput, TestBackend};
    use crate::backend::{EventSource, RawInput};
    use crate::config::SessionConfig;
    use crate::error::Error;
    use crate::pipeline::TerminalSession;
    use crate::state::mouse::MouseState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::time::Duration;

    fn session() -> (Arc<TerminalSession>, TestBackend, ScriptedInput) {
        let backend = TestBackend::new(6, 20);
        let input = ScriptedInput::new();
        let session =
            TerminalSession::new(backend.clone(), input.clone(), SessionConfig::default())
                .unwrap();
        (session, backend, input)
    }

    #[test]
    fn test_getkey_returns_key_and_fires_handlers() {
        let (session, _, input) = session();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        session.keys().register(Key::ANY, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        input.push_key(Key::from('x'));

        let read = getkey(&session.stdscr(), false).unwrap();
        assert_eq!(read, KeyRead::Key(Key::from('x')));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_swallowed_keys_still_fire_handlers() {
        let (session, _, input) = session();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        session.keys().register(Key::ANY, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let id = session.keys().add_interceptor(|key| key == Key::from('x'));
        input.push_key(Key::from('x')).push_key(Key::from('y'));

        let read = getkey(&session.stdscr(), false).unwrap();
        assert_eq!(read, KeyRead::Key(Key::from('y')));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        session.keys().remove_interceptor(id);
    }

    #[test]
    fn test_getkey_eof_and_ctrl_d() {
        let (session, _, input) = session();
        input.push_key(Key::EOT);
        let stdscr = session.stdscr();
        assert_eq!(getkey(&stdscr, false).unwrap(), KeyRead::Eof);
        assert_eq!(getkey(&stdscr, false).unwrap(), KeyRead::Eof);
    }

    #[test]
    fn test_getkey_no_input() {
        let (session, _, input) = session();
        input.push_timeout();
        assert_eq!(getkey(&session.stdscr(), false).unwrap(), KeyRead::NoInput);
    }

    #[test]
    fn test_getkey_dispatches_mouse_and_continues() {
        let (session, _, input) = session();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        session.mouse().add_handler(2, 3, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            true
        });
        input
            .push_mouse(2, 3, MouseState::BUTTON1 | MouseState::PRESSED)
            .push_key(Key::from('k'));

        assert_eq!(
            getkey(&session.stdscr(), false).unwrap(),
            KeyRead::Key(Key::from('k'))
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_getkey_no_mouse_returns_event() {
        let (session, _, input) = session();
        input.push_mouse(1, 1, MouseState::BUTTON3 | MouseState::PRESSED);
        match getkey(&session.stdscr(), true).unwrap() {
            KeyRead::Mouse(event) => {
                assert_eq!(event.button, 3);
                assert_eq!((event.row, event.col), (1, 1));
            }
            other => panic!("expected mouse, got {other:?}"),
        }
    }

    #[test]
    fn test_getkey_resize() {
        let (session, backend, input) = session();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        session.keys().register(Key::RESIZE, move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        backend.resize(10, 30);
        input.push_resize(10, 30);

        let stdscr = session.stdscr();
        assert_eq!(getkey(&stdscr, false).unwrap(), KeyRead::Key(Key::RESIZE));
        assert_eq!(stdscr.size().unwrap(), (10, 30));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_getkey_parks_cursor_on_window() {
        let (session, backend, input) = session();
        let win = session.new_window(crate::types::Rect::new(2, 4, 2, 10));
        win.put_str("ab").unwrap();
        input.push_key(Key::from('z'));
        getkey(&win, false).unwrap();
        assert_eq!(backend.cursor(), (2, 6));
        assert_eq!(session.with_screen(|s| Ok(s.cursor_window())).unwrap(), win.id());
    }

    #[test]
    fn test_getline_backspace() {
        let (session, _, input) = session();
        input.push_str("ab").push_key(Key::BACKSPACE).push_str("c").push_key(Key::CR);
        assert_eq!(getline(&session.stdscr()).unwrap().as_deref(), Some("ac"));
    }

    #[test]
    fn test_getline_erases_echo() {
        let (session, _, input) = session();
        let stdscr = session.stdscr();
        stdscr.put_str("> ").unwrap();
        input.push_str("hello").push_key(Key::LF);

        assert_eq!(getline(&stdscr).unwrap().as_deref(), Some("hello"));
        assert_eq!(stdscr.row_text(0).unwrap().trim_end(), ">");
        assert_eq!(stdscr.cursor().unwrap(), (0, 2));
    }

    #[test]
    fn test_getline_backspace_on_empty_is_noop() {
        let (session, _, input) = session();
        let stdscr = session.stdscr();
        stdscr.put_str("$ ").unwrap();
        input.push_key(Key::DEL).push_str("x").push_key(Key::CR);
        assert_eq!(getline(&stdscr).unwrap().as_deref(), Some("x"));
        assert_eq!(stdscr.row_text(0).unwrap().trim_end(), "$");
    }

    #[test]
    fn test_getline_kill_line() {
        let (session, _, input) = session();
        input.push_str("junk").push_key(Key::NAK).push_str("ok").push_key(Key::ENTER);
        assert_eq!(getline(&session.stdscr()).unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn test_getline_eof_discards_partial() {
        let (session, _, input) = session();
        input.push_str("half");
        assert_eq!(getline(&session.stdscr()).unwrap(), None);
    }

    #[test]
    fn test_getline_registered_key_repaints() {
        let (session, _, input) = session();
        let stdscr = session.stdscr();
        let s = session.clone();
        session.keys().register(Key::f(1), move |_| {
            // Scribble over the line like a help popup would.
            let _ = s.with_screen(|screen| screen.put_str_at(0, 0, 0, "####"));
        });
        input.push_str("ab").push_key(Key::f(1));
        input.push_key(Key::EOT);

        assert_eq!(getline(&stdscr).unwrap(), None);
        assert_eq!(&stdscr.row_text(0).unwrap()[..4], "ab##");
    }

    #[test]
    fn test_getline_skips_registered_keys() {
        let (session, _, input) = session();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        session.keys().register(Key::f(2), move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        input
            .push_str("a")
            .push_key(Key::f(2))
            .push_key(Key::UP)
            .push_str("b")
            .push_key(Key::CR);

        assert_eq!(getline(&session.stdscr()).unwrap().as_deref(), Some("ab"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_getline_routes_mouse() {
        let (session, _, input) = session();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        session.mouse().add_handler(5, 5, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            true
        });
        input
            .push_str("a")
            .push_mouse(5, 5, MouseState::BUTTON1 | MouseState::PRESSED)
            .push_key(Key::CR);
        assert_eq!(getline(&session.stdscr()).unwrap().as_deref(), Some("a"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    /// Blocks in `read` until the test sends something.
    struct ChannelInput {
        rx: mpsc::Receiver<RawInput>,
        entered: Mutex<mpsc::Sender<()>>,
    }

    impl EventSource for ChannelInput {
        fn read(&mut self, _timeout: Option<Duration>) -> std::io::Result<RawInput> {
            let _ = self.entered.lock().unwrap().send(());
            Ok(self.rx.recv().unwrap_or(RawInput::Eof))
        }
    }

    #[test]
    fn test_concurrent_getkey_rejected() {
        let (tx, rx) = mpsc::channel();
        let (entered_tx, entered_rx) = mpsc::channel();
        let session = TerminalSession::new(
            TestBackend::new(4, 10),
            ChannelInput {
                rx,
                entered: Mutex::new(entered_tx),
            },
            SessionConfig::default(),
        )
        .unwrap();

        let reader = {
            let session = session.clone();
            std::thread::spawn(move || getkey(&session.stdscr(), false).map_err(|e| e.to_string()))
        };
        entered_rx.recv().unwrap();

        let second = getkey(&session.stdscr(), false);
        assert!(matches!(second, Err(Error::ConcurrentRead)));

        tx.send(RawInput::Key(Key::from('a'))).unwrap();
        assert_eq!(reader.join().unwrap(), Ok(KeyRead::Key(Key::from('a'))));
    }
}
