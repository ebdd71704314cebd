//! End-to-end tests for a grid driven through `getkey`.
//!
//! Each test runs a full session on the headless backend: scripted mouse
//! reports and keys go in through the event source, cells come out of the
//! backend buffer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use gridterm::backend::test::{ScriptedInput, TestBackend};
use gridterm::{
    getkey, getline, BoxRef, BoxSpec, Grid, Key, KeyRead, MouseState, Rect, ResizeState,
    SessionConfig, TerminalSession, WindowSink,
};

// =============================================================================
// Helpers
// =============================================================================

fn session(rows: u16, cols: u16) -> (Arc<TerminalSession>, TestBackend, ScriptedInput) {
    let backend = TestBackend::new(rows, cols);
    let input = ScriptedInput::new();
    let session =
        TerminalSession::new(backend.clone(), input.clone(), SessionConfig::default()).unwrap();
    (session, backend, input)
}

/// Two columns sharing the border at column 9.
fn halves(grid: &Grid) -> gridterm::Result<()> {
    grid.add_box(
        BoxSpec::new("left", 0, 10)
            .top(BoxRef::Grid)
            .bottom(BoxRef::Grid)
            .left(BoxRef::Grid),
    )?;
    grid.add_box(
        BoxSpec::new("right", 0, 0)
            .top(BoxRef::Grid)
            .bottom(BoxRef::Grid)
            .left2r("left")
            .right(BoxRef::Grid),
    )?;
    Ok(())
}

fn press() -> MouseState {
    MouseState::BUTTON1 | MouseState::PRESSED
}

fn release() -> MouseState {
    MouseState::BUTTON1 | MouseState::RELEASED
}

fn border_row(left: char, split: char, right: char, a: usize, b: usize) -> String {
    format!("{left}{}{split}{}{right}", "─".repeat(a), "─".repeat(b))
}

/// Read keys until one is returned, failing on anything else.
fn next_key(win: &gridterm::Window) -> Key {
    match getkey(win, false).unwrap() {
        KeyRead::Key(key) => key,
        other => panic!("expected a key, got {other:?}"),
    }
}

// =============================================================================
// Border resizing
// =============================================================================

#[test]
fn test_drag_moves_border_and_windows() {
    let (session, backend, input) = session(5, 20);
    let stdscr = session.stdscr();
    let grid = Grid::with_builder(&stdscr, halves).unwrap();

    input
        .push_mouse(2, 9, press())
        .push_mouse(2, 12, MouseState::MOTION)
        .push_mouse(2, 12, release())
        .push_key(Key::from('q'));

    assert_eq!(next_key(&stdscr), Key::from('q'));
    assert!(grid.resize_state().is_idle());
    assert_eq!(grid.rect("left"), Some(Rect::new(0, 0, 5, 13)));
    assert_eq!(grid.rect("right"), Some(Rect::new(0, 12, 5, 8)));

    let left = grid.window("left").unwrap();
    assert_eq!(left.rect().unwrap(), Rect::new(1, 1, 3, 11));
    assert_eq!(backend.row_text(0), border_row('┌', '┬', '┐', 11, 6));
    assert_eq!(backend.row_text(4), border_row('└', '┴', '┘', 11, 6));
}

#[test]
fn test_double_click_enters_resize_mode() {
    let (session, backend, input) = session(5, 20);
    let stdscr = session.stdscr();
    let grid = Grid::with_builder(&stdscr, halves).unwrap();

    input
        .push_mouse(2, 9, press())
        .push_mouse(2, 9, release())
        .push_mouse(2, 9, press())
        .push_mouse(2, 9, release())
        .push_key(Key::RIGHT)
        .push_key(Key::RIGHT)
        .push_key(Key::FF);

    // Resize mode swallows other keys; the redraw key passes through.
    assert_eq!(next_key(&stdscr), Key::FF);
    assert!(matches!(grid.resize_state(), ResizeState::ModalResize(_)));
    assert_eq!(grid.rect("left"), Some(Rect::new(0, 0, 5, 12)));
    assert_eq!(backend.row_text(0), border_row('┌', '┬', '┐', 10, 7));

    input.push_key(Key::CR).push_key(Key::from('q'));
    assert_eq!(next_key(&stdscr), Key::from('q'));
    assert!(grid.resize_state().is_idle());
    assert_eq!(grid.rect("right"), Some(Rect::new(0, 11, 5, 9)));
}

#[test]
fn test_wildcard_handler_sees_keys_swallowed_by_resize_mode() {
    let (session, _, input) = session(5, 20);
    let stdscr = session.stdscr();
    let grid = Grid::with_builder(&stdscr, halves).unwrap();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    session.keys().register(Key::ANY, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    input
        .push_mouse(2, 9, press())
        .push_mouse(2, 9, release())
        .push_mouse(2, 9, press())
        .push_mouse(2, 9, release())
        .push_key(Key::RIGHT)
        .push_key(Key::from('x'))
        .push_key(Key::CR)
        .push_key(Key::from('q'));

    assert_eq!(next_key(&stdscr), Key::from('q'));
    assert_eq!(seen.load(Ordering::SeqCst), 4);
    assert!(grid.resize_state().is_idle());
    assert_eq!(grid.rect("left"), Some(Rect::new(0, 0, 5, 11)));
}

#[test]
fn test_terminal_resize_rebuilds_grid() {
    let (session, backend, input) = session(5, 20);
    let stdscr = session.stdscr();
    let grid = Grid::with_builder(&stdscr, halves).unwrap();
    let right = grid.window("right").unwrap();

    backend.resize(8, 30);
    input.push_resize(8, 30);

    assert_eq!(next_key(&stdscr), Key::RESIZE);
    assert_eq!(grid.window("right").unwrap(), right);
    assert_eq!(grid.rect("right"), Some(Rect::new(0, 9, 8, 21)));
    assert_eq!(backend.row_text(7), border_row('└', '┴', '┘', 8, 19));
}

#[test]
fn test_rebuild_is_repeatable() {
    let (session, _, _) = session(9, 40);
    let grid = Grid::with_builder(&session.stdscr(), halves).unwrap();

    let first: Vec<_> = grid.names().iter().map(|n| grid.rect(n)).collect();
    grid.rebuild().unwrap();
    let second: Vec<_> = grid.names().iter().map(|n| grid.rect(n)).collect();
    assert_eq!(first, second);
}

// =============================================================================
// Keys and lines
// =============================================================================

#[test]
fn test_function_key_handler_runs_before_return() {
    let (session, _, input) = session(5, 20);
    let stdscr = session.stdscr();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    session.keys().register(Key::f(1), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    input.push_key(Key::f(1)).push_key(Key::from('a'));
    assert_eq!(next_key(&stdscr), Key::f(1));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(next_key(&stdscr), Key::from('a'));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_getline_edits_then_hits_eof() {
    let (session, _, input) = session(5, 20);
    let stdscr = session.stdscr();
    input.push_str("hi").push_key(Key::DEL).push_str("!\r");

    assert_eq!(getline(&stdscr).unwrap().as_deref(), Some("h!"));
    assert_eq!(getline(&stdscr).unwrap(), None);
}

// =============================================================================
// Logging
// =============================================================================

#[test]
fn test_background_logging_keeps_input_cursor() {
    let (session, backend, _) = session(10, 30);
    let grid = Grid::new(&session.stdscr()).unwrap();
    grid.layout(vec![
        BoxSpec::new("cmd", 3, 0)
            .top(BoxRef::Grid)
            .left(BoxRef::Grid)
            .right(BoxRef::Grid),
        BoxSpec::new("log", 0, 0)
            .top2b("cmd")
            .bottom(BoxRef::Grid)
            .left(BoxRef::Grid)
            .right(BoxRef::Grid),
    ])
    .unwrap();

    let cmd = grid.window("cmd").unwrap();
    cmd.put_str("> ").unwrap();
    session
        .with_screen(|s| s.set_cursor_window(cmd.id()))
        .unwrap();

    let sink = WindowSink::new(grid.window("log").unwrap()).unwrap();
    thread::scope(|scope| {
        scope.spawn(|| {
            let subscriber = tracing_subscriber::fmt()
                .with_writer(sink.clone())
                .with_ansi(false)
                .without_time()
                .with_target(false)
                .with_level(false)
                .finish();
            tracing::subscriber::with_default(subscriber, || {
                tracing::info!("hello");
            });
        });
    });

    let row = backend.row_text(3);
    assert!(row.starts_with('│'));
    assert!(row.trim_start_matches('│').trim_start().starts_with("hello"));
    assert_eq!(backend.cursor(), (1, 3));
}
