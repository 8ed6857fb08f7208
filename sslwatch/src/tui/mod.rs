//! Interactive terminal dashboard
//!
//! Architecture:
//! - Main thread: owns all state, polls input, renders
//! - Tokio worker threads: run certificate checks and WHOIS lookups
//! - Communication via the orchestrator's two result channels, drained
//!   without blocking once per tick
//!
//! Popups are overlay state in the same loop, so certificate results keep
//! arriving while one is open.

mod app;
mod event;
mod popup;
mod ui;

use app::App;
use crossterm::{
    cursor::Show,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use event::{map_event, EventSource};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use sslwatch_lib::CheckOrchestrator;
use std::any::Any;
use std::io::{self, Stdout};
use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::{debug, error};
use ui::{Palette, Renderer};

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Set when something may have written over the screen behind ratatui's back.
static STRAY_OUTPUT: AtomicBool = AtomicBool::new(false);

fn take_stray_output() -> bool {
    STRAY_OUTPUT.swap(false, Ordering::Relaxed)
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen, Show);
}

/// Puts the terminal into raw/alternate-screen mode and undoes it on drop,
/// including when the loop returns an error or panics.
struct TerminalGuard {
    _panics: PanicRedirect,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = TerminalGuard {
            _panics: PanicRedirect::install(),
        };
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

/// Keeps panic reports off the dashboard while it owns the screen.
///
/// Panics on worker threads are caught by the pool and only logged here. A
/// panic on the UI thread restores the terminal first, then reports through
/// the previous hook as usual.
struct PanicRedirect {
    previous: Option<Arc<PanicHook>>,
}

impl PanicRedirect {
    fn install() -> Self {
        let previous: Arc<PanicHook> = Arc::new(panic::take_hook());
        let ui_thread = thread::current().id();
        let fallback = Arc::clone(&previous);

        panic::set_hook(Box::new(move |info| {
            report_panic(info, ui_thread, &fallback);
        }));

        Self {
            previous: Some(previous),
        }
    }
}

impl Drop for PanicRedirect {
    fn drop(&mut self) {
        // set_hook panics when called while unwinding
        if thread::panicking() {
            return;
        }
        if let Some(previous) = self.previous.take() {
            let _ = panic::take_hook();
            panic::set_hook(Box::new(move |info| (*previous)(info)));
        }
    }
}

fn report_panic(info: &PanicHookInfo<'_>, ui_thread: ThreadId, fallback: &PanicHook) {
    let current = thread::current();
    if current.id() == ui_thread {
        restore_terminal();
        fallback(info);
        return;
    }

    let location = info
        .location()
        .map(ToString::to_string)
        .unwrap_or_default();
    error!(
        thread = current.name().unwrap_or("unnamed"),
        location = %location,
        "worker panicked: {}",
        panic_message(info.payload())
    );
    STRAY_OUTPUT.store(true, Ordering::Relaxed);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Run the dashboard until the user quits.
pub fn run(orchestrator: CheckOrchestrator, tick_rate: Duration) -> io::Result<()> {
    let _guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let size = terminal.size()?;
    let mut app = App::new(orchestrator, Rect::new(0, 0, size.width, size.height));
    let renderer = Renderer::new(Palette::default());

    let result = run_loop(&mut terminal, &mut app, &renderer, EventSource::new(tick_rate));
    app.shutdown();
    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    renderer: &Renderer,
    events: EventSource,
) -> io::Result<()> {
    loop {
        // The stderr error layer can write over the alternate screen
        let stray = take_stray_output();
        let cleared = app.take_clear() || stray;
        if cleared {
            terminal.clear()?;
        }
        if app.take_dirty() || cleared {
            terminal.draw(|frame| renderer.draw(frame, app))?;
        }

        if let Some(event) = events.next()? {
            if let Some(action) = map_event(&event, app.input_context()) {
                debug!(?action, "input");
                app.apply(action);
            }
        }

        app.drain();

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}
