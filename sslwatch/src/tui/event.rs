//! Input polling and key mapping

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use std::io;
use std::time::Duration;

/// What the user asked for, independent of the raw terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleInputMode,
    ToggleDetailView,
    Backspace,
    AppendChar(char),
    Submit,
    ScrollPage(PageDirection),
    OpenHelp,
    PointerClick { row: u16, column: u16 },
    ScrollPopup(PopupScroll),
    ClosePopup,
    Resize { width: u16, height: u16 },
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupScroll {
    LineUp,
    LineDown,
    PageUp,
    PageDown,
}

/// Which key map applies. Popups capture input while they are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputContext {
    Main,
    WhoisPopup,
    Help,
}

/// Map a terminal event to an action in the given context.
///
/// Returns `None` for anything without a binding.
pub fn map_event(event: &Event, context: InputContext) -> Option<Action> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => map_key(key, context),
        Event::Mouse(mouse) => map_mouse(mouse, context),
        Event::Resize(width, height) => Some(Action::Resize {
            width: *width,
            height: *height,
        }),
        _ => None,
    }
}

fn map_key(key: &KeyEvent, context: InputContext) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        return Some(Action::Quit);
    }

    match context {
        InputContext::Main => match (key.code, ctrl) {
            (KeyCode::Char('f'), true) => Some(Action::ToggleInputMode),
            (KeyCode::Char('d'), true) => Some(Action::ToggleDetailView),
            (KeyCode::Enter, _) => Some(Action::Submit),
            (KeyCode::Backspace, _) => Some(Action::Backspace),
            (KeyCode::Left, _) => Some(Action::ScrollPage(PageDirection::Left)),
            (KeyCode::Right, _) => Some(Action::ScrollPage(PageDirection::Right)),
            (KeyCode::F(1), _) => Some(Action::OpenHelp),
            (KeyCode::Char(c), false)
                if (c.is_ascii_graphic() || c == ' ')
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                Some(Action::AppendChar(c))
            }
            _ => None,
        },
        InputContext::WhoisPopup => match key.code {
            KeyCode::Up => Some(Action::ScrollPopup(PopupScroll::LineUp)),
            KeyCode::Down => Some(Action::ScrollPopup(PopupScroll::LineDown)),
            KeyCode::PageUp => Some(Action::ScrollPopup(PopupScroll::PageUp)),
            KeyCode::PageDown => Some(Action::ScrollPopup(PopupScroll::PageDown)),
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::ClosePopup),
            _ => None,
        },
        // Any key dismisses help
        InputContext::Help => Some(Action::ClosePopup),
    }
}

fn map_mouse(mouse: &MouseEvent, context: InputContext) -> Option<Action> {
    match (mouse.kind, context) {
        (MouseEventKind::Down(MouseButton::Left), InputContext::Main | InputContext::WhoisPopup) => {
            Some(Action::PointerClick {
                row: mouse.row,
                column: mouse.column,
            })
        }
        (MouseEventKind::ScrollUp, InputContext::WhoisPopup) => {
            Some(Action::ScrollPopup(PopupScroll::LineUp))
        }
        (MouseEventKind::ScrollDown, InputContext::WhoisPopup) => {
            Some(Action::ScrollPopup(PopupScroll::LineDown))
        }
        _ => None,
    }
}

/// Polls the terminal for input, waiting at most one tick.
pub struct EventSource {
    tick_rate: Duration,
}

impl EventSource {
    pub fn new(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    /// Next terminal event, or `None` if the tick elapsed without one.
    pub fn next(&self) -> io::Result<Option<Event>> {
        if event::poll(self.tick_rate)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }
}
