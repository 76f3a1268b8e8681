use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Whether keystrokes navigate or edit the search input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Browse,
    Search,
}

/// User actions from keyboard events
#[derive(Debug, PartialEq)]
pub enum Action {
    Quit,
    Back,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PageUp,
    PageDown,
    Select,
    ToggleFocus,
    StartSearch,
    OlderYear,
    NewerYear,
    RollingWindow,
    CopyConversation,
    Input(char),
    DeleteChar,
    None,
}

/// Poll for keyboard events and convert to actions
pub fn poll_event(timeout: Duration, mode: InputMode) -> anyhow::Result<Action> {
    if event::poll(timeout)?
        && let Event::Key(key) = event::read()?
        && key.kind == KeyEventKind::Press
    {
        return Ok(key_to_action(key, mode));
    }
    Ok(Action::None)
}

fn key_to_action(key: KeyEvent, mode: InputMode) -> Action {
    match (key.code, key.modifiers) {
        // Available in every mode
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,
        (KeyCode::Char('y'), KeyModifiers::CONTROL) => Action::CopyConversation,
        (KeyCode::Char('p'), KeyModifiers::CONTROL) => Action::MoveUp,
        (KeyCode::Char('n'), KeyModifiers::CONTROL) => Action::MoveDown,
        (KeyCode::Esc, _) => Action::Back,
        (KeyCode::Enter, _) => Action::Select,
        (KeyCode::Tab, _) => Action::ToggleFocus,
        (KeyCode::Up, _) => Action::MoveUp,
        (KeyCode::Down, _) => Action::MoveDown,
        (KeyCode::Left, _) => Action::MoveLeft,
        (KeyCode::Right, _) => Action::MoveRight,
        (KeyCode::PageUp, _) => Action::PageUp,
        (KeyCode::PageDown, _) => Action::PageDown,

        // Search input
        (KeyCode::Char(c), KeyModifiers::NONE) | (KeyCode::Char(c), KeyModifiers::SHIFT)
            if mode == InputMode::Search =>
        {
            Action::Input(c)
        }
        (KeyCode::Backspace, _) if mode == InputMode::Search => Action::DeleteChar,

        // Browse keys
        (KeyCode::Char('q'), KeyModifiers::NONE) => Action::Quit,
        (KeyCode::Char('/'), KeyModifiers::NONE) => Action::StartSearch,
        (KeyCode::Char('['), KeyModifiers::NONE) => Action::OlderYear,
        (KeyCode::Char(']'), KeyModifiers::NONE) => Action::NewerYear,
        (KeyCode::Char('r'), KeyModifiers::NONE) => Action::RollingWindow,
        (KeyCode::Char('k'), KeyModifiers::NONE) => Action::MoveUp,
        (KeyCode::Char('j'), KeyModifiers::NONE) => Action::MoveDown,
        (KeyCode::Char('h'), KeyModifiers::NONE) => Action::MoveLeft,
        (KeyCode::Char('l'), KeyModifiers::NONE) => Action::MoveRight,

        _ => Action::None,
    }
}
