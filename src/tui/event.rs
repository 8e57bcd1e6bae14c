//! Keyboard event handling for the TUI.
//!
//! Maps crossterm keyboard events to application state changes. Key
//! behavior depends on which panel has focus.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, Focus};

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    /// Index the paths in the documents input
    Process,
    /// Answer the question in the question input
    Ask,
}

/// Handles a keyboard event and updates the app state accordingly.
///
/// # Event Handling
///
/// - `Ctrl+C`: Quit application (from any focus state)
/// - `Tab` / `Shift+Tab`: Cycle focus between panels
/// - `Esc`: Clear the status line
/// - `Enter`: Process documents or ask, depending on focus
/// - When an input is focused: character input and backspace edit it
/// - When the answer is focused: j/k or arrow keys scroll
///
/// # Examples
///
/// ```
/// use pdfrag::tui::{App, event::{Action, handle_key_event}};
/// use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
///
/// let mut app = App::new();
/// let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
/// assert_eq!(handle_key_event(&mut app, key), Action::Quit);
/// ```
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Action {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Tab => {
            app.next_focus();
            return Action::None;
        }
        KeyCode::BackTab => {
            app.prev_focus();
            return Action::None;
        }
        KeyCode::Esc => {
            app.clear_status();
            return Action::None;
        }
        _ => {}
    }

    match app.focus() {
        Focus::DocumentsInput => handle_input(app, key, Action::Process),
        Focus::QuestionInput => handle_input(app, key, Action::Ask),
        Focus::AnswerView => {
            handle_answer_view(app, key);
            Action::None
        }
    }
}

/// Edits the focused input; Enter submits it as `on_enter`.
fn handle_input(app: &mut App, key: KeyEvent, on_enter: Action) -> Action {
    match key.code {
        KeyCode::Enter => on_enter,
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            app.push_char(c);
            Action::None
        }
        KeyCode::Backspace => {
            app.pop_char();
            Action::None
        }
        _ => Action::None,
    }
}

fn handle_answer_view(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.scroll_answer_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_answer_up(1),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::StatusLevel;

    fn press(app: &mut App, code: KeyCode) -> Action {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn ctrl_c_quits_from_any_focus() {
        let mut app = App::new();
        for _ in 0..3 {
            let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
            assert_eq!(handle_key_event(&mut app, key), Action::Quit);
            app.next_focus();
        }
    }

    #[test]
    fn plain_q_is_typed_not_quit() {
        let mut app = App::new();
        assert_eq!(press(&mut app, KeyCode::Char('q')), Action::None);
        assert_eq!(app.documents_input(), "q");
    }

    #[test]
    fn tab_and_backtab_cycle_focus() {
        let mut app = App::new();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus(), Focus::QuestionInput);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus(), Focus::AnswerView);

        let back = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        handle_key_event(&mut app, back);
        assert_eq!(app.focus(), Focus::QuestionInput);
    }

    #[test]
    fn enter_maps_to_focused_action() {
        let mut app = App::new();
        assert_eq!(press(&mut app, KeyCode::Enter), Action::Process);

        press(&mut app, KeyCode::Tab);
        assert_eq!(press(&mut app, KeyCode::Enter), Action::Ask);

        press(&mut app, KeyCode::Tab);
        assert_eq!(press(&mut app, KeyCode::Enter), Action::None);
    }

    #[test]
    fn typing_and_backspace_edit_input() {
        let mut app = App::new();
        press(&mut app, KeyCode::Tab);
        for c in "Why?".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Backspace);

        let shifted = KeyEvent::new(KeyCode::Char('!'), KeyModifiers::SHIFT);
        handle_key_event(&mut app, shifted);

        assert_eq!(app.question_input(), "Why!");
        assert_eq!(app.documents_input(), "");
    }

    #[test]
    fn esc_clears_status() {
        let mut app = App::new();
        app.set_status(StatusLevel::Warning, "Please process documents first.");
        press(&mut app, KeyCode::Esc);
        assert!(app.status().is_none());
    }

    #[test]
    fn answer_view_scrolls() {
        let mut app = App::new();
        app.prev_focus();
        assert_eq!(app.focus(), Focus::AnswerView);

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.answer_scroll(), 2);
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.answer_scroll(), 1);
    }
}
