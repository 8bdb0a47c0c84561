use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, Focus};
use crate::input::EditCursor;
use crate::tui::AppEvent;

const MOUSE_SCROLL_LINES: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(width, height) => app.resized(width, height),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Answer { ticket, outcome } => app.apply_answer(ticket, outcome),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work everywhere
    if ctrl && key.code == KeyCode::Char('c') {
        app.shutdown();
        return;
    }

    if app.file_picker.is_some() {
        handle_file_picker(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('s') if ctrl => {
            app.submit_question();
            return;
        }
        KeyCode::Char('o') if ctrl => {
            app.open_file_picker();
            return;
        }
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return;
        }
        KeyCode::BackTab => {
            app.focus = app.focus.prev();
            return;
        }
        _ => {}
    }

    match app.focus {
        Focus::Url => handle_url(app, key),
        Focus::Upload => handle_upload(app, key),
        Focus::Messages => handle_messages(app, key),
        Focus::Question => handle_question(app, key),
    }
}

/// Shared editing keys for single- and multi-line fields.
/// Returns the new text when it changed.
fn edit_text(cursor: &mut EditCursor, text: &str, key: KeyEvent) -> Option<String> {
    let blocked = key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
    match key.code {
        KeyCode::Backspace => cursor.backspace(text),
        KeyCode::Delete => cursor.delete(text),
        KeyCode::Left => {
            cursor.left();
            None
        }
        KeyCode::Right => {
            cursor.right(text);
            None
        }
        KeyCode::Home => {
            cursor.home();
            None
        }
        KeyCode::End => {
            cursor.end(text);
            None
        }
        KeyCode::Char(c) if !blocked => Some(cursor.insert(text, c)),
        _ => None,
    }
}

fn handle_url(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.focus = Focus::Messages,
        KeyCode::Enter => app.focus = Focus::Question,
        _ => {
            let current = app.session.draft().url().to_string();
            if let Some(updated) = edit_text(&mut app.url_cursor, &current, key) {
                app.set_url(updated);
            }
        }
    }
}

fn handle_upload(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Char(' ') => app.open_file_picker(),
        KeyCode::Char('x') => app.session.clear_file(),
        KeyCode::Esc => app.focus = Focus::Messages,
        _ => {}
    }
}

fn handle_messages(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.shutdown(),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::PageDown => app.scroll_chat_down(app.half_page()),
        KeyCode::PageUp => app.scroll_chat_up(app.half_page()),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,
        KeyCode::Char('G') | KeyCode::End => app.scroll_chat_to_bottom(),
        KeyCode::Char('i') | KeyCode::Enter => app.focus = Focus::Question,
        _ => {}
    }
}

fn handle_question(app: &mut App, key: KeyEvent) {
    let newline = match key.code {
        KeyCode::Enter => key.modifiers.contains(KeyModifiers::ALT),
        KeyCode::Char('j') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    };

    let current = app.session.draft().question().to_string();
    if newline {
        let updated = app.question_cursor.insert(&current, '\n');
        app.set_question(updated);
        return;
    }

    match key.code {
        KeyCode::Enter => app.submit_question(),
        KeyCode::Esc => app.focus = Focus::Messages,
        _ => {
            if let Some(updated) = edit_text(&mut app.question_cursor, &current, key) {
                app.set_question(updated);
            }
        }
    }
}

fn handle_file_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_file_picker(),
        KeyCode::Enter => app.confirm_file_picker(),
        _ => {
            if let Some(picker) = app.file_picker.as_mut() {
                if let Some(updated) = edit_text(&mut picker.cursor, &picker.input, key) {
                    picker.input = updated;
                }
            }
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);

    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_chat_down(MOUSE_SCROLL_LINES),
        MouseEventKind::ScrollUp => app.scroll_chat_up(MOUSE_SCROLL_LINES),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{test_app, StaticService};
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key(code: KeyCode) -> AppEvent {
        key_with(code, KeyModifiers::NONE)
    }

    fn key_with(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_fills_question() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        type_text(&mut app, "hello");
        handle_event(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.session.draft().question(), "hell");
    }

    #[test]
    fn test_alt_enter_inserts_newline() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        type_text(&mut app, "a");
        handle_event(&mut app, key_with(KeyCode::Enter, KeyModifiers::ALT));
        handle_event(&mut app, key_with(KeyCode::Char('j'), KeyModifiers::CONTROL));
        type_text(&mut app, "b");
        assert_eq!(app.session.draft().question(), "a\n\nb");
        assert!(app.session.messages().is_empty());
    }

    #[test]
    fn test_tab_moves_focus_to_url() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        handle_event(&mut app, key(KeyCode::Tab));
        assert_eq!(app.focus, Focus::Url);

        type_text(&mut app, "https://example.com");
        assert_eq!(app.session.draft().url(), "https://example.com");
        assert_eq!(app.session.draft().question(), "");

        handle_event(&mut app, key(KeyCode::BackTab));
        assert_eq!(app.focus, Focus::Question);
    }

    #[test]
    fn test_ctrl_keys_do_not_type() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        handle_event(&mut app, key_with(KeyCode::Char('x'), KeyModifiers::CONTROL));
        assert_eq!(app.session.draft().question(), "");
    }

    #[test]
    fn test_file_picker_flow() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        handle_event(&mut app, key_with(KeyCode::Char('o'), KeyModifiers::CONTROL));
        assert!(app.file_picker.is_some());

        type_text(&mut app, "/tmp/paper.pdf");
        assert_eq!(app.session.draft().question(), "");
        handle_event(&mut app, key(KeyCode::Enter));

        assert!(app.file_picker.is_none());
        assert_eq!(
            app.session.draft().selected_file().map(|f| f.display_name()),
            Some("paper.pdf")
        );
        assert!(app.session.messages().is_empty());
    }

    #[test]
    fn test_esc_closes_picker_without_selecting() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        app.focus = Focus::Upload;
        handle_event(&mut app, key(KeyCode::Enter));
        type_text(&mut app, "/tmp/ignored.pdf");
        handle_event(&mut app, key(KeyCode::Esc));

        assert!(app.file_picker.is_none());
        assert!(app.session.draft().selected_file().is_none());
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_enter_submits_and_answer_event_lands() {
        let (mut app, mut rx) = test_app(StaticService(Ok("A")));
        type_text(&mut app, "Q");
        handle_event(&mut app, key(KeyCode::Enter));

        assert_eq!(app.session.messages().len(), 1);
        assert_eq!(app.session.draft().question(), "");

        let event = rx.recv().await.unwrap();
        handle_event(&mut app, event);

        let contents: Vec<_> = app.session.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Q", "A"]);
    }

    #[test]
    fn test_ctrl_c_quits_from_picker() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        app.open_file_picker();
        handle_event(&mut app, key_with(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_q_quits_only_from_messages() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        type_text(&mut app, "q");
        assert!(!app.should_quit);

        app.focus = Focus::Messages;
        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
