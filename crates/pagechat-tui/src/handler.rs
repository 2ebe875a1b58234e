use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, InputMode, Popup, TextInput};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.popup.is_some() {
        handle_popup(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Back to typing
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,

        // Chat actions
        KeyCode::Char('e') => app.start_extract(),
        KeyCode::Char(c @ '1'..='9') => app.run_quick_action(c as usize - '1' as usize),
        KeyCode::Char('c') => app.clear_history(),
        KeyCode::Char('t') => app.popup = Some(Popup::Token(TextInput::default())),
        KeyCode::Char('o') => app.popup = Some(Popup::OpenPage(TextInput::default())),
        KeyCode::Char('g') => app.open_token_page(),
        KeyCode::Char('x') => {
            app.expand_context = !app.expand_context;
            app.scroll_to_bottom();
        }

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page_down(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page_up(),
        KeyCode::PageDown => app.page_down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_input(),
        _ => edit_text(&mut app.input, key),
    }
}

fn handle_popup(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.popup = None,
        KeyCode::Enter => match app.popup.take() {
            Some(Popup::Token(mut input)) => app.save_token(&input.take()),
            Some(Popup::OpenPage(mut input)) => app.open_page(&input.take()),
            None => {}
        },
        _ => {
            if let Some(popup) = app.popup.as_mut() {
                edit_text(popup.input_mut(), key);
            }
        }
    }
}

fn edit_text(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) => input.insert(c),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => {
            for _ in 0..3 {
                app.scroll_down();
            }
        }
        MouseEventKind::ScrollUp => {
            for _ in 0..3 {
                app.scroll_up();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use crossterm::event::KeyEventKind;
    use pagechat_core::error::Result;
    use pagechat_core::{ActivePageExtractor, ChatController, Completer, MemoryStorage, SessionStore};

    struct Silent;

    #[async_trait]
    impl Completer for Silent {
        async fn complete(&self, _credential: Option<&str>, _user_input: &str, _context: Option<&str>) -> Result<String> {
            Ok(String::new())
        }
    }

    fn app() -> App {
        let extractor = Arc::new(ActivePageExtractor::new());
        let store = SessionStore::open(Arc::new(MemoryStorage::new())).unwrap();
        let controller = ChatController::new(store, Arc::new(Silent), extractor.clone());
        App::new(controller, extractor, "test-model")
    }

    fn press(app: &mut App, code: KeyCode) {
        let key = KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(key.kind, KeyEventKind::Press);
        handle_event(app, AppEvent::Key(key));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_ctrl_c_quits_from_editing() {
        let mut app = app();
        assert_eq!(app.input_mode, InputMode::Editing);
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(app.should_quit);
    }

    #[test]
    fn test_typing_q_in_editing_does_not_quit() {
        let mut app = app();
        type_text(&mut app, "quit");
        assert!(!app.should_quit);
        assert_eq!(app.input.value, "quit");

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_token_popup_saves_and_shows_notice() {
        let mut app = app();
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('t'));
        assert!(matches!(app.popup, Some(Popup::Token(_))));

        type_text(&mut app, "hf_abc");
        press(&mut app, KeyCode::Enter);
        assert!(app.popup.is_none());
        assert_eq!(app.controller.credential(), Some("hf_abc"));
        let last = app.controller.display().entries().last().unwrap();
        assert_eq!(last.text(), "API token saved.");
    }

    #[test]
    fn test_popup_escape_discards_input() {
        let mut app = app();
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('o'));
        type_text(&mut app, "https://example.com");
        press(&mut app, KeyCode::Esc);
        assert!(app.popup.is_none());
        assert!(app.current_page().is_none());
    }

    #[test]
    fn test_open_page_popup_sets_active_page() {
        let mut app = app();
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('o'));
        type_text(&mut app, "https://example.com/doc");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.current_page().as_deref(), Some("https://example.com/doc"));
    }

    #[tokio::test]
    async fn test_number_key_sends_quick_action() {
        let mut app = app();
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('1'));
        assert!(app.query_task.is_some());
        assert!(app.input.is_empty());
        let first = app.controller.transcript().turns()[0].clone();
        assert_eq!(first.content, app.controller.quick_actions()[0].question);

        // Out of range does nothing
        press(&mut app, KeyCode::Char('9'));
        assert_eq!(app.controller.transcript().len(), 1);
    }

    #[test]
    fn test_clear_key_resets_view() {
        let mut app = app();
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.controller.display().notice(), Some("Chat history cleared."));
    }
}
