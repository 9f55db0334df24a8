use anyhow::Result;
use carebot_core::{OutgoingQuery, RecommendBackend};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply(outcome) => {
            if let Some(message) = app.conversation.finish(outcome) {
                info!(id = %message.id(), kind = message.kind().as_str(), "reply received");
            }
            app.animation_frame = 0;
        }
    }
    Ok(())
}

/// Run the query on a background task; the outcome comes back as `AppEvent::Reply`.
fn dispatch(app: &App, query: OutgoingQuery, tx: &UnboundedSender<AppEvent>) {
    let client = app.client.clone();
    let tx = tx.clone();
    debug!(query = %query.text, endpoint = %client.endpoint(), "dispatching query");
    tokio::spawn(async move {
        let outcome = client.recommend(&query.text).await;
        // The receiver is gone only when the app is shutting down
        let _ = tx.send(AppEvent::Reply(outcome));
    });
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => app.should_quit = true,
        KeyCode::Esc => app.should_quit = true,

        KeyCode::Char('r') if ctrl => {
            if let Some(query) = app.retry() {
                dispatch(app, query, tx);
            }
        }

        KeyCode::Enter => {
            if let Some(query) = app.submit_input() {
                dispatch(app, query, tx);
            }
        }

        // Thread scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.half_page()),
        KeyCode::PageDown => app.scroll_down(app.half_page()),

        // Input editing
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) if !ctrl => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebot_core::error::UNREACHABLE_MESSAGE;
    use carebot_core::{MessageKind, RecommendClient};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn type_text(app: &mut App, text: &str, tx: &UnboundedSender<AppEvent>) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)), tx).unwrap();
        }
    }

    async fn unreachable_app() -> App {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let client = RecommendClient::with_client(&format!("http://{}", addr), http);
        App::new(client, "Welcome!")
    }

    #[test]
    fn test_char_to_byte_index_utf8() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[tokio::test]
    async fn test_editing_keys() {
        let mut app = unreachable_app().await;
        let (tx, _rx) = mpsc::unbounded_channel();

        type_text(&mut app, "héart", &tx);
        handle_event(&mut app, key(KeyCode::Left), &tx).unwrap();
        handle_event(&mut app, key(KeyCode::Backspace), &tx).unwrap();
        assert_eq!(app.input, "héat");

        handle_event(&mut app, key(KeyCode::Home), &tx).unwrap();
        handle_event(&mut app, key(KeyCode::Delete), &tx).unwrap();
        assert_eq!(app.input, "éat");
        assert_eq!(app.cursor, 0);

        handle_event(&mut app, key(KeyCode::End), &tx).unwrap();
        assert_eq!(app.cursor, 3);
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let mut app = unreachable_app().await;
        let (tx, _rx) = mpsc::unbounded_channel();
        handle_event(&mut app, ctrl('c'), &tx).unwrap();
        assert!(app.should_quit);

        let mut app = unreachable_app().await;
        handle_event(&mut app, key(KeyCode::Esc), &tx).unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_enter_sends_and_reply_lands_in_thread() {
        let mut app = unreachable_app().await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        type_text(&mut app, "find cardiology", &tx);
        handle_event(&mut app, key(KeyCode::Enter), &tx).unwrap();
        assert!(app.conversation.is_awaiting_reply());
        assert!(app.input.is_empty());

        let reply = rx.recv().await.unwrap();
        assert!(matches!(reply, AppEvent::Reply(Err(_))));
        handle_event(&mut app, reply, &tx).unwrap();

        let last = app.conversation.messages().last().unwrap();
        assert_eq!(last.kind(), MessageKind::Error);
        assert_eq!(last.content(), UNREACHABLE_MESSAGE);
        assert!(app.conversation.has_server_connectivity_error());
        assert!(!app.conversation.is_sending());
    }

    #[tokio::test]
    async fn test_ctrl_r_retries_last_query() {
        let mut app = unreachable_app().await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        type_text(&mut app, "find cardiology", &tx);
        handle_event(&mut app, key(KeyCode::Enter), &tx).unwrap();
        let reply = rx.recv().await.unwrap();
        handle_event(&mut app, reply, &tx).unwrap();

        handle_event(&mut app, ctrl('r'), &tx).unwrap();
        let last = app.conversation.messages().last().unwrap();
        assert!(last.is_user());
        assert_eq!(last.content(), "find cardiology");
        assert!(app.conversation.is_sending());
    }

    #[tokio::test]
    async fn test_ctrl_r_without_history_does_nothing() {
        let mut app = unreachable_app().await;
        let (tx, _rx) = mpsc::unbounded_channel();

        handle_event(&mut app, ctrl('r'), &tx).unwrap();

        assert_eq!(app.conversation.messages().len(), 1);
        assert!(!app.conversation.is_sending());
        assert!(app.input.is_empty());
    }
}
