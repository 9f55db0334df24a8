//! Conversation state machine
//!
//! `Conversation` owns the append-only message thread and the two loading
//! flags. It performs no I/O: callers take the [`OutgoingQuery`] returned by
//! [`Conversation::begin_send`], run it against a backend however suits them,
//! and hand the outcome back to [`Conversation::finish`].

use tracing::debug;

use crate::error::{is_connectivity_text, ChatError};
use crate::message::{Message, MessageId, MessageKind};

/// A query that has been recorded in the thread and now needs sending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingQuery {
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
    is_sending: bool,
    is_awaiting_reply: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a system greeting. An empty greeting adds nothing.
    pub fn with_greeting(greeting: &str) -> Self {
        let mut conversation = Self::new();
        if !greeting.trim().is_empty() {
            conversation.push(MessageKind::System, greeting);
        }
        conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_sending(&self) -> bool {
        self.is_sending
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.is_awaiting_reply
    }

    /// Record a user message and enter the sending state.
    ///
    /// Returns `None` without touching the thread while another request is
    /// still outstanding.
    pub fn begin_send(&mut self, text: &str) -> Option<OutgoingQuery> {
        if self.is_sending {
            debug!("request already in flight, ignoring send");
            return None;
        }

        self.push(MessageKind::User, text);
        self.is_sending = true;
        self.is_awaiting_reply = true;

        Some(OutgoingQuery {
            text: text.to_string(),
        })
    }

    /// Re-send the most recent user message, if there is one.
    pub fn begin_retry(&mut self) -> Option<OutgoingQuery> {
        let text = self.last_user_message()?.content().to_string();
        debug!(query = %text, "retrying last user message");
        self.begin_send(&text)
    }

    /// Complete the outstanding request, appending exactly one bot or error message.
    ///
    /// Returns `None` and leaves the thread alone when no request is outstanding.
    pub fn finish(&mut self, outcome: Result<String, ChatError>) -> Option<&Message> {
        if !self.is_sending {
            debug!("no request in flight, ignoring reply");
            return None;
        }

        self.is_awaiting_reply = false;
        self.is_sending = false;

        let message = match outcome {
            Ok(text) => self.push(MessageKind::Bot, text),
            Err(err) => {
                debug!(error = %err, "request failed");
                self.push(MessageKind::Error, err.user_message())
            }
        };
        Some(message)
    }

    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_user())
    }

    /// True once any connectivity failure has been recorded.
    pub fn has_server_connectivity_error(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.is_error() && is_connectivity_text(m.content()))
    }

    fn push(&mut self, kind: MessageKind, content: impl Into<String>) -> &Message {
        self.next_id += 1;
        let message = Message::new(MessageId(self.next_id), kind, content);
        debug!(id = %message.id(), kind = kind.as_str(), "appending message");
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    use crate::error::{SERVER_ERROR_MESSAGE, UNREACHABLE_MESSAGE};

    #[test]
    fn test_send_appends_user_and_sets_flags() {
        let mut conv = Conversation::new();
        let query = conv.begin_send("find cardiology").unwrap();

        assert_eq!(query.text, "find cardiology");
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].kind(), MessageKind::User);
        assert!(conv.is_sending());
        assert!(conv.is_awaiting_reply());
    }

    #[test]
    fn test_finish_success_appends_bot_and_clears_flags() {
        let mut conv = Conversation::new();
        conv.begin_send("find cardiology");
        conv.finish(Ok("Try Hospital X".to_string()));

        let last = conv.messages().last().unwrap();
        assert_eq!(last.kind(), MessageKind::Bot);
        assert_eq!(last.content(), "Try Hospital X");
        assert!(!conv.is_sending());
        assert!(!conv.is_awaiting_reply());
    }

    #[test]
    fn test_unreachable_sets_connectivity_flag() {
        let mut conv = Conversation::new();
        conv.begin_send("hi");
        assert!(!conv.has_server_connectivity_error());

        conv.finish(Err(ChatError::Unreachable("connection refused".into())));

        let errors: Vec<_> = conv.messages().iter().filter(|m| m.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].content(), UNREACHABLE_MESSAGE);
        assert!(conv.has_server_connectivity_error());
    }

    #[test]
    fn test_server_error_is_not_connectivity() {
        let mut conv = Conversation::new();
        conv.begin_send("hi");
        conv.finish(Err(ChatError::Server(StatusCode::INTERNAL_SERVER_ERROR)));

        assert_eq!(conv.messages()[1].content(), SERVER_ERROR_MESSAGE);
        assert!(!conv.has_server_connectivity_error());
    }

    #[test]
    fn test_retry_without_user_message_is_noop() {
        let mut conv = Conversation::with_greeting("Welcome!");
        assert!(conv.begin_retry().is_none());
        assert_eq!(conv.messages().len(), 1);
        assert!(!conv.is_sending());
    }

    #[test]
    fn test_retry_resends_latest_user_message() {
        let mut conv = Conversation::new();
        conv.begin_send("first");
        conv.finish(Ok("one".into()));
        conv.begin_send("second");
        conv.finish(Err(ChatError::Unreachable("down".into())));

        let query = conv.begin_retry().unwrap();
        assert_eq!(query.text, "second");
        let last = conv.messages().last().unwrap();
        assert!(last.is_user());
        assert_eq!(last.content(), "second");
    }

    #[test]
    fn test_send_while_in_flight_is_refused() {
        let mut conv = Conversation::new();
        conv.begin_send("first");
        assert!(conv.begin_send("second").is_none());
        assert!(conv.begin_retry().is_none());
        assert_eq!(conv.messages().len(), 1);
    }

    #[test]
    fn test_ids_follow_append_order() {
        let mut conv = Conversation::with_greeting("Welcome!");
        conv.begin_send("a");
        conv.finish(Ok("b".into()));

        let ids: Vec<_> = conv.messages().iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec![MessageId(1), MessageId(2), MessageId(3)]);
        assert_eq!(conv.messages()[0].kind(), MessageKind::System);
    }

    #[test]
    fn test_finish_without_request_is_ignored() {
        let mut conv = Conversation::with_greeting("Welcome!");
        assert!(conv.finish(Ok("stray".into())).is_none());
        assert_eq!(conv.messages().len(), 1);

        conv.begin_send("hi");
        assert!(conv.finish(Ok("one".into())).is_some());
        assert!(conv.finish(Err(ChatError::Unknown("late".into()))).is_none());
        assert_eq!(conv.messages().len(), 3);
        assert_eq!(conv.messages()[2].kind(), MessageKind::Bot);
    }

    #[test]
    fn test_blank_greeting_adds_nothing() {
        assert!(Conversation::with_greeting("  ").messages().is_empty());
    }
}
