use std::sync::Arc;

use tracing::info;

use crate::client::RecommendBackend;
use crate::conversation::{Conversation, OutgoingQuery};
use crate::message::Message;

/// Drives a [`Conversation`] against a backend, awaiting each reply in turn.
///
/// Every error is folded into the thread as an error message; nothing here
/// returns a failure to the caller.
pub struct ChatController<B: RecommendBackend> {
    conversation: Conversation,
    backend: Arc<B>,
}

impl<B: RecommendBackend> ChatController<B> {
    pub fn new(backend: B) -> Self {
        Self::with_conversation(backend, Conversation::new())
    }

    pub fn with_conversation(backend: B, conversation: Conversation) -> Self {
        Self {
            conversation,
            backend: Arc::new(backend),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn backend(&self) -> Arc<B> {
        Arc::clone(&self.backend)
    }

    pub async fn send_user_message(&mut self, text: &str) {
        let query = self.conversation.begin_send(text);
        self.dispatch(query).await;
    }

    pub async fn retry_last_user_message(&mut self) {
        let query = self.conversation.begin_retry();
        self.dispatch(query).await;
    }

    pub fn has_server_connectivity_error(&self) -> bool {
        self.conversation.has_server_connectivity_error()
    }

    async fn dispatch(&mut self, query: Option<OutgoingQuery>) {
        let Some(query) = query else {
            return;
        };

        let outcome = self.backend.recommend(&query.text).await;
        if let Some(message) = self.conversation.finish(outcome) {
            info!(kind = message.kind().as_str(), "reply recorded");
        }
    }
}
