//! Conversation message types
//!
//! These are UI-agnostic: the terminal front end and the one-shot `ask`
//! command both display the same `Message` values.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sequence number of a message within its conversation.
///
/// Ids are handed out in creation order, so comparing two ids compares their
/// position in the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who (or what) produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Bot,
    Error,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Bot => "bot",
            MessageKind::Error => "error",
            MessageKind::System => "system",
        }
    }
}

/// A single entry in the conversation thread. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    kind: MessageKind,
    content: String,
    created_at: DateTime<Utc>,
}

impl Message {
    pub(crate) fn new(id: MessageId, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_user(&self) -> bool {
        self.kind == MessageKind::User
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}
