pub mod client;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod message;
pub mod render;

// Re-export main types for convenience
pub use client::{RecommendBackend, RecommendClient};
pub use config::Config;
pub use controller::ChatController;
pub use conversation::{Conversation, OutgoingQuery};
pub use error::ChatError;
pub use message::{Message, MessageId, MessageKind};
pub use render::{render, Block, ListItem, Segment};
