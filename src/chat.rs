//! Conversation store
//!
//! Per-conversation message logs, read receipts and unread counts.

mod error;
mod event;
mod store;
mod types;

#[cfg(test)]
mod proptests;

pub use error::{ChatError, ChatResult, ErrorKind, ValidationError};
pub use event::ChatEvent;
pub use store::{ConversationStore, StoreOptions};
pub use types::{
    Conversation, ConversationSeed, ConversationSummary, Message, Participant, PresenceStatus,
    SeedMessage,
};
