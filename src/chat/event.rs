//! Change events emitted by the conversation store

use super::types::Message;
use serde::Serialize;

/// Events pushed to store subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A locally authored message was appended
    MessageSent {
        conversation_id: String,
        message: Message,
    },
    /// A participant message arrived. Consumed by the notification bridge.
    MessageReceived {
        conversation_id: String,
        participant_name: String,
        message: Message,
    },
    UnreadChanged {
        conversation_id: String,
        unread_count: usize,
    },
    ConversationRemoved {
        conversation_id: String,
    },
}

impl ChatEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ChatEvent::MessageSent { .. } => "message_sent",
            ChatEvent::MessageReceived { .. } => "message_received",
            ChatEvent::UnreadChanged { .. } => "unread_changed",
            ChatEvent::ConversationRemoved { .. } => "conversation_removed",
        }
    }
}
