//! API request and response types

use crate::chat::{Conversation, ConversationSummary, Message};
use crate::notifications::{Notification, NotificationTarget};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query string for conversation listing
#[derive(Debug, Default, Deserialize)]
pub struct ListConversationsQuery {
    /// Case-insensitive participant name filter
    #[serde(default)]
    pub q: Option<String>,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Request to add a notification directly
#[derive(Debug, Deserialize)]
pub struct AddNotificationRequest {
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub target: Option<NotificationTarget>,
    #[serde(default)]
    pub data: Value,
}

/// Response with a list of conversations
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
    pub total_unread: usize,
}

/// Response with a single conversation and its full log
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: Conversation,
    pub unread_count: usize,
}

/// Response for a sent message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: Message,
}

/// Response for read/mark-all actions
#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub marked: usize,
    pub unread_count: usize,
}

/// Response for removals and other idempotent actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Response with the notification feed
#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

/// Response with a single notification
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub notification: Notification,
    pub unread_count: usize,
}

/// Response for per-notification updates. `changed` is false when the id was
/// already gone or already read.
#[derive(Debug, Serialize)]
pub struct NotificationUpdateResponse {
    pub changed: bool,
    pub unread_count: usize,
}

/// Response for a check-in report
#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
