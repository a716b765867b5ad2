//! Notification types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Notification category. Open set: unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationCategory {
    Message,
    CheckInFlag,
    Alert,
    Task,
    Other(String),
}

impl NotificationCategory {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationCategory::Message => "message",
            NotificationCategory::CheckInFlag => "check_in_flag",
            NotificationCategory::Alert => "alert",
            NotificationCategory::Task => "task",
            NotificationCategory::Other(tag) => tag,
        }
    }
}

impl From<String> for NotificationCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "message" => NotificationCategory::Message,
            "check_in_flag" | "check-in-flag" => NotificationCategory::CheckInFlag,
            "alert" => NotificationCategory::Alert,
            "task" => NotificationCategory::Task,
            _ => NotificationCategory::Other(value),
        }
    }
}

impl From<&str> for NotificationCategory {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<NotificationCategory> for String {
    fn from(value: NotificationCategory) -> Self {
        match value {
            NotificationCategory::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// By-id reference to whatever the notification is about. Never resolved by
/// the feed itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationTarget {
    Conversation { conversation_id: String },
    Buddy { buddy_id: String },
    Alert { alert_id: String },
    Task { task_id: String },
}

/// Category-specific display data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NotificationTarget>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            target: None,
            data: Value::Null,
        }
    }

    pub fn with_target(mut self, target: NotificationTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// One entry of the feed. Only `is_read` ever changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub category: NotificationCategory,
    pub payload: NotificationPayload,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

/// Change events pushed to feed subscribers. Each carries the unread count
/// after the change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    Added {
        notification: Notification,
        unread_count: usize,
    },
    Read {
        id: String,
        unread_count: usize,
    },
    AllRead {
        unread_count: usize,
    },
    Cleared {
        id: String,
        unread_count: usize,
    },
}

impl FeedEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            FeedEvent::Added { .. } => "added",
            FeedEvent::Read { .. } => "read",
            FeedEvent::AllRead { .. } => "all_read",
            FeedEvent::Cleared { .. } => "cleared",
        }
    }

    pub fn unread_count(&self) -> usize {
        match self {
            FeedEvent::Added { unread_count, .. }
            | FeedEvent::Read { unread_count, .. }
            | FeedEvent::AllRead { unread_count }
            | FeedEvent::Cleared { unread_count, .. } => *unread_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_known_and_open_tags() {
        let json = serde_json::to_string(&NotificationCategory::CheckInFlag).unwrap();
        assert_eq!(json, "\"check_in_flag\"");

        let parsed: NotificationCategory = serde_json::from_str("\"alert\"").unwrap();
        assert_eq!(parsed, NotificationCategory::Alert);

        let custom: NotificationCategory = serde_json::from_str("\"badge_earned\"").unwrap();
        assert_eq!(custom, NotificationCategory::Other("badge_earned".into()));
        assert_eq!(custom.to_string(), "badge_earned");
    }

    #[test]
    fn test_payload_omits_empty_fields() {
        let payload = NotificationPayload::new("Hi", "there");
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, serde_json::json!({ "title": "Hi", "body": "there" }));

        let targeted = payload.with_target(NotificationTarget::Conversation {
            conversation_id: "C1".into(),
        });
        let value = serde_json::to_value(&targeted).unwrap();
        assert_eq!(value["target"]["kind"], "conversation");
        assert_eq!(value["target"]["conversation_id"], "C1");
    }
}
