//! Notification feed
//!
//! Aggregates cross-cutting events (new messages, check-in flags, alerts)
//! independently of any conversation.

mod feed;
mod sources;
mod types;

pub use feed::{FeedError, NotificationFeed};
pub use sources::{AlertBroadcast, AlertKind, AlertPriority, CheckInReport, Mood, SourceError};
pub use types::{
    FeedEvent, Notification, NotificationCategory, NotificationPayload, NotificationTarget,
};
