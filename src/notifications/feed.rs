//! Notification feed
//!
//! A single newest-first list of notifications with its own read/unread
//! lifecycle. Cleanup operations treat unknown ids as no-ops because callers
//! cannot know whether a concurrent clear already removed the entry.

use super::types::{FeedEvent, Notification, NotificationCategory, NotificationPayload};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("notification not found: {0}")]
    NotFound(String),
}

/// Handle to the notification feed. Clones share state.
#[derive(Clone)]
pub struct NotificationFeed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    /// Front is newest
    entries: RwLock<VecDeque<Notification>>,
    events: broadcast::Sender<FeedEvent>,
}

fn unread_in(entries: &VecDeque<Notification>) -> usize {
    entries.iter().filter(|n| !n.is_read).count()
}

impl NotificationFeed {
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            inner: Arc::new(FeedInner {
                entries: RwLock::new(VecDeque::new()),
                events,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, VecDeque<Notification>> {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<Notification>> {
        self.inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: FeedEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Prepend a new unread notification
    pub fn add_notification(
        &self,
        category: impl Into<NotificationCategory>,
        payload: NotificationPayload,
    ) -> Notification {
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            category: category.into(),
            payload,
            timestamp: Utc::now(),
            is_read: false,
        };
        let unread_count = {
            let mut entries = self.write();
            entries.push_front(notification.clone());
            unread_in(&entries)
        };
        tracing::info!(
            notification_id = %notification.id,
            category = %notification.category,
            unread_count,
            "Notification added"
        );
        self.emit(FeedEvent::Added {
            notification: notification.clone(),
            unread_count,
        });
        notification
    }

    /// Returns whether the notification changed. Absent ids are ignored.
    pub fn mark_as_read(&self, id: &str) -> bool {
        let (changed, unread_count) = {
            let mut entries = self.write();
            let changed = match entries.iter_mut().find(|n| n.id == id && !n.is_read) {
                Some(notification) => {
                    notification.is_read = true;
                    true
                }
                None => false,
            };
            (changed, unread_in(&entries))
        };
        if changed {
            self.emit(FeedEvent::Read {
                id: id.to_string(),
                unread_count,
            });
        } else {
            tracing::debug!(notification_id = %id, "mark_as_read: nothing to do");
        }
        changed
    }

    /// Returns how many notifications flipped to read
    pub fn mark_all_as_read(&self) -> usize {
        let flipped = {
            let mut entries = self.write();
            let mut flipped = 0;
            for notification in entries.iter_mut().filter(|n| !n.is_read) {
                notification.is_read = true;
                flipped += 1;
            }
            flipped
        };
        if flipped > 0 {
            self.emit(FeedEvent::AllRead { unread_count: 0 });
        }
        flipped
    }

    /// Permanently remove a notification. Absent ids are ignored.
    pub fn clear_notification(&self, id: &str) -> bool {
        let (removed, unread_count) = {
            let mut entries = self.write();
            let before = entries.len();
            entries.retain(|n| n.id != id);
            (entries.len() != before, unread_in(&entries))
        };
        if removed {
            tracing::debug!(notification_id = %id, "Notification cleared");
            self.emit(FeedEvent::Cleared {
                id: id.to_string(),
                unread_count,
            });
        }
        removed
    }

    /// Always recomputed from the entries
    pub fn unread_count(&self) -> usize {
        unread_in(&self.read())
    }

    /// Snapshot, newest first
    pub fn list(&self) -> Vec<Notification> {
        self.read().iter().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Result<Notification, FeedError> {
        self.read()
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| FeedError::NotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.inner.events.subscribe()
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(256)
    }
}
