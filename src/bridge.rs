//! Wiring between the conversation store and the notification feed
//!
//! Incoming participant messages become `message` notifications that point
//! back at their conversation by id.

use crate::chat::{ChatEvent, Message};
use crate::notifications::{
    Notification, NotificationCategory, NotificationFeed, NotificationPayload, NotificationTarget,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const PREVIEW_CHARS: usize = 80;

fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Turns chat events into notifications
#[derive(Clone)]
pub struct NotificationBridge {
    feed: NotificationFeed,
}

impl NotificationBridge {
    pub fn new(feed: NotificationFeed) -> Self {
        Self { feed }
    }

    /// Handle a single event. Returns the notification raised, if any.
    pub fn handle(&self, event: &ChatEvent) -> Option<Notification> {
        match event {
            ChatEvent::MessageReceived {
                conversation_id,
                participant_name,
                message,
            } => Some(self.notify_message(conversation_id, participant_name, message)),
            ChatEvent::MessageSent { .. }
            | ChatEvent::UnreadChanged { .. }
            | ChatEvent::ConversationRemoved { .. } => None,
        }
    }

    fn notify_message(
        &self,
        conversation_id: &str,
        participant_name: &str,
        message: &Message,
    ) -> Notification {
        let payload = NotificationPayload::new(
            format!("New message from {participant_name}"),
            preview(&message.content),
        )
        .with_target(NotificationTarget::Conversation {
            conversation_id: conversation_id.to_string(),
        })
        .with_data(json!({
            "message_id": message.id,
            "sender_id": message.sender_id,
        }));
        self.feed
            .add_notification(NotificationCategory::Message, payload)
    }

    /// Consume the store's lossless incoming stream on a background task
    /// until `shutdown` fires or the store goes away
    pub fn spawn(
        self,
        mut events: mpsc::UnboundedReceiver<ChatEvent>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    received = events.recv() => match received {
                        Some(event) => {
                            self.handle(&event);
                        }
                        None => break,
                    },
                }
            }
            tracing::info!("Notification bridge stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ConversationSeed, ConversationStore, Participant, StoreOptions};
    use crate::delivery::RotatingReplies;
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;

    fn message(content: &str) -> Message {
        Message {
            id: "m-1".into(),
            sender_id: "maria".into(),
            content: content.into(),
            timestamp: Utc::now(),
            read: false,
        }
    }

    #[test]
    fn test_only_incoming_messages_raise_notifications() {
        let feed = NotificationFeed::default();
        let bridge = NotificationBridge::new(feed.clone());

        assert!(bridge
            .handle(&ChatEvent::MessageSent {
                conversation_id: "C1".into(),
                message: message("hi"),
            })
            .is_none());
        assert!(bridge
            .handle(&ChatEvent::UnreadChanged {
                conversation_id: "C1".into(),
                unread_count: 1,
            })
            .is_none());

        let n = bridge
            .handle(&ChatEvent::MessageReceived {
                conversation_id: "C1".into(),
                participant_name: "Maria".into(),
                message: message("Salamat!"),
            })
            .unwrap();
        assert_eq!(n.category, NotificationCategory::Message);
        assert_eq!(n.payload.title, "New message from Maria");
        assert_eq!(n.payload.body, "Salamat!");
        assert_eq!(
            n.payload.target,
            Some(NotificationTarget::Conversation {
                conversation_id: "C1".into()
            })
        );
        assert_eq!(n.payload.data["message_id"], "m-1");
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "ñ".repeat(PREVIEW_CHARS + 5);
        let short = preview(&long);
        assert_eq!(short.chars().count(), PREVIEW_CHARS + 1);
        assert!(short.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_flows_into_feed() {
        let store = ConversationStore::new(
            Arc::new(RotatingReplies::new(vec!["Ingat palagi!".into()])),
            StoreOptions {
                reply_delay: Duration::from_millis(500),
                event_capacity: 16,
            },
        );
        store
            .load_conversation(ConversationSeed {
                id: "C1".into(),
                participant: Participant::new("maria", "Maria"),
                messages: vec![],
            })
            .unwrap();
        let feed = NotificationFeed::default();
        let mut feed_rx = feed.subscribe();
        let shutdown = CancellationToken::new();
        let task = NotificationBridge::new(feed.clone())
            .spawn(store.subscribe_incoming(), shutdown.clone());

        store.send_message("C1", "me", "Kumusta?").unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        let event = feed_rx.recv().await.unwrap();
        assert_eq!(event.unread_count(), 1);
        let n = &feed.list()[0];
        assert_eq!(n.payload.body, "Ingat palagi!");
        assert_eq!(feed.len(), 1, "own message must not notify");

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_bridge_stops_when_store_is_dropped() {
        let store = ConversationStore::new(
            Arc::new(RotatingReplies::default()),
            StoreOptions::default(),
        );
        let task = NotificationBridge::new(NotificationFeed::default())
            .spawn(store.subscribe_incoming(), CancellationToken::new());

        drop(store);
        task.await.unwrap();
    }
}
