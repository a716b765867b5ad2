//! Application composition root
//!
//! Builds the conversation store, the notification feed and the bridge
//! between them once at startup; everything else receives handles.

use crate::bridge::NotificationBridge;
use crate::chat::{ConversationStore, StoreOptions};
use crate::config::Config;
use crate::delivery::ReplyStrategy;
use crate::notifications::NotificationFeed;
use crate::seed::{SeedError, SeedFile};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Running messaging core. Must be created inside a tokio runtime.
pub struct App {
    store: ConversationStore,
    feed: NotificationFeed,
    shutdown: CancellationToken,
    bridge_task: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    /// Build from configuration and load the configured seed
    pub fn start(config: &Config) -> Result<Self, SeedError> {
        let seed = match &config.seed_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading seed file");
                SeedFile::read(path)?
            }
            None => SeedFile::demo(),
        };
        let app = Self::new(config.reply_strategy.build(), config.store_options());
        seed.load_into(&app.store)?;
        Ok(app)
    }

    /// Empty store with an explicit strategy
    pub fn new(strategy: Arc<dyn ReplyStrategy>, options: StoreOptions) -> Self {
        let store = ConversationStore::new(strategy, options);
        let feed = NotificationFeed::new(options.event_capacity);
        let shutdown = CancellationToken::new();
        let bridge_task = NotificationBridge::new(feed.clone())
            .spawn(store.subscribe_incoming(), shutdown.clone());

        Self {
            store,
            feed,
            shutdown,
            bridge_task: Mutex::new(Some(bridge_task)),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    /// Token cancelled by [`App::shutdown`]; long-lived consumers (SSE
    /// streams, the HTTP server) can watch it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel pending replies and stop the bridge
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.store.shutdown();
        let task = self
            .bridge_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Notification bridge ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{RotatingReplies, StrategyKind};
    use crate::notifications::NotificationCategory;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_start_with_demo_seed() {
        let config = Config {
            reply_strategy: StrategyKind::Rotate,
            ..Config::default()
        };
        let app = App::start(&config).unwrap();
        assert_eq!(app.store().len(), 3);
        assert!(app.feed().is_empty());
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_instances() {
        let a = App::new(Arc::new(RotatingReplies::default()), StoreOptions::default());
        let b = App::new(Arc::new(RotatingReplies::default()), StoreOptions::default());
        crate::seed::SeedFile::demo().load_into(a.store()).unwrap();

        assert_eq!(a.store().len(), 3);
        assert!(b.store().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_lands_in_store_and_feed() {
        let app = App::new(
            Arc::new(RotatingReplies::new(vec!["Noted po!".into()])),
            StoreOptions {
                reply_delay: Duration::from_millis(200),
                event_capacity: 16,
            },
        );
        crate::seed::SeedFile::demo().load_into(app.store()).unwrap();
        let mut feed_rx = app.feed().subscribe();

        app.store()
            .send_message("conv-nena", "me", "Kumain na po kayo?")
            .unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        feed_rx.recv().await.unwrap();

        assert_eq!(app.store().unread_count("conv-nena").unwrap(), 1);
        let feed = app.feed().list();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].category, NotificationCategory::Message);
        assert_eq!(feed[0].payload.title, "New message from Lola Nena");

        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_reply_notifies_with_tiny_event_capacity() {
        let app = App::new(
            Arc::new(RotatingReplies::default()),
            StoreOptions {
                reply_delay: Duration::from_millis(100),
                event_capacity: 1,
            },
        );
        crate::seed::SeedFile::demo().load_into(app.store()).unwrap();

        for content in ["Kumusta po?", "Kain na po", "Ingat po"] {
            app.store().send_message("conv-nena", "me", content).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(app.store().unread_count("conv-nena").unwrap(), 3);
        assert_eq!(app.feed().len(), 3);
        assert_eq!(app.feed().unread_count(), 3);

        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_replies() {
        let app = App::new(Arc::new(RotatingReplies::default()), StoreOptions::default());
        crate::seed::SeedFile::demo().load_into(app.store()).unwrap();

        app.store().send_message("conv-jose", "me", "Sige po").unwrap();
        app.shutdown().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let conv = app.store().select_conversation("conv-jose").unwrap();
        assert_eq!(conv.messages.len(), 2);
        assert!(app.feed().is_empty());
        assert!(app.shutdown_token().is_cancelled());
    }
}
