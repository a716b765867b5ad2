//! In-memory conversation store
//!
//! Owns every conversation and message. The index of conversations sits
//! behind a reader/writer lock; each conversation has its own mutex so that
//! writes to one log are serialized without blocking the others.

use super::error::{require_id, ChatError, ChatResult, ValidationError};
use super::event::ChatEvent;
use super::types::{Conversation, ConversationSeed, ConversationSummary, Message};
use crate::delivery::{DeliverySimulator, ReplyContext, ReplySink, ReplyStrategy};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Tunables for a store instance
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Latency of simulated replies
    pub reply_delay: Duration,
    /// Capacity of the change-event channel
    pub event_capacity: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(1500),
            event_capacity: 256,
        }
    }
}

type Slot = Arc<Mutex<Conversation>>;

#[derive(Default)]
struct ConversationIndex {
    /// Insertion order, used for listing
    order: Vec<String>,
    slots: HashMap<String, Slot>,
}

struct StoreInner {
    index: RwLock<ConversationIndex>,
    /// Lossy change stream for observers (SSE)
    events: broadcast::Sender<ChatEvent>,
    /// Lossless `MessageReceived` streams, one per subscriber
    incoming: Mutex<Vec<mpsc::UnboundedSender<ChatEvent>>>,
    delivery: DeliverySimulator,
}

/// Handle to the conversation store. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<StoreInner>,
}

fn lock(slot: &Slot) -> MutexGuard<'_, Conversation> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn validate_content(content: &str) -> Result<&str, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyContent)
    } else {
        Ok(trimmed)
    }
}

impl ConversationStore {
    pub fn new(strategy: Arc<dyn ReplyStrategy>, options: StoreOptions) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let inner = Arc::new_cyclic(|weak: &Weak<StoreInner>| {
            let sink: Weak<dyn ReplySink> = weak.clone();
            StoreInner {
                index: RwLock::new(ConversationIndex::default()),
                events,
                incoming: Mutex::new(Vec::new()),
                delivery: DeliverySimulator::new(sink, strategy, options.reply_delay),
            }
        });
        Self { inner }
    }

    // ==================== Lifecycle ====================

    /// Create a conversation out-of-band (seed data or an external loader)
    pub fn load_conversation(&self, seed: ConversationSeed) -> ChatResult<()> {
        require_id(&seed.id, "conversation id")?;
        require_id(&seed.participant.id, "participant id")?;

        let mut conversation = Conversation::new(seed.id, seed.participant);
        for entry in seed.messages {
            require_id(&entry.sender_id, "sender id")?;
            let content = validate_content(&entry.content)?.to_string();
            let floor = conversation.next_timestamp();
            let timestamp = entry.timestamp.map_or(floor, |ts| ts.max(floor));
            let from_participant = entry.sender_id == conversation.participant.id;
            conversation.append(Message {
                id: entry
                    .id
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                sender_id: entry.sender_id,
                content,
                timestamp,
                read: entry.read || !from_participant,
            });
        }

        let mut index = self.inner.write_index();
        if index.slots.contains_key(&conversation.id) {
            return Err(ValidationError::DuplicateConversation(conversation.id).into());
        }
        tracing::info!(
            conv_id = %conversation.id,
            participant = %conversation.participant.name,
            messages = conversation.messages.len(),
            "Loaded conversation"
        );
        index.order.push(conversation.id.clone());
        index
            .slots
            .insert(conversation.id.clone(), Arc::new(Mutex::new(conversation)));
        Ok(())
    }

    /// Delete a conversation and cancel its pending replies
    pub fn remove_conversation(&self, conversation_id: &str) -> bool {
        let removed = {
            let mut index = self.inner.write_index();
            let removed = index.slots.remove(conversation_id).is_some();
            if removed {
                index.order.retain(|id| id != conversation_id);
            }
            removed
        };
        if removed {
            self.inner.delivery.cancel_conversation(conversation_id);
            tracing::info!(conv_id = %conversation_id, "Removed conversation");
            self.inner.emit(ChatEvent::ConversationRemoved {
                conversation_id: conversation_id.to_string(),
            });
        }
        removed
    }

    /// Cancel all pending replies. The store stays readable.
    pub fn shutdown(&self) {
        self.inner.delivery.shutdown();
        tracing::info!("Conversation store shut down");
    }

    // ==================== Reads ====================

    /// Conversations whose participant name contains `filter`, in insertion
    /// order
    pub fn list_conversations(&self, filter: Option<&str>) -> Vec<Conversation> {
        let query = filter.unwrap_or_default();
        let index = self.inner.read_index();
        index
            .order
            .iter()
            .filter_map(|id| index.slots.get(id))
            .map(|slot| lock(slot).clone())
            .filter(|conv| conv.matches(query))
            .collect()
    }

    pub fn summaries(&self, filter: Option<&str>) -> Vec<ConversationSummary> {
        self.list_conversations(filter)
            .iter()
            .map(Conversation::summary)
            .collect()
    }

    /// Snapshot of one conversation. Does not touch read state.
    pub fn select_conversation(&self, conversation_id: &str) -> ChatResult<Conversation> {
        let slot = self
            .inner
            .slot(conversation_id)
            .ok_or_else(|| ChatError::NotFound(conversation_id.to_string()))?;
        let conversation = lock(&slot).clone();
        Ok(conversation)
    }

    pub fn unread_count(&self, conversation_id: &str) -> ChatResult<usize> {
        self.select_conversation(conversation_id)
            .map(|conv| conv.unread_count())
    }

    pub fn total_unread(&self) -> usize {
        let index = self.inner.read_index();
        index.slots.values().map(|slot| lock(slot).unread_count()).sum()
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.inner.read_index().slots.contains_key(conversation_id)
    }

    pub fn len(&self) -> usize {
        self.inner.read_index().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_replies(&self, conversation_id: &str) -> usize {
        self.inner.delivery.pending_replies(conversation_id)
    }

    pub fn delivery(&self) -> &DeliverySimulator {
        &self.inner.delivery
    }

    /// Push-based change stream. Slow receivers may lag and miss events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.events.subscribe()
    }

    /// Every `MessageReceived` event, in log order, without loss. The
    /// channel closes when the store is dropped.
    pub fn subscribe_incoming(&self) -> mpsc::UnboundedReceiver<ChatEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .incoming
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    // ==================== Writes ====================

    /// Append a locally authored message and schedule the simulated reply.
    ///
    /// Returns immediately; the reply arrives later on the change stream.
    pub fn send_message(
        &self,
        conversation_id: &str,
        author_id: &str,
        content: &str,
    ) -> ChatResult<Message> {
        require_id(author_id, "author id")?;
        let content = validate_content(content)?;
        let (message, participant) = self.inner.with_conversation(
            conversation_id,
            || ValidationError::UnknownConversation(conversation_id.to_string()).into(),
            |conv| {
                let message = Message {
                    id: uuid::Uuid::new_v4().to_string(),
                    sender_id: author_id.to_string(),
                    content: content.to_string(),
                    timestamp: conv.next_timestamp(),
                    read: true,
                };
                conv.append(message.clone());
                self.inner.emit(ChatEvent::MessageSent {
                    conversation_id: conversation_id.to_string(),
                    message: message.clone(),
                });
                Ok((message, conv.participant.clone()))
            },
        )?;

        tracing::info!(
            conv_id = %conversation_id,
            message_id = %message.id,
            author = %author_id,
            "Message sent"
        );

        self.inner.delivery.schedule_auto_reply(&ReplyContext {
            conversation_id,
            participant_id: &participant.id,
            participant_name: &participant.name,
            outbound: &message.content,
        });

        Ok(message)
    }

    /// Append a participant-authored, unread message
    pub fn receive_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
    ) -> ChatResult<Message> {
        self.inner
            .append_incoming(conversation_id, Some(sender_id), content)
    }

    /// Mark the whole log read. Idempotent; returns how many messages
    /// flipped.
    pub fn mark_conversation_read(&self, conversation_id: &str) -> ChatResult<usize> {
        let flipped = self.inner.with_conversation(
            conversation_id,
            || ChatError::NotFound(conversation_id.to_string()),
            |conv| {
                let flipped = conv.mark_all_read();
                if flipped > 0 {
                    self.inner.emit(ChatEvent::UnreadChanged {
                        conversation_id: conversation_id.to_string(),
                        unread_count: conv.unread_count(),
                    });
                }
                Ok(flipped)
            },
        )?;
        if flipped > 0 {
            tracing::debug!(conv_id = %conversation_id, flipped, "Conversation marked read");
        }
        Ok(flipped)
    }
}

impl StoreInner {
    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, ConversationIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_index(&self) -> std::sync::RwLockWriteGuard<'_, ConversationIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, conversation_id: &str) -> Option<Slot> {
        self.read_index().slots.get(conversation_id).cloned()
    }

    /// Run `f` against a live conversation with its mutex held. The index
    /// read guard is held as well, so a removal waits for `f` to finish and
    /// nothing is written to a conversation after it was removed.
    fn with_conversation<T>(
        &self,
        conversation_id: &str,
        missing: impl FnOnce() -> ChatError,
        f: impl FnOnce(&mut Conversation) -> ChatResult<T>,
    ) -> ChatResult<T> {
        let index = self.read_index();
        let slot = index.slots.get(conversation_id).ok_or_else(missing)?;
        let mut conv = lock(slot);
        f(&mut *conv)
    }

    /// Callers emit while holding the conversation mutex so that events of
    /// one conversation are published in log order.
    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn emit_incoming(&self, event: &ChatEvent) {
        self.incoming
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// `sender_id = None` means "whoever the participant is"
    fn append_incoming(
        &self,
        conversation_id: &str,
        sender_id: Option<&str>,
        content: &str,
    ) -> ChatResult<Message> {
        if let Some(sender_id) = sender_id {
            require_id(sender_id, "sender id")?;
        }
        let content = validate_content(content)?;
        let (message, unread_count) = self.with_conversation(
            conversation_id,
            || ValidationError::UnknownConversation(conversation_id.to_string()).into(),
            |conv| {
                let participant_id = conv.participant.id.clone();
                if let Some(sender_id) = sender_id {
                    if sender_id != participant_id {
                        return Err(ValidationError::ForeignSender(sender_id.to_string()).into());
                    }
                }
                let message = Message {
                    id: uuid::Uuid::new_v4().to_string(),
                    sender_id: participant_id,
                    content: content.to_string(),
                    timestamp: conv.next_timestamp(),
                    read: false,
                };
                conv.append(message.clone());
                let unread_count = conv.unread_count();

                let received = ChatEvent::MessageReceived {
                    conversation_id: conversation_id.to_string(),
                    participant_name: conv.participant.name.clone(),
                    message: message.clone(),
                };
                self.emit_incoming(&received);
                self.emit(received);
                self.emit(ChatEvent::UnreadChanged {
                    conversation_id: conversation_id.to_string(),
                    unread_count,
                });
                Ok((message, unread_count))
            },
        )?;

        tracing::info!(
            conv_id = %conversation_id,
            message_id = %message.id,
            unread_count,
            "Message received"
        );
        Ok(message)
    }
}

impl ReplySink for StoreInner {
    fn deliver_reply(&self, conversation_id: &str, content: &str) -> ChatResult<Message> {
        self.append_incoming(conversation_id, None, content)
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.delivery.shutdown();
    }
}
