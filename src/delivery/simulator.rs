//! Delayed, cancellable reply delivery

use super::strategy::{ReplyContext, ReplyStrategy};
use crate::chat::{ChatResult, Message};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Destination for simulated inbound replies
pub trait ReplySink: Send + Sync {
    /// Append a participant-authored reply to the conversation
    fn deliver_reply(&self, conversation_id: &str, content: &str) -> ChatResult<Message>;
}

/// Handle to a pending reply
#[derive(Debug, Clone)]
pub struct ScheduledReply {
    id: String,
    conversation_id: String,
    token: CancellationToken,
}

impl ScheduledReply {
    /// Prevent the reply from firing. No effect once it has fired.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Emulates network latency: each scheduled reply sleeps for its delay on a
/// tokio task, then appends itself through the [`ReplySink`].
///
/// The sink is held weakly, so a reply that outlives its store is dropped
/// silently. Every reply token is a child of the simulator's shutdown token.
#[derive(Clone)]
pub struct DeliverySimulator {
    inner: Arc<SimulatorInner>,
}

struct SimulatorInner {
    sink: Weak<dyn ReplySink>,
    strategy: Arc<dyn ReplyStrategy>,
    default_delay: Duration,
    /// conversation id -> reply id -> token
    pending: Mutex<HashMap<String, HashMap<String, CancellationToken>>>,
    shutdown: CancellationToken,
}

impl DeliverySimulator {
    pub fn new(
        sink: Weak<dyn ReplySink>,
        strategy: Arc<dyn ReplyStrategy>,
        default_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SimulatorInner {
                sink,
                strategy,
                default_delay,
                pending: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Pick a reply with the configured strategy and schedule it after the
    /// default delay
    pub fn schedule_auto_reply(&self, context: &ReplyContext<'_>) -> ScheduledReply {
        let reply = self.inner.strategy.choose_reply(context);
        self.schedule_reply(context.conversation_id, reply, self.inner.default_delay)
    }

    /// Deliver `reply` into the conversation once `delay` has elapsed.
    ///
    /// Never fails. Without a tokio runtime the returned handle is already
    /// cancelled.
    pub fn schedule_reply(
        &self,
        conversation_id: &str,
        reply: String,
        delay: Duration,
    ) -> ScheduledReply {
        let handle = ScheduledReply {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            token: self.inner.shutdown.child_token(),
        };

        if handle.token.is_cancelled() {
            tracing::debug!(conv_id = %conversation_id, "Simulator shut down, reply not scheduled");
            return handle;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(conv_id = %conversation_id, "No tokio runtime, reply not scheduled");
            handle.cancel();
            return handle;
        };

        self.inner.track(&handle);

        let inner = Arc::clone(&self.inner);
        let task = handle.clone();
        runtime.spawn(async move {
            tokio::select! {
                biased;
                () = task.token.cancelled() => {
                    tracing::debug!(
                        conv_id = %task.conversation_id,
                        reply_id = %task.id,
                        "Scheduled reply cancelled"
                    );
                }
                () = tokio::time::sleep(delay) => {
                    inner.fire(&task, &reply);
                }
            }
            inner.untrack(&task);
        });

        tracing::debug!(
            conv_id = %conversation_id,
            reply_id = %handle.id,
            delay_ms = delay.as_millis(),
            "Reply scheduled"
        );
        handle
    }

    /// Cancel every pending reply for a conversation. Returns how many were
    /// cancelled.
    pub fn cancel_conversation(&self, conversation_id: &str) -> usize {
        let removed = self.inner.lock_pending().remove(conversation_id);
        let count = removed.map_or(0, |replies| {
            for token in replies.values() {
                token.cancel();
            }
            replies.len()
        });
        if count > 0 {
            tracing::info!(conv_id = %conversation_id, count, "Cancelled pending replies");
        }
        count
    }

    /// Cancel everything and refuse new work
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.lock_pending().clear();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn pending_replies(&self, conversation_id: &str) -> usize {
        self.inner
            .lock_pending()
            .get(conversation_id)
            .map_or(0, HashMap::len)
    }

    pub fn total_pending(&self) -> usize {
        self.inner.lock_pending().values().map(HashMap::len).sum()
    }
}

impl SimulatorInner {
    fn lock_pending(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, HashMap<String, CancellationToken>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn track(&self, reply: &ScheduledReply) {
        self.lock_pending()
            .entry(reply.conversation_id.clone())
            .or_default()
            .insert(reply.id.clone(), reply.token.clone());
    }

    fn untrack(&self, reply: &ScheduledReply) {
        let mut pending = self.lock_pending();
        if let Some(replies) = pending.get_mut(&reply.conversation_id) {
            replies.remove(&reply.id);
            if replies.is_empty() {
                pending.remove(&reply.conversation_id);
            }
        }
    }

    fn fire(&self, reply: &ScheduledReply, content: &str) {
        if reply.token.is_cancelled() {
            return;
        }
        let Some(sink) = self.sink.upgrade() else {
            tracing::debug!(reply_id = %reply.id, "Store dropped before reply fired");
            return;
        };
        match sink.deliver_reply(&reply.conversation_id, content) {
            Ok(message) => tracing::info!(
                conv_id = %reply.conversation_id,
                message_id = %message.id,
                "Simulated reply delivered"
            ),
            Err(e) if e.is_missing_conversation() => tracing::debug!(
                conv_id = %reply.conversation_id,
                reply_id = %reply.id,
                "Conversation gone, dropping stale reply"
            ),
            Err(e) => tracing::warn!(
                conv_id = %reply.conversation_id,
                error = %e,
                "Simulated reply rejected"
            ),
        }
    }
}
