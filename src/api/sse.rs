//! Server-Sent Events support
//!
//! Each stream opens with an `init` snapshot and then relays the store or
//! feed broadcast channel until the app shuts down.

use crate::chat::ChatEvent;
use crate::notifications::FeedEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

/// Events that can be relayed over SSE
pub trait StreamEvent: Serialize + Clone + Send + 'static {
    fn event_type(&self) -> &'static str;
}

impl StreamEvent for ChatEvent {
    fn event_type(&self) -> &'static str {
        ChatEvent::event_type(self)
    }
}

impl StreamEvent for FeedEvent {
    fn event_type(&self) -> &'static str {
        FeedEvent::event_type(self)
    }
}

/// Convert broadcast stream to SSE stream
pub fn sse_stream<E: StreamEvent>(
    init: Value,
    broadcast_rx: broadcast::Receiver<E>,
    shutdown: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        Ok(Event::default().event("init").data(init.to_string()))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(to_axum_event(&event))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::debug!(skipped, "SSE subscriber lagged");
            None
        }
    });

    let combined = futures::StreamExt::take_until(
        init.chain(broadcasts),
        shutdown.cancelled_owned(),
    );

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn to_axum_event<E: StreamEvent>(event: &E) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to serialize SSE event");
        String::from("{}")
    });
    Event::default().event(event.event_type()).data(data)
}
