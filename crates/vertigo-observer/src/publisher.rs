//! Server-sent event stream of console state.
//!
//! Clients connect to `GET /api/events`. Each connection gets its own
//! [`EventStreamPublisher`], which subscribes to every channel of the
//! [`StateStore`] on creation. The subscription fires once per channel
//! right away, so the client first receives a full snapshot and then one
//! event per change:
//!
//! ```text
//! event: cameraUpdate
//! data: {"Framerate":30,...}
//!
//! ```
//!
//! Dropping the publisher (which is what Axum does when the client goes
//! away) removes every listener it registered.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;
use vertigo_core::{ChannelEvent, StateStore, Subscription};

use crate::state::AppState;

/// One event stream connection.
#[derive(Debug)]
pub struct EventStreamPublisher {
    id: Uuid,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    subscription: Subscription,
}

impl EventStreamPublisher {
    /// Subscribe to every channel of `store`.
    ///
    /// The snapshot events are queued before this returns.
    pub fn open(store: &StateStore) -> Self {
        let id = Uuid::new_v4();
        let (tx, events) = mpsc::unbounded_channel();
        let subscription = store.subscribe_all(move |event| {
            // The receiver only goes away together with the subscription.
            let _ = tx.send(event);
        });
        debug!(connection = %id, "Event stream opened");
        Self {
            id,
            events,
            subscription,
        }
    }

    /// Connection id used in logs.
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Unsubscribe from the store. Events already queued are still
    /// yielded, after which the stream ends.
    pub fn close(&mut self) {
        if !self.subscription.is_cancelled() {
            self.subscription.unsubscribe();
            self.events.close();
            debug!(connection = %self.id, "Event stream closed");
        }
    }
}

impl Stream for EventStreamPublisher {
    type Item = ChannelEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for EventStreamPublisher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Encode a channel event as an SSE frame.
pub fn to_sse_event(event: &ChannelEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .data(event.payload.to_string())
}

/// Open an event stream for the connecting client.
///
/// # Route
///
/// `GET /api/events`
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let publisher = EventStreamPublisher::open(&state.store);
    let stream = publisher.map(|event| Ok(to_sse_event(&event)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
