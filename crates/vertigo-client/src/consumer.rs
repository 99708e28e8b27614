//! Persistent event stream connection with automatic reconnect.
//!
//! # States
//!
//! ```text
//! Disconnected -> Connecting -> Connected
//!                    ^              |
//!                    |            error
//!                    |              v
//!            ReconnectPending <- Error
//! ```
//!
//! An error on a connecting or connected stream tears the connection down
//! and arms one reconnect timer. Further errors while that timer is
//! pending do not arm another one. Opening a connection always cancels a
//! pending timer first.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vertigo_core::StateStore;
use vertigo_core::config::ClientConfig;

use crate::error::ClientError;
use crate::mirror::Mirror;
use crate::transport::Transport;

/// Default delay before reconnecting after an error.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Where the consumer is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying to; initial and final state.
    Disconnected,
    /// Opening a connection.
    Connecting,
    /// Receiving events.
    Connected,
    /// The connection failed and was torn down.
    Error,
    /// Waiting for the reconnect timer.
    ReconnectPending,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner<T> {
    transport: T,
    store: Arc<StateStore>,
    reconnect_delay: Duration,
    state: watch::Sender<ConnectionState>,
    generation: AtomicU64,
    shut_down: AtomicBool,
    connection: Mutex<Option<JoinHandle<()>>>,
    reconnect: Mutex<Option<JoinHandle<()>>>,
}

/// Client side of the event stream.
///
/// Mirrors the remote console state into a local [`StateStore`]. Dropping
/// the consumer shuts it down.
pub struct EventStreamConsumer<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> EventStreamConsumer<T> {
    /// Create a consumer writing into `store` and connect right away.
    /// Must be called from within a Tokio runtime.
    pub fn start(transport: T, store: Arc<StateStore>, reconnect_delay: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let inner = Arc::new(Inner {
            transport,
            store,
            reconnect_delay,
            state,
            generation: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
            connection: Mutex::new(None),
            reconnect: Mutex::new(None),
        });
        inner.connect();
        Self { inner }
    }

    /// Like [`start`](Self::start), with the delay from `config`.
    pub fn from_config(transport: T, store: Arc<StateStore>, config: &ClientConfig) -> Self {
        Self::start(transport, store, config.reconnect_delay())
    }

    /// The mirror store.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.inner.store
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Watch connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Whether a reconnect timer is armed.
    pub fn reconnect_pending(&self) -> bool {
        lock(&self.inner.reconnect).is_some()
    }

    /// Report a failure of the current connection observed outside the
    /// stream itself, such as a failed write on the same transport.
    pub fn fail_connection(&self, error: &ClientError) {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.inner.fail(generation, error);
    }

    /// Drop the connection and any pending reconnect for good.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl<T: Transport> Drop for EventStreamConsumer<T> {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl<T: Transport> std::fmt::Debug for EventStreamConsumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamConsumer")
            .field("state", &self.state())
            .field("reconnect_pending", &self.reconnect_pending())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Inner<T> {
    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn connect(self: &Arc<Self>) {
        if self.shut_down.load(Ordering::SeqCst) {
            return;
        }
        let pending = lock(&self.reconnect).take();
        if let Some(timer) = pending {
            timer.abort();
        }

        let mut connection = lock(&self.connection);
        if let Some(task) = connection.take() {
            task.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        self.set_state(ConnectionState::Connecting);
        *connection = Some(tokio::spawn(Arc::clone(self).run_connection(generation)));
    }

    async fn run_connection(self: Arc<Self>, generation: u64) {
        let mut events = match self.transport.connect().await {
            Ok(events) => events,
            Err(e) => {
                self.fail(generation, &e);
                return;
            }
        };
        self.set_state(ConnectionState::Connected);
        info!("Event stream connected");

        let mut mirror = Mirror::new(Arc::clone(&self.store));
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => match mirror.apply(&event) {
                    Ok(Some(channel)) => debug!(%channel, "Applied event"),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Dropping malformed event"),
                },
                Err(e) => {
                    drop(events);
                    self.fail(generation, &e);
                    return;
                }
            }
        }
        drop(events);
        self.fail(
            generation,
            &ClientError::Transport(String::from("event stream ended")),
        );
    }

    fn fail(self: &Arc<Self>, generation: u64, error: &ClientError) {
        if self.shut_down.load(Ordering::SeqCst)
            || generation != self.generation.load(Ordering::SeqCst)
        {
            return;
        }

        let mut reconnect = lock(&self.reconnect);
        if reconnect.is_some() {
            debug!(error = %error, "Reconnect already pending");
            return;
        }

        warn!(error = %error, "Event stream failed");
        self.set_state(ConnectionState::Error);
        let current = lock(&self.connection).take();
        if let Some(task) = current {
            task.abort();
        }

        let inner = Arc::clone(self);
        *reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.reconnect_delay).await;
            lock(&inner.reconnect).take();
            inner.connect();
        }));
        self.set_state(ConnectionState::ReconnectPending);
    }

    fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let pending = lock(&self.reconnect).take();
        if let Some(timer) = pending {
            timer.abort();
        }
        let current = lock(&self.connection).take();
        if let Some(task) = current {
            task.abort();
        }
        self.set_state(ConnectionState::Disconnected);
        debug!("Event stream consumer shut down");
    }
}
