//! Event stream consumer for the Vertigo console.
//!
//! Connects to the console's server-sent event stream and keeps a local
//! [`StateStore`](vertigo_core::StateStore) in step with the server.
//!
//! - [`sse`]: incremental parser for the `text/event-stream` wire format
//! - [`transport`]: opening connections, over HTTP or anything else that
//!   yields events
//! - [`mirror`]: applying events to the local store
//! - [`consumer`]: the connection state machine with single-flight
//!   reconnect

pub mod consumer;
pub mod error;
pub mod mirror;
pub mod sse;
pub mod transport;

pub use consumer::{ConnectionState, DEFAULT_RECONNECT_DELAY, EventStreamConsumer};
pub use error::ClientError;
pub use mirror::Mirror;
pub use sse::{SseEvent, SseParser};
pub use transport::{DEFAULT_IDLE_TIMEOUT, EventStream, HttpTransport, Transport, idle_limited};
