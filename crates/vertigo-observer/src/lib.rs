//! Console API server for Vertigo.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Event stream** (`GET /api/events`): server-sent events carrying a
//!   full snapshot of every channel followed by incremental updates, one
//!   [`EventStreamPublisher`] per connection
//! - **Trusted mutation endpoints** for starting and stopping
//!   experiments, closing the window and driving the camera
//! - **Read endpoints** for the catalog, participants and battery
//!
//! # Architecture
//!
//! Handlers call the [`SessionController`] synchronously; nothing awaits
//! between checking state and writing it. The event stream only reads:
//! it subscribes to the [`StateStore`] when the connection opens and
//! unsubscribes when the response body is dropped.
//!
//! [`SessionController`]: vertigo_core::SessionController
//! [`StateStore`]: vertigo_core::StateStore

pub mod error;
pub mod handlers;
pub mod publisher;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;

// Re-export primary types for convenience.
pub use publisher::EventStreamPublisher;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, serve};
pub use startup::{StartupError, spawn_server};
pub use state::AppState;
