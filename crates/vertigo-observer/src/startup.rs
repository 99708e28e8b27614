//! Server startup helper for embedding in the engine binary.
//!
//! [`spawn_server`] binds eagerly, so address and port problems surface
//! before the engine carries on, then serves on a background task.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the console server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind `config` and spawn the server on a background Tokio task.
///
/// The caller should hold the returned handle and abort or await it
/// during shutdown.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address is invalid or the
/// listener cannot bind.
pub async fn spawn_server(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let addr = config.addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::serve(listener, state).await {
            tracing::error!(error = %e, "Console server exited with error");
        }
    });

    tracing::info!(%addr, "Console server spawned on background task");

    Ok(handle)
}
