//! Shared application state for the console API server.

use std::sync::Arc;
use std::time::Duration;

use vertigo_core::{SessionController, StateStore};

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState {
    /// The authoritative store, read by the event stream.
    pub store: Arc<StateStore>,
    /// Trusted mutation API writing into `store`.
    pub controller: SessionController,
}

impl AppState {
    /// Build state around `store` with run sessions lasting
    /// `run_duration`.
    pub fn new(store: Arc<StateStore>, run_duration: Duration) -> Self {
        let controller = SessionController::new(Arc::clone(&store), run_duration);
        Self { store, controller }
    }
}
