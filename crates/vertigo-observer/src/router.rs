//! Axum router construction for the console API.
//!
//! Assembles all routes (REST + event stream) into a single [`Router`]
//! with CORS middleware enabled for the browser console.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::publisher;
use crate::state::AppState;

/// Build the complete Axum router for the console server.
///
/// See [`handlers`] for the REST endpoints; `GET /api/events` is the
/// server-sent event stream.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Event stream
        .route("/api/events", get(publisher::events))
        // Experiments and window
        .route("/api/experiments", get(handlers::get_experiments))
        .route(
            "/api/experiment",
            delete(handlers::delete_experiment).post(handlers::post_experiment),
        )
        .route("/api/window", delete(handlers::delete_window))
        // Participants
        .route("/api/participants", get(handlers::get_participants))
        .route("/api/participant/{name}", get(handlers::get_participant))
        // Devices
        .route("/api/battery", get(handlers::get_battery))
        .route(
            "/api/camera",
            get(handlers::get_camera)
                .post(handlers::post_camera)
                .delete(handlers::delete_camera),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
