//! REST API endpoint handlers for the console server.
//!
//! Every handler is a thin wrapper over the [`SessionController`]: it
//! decodes the request, calls one trusted operation and maps the outcome
//! to a response. Mutations answer `200` with a `null` body on success.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/experiments` | Full experiment catalog |
//! | `POST` | `/api/experiment` | Start a run session |
//! | `DELETE` | `/api/experiment` | Stop the run session |
//! | `DELETE` | `/api/window` | Close the stimulus window |
//! | `GET` | `/api/participants` | Full participant registry |
//! | `GET` | `/api/participant/{name}` | One participant, created on first use |
//! | `GET` | `/api/battery` | Current battery reading |
//! | `POST` | `/api/camera` | Start the camera |
//! | `GET` | `/api/camera` | Current camera parameters |
//! | `DELETE` | `/api/camera` | Stop the camera |
//!
//! [`SessionController`]: vertigo_core::SessionController

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::Deserialize;
use vertigo_types::{
    BatteryState, CameraParameters, Catalog, Participant, ParticipantByName, RunParameters,
    WindowParameters,
};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/experiment`.
#[derive(Debug, Deserialize)]
pub struct RunExperimentRequest {
    /// Catalog key of the experiment to run.
    pub key: String,
    /// Participant, session and any extra experiment parameters.
    pub parameters: RunParameters,
    /// Window to open for the run.
    #[serde(default)]
    pub window: WindowParameters,
}

// ---------------------------------------------------------------------------
// Experiments
// ---------------------------------------------------------------------------

/// Return the full experiment catalog.
pub async fn get_experiments(State(state): State<Arc<AppState>>) -> Json<Catalog> {
    Json(state.controller.experiments())
}

/// Start a run session.
pub async fn post_experiment(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RunExperimentRequest>, JsonRejection>,
) -> Result<Json<()>, ObserverError> {
    let Json(request) = body?;
    state
        .controller
        .run_experiment(&request.key, &request.parameters, request.window)?;
    Ok(Json(()))
}

/// Stop the active run session.
pub async fn delete_experiment(
    State(state): State<Arc<AppState>>,
) -> Result<Json<()>, ObserverError> {
    state.controller.stop_experiment()?;
    Ok(Json(()))
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Close the stimulus window.
pub async fn delete_window(State(state): State<Arc<AppState>>) -> Result<Json<()>, ObserverError> {
    state.controller.close_window()?;
    Ok(Json(()))
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// Return the full participant registry.
pub async fn get_participants(State(state): State<Arc<AppState>>) -> Json<ParticipantByName> {
    Json(state.controller.participants())
}

/// Return one participant, registering it if it is new.
pub async fn get_participant(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Json<Participant> {
    Json(state.controller.participant(&name))
}

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

/// Return the current battery reading, `404` while unknown.
pub async fn get_battery(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BatteryState>, ObserverError> {
    Ok(Json(state.controller.battery()?))
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// Start the camera with the posted parameters merged over the defaults.
pub async fn post_camera(
    State(state): State<Arc<AppState>>,
    body: Result<Json<serde_json::Map<String, serde_json::Value>>, JsonRejection>,
) -> Result<Json<CameraParameters>, ObserverError> {
    let Json(partial) = body?;
    Ok(Json(state.controller.start_camera(&partial)?))
}

/// Return the parameters of the running camera.
pub async fn get_camera(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CameraParameters>, ObserverError> {
    Ok(Json(state.controller.camera()?))
}

/// Stop the camera.
pub async fn delete_camera(State(state): State<Arc<AppState>>) -> Result<Json<()>, ObserverError> {
    state.controller.stop_camera()?;
    Ok(Json(()))
}
