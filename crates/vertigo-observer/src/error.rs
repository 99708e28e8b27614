//! Error types for the console API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vertigo_core::{ControlError, ErrorKind};

/// Errors that can occur in the console API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// A trusted mutation or query was rejected.
    #[error(transparent)]
    Control(#[from] ControlError),

    /// The request body could not be decoded.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ObserverError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ObserverError {
    /// HTTP status for this error.
    ///
    /// Not-found errors answer `404` and everything else `400`, except
    /// that an unknown experiment is a `400` and stopping a closed window
    /// or camera is a `404`.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Control(ControlError::UnknownExperiment(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Control(ControlError::WindowNotOpen | ControlError::CameraNotStarted) => {
                StatusCode::NOT_FOUND
            }
            Self::Control(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict | ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
