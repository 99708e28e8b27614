//! Errors returned by the trusted mutation API.
//!
//! Each [`ControlError`] belongs to one [`ErrorKind`] so transports can map
//! it to a status without matching on every variant. The `Display` text is
//! the message shown to the operator.

/// Broad category of a [`ControlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Something referenced does not exist or is not available.
    NotFound,
    /// The request conflicts with the current session state.
    Conflict,
    /// The request itself is malformed.
    Invalid,
}

/// A trusted mutation or query was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    /// The experiment key is not in the catalog.
    #[error("unknown experiment '{0}'")]
    UnknownExperiment(String),

    /// A run session is already active; carries the running key.
    #[error("experiment '{0}' is already running")]
    ExperimentAlreadyRunning(String),

    /// Stop was requested with no run session active.
    #[error("no experiment started")]
    NoExperimentRunning,

    /// Close was requested on a closed window.
    #[error("window is not opened")]
    WindowNotOpen,

    /// Start was requested while the camera streams.
    #[error("camera is already started")]
    CameraAlreadyStarted,

    /// Stop was requested while the camera is stopped.
    #[error("camera is not started")]
    CameraNotStarted,

    /// Parameters were queried while the camera is stopped.
    #[error("camera is not running")]
    CameraNotRunning,

    /// Camera parameters could not be merged over the defaults.
    #[error("invalid camera parameters: {0}")]
    InvalidCameraParameters(String),

    /// No battery reading is currently available.
    #[error("battery state unavailable")]
    BatteryUnavailable,
}

impl ControlError {
    /// The category of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownExperiment(_) | Self::CameraNotRunning | Self::BatteryUnavailable => {
                ErrorKind::NotFound
            }
            Self::ExperimentAlreadyRunning(_)
            | Self::NoExperimentRunning
            | Self::WindowNotOpen
            | Self::CameraAlreadyStarted
            | Self::CameraNotStarted => ErrorKind::Conflict,
            Self::InvalidCameraParameters(_) => ErrorKind::Invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_operator_wording() {
        assert_eq!(
            ControlError::UnknownExperiment(String::from("x.psyexp")).to_string(),
            "unknown experiment 'x.psyexp'"
        );
        assert_eq!(
            ControlError::ExperimentAlreadyRunning(String::from("valid.psyexp")).to_string(),
            "experiment 'valid.psyexp' is already running"
        );
        assert_eq!(ControlError::NoExperimentRunning.to_string(), "no experiment started");
        assert_eq!(ControlError::WindowNotOpen.to_string(), "window is not opened");
        assert_eq!(ControlError::CameraAlreadyStarted.to_string(), "camera is already started");
        assert_eq!(ControlError::CameraNotStarted.to_string(), "camera is not started");
        assert_eq!(ControlError::CameraNotRunning.to_string(), "camera is not running");
    }

    #[test]
    fn kinds() {
        assert_eq!(
            ControlError::UnknownExperiment(String::new()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(ControlError::CameraAlreadyStarted.kind(), ErrorKind::Conflict);
        assert_eq!(
            ControlError::InvalidCameraParameters(String::new()).kind(),
            ErrorKind::Invalid
        );
    }
}
