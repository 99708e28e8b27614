//! Error types for the upstream pollers.
//!
//! None of these leave the poller: they are logged and counted towards
//! the failure threshold of the channel being fed.

/// Errors that can occur while reading an upstream subsystem.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Socket-level failure talking to the UPS server.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The UPS server answered something other than the expected variable.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The UPS server closed the connection.
    #[error("connection closed")]
    Closed,

    /// The subsystem did not answer in time.
    #[error("no answer within {0:?}")]
    Timeout(std::time::Duration),

    /// The HTTP request to the camera subsystem failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The camera subsystem answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// A value could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

impl UpstreamError {
    /// Whether a cached connection must be discarded after this error.
    pub const fn poisons_connection(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Closed | Self::Timeout(_) | Self::Protocol(_)
        )
    }
}
