//! Error types for the event stream consumer.

/// Errors seen by the consumer. Neither is fatal: transport errors lead
/// to a reconnect, malformed events are dropped.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The stream could not be opened or broke while reading.
    #[error("transport error: {0}")]
    Transport(String),

    /// An event payload was not valid JSON for its channel.
    #[error("malformed {event} payload: {source}")]
    MalformedEvent {
        /// Event name as received.
        event: String,
        /// The decoding error.
        source: serde_json::Error,
    },
}
