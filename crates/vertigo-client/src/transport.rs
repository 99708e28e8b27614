//! How the consumer reaches the event stream.
//!
//! A [`Transport`] opens one connection and hands back its events as a
//! stream. The consumer owns reconnecting; a transport never retries on
//! its own. The stream ending counts as a disconnect, and so does a
//! connection that goes quiet for longer than its idle timeout.

use std::future::Future;
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use tracing::debug;
use vertigo_core::config::ClientConfig;

use crate::error::ClientError;
use crate::sse::{SseEvent, SseParser};

/// Events of one open connection.
pub type EventStream = BoxStream<'static, Result<SseEvent, ClientError>>;

/// Opens event stream connections.
pub trait Transport: Send + Sync + 'static {
    /// Open a new connection.
    fn connect(&self) -> impl Future<Output = Result<EventStream, ClientError>> + Send;
}

/// Default time without any data before a connection is given up.
/// The server sends a keep-alive comment well within this.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(45);

/// Pass `inner` through, ending it with a transport error once no item
/// has arrived for `idle`.
pub fn idle_limited<S, T>(inner: S, idle: Duration) -> BoxStream<'static, Result<T, ClientError>>
where
    S: Stream<Item = Result<T, ClientError>> + Send + Unpin + 'static,
    T: Send + 'static,
{
    stream::unfold(Some(inner), move |state| async move {
        let mut inner = state?;
        match tokio::time::timeout(idle, inner.next()).await {
            Ok(Some(item)) => Some((item, Some(inner))),
            Ok(None) => None,
            Err(_) => Some((
                Err(ClientError::Transport(format!("no data for {idle:?}"))),
                None,
            )),
        }
    })
    .boxed()
}

/// Event stream over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    idle_timeout: Duration,
}

impl HttpTransport {
    /// A transport reading the event stream at `url`, with the default
    /// idle timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// A transport for `url` with the idle timeout from `config`.
    pub fn from_config(url: impl Into<String>, config: &ClientConfig) -> Self {
        Self::new(url).with_idle_timeout(config.idle_timeout())
    }

    /// Replace the idle timeout. It also bounds the wait for the response
    /// headers.
    #[must_use]
    pub const fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

impl Transport for HttpTransport {
    async fn connect(&self) -> Result<EventStream, ClientError> {
        let request = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send();
        let response = tokio::time::timeout(self.idle_timeout, request)
            .await
            .map_err(|elapsed| {
                ClientError::Transport(format!(
                    "no response within {:?}: {elapsed}",
                    self.idle_timeout
                ))
            })?
            .map_err(|e| ClientError::Transport(format!("event stream request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!(
                "event stream returned {status}"
            )));
        }
        debug!(url = self.url, "Event stream connected");

        let chunks = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| ClientError::Transport(format!("event stream read failed: {e}")))
            })
            .boxed();

        let mut parser = SseParser::new();
        let events = idle_limited(chunks, self.idle_timeout)
            .map(move |chunk| match chunk {
                Ok(bytes) => parser.push(&bytes).into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            })
            .flat_map(stream::iter);
        Ok(events.boxed())
    }
}
