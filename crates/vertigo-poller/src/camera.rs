//! Live stream path from the camera subsystem.
//!
//! The camera subsystem reports its parameters as a JSON object; the
//! `RtspServerPath` field holds the URL of the live stream. The poller
//! publishes only the path component of that URL on the stream channel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use vertigo_core::StateStore;
use vertigo_core::config::CameraConfig;

use crate::error::UpstreamError;
use crate::hysteresis::FailureCounter;
use crate::poller::UpstreamPoller;

/// Something that can report the camera parameters.
pub trait CameraSource: Send + 'static {
    /// Fetch the current parameter object.
    fn fetch(&self) -> impl Future<Output = Result<serde_json::Value, UpstreamError>> + Send;
}

/// Path component of the stream URL in `params`, or `""` if there is none.
pub fn stream_path(params: &serde_json::Value) -> String {
    params
        .get("RtspServerPath")
        .and_then(serde_json::Value::as_str)
        .and_then(|url| reqwest::Url::parse(url).ok())
        .map(|url| url.path().to_owned())
        .unwrap_or_default()
}

/// Fetches camera parameters over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCameraSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpCameraSource {
    /// A source querying `url` with `GET`. Each request, body included,
    /// must complete within `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }

    fn request_error(&self, context: &str, e: &reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Http(format!("{context}: {e}"))
        }
    }
}

impl CameraSource for HttpCameraSource {
    async fn fetch(&self) -> Result<serde_json::Value, UpstreamError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.request_error("camera request failed", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(self.timeout)
            } else {
                UpstreamError::Parse(format!("camera response: {e}"))
            }
        })
    }
}

/// Publishes the stream path with failure hysteresis.
#[derive(Debug)]
pub struct CameraPoller<S> {
    source: S,
    store: Arc<StateStore>,
    failures: FailureCounter,
}

impl<S: CameraSource> CameraPoller<S> {
    /// Poll `source` into `store`, clearing the stream path after
    /// `failure_threshold` consecutive failures.
    pub const fn new(source: S, store: Arc<StateStore>, failure_threshold: u32) -> Self {
        Self {
            source,
            store,
            failures: FailureCounter::new(failure_threshold),
        }
    }
}

impl CameraPoller<HttpCameraSource> {
    /// A poller querying the camera subsystem described by `config`.
    pub fn from_config(config: &CameraConfig, store: Arc<StateStore>) -> Self {
        Self::new(
            HttpCameraSource::new(config.url.clone(), config.timeout()),
            store,
            config.failure_threshold,
        )
    }
}

impl<S: CameraSource> UpstreamPoller for CameraPoller<S> {
    fn name(&self) -> &'static str {
        "camera"
    }

    async fn poll_once(&mut self) {
        match self.source.fetch().await {
            Ok(params) => {
                if self.failures.failures() > 0 {
                    info!(after = self.failures.failures(), "Camera subsystem reachable again");
                }
                self.failures.record_success();
                self.store.stream().set(stream_path(&params));
            }
            Err(e) => {
                let degrade = self.failures.record_failure();
                warn!(error = %e, failures = self.failures.failures(), "Could not read camera parameters");
                if degrade {
                    self.store.stream().set(String::new());
                }
            }
        }
    }
}
