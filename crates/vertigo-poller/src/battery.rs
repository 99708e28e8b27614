//! Battery state from the UPS server.
//!
//! The charge level comes from `battery.charge` and the flags from
//! `ups.status`, a space-separated list of status tokens. `OB` (on
//! battery) or `LB` (low battery) means the device runs from its battery
//! and is not charging; otherwise it is on mains and charging iff `CHRG`
//! is present.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use vertigo_core::StateStore;
use vertigo_core::config::BatteryConfig;
use vertigo_types::BatteryState;

use crate::error::UpstreamError;
use crate::hysteresis::FailureCounter;
use crate::nut::NutClient;
use crate::poller::UpstreamPoller;

/// Something that can produce a battery reading.
pub trait BatterySource: Send + 'static {
    /// Take one reading.
    fn read(&mut self) -> impl Future<Output = Result<BatteryState, UpstreamError>> + Send;
}

/// Derive the battery flags from a UPS status string.
pub fn battery_state(level: u8, status: &str) -> BatteryState {
    let mut tokens = status.split_whitespace();
    if tokens.clone().any(|t| t == "OB" || t == "LB") {
        BatteryState::known(level, true, false)
    } else {
        BatteryState::known(level, false, tokens.any(|t| t == "CHRG"))
    }
}

/// Parse `battery.charge`, dropping any fractional part.
fn parse_charge(raw: &str) -> Result<u8, UpstreamError> {
    let whole = raw.trim().split('.').next().unwrap_or_default();
    whole
        .parse::<u8>()
        .map(|level| level.min(100))
        .map_err(|e| UpstreamError::Parse(format!("battery.charge '{raw}': {e}")))
}

/// Reads the battery over a cached UPS server connection.
///
/// The connection is opened on first use and reused across reads. Any
/// socket or protocol failure discards it, so the next read reconnects.
#[derive(Debug)]
pub struct NutBatterySource {
    host: String,
    port: u16,
    ups: String,
    timeout: Duration,
    client: Option<NutClient>,
}

impl NutBatterySource {
    /// A source for `ups` on `host:port`, waiting at most `timeout` for
    /// the connection and for each reply. Nothing is opened yet.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        ups: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            ups: ups.into(),
            timeout,
            client: None,
        }
    }

    /// Whether a connection is currently cached.
    pub const fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    async fn read_once(&mut self) -> Result<BatteryState, UpstreamError> {
        if self.client.is_none() {
            self.client = Some(NutClient::connect(&self.host, self.port, self.timeout).await?);
        }
        let client = self.client.as_mut().ok_or(UpstreamError::Closed)?;
        let charge = client.get_var(&self.ups, "battery.charge").await?;
        let status = client.get_var(&self.ups, "ups.status").await?;
        Ok(battery_state(parse_charge(&charge)?, &status))
    }
}

impl BatterySource for NutBatterySource {
    async fn read(&mut self) -> Result<BatteryState, UpstreamError> {
        let result = self.read_once().await;
        if let Err(e) = &result {
            if e.poisons_connection() && self.client.take().is_some() {
                debug!(host = self.host, "Dropped UPS connection");
            }
        }
        result
    }
}

/// Publishes battery readings with failure hysteresis.
#[derive(Debug)]
pub struct BatteryPoller<S> {
    source: S,
    store: Arc<StateStore>,
    failures: FailureCounter,
}

impl<S: BatterySource> BatteryPoller<S> {
    /// Poll `source` into `store`, publishing "unknown" after
    /// `failure_threshold` consecutive failures.
    pub const fn new(source: S, store: Arc<StateStore>, failure_threshold: u32) -> Self {
        Self {
            source,
            store,
            failures: FailureCounter::new(failure_threshold),
        }
    }

    /// Consecutive failures so far.
    pub const fn failures(&self) -> u32 {
        self.failures.failures()
    }
}

impl BatteryPoller<NutBatterySource> {
    /// A poller talking to the UPS server described by `config`.
    pub fn from_config(config: &BatteryConfig, store: Arc<StateStore>) -> Self {
        let source = NutBatterySource::new(
            config.host.clone(),
            config.port,
            config.ups.clone(),
            config.timeout(),
        );
        Self::new(source, store, config.failure_threshold)
    }
}

impl<S: BatterySource> UpstreamPoller for BatteryPoller<S> {
    fn name(&self) -> &'static str {
        "battery"
    }

    async fn poll_once(&mut self) {
        match self.source.read().await {
            Ok(state) => {
                if self.failures.failures() > 0 {
                    info!(after = self.failures.failures(), "Battery readings recovered");
                }
                self.failures.record_success();
                self.store.battery().set(state);
            }
            Err(e) => {
                let degrade = self.failures.record_failure();
                warn!(error = %e, failures = self.failures.failures(), "Could not read battery state");
                if degrade {
                    self.store.battery().set(BatteryState::unknown());
                }
            }
        }
    }
}
