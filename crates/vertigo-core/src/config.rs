//! Configuration loading and typed config structures for the console.
//!
//! The configuration lives in `vertigo-config.yaml`. Every field has a
//! default matching the reference behaviour, so an empty or missing file
//! yields a working setup. A few environment variables override the YAML
//! after parsing (see [`ConsoleConfig::apply_env_overrides`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration or a catalog file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A setting is outside its allowed range.
    #[error("invalid setting {field}: {message}")]
    Invalid {
        /// Dotted path of the setting.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// An environment override held an invalid value.
    #[error("invalid environment override {name}: {message}")]
    Env {
        /// Variable name.
        name: String,
        /// What was wrong with it.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level console configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConsoleConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerSection,

    /// Run-session behaviour.
    #[serde(default)]
    pub session: SessionConfig,

    /// UPS / battery poller.
    #[serde(default)]
    pub battery: BatteryConfig,

    /// Camera subsystem poller.
    #[serde(default)]
    pub camera: CameraConfig,

    /// Event stream consumer.
    #[serde(default)]
    pub client: ClientConfig,

    /// Experiment catalog source.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Seed fixture data and simulate the battery instead of polling
    /// real devices.
    #[serde(default)]
    pub stub: bool,
}

impl ConsoleConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML,
    /// [`ConfigError::Env`] if an override is malformed and
    /// [`ConfigError::Invalid`] if a setting is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML,
    /// [`ConfigError::Env`] if an override is malformed and
    /// [`ConfigError::Invalid`] if a setting is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings that have a range, such as the poll intervals
    /// and timeouts, which must be non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("battery.poll_interval_ms", self.battery.poll_interval_ms),
            ("battery.timeout_ms", self.battery.timeout_ms),
            ("camera.poll_interval_ms", self.camera.poll_interval_ms),
            ("camera.timeout_ms", self.camera.timeout_ms),
            ("client.idle_timeout_ms", self.client.idle_timeout_ms),
        ];
        match durations.into_iter().find(|(_, ms)| *ms == 0) {
            Some((field, _)) => Err(ConfigError::Invalid {
                field: field.to_owned(),
                message: String::from("must be greater than zero"),
            }),
            None => Ok(()),
        }
    }

    /// Apply environment variable overrides:
    /// - `NUT_HOSTNAME` overrides `battery.host`
    /// - `CAMERA_HOST` overrides `camera.url` with `http://<host>/camera`
    /// - `VERTIGO_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `VERTIGO_PORT` is not a port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("NUT_HOSTNAME") {
            if !host.is_empty() {
                self.battery.host = host;
            }
        }
        if let Ok(host) = std::env::var("CAMERA_HOST") {
            if !host.is_empty() {
                self.camera.url = format!("http://{host}/camera");
            }
        }
        if let Ok(port) = std::env::var("VERTIGO_PORT") {
            self.server.port = port.parse().map_err(|e| ConfigError::Env {
                name: String::from("VERTIGO_PORT"),
                message: format!("{e}"),
            })?;
        }
        Ok(())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Run-session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Milliseconds before a run session expires on its own.
    #[serde(default = "default_run_duration_ms")]
    pub run_duration_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            run_duration_ms: default_run_duration_ms(),
        }
    }
}

impl SessionConfig {
    /// Run-session lifetime as a [`Duration`].
    pub const fn run_duration(&self) -> Duration {
        Duration::from_millis(self.run_duration_ms)
    }
}

/// UPS / battery poller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatteryConfig {
    /// Whether to poll the UPS at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Host of the UPS line-protocol server.
    #[serde(default = "default_nut_host")]
    pub host: String,
    /// Port of the UPS line-protocol server.
    #[serde(default = "default_nut_port")]
    pub port: u16,
    /// UPS name on that server.
    #[serde(default = "default_ups_name")]
    pub ups: String,
    /// Milliseconds between polls.
    #[serde(default = "default_battery_interval_ms")]
    pub poll_interval_ms: u64,
    /// Milliseconds to wait for the connection and for each reply.
    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,
    /// Consecutive failures before the battery is published as unknown.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_nut_host(),
            port: default_nut_port(),
            ups: default_ups_name(),
            poll_interval_ms: default_battery_interval_ms(),
            timeout_ms: default_upstream_timeout_ms(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

impl BatteryConfig {
    /// Poll interval as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-request timeout as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Camera subsystem poller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CameraConfig {
    /// Whether to poll the camera subsystem at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// URL of the camera parameter endpoint.
    #[serde(default = "default_camera_url")]
    pub url: String,
    /// Milliseconds between polls.
    #[serde(default = "default_camera_interval_ms")]
    pub poll_interval_ms: u64,
    /// Milliseconds to wait for each request, body included.
    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,
    /// Consecutive failures before the stream path is cleared.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_camera_url(),
            poll_interval_ms: default_camera_interval_ms(),
            timeout_ms: default_upstream_timeout_ms(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

impl CameraConfig {
    /// Poll interval as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-request timeout as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Event stream consumer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Milliseconds to wait before reconnecting after a stream error.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Milliseconds without any data, keep-alives included, after which
    /// the connection is treated as dead.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl ClientConfig {
    /// Reconnect delay as a [`Duration`].
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Idle timeout as a [`Duration`].
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// Experiment catalog configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    /// YAML catalog to load at startup.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

const fn default_run_duration_ms() -> u64 {
    10_000
}

const fn default_true() -> bool {
    true
}

fn default_nut_host() -> String {
    String::from("localhost")
}

const fn default_nut_port() -> u16 {
    3493
}

fn default_ups_name() -> String {
    String::from("openups")
}

const fn default_battery_interval_ms() -> u64 {
    15_000
}

const fn default_failure_threshold() -> u32 {
    5
}

fn default_camera_url() -> String {
    String::from("http://localhost:5042/camera")
}

const fn default_camera_interval_ms() -> u64 {
    5_000
}

const fn default_reconnect_delay_ms() -> u64 {
    2_000
}

const fn default_upstream_timeout_ms() -> u64 {
    3_000
}

const fn default_idle_timeout_ms() -> u64 {
    45_000
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let config = ConsoleConfig::default();
        assert_eq!(config.session.run_duration(), Duration::from_secs(10));
        assert_eq!(config.battery.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.battery.failure_threshold, 5);
        assert_eq!(config.battery.port, 3493);
        assert_eq!(config.battery.ups, "openups");
        assert_eq!(config.camera.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.camera.failure_threshold, 5);
        assert_eq!(config.client.reconnect_delay(), Duration::from_secs(2));
        assert_eq!(config.battery.timeout(), Duration::from_secs(3));
        assert_eq!(config.camera.timeout(), Duration::from_secs(3));
        assert!(!config.stub);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = "
session:
  run_duration_ms: 2500
battery:
  failure_threshold: 3
stub: true
";
        let config: ConsoleConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.session.run_duration_ms, 2500);
        assert_eq!(config.battery.failure_threshold, 3);
        assert_eq!(config.battery.poll_interval_ms, 15_000);
        assert_eq!(config.camera, CameraConfig::default());
        assert!(config.stub);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = ConsoleConfig::parse("battery:\n  poll_interval_ms: 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref field, .. } if field == "battery.poll_interval_ms"
        ));

        let err = ConsoleConfig::parse("camera:\n  timeout_ms: 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref field, .. } if field == "camera.timeout_ms"
        ));
        assert!(ConsoleConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result: Result<ConsoleConfig, _> = serde_yml::from_str("server: [1, 2");
        assert!(result.is_err());
    }
}
