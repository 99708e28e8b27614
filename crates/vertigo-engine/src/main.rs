//! Console binary for Vertigo.
//!
//! Wires together the state store, the upstream pollers and the console
//! API server, then serves until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `$VERTIGO_CONFIG` or `vertigo-config.yaml`
//! 3. Create the state store and session controller
//! 4. Seed fixtures and the simulated battery in stub mode, otherwise
//!    load the catalog and start the battery and camera pollers
//! 5. Start the console API server
//! 6. Wait for Ctrl-C or the server to exit

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vertigo_core::{ConsoleConfig, StateStore, catalog, stub};
use vertigo_observer::{AppState, ServerConfig};
use vertigo_poller::{BatteryPoller, CameraPoller, spawn_poller};

use crate::error::EngineError;

/// Config file read when `VERTIGO_CONFIG` is not set.
const DEFAULT_CONFIG_FILE: &str = "vertigo-config.yaml";

/// Application entry point for the console.
///
/// # Errors
///
/// Returns an error if configuration, the catalog or the server fails
/// to load or start.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("vertigo-engine starting");

    // 2. Load configuration.
    let config = load_config(&config_path(std::env::var("VERTIGO_CONFIG").ok()))?;
    info!(
        host = config.server.host,
        port = config.server.port,
        stub = config.stub,
        run_duration_ms = config.session.run_duration_ms,
        "Configuration loaded"
    );

    // 3. Create the store and controller.
    let store = StateStore::shared();
    let app_state = Arc::new(AppState::new(
        Arc::clone(&store),
        config.session.run_duration(),
    ));

    // 4. Feed the store.
    let background = if config.stub {
        stub::seed(&store);
        info!("Stub mode: fixtures seeded, simulated battery running");
        vec![stub::spawn_stub_battery(Arc::clone(&store))]
    } else {
        if let Some(path) = &config.catalog.file {
            let loaded =
                catalog::load(path).map_err(|source| EngineError::Catalog { source })?;
            app_state.controller.reload_catalog(loaded);
        }
        spawn_pollers(&config, &store)
    };

    // 5. Start the console API server.
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let mut server =
        vertigo_observer::startup::spawn_server(&server_config, Arc::clone(&app_state))
            .await
            .map_err(EngineError::from)?;

    // 6. Serve until interrupted.
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(EngineError::from)?;
            info!("Interrupt received, shutting down");
            server.abort();
        }
        result = &mut server => {
            if let Err(e) = result {
                warn!(error = %e, "Console server task failed");
            }
        }
    }

    for task in background {
        task.abort();
    }
    info!("vertigo-engine shutdown complete");
    Ok(())
}

/// The config file to read: `explicit` if given, the default otherwise.
fn config_path(explicit: Option<String>) -> PathBuf {
    explicit
        .filter(|path| !path.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}

/// Load configuration from `path`, falling back to defaults (with
/// environment overrides) when the file does not exist.
fn load_config(path: &Path) -> Result<ConsoleConfig, EngineError> {
    if path.exists() {
        info!(path = %path.display(), "Reading config file");
        Ok(ConsoleConfig::from_file(path)?)
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(ConsoleConfig::parse("")?)
    }
}

/// Start the enabled upstream pollers.
fn spawn_pollers(config: &ConsoleConfig, store: &Arc<StateStore>) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::new();
    if config.battery.enabled {
        info!(
            host = config.battery.host,
            port = config.battery.port,
            ups = config.battery.ups,
            poll_interval_ms = config.battery.poll_interval_ms,
            "Battery poller started"
        );
        tasks.push(spawn_poller(
            BatteryPoller::from_config(&config.battery, Arc::clone(store)),
            config.battery.poll_interval(),
        ));
    }
    if config.camera.enabled {
        info!(
            url = config.camera.url,
            poll_interval_ms = config.camera.poll_interval_ms,
            "Camera poller started"
        );
        tasks.push(spawn_poller(
            CameraPoller::from_config(&config.camera, Arc::clone(store)),
            config.camera.poll_interval(),
        ));
    }
    tasks
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn config_path_prefers_explicit() {
        assert_eq!(
            config_path(Some(String::from("/etc/vertigo.yaml"))),
            PathBuf::from("/etc/vertigo.yaml")
        );
        assert_eq!(config_path(Some(String::new())), PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(config_path(None), PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/vertigo-config.yaml")).unwrap();
        assert!(!config.stub);
        assert_eq!(config.session.run_duration_ms, 10_000);
    }
}
