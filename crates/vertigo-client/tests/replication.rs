//! End-to-end replication against a live console server.
//!
//! The server runs on an ephemeral local port; the consumer mirrors it
//! over HTTP into a separate store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use vertigo_client::{ConnectionState, EventStreamConsumer, HttpTransport};
use vertigo_core::config::ClientConfig;
use vertigo_core::{DEFAULT_RUN_DURATION, StateStore, stub};
use vertigo_observer::AppState;
use vertigo_types::{BatteryState, RunParameters, WindowParameters};

async fn start_console() -> (Arc<AppState>, String) {
    let store = StateStore::shared();
    stub::seed(&store);
    let state = Arc::new(AppState::new(store, DEFAULT_RUN_DURATION));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serving = Arc::clone(&state);
    tokio::spawn(async move {
        vertigo_observer::server::serve(listener, serving).await.unwrap();
    });
    (state, format!("http://{addr}/api/events"))
}

/// Poll until `check` holds, failing after five seconds.
async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn mirror_follows_server() {
    let (server, url) = start_console().await;
    let mirror = StateStore::shared();
    let config = ClientConfig {
        reconnect_delay_ms: 100,
        idle_timeout_ms: 5_000,
    };
    let consumer = EventStreamConsumer::from_config(
        HttpTransport::from_config(url, &config),
        Arc::clone(&mirror),
        &config,
    );

    eventually(|| consumer.state() == ConnectionState::Connected).await;
    eventually(|| mirror.catalog().get() == server.store.catalog().get()).await;
    eventually(|| mirror.participants().get() == server.store.participants().get()).await;

    server
        .controller
        .run_experiment(
            "valid.psyexp",
            &RunParameters::new("vorcha", 3),
            WindowParameters::default(),
        )
        .unwrap();
    eventually(|| mirror.experiment().get() == "valid.psyexp").await;
    eventually(|| mirror.window().get().is_some()).await;
    eventually(|| {
        mirror
            .participants()
            .entry("vorcha")
            .is_some_and(|p| p.next_session == 4)
    })
    .await;

    server.store.battery().set(BatteryState::known(61, true, false));
    eventually(|| mirror.battery().get() == BatteryState::known(61, true, false)).await;

    server.controller.stop_experiment().unwrap();
    eventually(|| mirror.experiment().get().is_empty()).await;

    consumer.shutdown();
    assert_eq!(consumer.state(), ConnectionState::Disconnected);
    eventually(|| server.store.listener_count() == 0).await;
}

#[tokio::test]
async fn unreachable_server_schedules_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let consumer = EventStreamConsumer::start(
        HttpTransport::new(format!("http://{addr}/api/events")),
        StateStore::shared(),
        Duration::from_secs(60),
    );
    eventually(|| consumer.state() == ConnectionState::ReconnectPending).await;
    assert!(consumer.reconnect_pending());
}
