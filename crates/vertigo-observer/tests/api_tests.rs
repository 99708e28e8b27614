//! Integration tests for the console API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use vertigo_core::{DEFAULT_RUN_DURATION, StateStore, stub};
use vertigo_observer::router::build_router;
use vertigo_observer::state::AppState;
use vertigo_types::{BatteryState, Channel};

fn make_test_state() -> Arc<AppState> {
    let store = StateStore::shared();
    stub::seed(&store);
    Arc::new(AppState::new(store, DEFAULT_RUN_DURATION))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, 1_000_000).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(state: &Arc<AppState>, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let app = build_router(Arc::clone(state));
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn run_request(key: &str) -> Value {
    json!({
        "key": key,
        "parameters": {"participant": "p", "session": 1},
        "window": {"framerate": 60.0, "backgroundColor": "#7f007f"}
    })
}

// ---------------------------------------------------------------------------
// Experiments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_experiments_returns_catalog() {
    let state = make_test_state();
    let (status, json) = send(&state, "GET", "/api/experiments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid.psyexp"]["parameters"], json!(["participant", "session"]));
    assert_eq!(json["unvalid.psyexp"]["resources"]["missing.png"], json!(false));
}

#[tokio::test]
async fn run_then_stop_experiment() {
    let state = make_test_state();

    let (status, json) = send(&state, "POST", "/api/experiment", Some(run_request("valid.psyexp"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, Value::Null);
    assert_eq!(state.store.experiment().get(), "valid.psyexp");
    assert_eq!(state.store.participants().entry("p").unwrap().next_session, 2);

    let (status, json) = send(&state, "POST", "/api/experiment", Some(run_request("valid.psyexp"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "experiment 'valid.psyexp' is already running");
    assert_eq!(json["status"], 400);

    let (status, _) = send(&state, "DELETE", "/api/experiment", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.store.experiment().get(), "");

    let (status, json) = send(&state, "DELETE", "/api/experiment", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "no experiment started");
}

#[tokio::test]
async fn unknown_experiment_is_bad_request() {
    let state = make_test_state();
    let (status, json) = send(&state, "POST", "/api/experiment", Some(run_request("nope.psyexp"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "unknown experiment 'nope.psyexp'");
}

#[tokio::test]
async fn run_without_session_is_bad_request() {
    let state = make_test_state();
    let body = json!({"key": "valid.psyexp", "parameters": {"participant": "p"}});
    let (status, json) = send(&state, "POST", "/api/experiment", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
    assert_eq!(state.store.experiment().get(), "");
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

#[tokio::test]
async fn close_window_lifecycle() {
    let state = make_test_state();

    let (status, json) = send(&state, "DELETE", "/api/window", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "window is not opened");

    send(&state, "POST", "/api/experiment", Some(run_request("valid.psyexp"))).await;
    let (status, _) = send(&state, "DELETE", "/api/window", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.store.window().get(), None);
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn participants_and_get_or_create() {
    let state = make_test_state();

    let (status, json) = send(&state, "GET", "/api/participants", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["asari"]["nextSession"], 123_453);

    let (status, json) = send(&state, "GET", "/api/participant/quarian", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"name": "quarian", "nextSession": 0}));
    assert!(state.store.participants().contains_key("quarian"));

    let (_, json) = send(&state, "GET", "/api/participant/turian", None).await;
    assert_eq!(json["nextSession"], 1);
}

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn battery_unknown_then_known() {
    let state = make_test_state();

    let (status, json) = send(&state, "GET", "/api/battery", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "battery state unavailable");

    state.store.battery().set(BatteryState::known(77, true, false));
    let (status, json) = send(&state, "GET", "/api/battery", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"level": 77, "onBattery": true, "charging": false}));
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

#[tokio::test]
async fn camera_lifecycle() {
    let state = make_test_state();

    let (status, json) = send(&state, "GET", "/api/camera", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "camera is not running");

    let (status, json) = send(&state, "DELETE", "/api/camera", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "camera is not started");

    let (status, json) = send(&state, "POST", "/api/camera", Some(json!({"Framerate": 50}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["Framerate"], 50);
    assert_eq!(json["StreamBitrate"], 400);

    let (status, json) = send(&state, "POST", "/api/camera", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "camera is already started");

    let (status, json) = send(&state, "GET", "/api/camera", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["Framerate"], 50);

    let (status, _) = send(&state, "DELETE", "/api/camera", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.store.camera().get(), None);
}

#[tokio::test]
async fn camera_rejects_malformed_parameters() {
    let state = make_test_state();
    let (status, _) = send(&state, "POST", "/api/camera", Some(json!({"Framerate": "fast"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.store.camera().get(), None);
}

// ---------------------------------------------------------------------------
// Event stream
// ---------------------------------------------------------------------------

/// Read body chunks until `count` complete SSE frames have arrived.
async fn read_frames<S>(body: &mut S, buffer: &mut String, count: usize) -> Vec<(String, Value)>
where
    S: futures::Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin,
{
    let mut frames = Vec::new();
    while frames.len() < count {
        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            let mut name = None;
            let mut data = None;
            for line in frame.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    name = Some(rest.trim().to_owned());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data = Some(serde_json::from_str(rest.trim()).unwrap());
                }
            }
            if let (Some(name), Some(data)) = (name, data) {
                frames.push((name, data));
            }
        }
        if frames.len() >= count {
            break;
        }
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());
    }
    frames
}

#[tokio::test]
async fn event_stream_snapshot_update_and_cleanup() {
    let state = make_test_state();
    let app = build_router(Arc::clone(&state));

    let response = app
        .oneshot(Request::builder().uri("/api/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let mut buffer = String::new();

    let snapshot = read_frames(&mut body, &mut buffer, Channel::ALL.len()).await;
    let names: Vec<&str> = snapshot.iter().map(|(name, _)| name.as_str()).collect();
    for channel in Channel::ALL {
        assert!(names.contains(&channel.event_name()));
    }
    let catalog = &snapshot
        .iter()
        .find(|(name, _)| name == "catalogUpdate")
        .unwrap()
        .1;
    assert_eq!(catalog.as_object().unwrap().len(), 3);
    let camera = &snapshot.iter().find(|(name, _)| name == "cameraUpdate").unwrap().1;
    assert_eq!(camera, &Value::Null);
    assert_eq!(state.store.listener_count(), Channel::ALL.len());

    let started = state.controller.start_camera(&serde_json::Map::new()).unwrap();
    let update = read_frames(&mut body, &mut buffer, 1).await;
    assert_eq!(update.first().unwrap().0, "cameraUpdate");
    assert_eq!(update.first().unwrap().1, serde_json::to_value(started).unwrap());

    drop(body);
    assert_eq!(state.store.listener_count(), 0);
}
