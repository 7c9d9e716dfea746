#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use gasguard_api::config::ServerConfig;
use gasguard_api::router::build_app_router;
use gasguard_api::state::AppState;
use gasguard_core::reading::SensorSample;
use gasguard_events::{ChannelDispatcher, EventBus};
use gasguard_monitor::{Monitor, MonitorSettings, SimulatedSource};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

/// Application state around a monitor that is never started: no pollers,
/// no sweep, no demo devices. Readings only arrive through [`ingest`].
pub fn test_state() -> AppState {
    let event_bus = Arc::new(EventBus::default());
    let settings = MonitorSettings {
        seed_demo_devices: false,
        ..MonitorSettings::default()
    };
    let monitor = Monitor::new(
        settings,
        Arc::new(SimulatedSource::default()),
        Arc::new(ChannelDispatcher::new(Arc::clone(&event_bus))),
        Arc::clone(&event_bus),
    );

    AppState {
        config: Arc::new(test_config()),
        monitor,
        event_bus,
    }
}

/// The production router over `state`.
pub fn build_test_app(state: &AppState) -> Router {
    build_app_router(state.clone(), &state.config)
}

/// Push one reading for `device_id` through the pipeline, stamped now.
pub async fn ingest(state: &AppState, device_id: &str, gas_level: u32) {
    state
        .monitor
        .ingest(SensorSample {
            device_id: device_id.to_string(),
            gas_level,
            temperature: 24.0,
            humidity: 50.0,
            timestamp: Utc::now(),
            battery_level: None,
        })
        .await
        .expect("device is registered");
}

/// Register a device through the API and return its id.
pub async fn create_device(state: &AppState, name: &str, ip: &str) -> String {
    let body = serde_json::json!({
        "name": name,
        "location": "Kitchen Area",
        "ip_address": ip,
    });
    let response = post_json(build_test_app(state), "/api/v1/devices", body).await;
    let json = body_json(response).await;
    json["data"]["id"]
        .as_str()
        .expect("created device has an id")
        .to_string()
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    json_request(app, Method::PUT, uri, body).await
}

/// POST a body verbatim, for payloads that are not valid JSON.
pub async fn post_raw(app: Router, uri: &str, body: &'static str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

async fn json_request(app: Router, method: Method, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
