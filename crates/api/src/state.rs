use std::sync::Arc;

use gasguard_events::EventBus;
use gasguard_monitor::Monitor;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Devices, history, alert state and the live configuration.
    pub monitor: Arc<Monitor>,
    /// Source of the WebSocket live feed.
    pub event_bus: Arc<EventBus>,
}
