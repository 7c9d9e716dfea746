//! Well-known event type names published on the monitor event bus.
//!
//! Consumers (the WebSocket live feed, the presentation layer) switch on
//! these strings, so they must stay stable.

/// A reading was classified and recorded for a device.
pub const EVENT_READING_RECORDED: &str = "reading.recorded";

/// A device moved between online / warning / offline.
pub const EVENT_DEVICE_STATUS_CHANGED: &str = "device.status_changed";

/// A device was added to the registry.
pub const EVENT_DEVICE_REGISTERED: &str = "device.registered";

/// A device was removed from the registry.
pub const EVENT_DEVICE_REMOVED: &str = "device.removed";

/// The alert engine decided to notify.
pub const EVENT_ALERT_FIRED: &str = "alert.fired";

/// Per-channel outcome of a notification dispatch.
pub const EVENT_DISPATCH_REPORTED: &str = "alert.dispatch_reported";

/// Play the audible alarm (payload carries the volume).
pub const EVENT_ALERT_AUDIO: &str = "alert.audio";

/// Trigger vibration on the presentation device.
pub const EVENT_ALERT_VIBRATION: &str = "alert.vibration";

/// A new alert configuration was committed.
pub const EVENT_CONFIG_UPDATED: &str = "config.updated";
