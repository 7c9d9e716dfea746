//! The two periodic tasks: one poller per device and the liveness sweep.
//!
//! Both run until their token is cancelled. A device poller's token is a
//! child of the monitor's root token, so it can be stopped on its own when
//! the device is removed and is stopped with everything else on shutdown.

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use gasguard_core::types::DeviceId;

use crate::monitor::Monitor;

/// Poll one device every `poll_interval` until `cancel` fires.
///
/// Cancellation also interrupts a poll that is already in flight.
pub(crate) async fn poll_device(monitor: Arc<Monitor>, device_id: DeviceId, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(monitor.settings().poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(device_id = %device_id, "Device poller started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = monitor.run_cycle_for(&device_id) => {}
                }
            }
        }
    }

    tracing::debug!(device_id = %device_id, "Device poller stopped");
}

/// Run the offline-demotion sweep every `sweep_interval` until `cancel`
/// fires.
pub(crate) async fn run_liveness_sweep(monitor: Arc<Monitor>, cancel: CancellationToken) {
    let settings = monitor.settings();
    tracing::info!(
        interval_secs = settings.sweep_interval.as_secs(),
        timeout_secs = settings.heartbeat_timeout.num_seconds(),
        "Liveness sweep started"
    );

    let mut interval = tokio::time::interval(settings.sweep_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Liveness sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let demoted = monitor.sweep_now().await;
                if demoted.is_empty() {
                    tracing::debug!("Liveness sweep: all devices current");
                } else {
                    tracing::info!(demoted = demoted.len(), "Liveness sweep: devices marked offline");
                }
            }
        }
    }
}
