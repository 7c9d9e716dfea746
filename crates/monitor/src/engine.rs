//! Per-device alert state and notification dispatch.
//!
//! [`AlertEngine::evaluate`] serialises evaluations per device, advances the
//! [`DeviceAlertState`] machine and, when it fires, hands the request to the
//! [`NotificationDispatcher`] on a tracked background task. Delivery results
//! never feed back into the state machine.

use std::collections::HashMap;
use std::sync::Arc;

use gasguard_core::alert::{DeviceAlertState, NotificationRequest};
use gasguard_core::alert_config::AlertConfig;
use gasguard_core::event_names::{EVENT_ALERT_FIRED, EVENT_DISPATCH_REPORTED};
use gasguard_core::tier::Tier;
use gasguard_core::types::{DeviceId, Timestamp};
use gasguard_events::{DispatchReport, EventBus, MonitorEvent, NotificationDispatcher};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// What one evaluation did.
#[derive(Debug)]
pub struct AlertOutcome {
    /// State after the evaluation.
    pub state: DeviceAlertState,
    /// The notification that fired, if any.
    pub notification: Option<NotificationRequest>,
    /// Background delivery; `None` when nothing fired or no channel is enabled.
    pub dispatch: Option<JoinHandle<DispatchReport>>,
}

impl AlertOutcome {
    pub fn fired(&self) -> bool {
        self.notification.is_some()
    }
}

pub struct AlertEngine {
    states: RwLock<HashMap<DeviceId, Arc<Mutex<DeviceAlertState>>>>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    event_bus: Arc<EventBus>,
    tracker: TaskTracker,
}

impl AlertEngine {
    pub fn new(
        dispatcher: Arc<dyn NotificationDispatcher>,
        event_bus: Arc<EventBus>,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            dispatcher,
            event_bus,
            tracker,
        }
    }

    async fn state_for(&self, device_id: &str) -> Arc<Mutex<DeviceAlertState>> {
        if let Some(state) = self.states.read().await.get(device_id) {
            return Arc::clone(state);
        }
        let mut states = self.states.write().await;
        Arc::clone(
            states
                .entry(device_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(DeviceAlertState::new(device_id)))),
        )
    }

    /// Feed a freshly classified tier into the device's state machine.
    ///
    /// `cfg` must be a single snapshot for the whole evaluation. State is
    /// created on first use.
    pub async fn evaluate(
        &self,
        device_id: &str,
        tier: Tier,
        cfg: &AlertConfig,
        now: Timestamp,
    ) -> AlertOutcome {
        let state = self.state_for(device_id).await;
        let mut state = state.lock().await;
        let notification = state.apply(tier, cfg, now);

        let dispatch = notification.as_ref().and_then(|request| {
            tracing::info!(
                device_id,
                tier = %request.tier,
                evacuation = request.is_evacuation_advisory,
                channels = request.channels.len(),
                "Alert fired"
            );
            self.event_bus.publish(
                MonitorEvent::new(EVENT_ALERT_FIRED)
                    .with_device(device_id)
                    .with_payload(serde_json::to_value(request).unwrap_or_default()),
            );

            if request.channels.is_empty() {
                tracing::debug!(device_id, "No alert channels enabled, dispatch skipped");
                return None;
            }
            Some(self.spawn_dispatch(request.clone()))
        });

        AlertOutcome {
            state: state.clone(),
            notification,
            dispatch,
        }
    }

    fn spawn_dispatch(&self, request: NotificationRequest) -> JoinHandle<DispatchReport> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let event_bus = Arc::clone(&self.event_bus);

        self.tracker.spawn(async move {
            let report = dispatcher.dispatch(&request).await;
            if report.is_success() {
                tracing::info!(
                    device_id = %report.device_id,
                    channels = report.outcomes.len(),
                    "Alert delivered"
                );
            } else {
                tracing::error!(
                    device_id = %report.device_id,
                    failed = ?report.failed_channels(),
                    "Alert delivery failed on some channels"
                );
            }
            event_bus.publish(
                MonitorEvent::new(EVENT_DISPATCH_REPORTED)
                    .with_device(report.device_id.clone())
                    .with_payload(serde_json::to_value(&report).unwrap_or_default()),
            );
            report
        })
    }

    /// Current state, or `None` if the device has never been evaluated.
    pub async fn state(&self, device_id: &str) -> Option<DeviceAlertState> {
        let state = self.states.read().await.get(device_id).cloned()?;
        let snapshot = state.lock().await.clone();
        Some(snapshot)
    }

    pub async fn remove_device(&self, device_id: &str) {
        self.states.write().await.remove(device_id);
    }
}
