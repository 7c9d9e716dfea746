//! The [`Monitor`] facade: owns every stateful component and drives the
//! poll -> classify -> registry -> history -> alert pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use gasguard_core::alert::DeviceAlertState;
use gasguard_core::alert_config::AlertConfig;
use gasguard_core::device::{BatteryBand, Device, NewDevice};
use gasguard_core::error::CoreError;
use gasguard_core::event_names::{
    EVENT_CONFIG_UPDATED, EVENT_DEVICE_REGISTERED, EVENT_DEVICE_REMOVED,
    EVENT_DEVICE_STATUS_CHANGED, EVENT_READING_RECORDED,
};
use gasguard_core::history::{Bucket, HistoryRange, Metric};
use gasguard_core::reading::{GasReading, SensorSample};
use gasguard_core::tier::{classify, gauge_percent, Tier};
use gasguard_core::types::DeviceId;
use gasguard_events::{EventBus, MonitorEvent, NotificationDispatcher};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::aggregator::HistoricalAggregator;
use crate::config_store::ConfigStore;
use crate::engine::{AlertEngine, AlertOutcome};
use crate::ingest;
use crate::registry::{DeviceRegistry, StatusChange};
use crate::settings::MonitorSettings;
use crate::source::ReadingSource;

/// Everything one pass of the pipeline produced for a device.
#[derive(Debug)]
pub struct CycleOutcome {
    pub reading: GasReading,
    pub tier: Tier,
    /// The device after the heartbeat.
    pub device: Device,
    pub status_change: Option<StatusChange>,
    /// `false` when the history windows dropped the reading as too old.
    pub recorded_in_history: bool,
    pub alert: AlertOutcome,
}

/// Presentation snapshot of one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceView {
    #[serde(flatten)]
    pub device: Device,
    pub battery_band: BatteryBand,
    pub low_battery: bool,
    pub gauge_percent: f64,
    pub alert: DeviceAlertState,
    pub latest_reading: Option<GasReading>,
}

struct Poller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Seed set mirroring the household the dashboard was designed around:
/// `(name, location, ip, battery, gas level)`.
const DEMO_DEVICES: [(&str, &str, &str, u8, u32); 3] = [
    ("Kitchen Sensor", "Kitchen Area", "192.168.1.101", 85, 320),
    ("Garage Sensor", "Garage", "192.168.1.102", 25, 150),
    ("Basement Sensor", "Basement", "192.168.1.103", 0, 0),
];

pub struct Monitor {
    settings: MonitorSettings,
    registry: DeviceRegistry,
    aggregator: HistoricalAggregator,
    engine: AlertEngine,
    config: ConfigStore,
    source: Arc<dyn ReadingSource>,
    event_bus: Arc<EventBus>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    pollers: Mutex<HashMap<DeviceId, Poller>>,
    /// Serialises the registry -> engine steps per device, so an ingest and
    /// a threshold re-classification never interleave.
    pipelines: RwLock<HashMap<DeviceId, Arc<Mutex<()>>>>,
    started: AtomicBool,
}

impl Monitor {
    pub fn new(
        settings: MonitorSettings,
        source: Arc<dyn ReadingSource>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        event_bus: Arc<EventBus>,
    ) -> Arc<Self> {
        let tracker = TaskTracker::new();
        Arc::new(Self {
            settings,
            registry: DeviceRegistry::new(),
            aggregator: HistoricalAggregator::new(),
            engine: AlertEngine::new(dispatcher, Arc::clone(&event_bus), tracker.clone()),
            config: ConfigStore::default(),
            source,
            event_bus,
            cancel: CancellationToken::new(),
            tracker,
            pollers: Mutex::new(HashMap::new()),
            pipelines: RwLock::new(HashMap::new()),
            started: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &HistoricalAggregator {
        &self.aggregator
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Seed demo devices if configured, then start the liveness sweep and a
    /// poller for every known device. Calling it twice is a no-op.
    pub async fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        if self.settings.seed_demo_devices && self.registry.is_empty().await {
            self.seed_demo_devices().await;
        }

        self.tracker.spawn(ingest::run_liveness_sweep(
            Arc::clone(self),
            self.cancel.child_token(),
        ));

        for device in self.registry.list_devices().await {
            self.spawn_poller(device.id).await;
        }

        tracing::info!(
            devices = self.registry.len().await,
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            "Monitor started"
        );
    }

    /// Cancel every task and wait for pollers, the sweep and in-flight
    /// dispatches to finish.
    pub async fn shutdown(&self) {
        tracing::info!("Monitor shutting down");
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        self.pollers.lock().await.clear();
        tracing::info!("Monitor stopped");
    }

    async fn spawn_poller(self: &Arc<Self>, device_id: DeviceId) {
        let cancel = self.cancel.child_token();
        let handle = self.tracker.spawn(ingest::poll_device(
            Arc::clone(self),
            device_id.clone(),
            cancel.clone(),
        ));
        self.pollers
            .lock()
            .await
            .insert(device_id, Poller { cancel, handle });
    }

    async fn seed_demo_devices(&self) {
        let now = Utc::now();
        for (name, location, ip_address, battery_level, gas_level) in DEMO_DEVICES {
            let new = NewDevice {
                name: name.to_string(),
                location: location.to_string(),
                ip_address: ip_address.to_string(),
            };
            let device = match self.registry.register(&new, now).await {
                Ok(device) => device,
                Err(e) => {
                    tracing::error!(name, error = %e, "Failed to seed demo device");
                    continue;
                }
            };
            self.ingest(SensorSample {
                device_id: device.id,
                gas_level,
                temperature: 22.0,
                humidity: 50.0,
                timestamp: now,
                battery_level: Some(battery_level),
            })
            .await;
        }
        tracing::info!(count = DEMO_DEVICES.len(), "Demo devices seeded");
    }

    // -----------------------------------------------------------------------
    // Devices
    // -----------------------------------------------------------------------

    /// Register a device and, if the monitor is running, start polling it.
    pub async fn add_device(self: &Arc<Self>, new: NewDevice) -> Result<Device, CoreError> {
        let device = self.registry.register(&new, Utc::now()).await?;

        self.event_bus.publish(
            MonitorEvent::new(EVENT_DEVICE_REGISTERED)
                .with_device(device.id.clone())
                .with_payload(serde_json::to_value(&device).unwrap_or_default()),
        );

        if self.started.load(Ordering::SeqCst) && !self.cancel.is_cancelled() {
            self.spawn_poller(device.id.clone()).await;
        }
        Ok(device)
    }

    /// Stop polling a device and drop all of its state. Idempotent; returns
    /// whether the device existed.
    pub async fn remove_device(&self, device_id: &str) -> bool {
        let poller = self.pollers.lock().await.remove(device_id);
        if let Some(poller) = poller {
            poller.cancel.cancel();
            if let Err(e) = poller.handle.await {
                tracing::warn!(device_id, error = %e, "Device poller ended abnormally");
            }
        }

        let removed = self.registry.remove(device_id).await;
        self.aggregator.remove_device(device_id).await;
        self.engine.remove_device(device_id).await;
        self.pipelines.write().await.remove(device_id);

        if removed {
            self.event_bus
                .publish(MonitorEvent::new(EVENT_DEVICE_REMOVED).with_device(device_id));
        }
        removed
    }

    pub async fn device_view(&self, device_id: &str) -> Option<DeviceView> {
        let device = self.registry.get(device_id).await?;
        Some(self.view_of(device).await)
    }

    /// Every device in registration order.
    pub async fn device_views(&self) -> Vec<DeviceView> {
        let mut views = Vec::new();
        for device in self.registry.list_devices().await {
            views.push(self.view_of(device).await);
        }
        views
    }

    async fn view_of(&self, device: Device) -> DeviceView {
        let alert = self
            .engine
            .state(&device.id)
            .await
            .unwrap_or_else(|| DeviceAlertState::new(device.id.clone()));
        let latest_reading = self.registry.latest_reading(&device.id).await;
        DeviceView {
            battery_band: device.battery_band(),
            low_battery: device.low_battery(),
            gauge_percent: gauge_percent(device.last_gas_level),
            alert,
            latest_reading,
            device,
        }
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    async fn pipeline_for(&self, device_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.pipelines.read().await.get(device_id) {
            return Arc::clone(lock);
        }
        Arc::clone(
            self.pipelines
                .write()
                .await
                .entry(device_id.to_string())
                .or_default(),
        )
    }

    /// One poll of one device through the whole pipeline.
    ///
    /// Returns `None` when there was nothing to process: unknown device, no
    /// sample this cycle, a source error (logged), or a removal that raced
    /// the cycle.
    pub async fn run_cycle_for(&self, device_id: &str) -> Option<CycleOutcome> {
        let device = self.registry.get(device_id).await?;

        match self.source.poll(&device).await {
            Ok(Some(sample)) => self.ingest(sample).await,
            Ok(None) => {
                tracing::trace!(device_id, "No reading this cycle");
                None
            }
            Err(e) => {
                tracing::warn!(device_id, error = %e, "Reading source poll failed");
                None
            }
        }
    }

    /// Push one sample through classify -> registry -> history -> alerts.
    ///
    /// The alert engine's clock is the sample's own timestamp. A late
    /// sample is folded into history only and returns `None`: it never
    /// changes the device snapshot or the alert state.
    pub async fn ingest(&self, sample: SensorSample) -> Option<CycleOutcome> {
        let device_id = sample.device_id.clone();
        let Some(location) = self.registry.get(&device_id).await.map(|d| d.location) else {
            tracing::debug!(device_id = %device_id, "Sample for unknown device ignored");
            return None;
        };

        let pipeline = self.pipeline_for(&device_id).await;
        let _pipeline = pipeline.lock().await;

        let cfg = self.config.snapshot();
        let tier = classify(sample.gas_level, &cfg);
        let reading = GasReading::from_sample(&sample, location);

        let Some(heartbeat) = self
            .registry
            .record_heartbeat(&reading, tier, sample.battery_level)
            .await
        else {
            self.pipelines.write().await.remove(&device_id);
            return None;
        };
        if heartbeat.late {
            self.aggregator.append(&reading).await;
            return None;
        }
        let recorded_in_history = self.aggregator.append(&reading).await;
        let alert = self
            .engine
            .evaluate(&device_id, tier, &cfg, reading.timestamp)
            .await;

        // Removed while this cycle was running: drop whatever it recreated.
        if !self.registry.contains(&device_id).await {
            self.aggregator.remove_device(&device_id).await;
            self.engine.remove_device(&device_id).await;
            self.pipelines.write().await.remove(&device_id);
            return None;
        }

        tracing::debug!(
            device_id = %device_id,
            gas_level = reading.gas_level,
            tier = %tier,
            "Reading recorded"
        );
        self.event_bus.publish(
            MonitorEvent::new(EVENT_READING_RECORDED)
                .with_device(device_id.clone())
                .with_payload(serde_json::json!({
                    "reading": reading,
                    "tier": tier,
                    "gauge_percent": gauge_percent(reading.gas_level),
                    "status": heartbeat.device.status,
                    "battery_level": heartbeat.device.battery_level,
                })),
        );
        if let Some(change) = &heartbeat.status_change {
            self.publish_status_change(change);
        }

        Some(CycleOutcome {
            reading,
            tier,
            device: heartbeat.device,
            status_change: heartbeat.status_change,
            recorded_in_history,
            alert,
        })
    }

    /// Run the offline demotion once, using the current time as the
    /// snapshot.
    pub async fn sweep_now(&self) -> Vec<StatusChange> {
        let now = Utc::now();
        let demoted = self
            .registry
            .sweep(now, self.settings.heartbeat_timeout)
            .await;
        for change in &demoted {
            self.publish_status_change(change);
        }
        demoted
    }

    fn publish_status_change(&self, change: &StatusChange) {
        self.event_bus.publish(
            MonitorEvent::new(EVENT_DEVICE_STATUS_CHANGED)
                .with_device(change.device_id.clone())
                .with_payload(serde_json::to_value(change).unwrap_or_default()),
        );
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn alert_config(&self) -> Arc<AlertConfig> {
        self.config.snapshot()
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    /// Validate and commit a config edit, then re-classify every reachable
    /// device against the new thresholds.
    pub async fn commit_config(&self, draft: AlertConfig) -> Result<Arc<AlertConfig>, CoreError> {
        let cfg = self.config.commit(draft)?;
        tracing::info!(
            warning = cfg.warning_threshold,
            danger = cfg.danger_threshold,
            "Alert config committed"
        );
        self.config_applied(&cfg).await;
        Ok(cfg)
    }

    pub async fn reset_config(&self) -> Arc<AlertConfig> {
        let cfg = self.config.reset();
        tracing::info!("Alert config reset to defaults");
        self.config_applied(&cfg).await;
        cfg
    }

    async fn config_applied(&self, cfg: &Arc<AlertConfig>) {
        self.event_bus.publish(
            MonitorEvent::new(EVENT_CONFIG_UPDATED)
                .with_payload(serde_json::to_value(cfg.as_ref()).unwrap_or_default()),
        );

        let now = Utc::now();
        for device in self.registry.list_devices().await {
            let pipeline = self.pipeline_for(&device.id).await;
            let _pipeline = pipeline.lock().await;

            let Some((tier, change)) = self.registry.apply_thresholds(&device.id, cfg).await
            else {
                continue;
            };
            if let Some(change) = &change {
                self.publish_status_change(change);
            }
            self.engine.evaluate(&device.id, tier, cfg, now).await;
        }
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    pub async fn set_history_range(&self, range: HistoryRange) {
        self.aggregator.set_range(range, Utc::now()).await;
    }

    pub async fn selected_history_range(&self) -> HistoryRange {
        self.aggregator.selected_range().await
    }

    /// Buckets for a known device, or `None` if the device does not exist.
    pub async fn history(
        &self,
        device_id: &str,
        metric: Metric,
        range: HistoryRange,
    ) -> Option<Vec<Bucket>> {
        if !self.registry.contains(device_id).await {
            return None;
        }
        Some(
            self.aggregator
                .query(device_id, metric, range, Utc::now())
                .await,
        )
    }
}
