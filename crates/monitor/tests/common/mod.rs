#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use gasguard_core::alert::NotificationRequest;
use gasguard_core::device::{Device, NewDevice};
use gasguard_core::reading::SensorSample;
use gasguard_core::types::{Ppm, Timestamp};
use gasguard_events::{DispatchReport, EventBus, NotificationDispatcher};
use gasguard_monitor::{Monitor, MonitorSettings, ReadingSource, SourceError};

/// Level reported when a device has no scripted levels left.
pub const IDLE_LEVEL: Ppm = 100;

/// Plays back per-device gas levels; devices can be made unreachable.
#[derive(Default)]
pub struct ScriptedSource {
    levels: Mutex<HashMap<String, VecDeque<Ppm>>>,
    unreachable: Mutex<HashSet<String>>,
}

impl ScriptedSource {
    pub fn script(&self, device_id: &str, levels: &[Ppm]) {
        self.levels
            .lock()
            .unwrap()
            .entry(device_id.to_string())
            .or_default()
            .extend(levels.iter().copied());
    }

    pub fn set_unreachable(&self, device_id: &str) {
        self.unreachable
            .lock()
            .unwrap()
            .insert(device_id.to_string());
    }
}

#[async_trait]
impl ReadingSource for ScriptedSource {
    async fn poll(&self, device: &Device) -> Result<Option<SensorSample>, SourceError> {
        if self.unreachable.lock().unwrap().contains(&device.id) {
            return Err(SourceError::Unreachable(device.id.clone()));
        }
        let level = self
            .levels
            .lock()
            .unwrap()
            .get_mut(&device.id)
            .and_then(|q| q.pop_front())
            .unwrap_or(IDLE_LEVEL);
        Ok(Some(sample(&device.id, level, Utc::now())))
    }
}

/// Records every request it is asked to deliver.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub requests: Mutex<Vec<NotificationRequest>>,
}

impl RecordingDispatcher {
    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, request: &NotificationRequest) -> DispatchReport {
        self.requests.lock().unwrap().push(request.clone());
        let mut report = DispatchReport::new(request.device_id.clone(), request.tier);
        for &channel in &request.channels {
            report.record(channel, Ok(()));
        }
        report
    }
}

pub struct Harness {
    pub monitor: Arc<Monitor>,
    pub source: Arc<ScriptedSource>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub bus: Arc<EventBus>,
}

pub fn quiet_settings() -> MonitorSettings {
    MonitorSettings {
        poll_interval: Duration::from_millis(20),
        sweep_interval: Duration::from_millis(20),
        heartbeat_timeout: chrono::Duration::seconds(120),
        seed_demo_devices: false,
    }
}

pub fn harness(settings: MonitorSettings) -> Harness {
    let source = Arc::new(ScriptedSource::default());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let bus = Arc::new(EventBus::default());
    let monitor = Monitor::new(
        settings,
        Arc::clone(&source) as Arc<dyn ReadingSource>,
        Arc::clone(&dispatcher) as Arc<dyn NotificationDispatcher>,
        Arc::clone(&bus),
    );
    Harness {
        monitor,
        source,
        dispatcher,
        bus,
    }
}

pub fn new_device(name: &str, ip: &str) -> NewDevice {
    NewDevice {
        name: name.to_string(),
        location: format!("{name} room"),
        ip_address: ip.to_string(),
    }
}

pub fn sample(device_id: &str, gas_level: Ppm, at: Timestamp) -> SensorSample {
    SensorSample {
        device_id: device_id.to_string(),
        gas_level,
        temperature: 23.5,
        humidity: 48.0,
        timestamp: at,
        battery_level: None,
    }
}

/// Wait for every dispatch spawned so far.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
