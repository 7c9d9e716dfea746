//! Known devices and their connectivity/battery state machine.
//!
//! The outer `RwLock` only guards the id -> entry map; every mutation of a
//! device happens under that device's own mutex, so a slow update on one
//! sensor never blocks another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use gasguard_core::alert_config::AlertConfig;
use gasguard_core::device::{format_device_id, Device, DeviceStatus, NewDevice};
use gasguard_core::error::CoreError;
use gasguard_core::reading::GasReading;
use gasguard_core::tier::{classify, Tier};
use gasguard_core::types::{DeviceId, Timestamp};
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

/// A device moved between connectivity states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub device_id: DeviceId,
    pub from: DeviceStatus,
    pub to: DeviceStatus,
}

/// Result of applying a heartbeat to a known device.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    /// The device after the update.
    pub device: Device,
    pub status_change: Option<StatusChange>,
    /// The reading arrived out of order and left the device untouched.
    pub late: bool,
}

struct DeviceEntry {
    device: Device,
    latest: Option<GasReading>,
}

impl DeviceEntry {
    /// A reading is late when it is older than the newest one already
    /// applied, or when the device is offline and the reading is no newer
    /// than the heartbeat that went stale.
    fn is_late(&self, reading: &GasReading) -> bool {
        let behind_latest = self
            .latest
            .as_ref()
            .is_some_and(|latest| reading.timestamp < latest.timestamp);
        let revives_stale =
            self.device.is_offline() && reading.timestamp <= self.device.last_seen_at;
        behind_latest || revives_stale
    }

    fn set_status(&mut self, to: DeviceStatus) -> Option<StatusChange> {
        let from = std::mem::replace(&mut self.device.status, to);
        (from != to).then(|| StatusChange {
            device_id: self.device.id.clone(),
            from,
            to,
        })
    }
}

pub struct DeviceRegistry {
    devices: RwLock<IndexMap<DeviceId, Arc<Mutex<DeviceEntry>>>>,
    /// Last issued sequence number; ids are never reused.
    last_seq: AtomicU64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(IndexMap::new()),
            last_seq: AtomicU64::new(0),
        }
    }

    /// Validate and register a new device, assigning the next `lpg-NNN` id.
    ///
    /// New devices start `online` with a full battery. A rejected
    /// registration leaves the registry untouched.
    pub async fn register(&self, new: &NewDevice, now: Timestamp) -> Result<Device, CoreError> {
        let validated = new.validate()?;

        let seq = self.last_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let device = Device::registered(format_device_id(seq), validated, now);

        let entry = DeviceEntry {
            device: device.clone(),
            latest: None,
        };
        self.devices
            .write()
            .await
            .insert(device.id.clone(), Arc::new(Mutex::new(entry)));

        tracing::info!(
            device_id = %device.id,
            name = %device.name,
            ip_address = %device.ip_address,
            "Device registered"
        );
        Ok(device)
    }

    /// Remove a device. Unknown ids are a no-op; returns whether anything
    /// was removed.
    pub async fn remove(&self, device_id: &str) -> bool {
        let removed = self.devices.write().await.shift_remove(device_id).is_some();
        if removed {
            tracing::info!(device_id, "Device removed");
        } else {
            tracing::debug!(device_id, "Remove requested for unknown device");
        }
        removed
    }

    async fn entry(&self, device_id: &str) -> Option<Arc<Mutex<DeviceEntry>>> {
        self.devices.read().await.get(device_id).cloned()
    }

    async fn entries(&self) -> Vec<Arc<Mutex<DeviceEntry>>> {
        self.devices.read().await.values().cloned().collect()
    }

    /// Apply a fresh reading as a heartbeat.
    ///
    /// `tier` is the reading's classification. `battery_level` of `None`
    /// keeps the last known level. A late reading changes nothing and comes
    /// back with `late` set, so an offline device is only revived by a
    /// reading newer than its last heartbeat. Returns `None` (after logging)
    /// when the device is unknown, which is expected when a removal races an
    /// in-flight poll.
    pub async fn record_heartbeat(
        &self,
        reading: &GasReading,
        tier: Tier,
        battery_level: Option<u8>,
    ) -> Option<Heartbeat> {
        let Some(entry) = self.entry(&reading.device_id).await else {
            tracing::warn!(
                device_id = %reading.device_id,
                "Heartbeat for unknown device ignored"
            );
            return None;
        };

        let mut entry = entry.lock().await;
        if entry.is_late(reading) {
            tracing::debug!(
                device_id = %reading.device_id,
                timestamp = %reading.timestamp,
                last_seen_at = %entry.device.last_seen_at,
                "Late reading left device state unchanged"
            );
            return Some(Heartbeat {
                device: entry.device.clone(),
                status_change: None,
                late: true,
            });
        }

        let device = &mut entry.device;
        device.last_seen_at = device.last_seen_at.max(reading.timestamp);
        device.last_gas_level = reading.gas_level;
        device.last_tier = tier;
        if let Some(level) = battery_level {
            device.battery_level = level.min(100);
        }

        let live = device.live_status();
        let status_change = entry.set_status(live);
        entry.latest = Some(reading.clone());

        if let Some(change) = &status_change {
            tracing::info!(
                device_id = %change.device_id,
                from = ?change.from,
                to = ?change.to,
                "Device status changed"
            );
        }

        Some(Heartbeat {
            device: entry.device.clone(),
            status_change,
            late: false,
        })
    }

    /// Re-classify a device's current gas level against edited thresholds.
    ///
    /// The level is read under the device's own lock, so the newest reading
    /// always wins. Returns the new tier and any status change, or `None`
    /// for unknown and offline devices; only a heartbeat brings an offline
    /// device back.
    pub async fn apply_thresholds(
        &self,
        device_id: &str,
        cfg: &AlertConfig,
    ) -> Option<(Tier, Option<StatusChange>)> {
        let entry = self.entry(device_id).await?;
        let mut entry = entry.lock().await;
        if entry.device.is_offline() {
            return None;
        }
        let tier = classify(entry.device.last_gas_level, cfg);
        entry.device.last_tier = tier;
        let live = entry.device.live_status();
        Some((tier, entry.set_status(live)))
    }

    /// Demote every device whose `last_seen_at` is older than `timeout`
    /// relative to `now` to offline, returning one change per demotion.
    ///
    /// `now` is the snapshot taken when the sweep started. Each device is
    /// checked under its own lock, so a heartbeat that lands first wins.
    pub async fn sweep(&self, now: Timestamp, timeout: chrono::Duration) -> Vec<StatusChange> {
        let mut demoted = Vec::new();
        for entry in self.entries().await {
            let mut entry = entry.lock().await;
            if entry.device.is_offline() || !entry.device.is_stale_at(now, timeout) {
                continue;
            }
            if let Some(change) = entry.set_status(DeviceStatus::Offline) {
                tracing::warn!(
                    device_id = %change.device_id,
                    last_seen_at = %entry.device.last_seen_at,
                    "Device missed heartbeat, marked offline"
                );
                demoted.push(change);
            }
        }
        demoted
    }

    /// All devices in registration order.
    pub async fn list_devices(&self) -> Vec<Device> {
        let mut devices = Vec::new();
        for entry in self.entries().await {
            devices.push(entry.lock().await.device.clone());
        }
        devices
    }

    pub async fn get(&self, device_id: &str) -> Option<Device> {
        let entry = self.entry(device_id).await?;
        let device = entry.lock().await.device.clone();
        Some(device)
    }

    pub async fn latest_reading(&self, device_id: &str) -> Option<GasReading> {
        let entry = self.entry(device_id).await?;
        let latest = entry.lock().await.latest.clone();
        latest
    }

    pub async fn contains(&self, device_id: &str) -> bool {
        self.devices.read().await.contains_key(device_id)
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};
    use gasguard_core::reading::SensorSample;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn kitchen() -> NewDevice {
        NewDevice {
            name: "Kitchen Sensor".to_string(),
            location: "Kitchen Area".to_string(),
            ip_address: "192.168.1.101".to_string(),
        }
    }

    fn reading(device_id: &str, gas_level: u32, at: Timestamp) -> GasReading {
        GasReading::from_sample(
            &SensorSample {
                device_id: device_id.to_string(),
                gas_level,
                temperature: 24.0,
                humidity: 50.0,
                timestamp: at,
                battery_level: None,
            },
            "Kitchen Area",
        )
    }

    #[tokio::test]
    async fn register_assigns_sequential_ids_and_defaults() {
        let registry = DeviceRegistry::new();
        let a = registry.register(&kitchen(), t0()).await.unwrap();
        let b = registry.register(&kitchen(), t0()).await.unwrap();

        assert_eq!(a.id, "lpg-001");
        assert_eq!(b.id, "lpg-002");
        assert_eq!(a.status, DeviceStatus::Online);
        assert_eq!(a.battery_level, 100);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_removal() {
        let registry = DeviceRegistry::new();
        let a = registry.register(&kitchen(), t0()).await.unwrap();
        assert!(registry.remove(&a.id).await);

        let b = registry.register(&kitchen(), t0()).await.unwrap();
        assert_eq!(b.id, "lpg-002");
    }

    #[tokio::test]
    async fn empty_ip_is_rejected_and_count_unchanged() {
        let registry = DeviceRegistry::new();
        registry.register(&kitchen(), t0()).await.unwrap();

        let bad = NewDevice {
            ip_address: String::new(),
            ..kitchen()
        };
        let err = registry.register(&bad, t0()).await.unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = DeviceRegistry::new();
        let device = registry.register(&kitchen(), t0()).await.unwrap();
        assert!(registry.remove(&device.id).await);
        assert!(!registry.remove(&device.id).await);
        assert!(!registry.remove("lpg-999").await);
    }

    #[tokio::test]
    async fn list_preserves_registration_order() {
        let registry = DeviceRegistry::new();
        for name in ["A", "B", "C"] {
            let new = NewDevice {
                name: name.to_string(),
                ..kitchen()
            };
            registry.register(&new, t0()).await.unwrap();
        }
        registry.remove("lpg-002").await;

        let names: Vec<_> = registry
            .list_devices()
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["A", "C"]);
    }

    #[tokio::test]
    async fn heartbeat_updates_snapshot_and_status() {
        let registry = DeviceRegistry::new();
        let device = registry.register(&kitchen(), t0()).await.unwrap();

        let later = t0() + Duration::seconds(2);
        let hb = registry
            .record_heartbeat(&reading(&device.id, 1200, later), Tier::Warning, Some(90))
            .await
            .expect("known device");

        assert_eq!(hb.device.last_gas_level, 1200);
        assert_eq!(hb.device.last_seen_at, later);
        assert_eq!(hb.device.battery_level, 90);
        assert_eq!(hb.device.status, DeviceStatus::Warning);
        assert_eq!(
            hb.status_change,
            Some(StatusChange {
                device_id: device.id.clone(),
                from: DeviceStatus::Online,
                to: DeviceStatus::Warning,
            })
        );
        assert_eq!(
            registry.latest_reading(&device.id).await.unwrap().gas_level,
            1200
        );
    }

    #[tokio::test]
    async fn low_battery_puts_device_in_warning() {
        let registry = DeviceRegistry::new();
        let device = registry.register(&kitchen(), t0()).await.unwrap();
        let hb = registry
            .record_heartbeat(&reading(&device.id, 100, t0()), Tier::Safe, Some(25))
            .await
            .unwrap();
        assert_eq!(hb.device.status, DeviceStatus::Warning);
    }

    #[tokio::test]
    async fn heartbeat_for_unknown_device_is_ignored() {
        let registry = DeviceRegistry::new();
        let hb = registry
            .record_heartbeat(&reading("lpg-404", 100, t0()), Tier::Safe, None)
            .await;
        assert!(hb.is_none());
    }

    #[tokio::test]
    async fn stale_device_goes_offline_only_after_timeout() {
        let registry = DeviceRegistry::new();
        let device = registry.register(&kitchen(), t0()).await.unwrap();
        let timeout = Duration::seconds(120);

        assert!(registry.sweep(t0() + Duration::seconds(120), timeout).await.is_empty());

        let demoted = registry.sweep(t0() + Duration::seconds(121), timeout).await;
        assert_eq!(demoted.len(), 1);
        assert_eq!(demoted[0].to, DeviceStatus::Offline);
        assert!(registry.get(&device.id).await.unwrap().is_offline());

        // Already offline: nothing further to demote.
        assert!(registry.sweep(t0() + Duration::seconds(300), timeout).await.is_empty());
    }

    #[tokio::test]
    async fn fresh_heartbeat_restores_offline_device() {
        let registry = DeviceRegistry::new();
        let device = registry.register(&kitchen(), t0()).await.unwrap();
        registry.sweep(t0() + Duration::minutes(5), Duration::seconds(120)).await;

        let hb = registry
            .record_heartbeat(
                &reading(&device.id, 300, t0() + Duration::minutes(6)),
                Tier::Safe,
                None,
            )
            .await
            .unwrap();
        assert_eq!(hb.device.status, DeviceStatus::Online);
        assert_eq!(hb.status_change.unwrap().from, DeviceStatus::Offline);
    }

    #[tokio::test]
    async fn heartbeat_newer_than_sweep_snapshot_wins() {
        let registry = DeviceRegistry::new();
        let device = registry.register(&kitchen(), t0()).await.unwrap();
        let sweep_started = t0() + Duration::seconds(150);

        // Heartbeat lands between the snapshot and the per-device check.
        registry
            .record_heartbeat(&reading(&device.id, 100, sweep_started), Tier::Safe, None)
            .await;

        assert!(registry
            .sweep(sweep_started, Duration::seconds(120))
            .await
            .is_empty());
        assert!(!registry.get(&device.id).await.unwrap().is_offline());
    }

    #[tokio::test]
    async fn out_of_order_heartbeat_does_not_rewind_last_seen() {
        let registry = DeviceRegistry::new();
        let device = registry.register(&kitchen(), t0()).await.unwrap();
        let newer = t0() + Duration::seconds(30);
        registry
            .record_heartbeat(&reading(&device.id, 100, newer), Tier::Safe, None)
            .await;
        let hb = registry
            .record_heartbeat(&reading(&device.id, 100, t0()), Tier::Safe, None)
            .await
            .unwrap();
        assert_eq!(hb.device.last_seen_at, newer);
    }

    #[tokio::test]
    async fn late_reading_does_not_revive_offline_device() {
        let registry = DeviceRegistry::new();
        let device = registry.register(&kitchen(), t0()).await.unwrap();
        registry.sweep(t0() + Duration::minutes(5), Duration::seconds(120)).await;

        let hb = registry
            .record_heartbeat(
                &reading(&device.id, 777, t0() - Duration::seconds(30)),
                Tier::Safe,
                Some(90),
            )
            .await
            .unwrap();

        assert!(hb.late);
        assert_eq!(hb.status_change, None);
        let stored = registry.get(&device.id).await.unwrap();
        assert!(stored.is_offline());
        assert_eq!(stored.last_seen_at, t0());
        assert_eq!(stored.last_gas_level, 0);
        assert_eq!(stored.battery_level, 100);
        assert!(registry.latest_reading(&device.id).await.is_none());
    }

    #[tokio::test]
    async fn reading_older_than_latest_leaves_snapshot_alone() {
        let registry = DeviceRegistry::new();
        let device = registry.register(&kitchen(), t0()).await.unwrap();
        let newer = t0() + Duration::seconds(30);
        registry
            .record_heartbeat(&reading(&device.id, 2600, newer), Tier::Danger, None)
            .await;

        let older = t0() + Duration::seconds(10);
        let hb = registry
            .record_heartbeat(&reading(&device.id, 100, older), Tier::Safe, None)
            .await
            .unwrap();

        assert!(hb.late);
        assert_eq!(hb.device.last_gas_level, 2600);
        assert_eq!(hb.device.last_tier, Tier::Danger);
        assert_eq!(hb.device.status, DeviceStatus::Warning);
        assert_eq!(
            registry.latest_reading(&device.id).await.unwrap().timestamp,
            newer
        );
    }

    #[tokio::test]
    async fn apply_thresholds_keeps_offline_devices_offline() {
        let registry = DeviceRegistry::new();
        let device = registry.register(&kitchen(), t0()).await.unwrap();
        registry
            .record_heartbeat(&reading(&device.id, 2600, t0()), Tier::Danger, None)
            .await;
        registry.sweep(t0() + Duration::minutes(5), Duration::seconds(120)).await;

        assert!(registry
            .apply_thresholds(&device.id, &AlertConfig::default())
            .await
            .is_none());
        assert!(registry.get(&device.id).await.unwrap().is_offline());
    }

    #[tokio::test]
    async fn apply_thresholds_uses_current_level() {
        let registry = DeviceRegistry::new();
        let device = registry.register(&kitchen(), t0()).await.unwrap();
        registry
            .record_heartbeat(&reading(&device.id, 800, t0()), Tier::Safe, None)
            .await;

        let lowered = AlertConfig {
            warning_threshold: 500,
            ..AlertConfig::default()
        };
        let (tier, change) = registry.apply_thresholds(&device.id, &lowered).await.unwrap();
        assert_eq!(tier, Tier::Warning);
        assert_eq!(change.unwrap().to, DeviceStatus::Warning);

        let (tier, change) = registry
            .apply_thresholds(&device.id, &AlertConfig::default())
            .await
            .unwrap();
        assert_eq!(tier, Tier::Safe);
        assert_eq!(change.unwrap().to, DeviceStatus::Online);
    }

    #[tokio::test]
    async fn apply_thresholds_for_unknown_device_is_none() {
        let registry = DeviceRegistry::new();
        assert!(registry
            .apply_thresholds("lpg-404", &AlertConfig::default())
            .await
            .is_none());
    }
}
