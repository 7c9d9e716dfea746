//! Time-windowed history per device.
//!
//! Each device keeps one [`HistoryWindow`] per [`HistoryRange`]; only the
//! active span is retained, never raw readings. The selected range is what
//! the dashboard charts by default; selecting it rebuilds that range's
//! windows relative to the moment of selection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use gasguard_core::history::{Bucket, HistoryRange, HistoryWindow, Metric};
use gasguard_core::reading::GasReading;
use gasguard_core::types::{DeviceId, Timestamp};
use tokio::sync::{Mutex, RwLock};

struct DeviceWindows {
    windows: HashMap<HistoryRange, HistoryWindow>,
}

impl DeviceWindows {
    fn anchored_at(now: Timestamp) -> Self {
        Self {
            windows: HistoryRange::ALL
                .into_iter()
                .map(|range| (range, HistoryWindow::new(range, now)))
                .collect(),
        }
    }
}

pub struct HistoricalAggregator {
    devices: RwLock<HashMap<DeviceId, Arc<Mutex<DeviceWindows>>>>,
    selected: RwLock<HistoryRange>,
    /// Readings rejected by at least one window for landing before it.
    dropped: AtomicU64,
}

impl HistoricalAggregator {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            selected: RwLock::new(HistoryRange::default()),
            dropped: AtomicU64::new(0),
        }
    }

    async fn windows_for(&self, device_id: &str) -> Option<Arc<Mutex<DeviceWindows>>> {
        self.devices.read().await.get(device_id).cloned()
    }

    /// Route a reading into every range's window.
    ///
    /// A device's windows are created on its first reading, anchored at that
    /// reading's timestamp. Returns `false` if any window dropped the reading
    /// as too old; such drops are counted, not raised.
    pub async fn append(&self, reading: &GasReading) -> bool {
        let entry = match self.windows_for(&reading.device_id).await {
            Some(entry) => entry,
            None => Arc::clone(
                self.devices
                    .write()
                    .await
                    .entry(reading.device_id.clone())
                    .or_insert_with(|| {
                        Arc::new(Mutex::new(DeviceWindows::anchored_at(reading.timestamp)))
                    }),
            ),
        };

        let mut entry = entry.lock().await;
        let mut accepted = true;
        for window in entry.windows.values_mut() {
            accepted &= window.insert(reading);
        }

        if !accepted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                device_id = %reading.device_id,
                timestamp = %reading.timestamp,
                "Reading older than history window dropped"
            );
        }
        accepted
    }

    /// The full fixed-length bucket array for one device, metric and range,
    /// with the window advanced to `now`.
    ///
    /// Devices with no readings yet get an all-empty window ending at `now`.
    pub async fn query(
        &self,
        device_id: &str,
        metric: Metric,
        range: HistoryRange,
        now: Timestamp,
    ) -> Vec<Bucket> {
        let window = match self.windows_for(device_id).await {
            Some(entry) => {
                let entry = entry.lock().await;
                entry.windows.get(&range).cloned()
            }
            None => None,
        };

        let mut window = window.unwrap_or_else(|| HistoryWindow::new(range, now));
        window.advance_to(now);
        window.buckets(metric)
    }

    /// Select `range` and rebuild its windows relative to `now`, discarding
    /// their previous buckets. Other ranges are left as they are.
    pub async fn set_range(&self, range: HistoryRange, now: Timestamp) {
        *self.selected.write().await = range;

        let entries: Vec<_> = self.devices.read().await.values().cloned().collect();
        for entry in &entries {
            entry
                .lock()
                .await
                .windows
                .insert(range, HistoryWindow::new(range, now));
        }

        tracing::info!(range = %range, devices = entries.len(), "History range rebuilt");
    }

    pub async fn selected_range(&self) -> HistoryRange {
        *self.selected.read().await
    }

    pub async fn remove_device(&self, device_id: &str) {
        self.devices.write().await.remove(device_id);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for HistoricalAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use gasguard_core::reading::SensorSample;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 30, 0).unwrap()
    }

    fn reading(device_id: &str, gas_level: u32, at: Timestamp) -> GasReading {
        GasReading::from_sample(
            &SensorSample {
                device_id: device_id.to_string(),
                gas_level,
                temperature: 25.0,
                humidity: 55.0,
                timestamp: at,
                battery_level: None,
            },
            "Garage",
        )
    }

    #[tokio::test]
    async fn bucket_count_is_fixed_regardless_of_readings() {
        let agg = HistoricalAggregator::new();
        for (range, expected) in [
            (HistoryRange::OneHour, 60),
            (HistoryRange::OneDay, 24),
            (HistoryRange::OneWeek, 7),
        ] {
            assert_eq!(
                agg.query("lpg-001", Metric::GasLevel, range, t0()).await.len(),
                expected
            );
        }

        for i in 0..500 {
            agg.append(&reading("lpg-001", 100, t0() + Duration::seconds(i)))
                .await;
        }
        for range in HistoryRange::ALL {
            let buckets = agg
                .query("lpg-001", Metric::GasLevel, range, t0() + Duration::seconds(500))
                .await;
            assert_eq!(buckets.len(), range.bucket_count());
        }
    }

    #[tokio::test]
    async fn append_feeds_every_range() {
        let agg = HistoricalAggregator::new();
        agg.append(&reading("lpg-001", 200, t0())).await;
        agg.append(&reading("lpg-001", 400, t0())).await;

        for range in HistoryRange::ALL {
            let buckets = agg.query("lpg-001", Metric::GasLevel, range, t0()).await;
            let last = buckets.last().unwrap();
            assert_eq!(last.aggregated_value, Some(300.0));
            assert_eq!(last.sample_count, 2);
        }
    }

    #[tokio::test]
    async fn metrics_are_aggregated_independently() {
        let agg = HistoricalAggregator::new();
        agg.append(&reading("lpg-001", 200, t0())).await;

        let humidity = agg
            .query("lpg-001", Metric::Humidity, HistoryRange::OneHour, t0())
            .await;
        assert_eq!(humidity.last().unwrap().aggregated_value, Some(55.0));
    }

    #[tokio::test]
    async fn late_reading_is_dropped_and_counted() {
        let agg = HistoricalAggregator::new();
        agg.append(&reading("lpg-001", 200, t0())).await;

        let stale = t0() - Duration::hours(2);
        assert!(!agg.append(&reading("lpg-001", 9000, stale)).await);
        assert_eq!(agg.dropped_count(), 1);
    }

    #[tokio::test]
    async fn set_range_discards_previous_buckets_for_that_range() {
        let agg = HistoricalAggregator::new();
        agg.append(&reading("lpg-001", 200, t0())).await;

        agg.set_range(HistoryRange::OneHour, t0()).await;
        assert_eq!(agg.selected_range().await, HistoryRange::OneHour);

        let hour = agg
            .query("lpg-001", Metric::GasLevel, HistoryRange::OneHour, t0())
            .await;
        assert!(hour.iter().all(|b| b.aggregated_value.is_none()));

        let day = agg
            .query("lpg-001", Metric::GasLevel, HistoryRange::OneDay, t0())
            .await;
        assert_eq!(day.last().unwrap().aggregated_value, Some(200.0));
    }

    #[tokio::test]
    async fn devices_do_not_share_windows() {
        let agg = HistoricalAggregator::new();
        agg.append(&reading("lpg-001", 100, t0())).await;
        agg.append(&reading("lpg-002", 900, t0())).await;

        let a = agg
            .query("lpg-001", Metric::GasLevel, HistoryRange::OneHour, t0())
            .await;
        assert_eq!(a.last().unwrap().aggregated_value, Some(100.0));

        agg.remove_device("lpg-002").await;
        let b = agg
            .query("lpg-002", Metric::GasLevel, HistoryRange::OneHour, t0())
            .await;
        assert!(b.iter().all(|bucket| bucket.sample_count == 0));
    }
}
