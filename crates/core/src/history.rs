//! Time-windowed, downsampled reading history.
//!
//! A [`HistoryWindow`] keeps a fixed number of buckets for one range and
//! nothing else: raw readings are folded into a running mean per metric and
//! then discarded. Buckets are aligned to interval boundaries in UTC.

use std::collections::VecDeque;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::reading::GasReading;
use crate::types::Timestamp;

/// Selectable history span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryRange {
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    OneWeek,
}

impl HistoryRange {
    pub const ALL: [HistoryRange; 3] = [
        HistoryRange::OneHour,
        HistoryRange::OneDay,
        HistoryRange::OneWeek,
    ];

    /// Number of buckets in the window.
    pub fn bucket_count(&self) -> usize {
        match self {
            HistoryRange::OneHour => 60,
            HistoryRange::OneDay => 24,
            HistoryRange::OneWeek => 7,
        }
    }

    /// Width of a single bucket.
    pub fn bucket_interval(&self) -> Duration {
        match self {
            HistoryRange::OneHour => Duration::minutes(1),
            HistoryRange::OneDay => Duration::minutes(60),
            HistoryRange::OneWeek => Duration::minutes(1440),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryRange::OneHour => "1h",
            HistoryRange::OneDay => "24h",
            HistoryRange::OneWeek => "7d",
        }
    }

    fn label(&self, start: Timestamp) -> String {
        match self {
            HistoryRange::OneHour | HistoryRange::OneDay => start.format("%H:%M").to_string(),
            HistoryRange::OneWeek => start.format("%b %-d").to_string(),
        }
    }
}

impl std::fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A charted quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    GasLevel,
    Temperature,
    Humidity,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::GasLevel, Metric::Temperature, Metric::Humidity];

    fn index(&self) -> usize {
        match self {
            Metric::GasLevel => 0,
            Metric::Temperature => 1,
            Metric::Humidity => 2,
        }
    }

    pub fn value_of(&self, reading: &GasReading) -> f64 {
        match self {
            Metric::GasLevel => f64::from(reading.gas_level),
            Metric::Temperature => reading.temperature,
            Metric::Humidity => reading.humidity,
        }
    }
}

/// One aggregated slot as returned to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub start: Timestamp,
    /// Mean of every reading placed in the bucket; `None` means no data.
    pub aggregated_value: Option<f64>,
    pub sample_count: u64,
}

/// Incremental arithmetic mean.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    count: u64,
    mean: f64,
}

impl RunningMean {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn value(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    means: [RunningMean; 3],
}

/// Fixed-length sliding window of buckets for one range.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    range: HistoryRange,
    /// Start of the oldest bucket.
    origin: Timestamp,
    slots: VecDeque<Slot>,
}

/// Floor `ts` to a multiple of `interval` since the Unix epoch.
fn align(ts: Timestamp, interval: Duration) -> Timestamp {
    let rem = ts
        .timestamp_millis()
        .rem_euclid(interval.num_milliseconds());
    ts - Duration::milliseconds(rem)
}

impl HistoryWindow {
    /// Empty window whose trailing bucket contains `now`.
    pub fn new(range: HistoryRange, now: Timestamp) -> Self {
        let n = range.bucket_count();
        let interval = range.bucket_interval();
        let origin = align(now, interval) - interval * (n as i32 - 1);
        Self {
            range,
            origin,
            slots: VecDeque::from(vec![Slot::default(); n]),
        }
    }

    pub fn range(&self) -> HistoryRange {
        self.range
    }

    pub fn origin(&self) -> Timestamp {
        self.origin
    }

    /// Exclusive end of the trailing bucket.
    pub fn end(&self) -> Timestamp {
        self.origin + self.range.bucket_interval() * self.slots.len() as i32
    }

    /// Fold a reading into its bucket.
    ///
    /// Readings older than the oldest bucket are rejected (`false`). Readings
    /// past the trailing bucket slide the window forward first.
    pub fn insert(&mut self, reading: &GasReading) -> bool {
        let ts = reading.timestamp;
        if ts < self.origin {
            return false;
        }
        if ts >= self.end() {
            self.slide_to(ts);
        }

        let interval_ms = self.range.bucket_interval().num_milliseconds();
        let idx = (ts - self.origin).num_milliseconds() / interval_ms;
        let Some(slot) = self.slots.get_mut(idx as usize) else {
            return false;
        };
        for metric in Metric::ALL {
            slot.means[metric.index()].push(metric.value_of(reading));
        }
        true
    }

    /// Slide the window forward so its trailing bucket contains `now`.
    ///
    /// No-op while `now` is still inside the current span.
    pub fn advance_to(&mut self, now: Timestamp) {
        if now >= self.end() {
            self.slide_to(now);
        }
    }

    fn slide_to(&mut self, ts: Timestamp) {
        let n = self.slots.len();
        let interval = self.range.bucket_interval();
        let steps = ((ts - self.end()).num_milliseconds() / interval.num_milliseconds()) as usize + 1;

        if steps >= n {
            *self = HistoryWindow::new(self.range, ts);
            return;
        }
        self.slots.drain(..steps);
        self.slots.extend(std::iter::repeat(Slot::default()).take(steps));
        self.origin = self.origin + interval * steps as i32;
    }

    /// Every bucket, oldest first, for one metric.
    pub fn buckets(&self, metric: Metric) -> Vec<Bucket> {
        let interval = self.range.bucket_interval();
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let start = self.origin + interval * i as i32;
                let mean = slot.means[metric.index()];
                Bucket {
                    label: self.range.label(start),
                    start,
                    aggregated_value: mean.value(),
                    sample_count: mean.count(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 30, 20).unwrap()
    }

    fn reading_at(ts: Timestamp, gas_level: u32) -> GasReading {
        GasReading {
            id: Uuid::now_v7(),
            device_id: "lpg-001".to_string(),
            gas_level,
            temperature: 22.0,
            humidity: 50.0,
            timestamp: ts,
            location: "Kitchen Area".to_string(),
        }
    }

    #[test]
    fn bucket_counts_are_fixed_per_range() {
        for (range, expected) in [
            (HistoryRange::OneHour, 60),
            (HistoryRange::OneDay, 24),
            (HistoryRange::OneWeek, 7),
        ] {
            let window = HistoryWindow::new(range, now());
            assert_eq!(window.buckets(Metric::GasLevel).len(), expected);
        }
    }

    #[test]
    fn empty_buckets_report_no_data() {
        let window = HistoryWindow::new(HistoryRange::OneDay, now());
        assert!(window
            .buckets(Metric::Humidity)
            .iter()
            .all(|b| b.aggregated_value.is_none() && b.sample_count == 0));
    }

    #[test]
    fn trailing_bucket_holds_running_mean() {
        let mut window = HistoryWindow::new(HistoryRange::OneHour, now());
        for level in [100, 200, 600] {
            assert!(window.insert(&reading_at(now(), level)));
        }
        let buckets = window.buckets(Metric::GasLevel);
        let last = buckets.last().unwrap();
        assert_eq!(last.sample_count, 3);
        assert!((last.aggregated_value.unwrap() - 300.0).abs() < 1e-9);
        assert_eq!(last.label, "13:30");
    }

    #[test]
    fn window_is_aligned_to_interval_boundaries() {
        let window = HistoryWindow::new(HistoryRange::OneDay, now());
        assert_eq!(window.end(), Utc.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap());
        assert_eq!(window.origin(), Utc.with_ymd_and_hms(2024, 4, 30, 14, 0, 0).unwrap());
    }

    #[test]
    fn reading_before_window_is_dropped() {
        let mut window = HistoryWindow::new(HistoryRange::OneHour, now());
        let late = window.origin() - Duration::seconds(1);
        assert!(!window.insert(&reading_at(late, 500)));
        assert!(window
            .buckets(Metric::GasLevel)
            .iter()
            .all(|b| b.aggregated_value.is_none()));
    }

    #[test]
    fn future_reading_slides_window_forward() {
        let mut window = HistoryWindow::new(HistoryRange::OneHour, now());
        window.insert(&reading_at(now(), 400));

        let later = now() + Duration::minutes(2);
        assert!(window.insert(&reading_at(later, 800)));

        let buckets = window.buckets(Metric::GasLevel);
        assert_eq!(buckets.len(), 60);
        assert_eq!(buckets[59].aggregated_value, Some(800.0));
        assert_eq!(buckets[57].aggregated_value, Some(400.0));
        assert_eq!(buckets[58].aggregated_value, None);
    }

    #[test]
    fn far_future_reading_resets_window() {
        let mut window = HistoryWindow::new(HistoryRange::OneWeek, now());
        window.insert(&reading_at(now(), 400));
        let much_later = now() + Duration::days(30);
        assert!(window.insert(&reading_at(much_later, 900)));

        let values: Vec<_> = window
            .buckets(Metric::GasLevel)
            .iter()
            .map(|b| b.aggregated_value)
            .collect();
        assert_eq!(values.iter().filter(|v| v.is_some()).count(), 1);
        assert_eq!(values[6], Some(900.0));
    }

    #[test]
    fn advance_to_keeps_recent_buckets() {
        let mut window = HistoryWindow::new(HistoryRange::OneHour, now());
        window.insert(&reading_at(now(), 400));

        window.advance_to(now() + Duration::seconds(10));
        assert_eq!(window.buckets(Metric::GasLevel)[59].aggregated_value, Some(400.0));

        window.advance_to(now() + Duration::minutes(5));
        let buckets = window.buckets(Metric::GasLevel);
        assert_eq!(buckets[54].aggregated_value, Some(400.0));
        assert_eq!(buckets[59].aggregated_value, None);
    }

    #[test]
    fn week_labels_use_month_and_day() {
        let window = HistoryWindow::new(HistoryRange::OneWeek, now());
        let buckets = window.buckets(Metric::GasLevel);
        assert_eq!(buckets[6].label, "May 1");
        assert_eq!(buckets[0].label, "Apr 25");
    }

    #[test]
    fn range_serializes_as_short_name() {
        assert_eq!(serde_json::to_value(HistoryRange::OneWeek).unwrap(), "7d");
        let parsed: HistoryRange = serde_json::from_value(serde_json::json!("1h")).unwrap();
        assert_eq!(parsed, HistoryRange::OneHour);
    }
}
