//! Where readings come from.
//!
//! The ingestion loop only depends on [`ReadingSource`]. [`SimulatedSource`]
//! is the demo feed: mostly quiet background levels with occasional spikes,
//! enough to exercise every tier.

use async_trait::async_trait;
use chrono::Utc;
use gasguard_core::device::Device;
use gasguard_core::reading::SensorSample;
use gasguard_core::types::DeviceId;
use rand::Rng;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Device {0} is unreachable")]
    Unreachable(DeviceId),
}

/// Supplies one sample per device per poll.
///
/// `Ok(None)` means "no update this cycle"; it is never treated as a
/// connectivity failure. Connectivity is judged by heartbeat age alone.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    async fn poll(&self, device: &Device) -> Result<Option<SensorSample>, SourceError>;
}

/// Random readings shaped like a household kitchen sensor.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    /// Upper bound of the quiet background level (PPM).
    pub base_max_ppm: f64,
    /// Chance per poll of a leak-like spike.
    pub spike_probability: f64,
    /// Upper bound of a spike added on top of the background (PPM).
    pub spike_max_ppm: f64,
    /// Chance per poll that the battery drops by one percent.
    pub battery_drain_probability: f64,
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self {
            base_max_ppm: 500.0,
            spike_probability: 0.1,
            spike_max_ppm: 3000.0,
            battery_drain_probability: 0.02,
        }
    }
}

#[async_trait]
impl ReadingSource for SimulatedSource {
    async fn poll(&self, device: &Device) -> Result<Option<SensorSample>, SourceError> {
        // A flat battery means a silent sensor.
        if device.battery_level == 0 {
            return Ok(None);
        }

        let mut rng = rand::rng();

        let mut gas_level = rng.random_range(0.0..self.base_max_ppm);
        if rng.random_bool(self.spike_probability) {
            gas_level += rng.random_range(0.0..self.spike_max_ppm);
        }

        let battery_level = if rng.random_bool(self.battery_drain_probability) {
            device.battery_level.saturating_sub(1)
        } else {
            device.battery_level
        };

        Ok(Some(SensorSample {
            device_id: device.id.clone(),
            gas_level: gas_level.round() as u32,
            temperature: rng.random_range(20.0..35.0),
            humidity: rng.random_range(40.0..70.0),
            timestamp: Utc::now(),
            battery_level: Some(battery_level),
        }))
    }
}
