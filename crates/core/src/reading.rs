//! Sensor readings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DeviceId, Ppm, Timestamp};

/// Raw sample as supplied by a reading source for one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub device_id: DeviceId,
    pub gas_level: Ppm,
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: Timestamp,
    /// Not every source reports battery; `None` keeps the last known level.
    #[serde(default)]
    pub battery_level: Option<u8>,
}

/// An immutable, identified gas reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasReading {
    pub id: Uuid,
    pub device_id: DeviceId,
    pub gas_level: Ppm,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, clamped to `0..=100`.
    pub humidity: f64,
    pub timestamp: Timestamp,
    pub location: String,
}

impl GasReading {
    /// Stamp a sample with a fresh id and the device's location.
    pub fn from_sample(sample: &SensorSample, location: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            device_id: sample.device_id.clone(),
            gas_level: sample.gas_level,
            temperature: sample.temperature,
            humidity: sample.humidity.clamp(0.0, 100.0),
            timestamp: sample.timestamp,
            location: location.into(),
        }
    }
}
