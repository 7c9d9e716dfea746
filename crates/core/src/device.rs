//! Sensor device model, registration rules, and the connectivity status rule.
//!
//! Pure logic; the registry that owns devices lives in `gasguard-monitor`.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, FieldViolation};
use crate::tier::Tier;
use crate::types::{DeviceId, Ppm, Timestamp};

/// Battery level below which a device is flagged `warning`.
pub const LOW_BATTERY_PERCENT: u8 = 30;

/// Battery level a freshly registered device reports until its first heartbeat.
pub const INITIAL_BATTERY_PERCENT: u8 = 100;

/// Maximum length of a device name or location.
const MAX_LABEL_LEN: usize = 128;

/// Connectivity / health status of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Online,
    Warning,
    Offline,
}

/// Coarse battery band used for display colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryBand {
    Good,
    Low,
    Critical,
}

/// A registered LPG sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub location: String,
    pub status: DeviceStatus,
    pub battery_level: u8,
    pub last_seen_at: Timestamp,
    pub last_gas_level: Ppm,
    /// Tier of the most recently classified reading.
    pub last_tier: Tier,
    pub ip_address: String,
}

/// Fields supplied when adding a device.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDevice {
    pub name: String,
    pub location: String,
    pub ip_address: String,
}

impl NewDevice {
    /// Check every field and return the trimmed values on success.
    pub fn validate(&self) -> Result<NewDevice, CoreError> {
        let mut violations = Vec::new();

        let name = self.name.trim();
        let location = self.location.trim();
        let ip_address = self.ip_address.trim();

        check_label(&mut violations, "name", "Device name", name);
        check_label(&mut violations, "location", "Location", location);

        if ip_address.is_empty() {
            violations.push(FieldViolation::new(
                "ip_address",
                "IP address must not be empty",
            ));
        } else if ip_address.parse::<IpAddr>().is_err() {
            violations.push(FieldViolation::new(
                "ip_address",
                format!("'{ip_address}' is not a valid IP address"),
            ));
        }

        if !violations.is_empty() {
            return Err(CoreError::Validation(violations));
        }

        Ok(NewDevice {
            name: name.to_string(),
            location: location.to_string(),
            ip_address: ip_address.to_string(),
        })
    }
}

fn check_label(violations: &mut Vec<FieldViolation>, field: &'static str, label: &str, value: &str) {
    if value.is_empty() {
        violations.push(FieldViolation::new(
            field,
            format!("{label} must not be empty"),
        ));
    } else if value.chars().count() > MAX_LABEL_LEN {
        violations.push(FieldViolation::new(
            field,
            format!("{label} must not exceed {MAX_LABEL_LEN} characters"),
        ));
    }
}

/// Format the display id for the `seq`-th registered device (`lpg-001`).
pub fn format_device_id(seq: u64) -> DeviceId {
    format!("lpg-{seq:03}")
}

impl Device {
    /// Build the initial record for a validated registration.
    pub fn registered(id: DeviceId, new: NewDevice, now: Timestamp) -> Self {
        Self {
            id,
            name: new.name,
            location: new.location,
            status: DeviceStatus::Online,
            battery_level: INITIAL_BATTERY_PERCENT,
            last_seen_at: now,
            last_gas_level: 0,
            last_tier: Tier::Safe,
            ip_address: new.ip_address,
        }
    }

    /// Status for a device that has just been heard from.
    ///
    /// A fresh heartbeat always restores connectivity; the device is then
    /// downgraded to `warning` on low battery or an alerting tier.
    pub fn live_status(&self) -> DeviceStatus {
        if self.battery_level < LOW_BATTERY_PERCENT || self.last_tier.is_alerting() {
            DeviceStatus::Warning
        } else {
            DeviceStatus::Online
        }
    }

    /// `true` when `last_seen_at` is strictly older than `timeout` at `now`.
    pub fn is_stale_at(&self, now: Timestamp, timeout: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_seen_at) > timeout
    }

    pub fn is_offline(&self) -> bool {
        self.status == DeviceStatus::Offline
    }

    pub fn low_battery(&self) -> bool {
        self.battery_level < LOW_BATTERY_PERCENT
    }

    pub fn battery_band(&self) -> BatteryBand {
        match self.battery_level {
            51..=u8::MAX => BatteryBand::Good,
            21..=50 => BatteryBand::Low,
            _ => BatteryBand::Critical,
        }
    }
}
