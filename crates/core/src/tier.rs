//! Threshold classification of gas readings.
//!
//! Pure logic: the caller supplies the level and the active configuration.

use serde::{Deserialize, Serialize};

use crate::alert_config::AlertConfig;
use crate::types::Ppm;

/// Level shown as a full gauge on the live dashboard.
pub const GAUGE_FULL_SCALE_PPM: Ppm = 5000;

/// Risk tier of a reading, in ascending order of severity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Safe,
    Warning,
    Danger,
}

impl Tier {
    /// `true` for any tier that should raise an alert.
    pub fn is_alerting(&self) -> bool {
        *self >= Tier::Warning
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Safe => "safe",
            Tier::Warning => "warning",
            Tier::Danger => "danger",
        }
    }

    /// Advisory text shown with an alert, or `None` for a safe reading.
    pub fn advisory(&self, evacuate: bool) -> Option<&'static str> {
        match self {
            Tier::Safe => None,
            Tier::Warning => Some("WARNING: Elevated gas levels detected. Check for leaks."),
            Tier::Danger if evacuate => {
                Some("DANGER: High gas concentration detected! Evacuate immediately!")
            }
            Tier::Danger => Some("DANGER: High gas concentration detected!"),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a gas level against the configured thresholds.
///
/// `level >= danger` is danger, `level >= warning` is warning, anything
/// lower is safe. Total: every input maps to a tier.
pub fn classify(level: Ppm, cfg: &AlertConfig) -> Tier {
    if level >= cfg.danger_threshold {
        Tier::Danger
    } else if level >= cfg.warning_threshold {
        Tier::Warning
    } else {
        Tier::Safe
    }
}

/// Level as a percentage of the dashboard gauge, capped at 100.
pub fn gauge_percent(level: Ppm) -> f64 {
    (f64::from(level) / f64::from(GAUGE_FULL_SCALE_PPM) * 100.0).min(100.0)
}
