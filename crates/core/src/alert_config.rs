//! Alert configuration and its validator.
//!
//! There is a single live [`AlertConfig`] per process. Edits arrive as a
//! complete draft, are checked by [`AlertConfigValidator`], and only replace
//! the live value when no violation was found.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::channels::Channel;
use crate::error::{CoreError, FieldViolation};
use crate::types::Ppm;

/// Snooze durations offered to the user, in minutes.
pub const ALLOWED_SNOOZE_MINUTES: [u32; 5] = [1, 5, 10, 15, 30];

/// Highest accepted warning threshold.
pub const MAX_WARNING_THRESHOLD: Ppm = 5000;

/// Highest accepted danger threshold.
pub const MAX_DANGER_THRESHOLD: Ppm = 10_000;

/// Highest alert volume.
pub const MAX_ALERT_VOLUME: u8 = 100;

/// Optional leading `+`, then 7 to 15 digits (E.164 length).
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid regex"));

/// User-editable alerting settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub warning_threshold: Ppm,
    pub danger_threshold: Ppm,
    pub enable_audio_alerts: bool,
    pub enable_vibration: bool,
    pub enable_email_notifications: bool,
    pub email_address: String,
    pub enable_sms_notifications: bool,
    pub phone_number: String,
    pub alert_volume: u8,
    pub snooze_time_minutes: u32,
    pub auto_evacuation_alert: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 1000,
            danger_threshold: 2500,
            enable_audio_alerts: true,
            enable_vibration: true,
            enable_email_notifications: false,
            email_address: String::new(),
            enable_sms_notifications: false,
            phone_number: String::new(),
            alert_volume: 80,
            snooze_time_minutes: 5,
            auto_evacuation_alert: true,
        }
    }
}

impl AlertConfig {
    /// Channels switched on in this configuration.
    pub fn enabled_channels(&self) -> BTreeSet<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| match c {
                Channel::Audio => self.enable_audio_alerts,
                Channel::Vibration => self.enable_vibration,
                Channel::Email => self.enable_email_notifications,
                Channel::Sms => self.enable_sms_notifications,
            })
            .collect()
    }

    /// Snooze window as a chrono duration.
    pub fn snooze_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.snooze_time_minutes))
    }

    /// Every rule this configuration breaks. Empty means valid.
    pub fn violations(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();

        if self.warning_threshold >= self.danger_threshold {
            violations.push(FieldViolation::new(
                "warning_threshold",
                "Warning threshold must be less than danger threshold",
            ));
        }
        if self.warning_threshold > MAX_WARNING_THRESHOLD {
            violations.push(FieldViolation::new(
                "warning_threshold",
                format!("Warning threshold must not exceed {MAX_WARNING_THRESHOLD} PPM"),
            ));
        }
        if self.danger_threshold > MAX_DANGER_THRESHOLD {
            violations.push(FieldViolation::new(
                "danger_threshold",
                format!("Danger threshold must not exceed {MAX_DANGER_THRESHOLD} PPM"),
            ));
        }

        let email = self.email_address.trim();
        match (self.enable_email_notifications, email.is_empty()) {
            (true, true) => violations.push(FieldViolation::new(
                "email_address",
                "Email address is required for email notifications",
            )),
            (false, false) => violations.push(FieldViolation::new(
                "email_address",
                "Email address must be empty while email notifications are disabled",
            )),
            (true, false) if !email.to_string().validate_email() => {
                violations.push(FieldViolation::new(
                    "email_address",
                    format!("'{email}' is not a valid email address"),
                ))
            }
            _ => {}
        }

        let phone = self.phone_number.trim();
        match (self.enable_sms_notifications, phone.is_empty()) {
            (true, true) => violations.push(FieldViolation::new(
                "phone_number",
                "Phone number is required for SMS notifications",
            )),
            (false, false) => violations.push(FieldViolation::new(
                "phone_number",
                "Phone number must be empty while SMS notifications are disabled",
            )),
            (true, false) if !is_valid_phone(phone) => violations.push(FieldViolation::new(
                "phone_number",
                format!("'{phone}' is not a valid phone number"),
            )),
            _ => {}
        }

        if self.alert_volume > MAX_ALERT_VOLUME {
            violations.push(FieldViolation::new(
                "alert_volume",
                format!("Alert volume must be between 0 and {MAX_ALERT_VOLUME}"),
            ));
        }
        if !ALLOWED_SNOOZE_MINUTES.contains(&self.snooze_time_minutes) {
            violations.push(FieldViolation::new(
                "snooze_time_minutes",
                format!("Snooze time must be one of {ALLOWED_SNOOZE_MINUTES:?} minutes"),
            ));
        }

        violations
    }
}

/// Spaces, dashes and parentheses are accepted as visual separators.
fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    PHONE_RE.is_match(&compact)
}

/// Gatekeeper for configuration edits.
pub struct AlertConfigValidator;

impl AlertConfigValidator {
    /// Check a draft and hand it back unchanged if it is valid.
    ///
    /// All violations are collected into a single
    /// [`CoreError::Validation`] so the caller can report them together.
    pub fn validate(draft: AlertConfig) -> Result<AlertConfig, CoreError> {
        let violations = draft.violations();
        if violations.is_empty() {
            Ok(draft)
        } else {
            Err(CoreError::Validation(violations))
        }
    }
}
