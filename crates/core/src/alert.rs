//! Per-device alert state machine and notification requests.
//!
//! [`DeviceAlertState::apply`] is the pure transition function; the engine in
//! `gasguard-monitor` serialises calls per device and performs the dispatch.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::alert_config::AlertConfig;
use crate::channels::Channel;
use crate::tier::Tier;
use crate::types::{DeviceId, Timestamp};

/// Alert state tracked for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAlertState {
    pub device_id: DeviceId,
    pub current_tier: Tier,
    pub snoozed_until: Option<Timestamp>,
}

/// What the engine asks the dispatcher to deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub device_id: DeviceId,
    pub tier: Tier,
    pub channels: BTreeSet<Channel>,
    pub is_evacuation_advisory: bool,
    pub message: String,
    /// Set only when the email channel is enabled.
    pub email_address: Option<String>,
    /// Set only when the SMS channel is enabled.
    pub phone_number: Option<String>,
    pub alert_volume: u8,
    pub issued_at: Timestamp,
}

impl NotificationRequest {
    fn build(device_id: &str, tier: Tier, cfg: &AlertConfig, now: Timestamp) -> Self {
        let channels = cfg.enabled_channels();
        let is_evacuation_advisory = tier == Tier::Danger && cfg.auto_evacuation_alert;
        let contact = |channel: Channel, value: &str| {
            channels
                .contains(&channel)
                .then(|| value.trim().to_string())
        };
        Self {
            device_id: device_id.to_string(),
            tier,
            is_evacuation_advisory,
            message: tier
                .advisory(is_evacuation_advisory)
                .unwrap_or_default()
                .to_string(),
            email_address: contact(Channel::Email, &cfg.email_address),
            phone_number: contact(Channel::Sms, &cfg.phone_number),
            alert_volume: cfg.alert_volume,
            issued_at: now,
            channels,
        }
    }
}

impl DeviceAlertState {
    pub fn new(device_id: impl Into<DeviceId>) -> Self {
        Self {
            device_id: device_id.into(),
            current_tier: Tier::Safe,
            snoozed_until: None,
        }
    }

    /// `true` while `now` is inside the snooze window.
    pub fn is_snoozed_at(&self, now: Timestamp) -> bool {
        self.snoozed_until.is_some_and(|until| now < until)
    }

    /// Advance the state machine with a freshly classified tier.
    ///
    /// - Any move to `safe` clears the snooze.
    /// - An escalation (`safe -> warning|danger`, `warning -> danger`) outside
    ///   the snooze window produces a notification and starts a new window.
    /// - Inside the window nothing fires, even if the tier worsens.
    ///
    /// `current_tier` is always updated, whether or not anything fires.
    pub fn apply(
        &mut self,
        tier: Tier,
        cfg: &AlertConfig,
        now: Timestamp,
    ) -> Option<NotificationRequest> {
        let previous = std::mem::replace(&mut self.current_tier, tier);

        if tier == Tier::Safe {
            self.snoozed_until = None;
            return None;
        }

        if tier <= previous || self.is_snoozed_at(now) {
            return None;
        }

        self.snoozed_until = Some(now + cfg.snooze_duration());
        Some(NotificationRequest::build(&self.device_id, tier, cfg, now))
    }
}
