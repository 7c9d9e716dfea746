//! Notification fan-out across the enabled alert channels.
//!
//! The alert engine hands a [`NotificationRequest`] to a
//! [`NotificationDispatcher`]. [`ChannelDispatcher`] is the production
//! implementation: local channels (audio, vibration) are published on the
//! [`EventBus`] for the presentation layer, remote channels go out over
//! SMTP and the SMS gateway. One channel failing never stops the others.

use std::sync::Arc;

use async_trait::async_trait;
use gasguard_core::alert::NotificationRequest;
use gasguard_core::channels::Channel;
use gasguard_core::event_names::{EVENT_ALERT_AUDIO, EVENT_ALERT_VIBRATION};
use gasguard_core::tier::Tier;
use gasguard_core::types::DeviceId;
use serde::Serialize;

use crate::bus::{EventBus, MonitorEvent};
use crate::delivery::email::{EmailDelivery, EmailError};
use crate::delivery::sms::{SmsDelivery, SmsError};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{0} channel is not configured")]
    NotConfigured(Channel),

    #[error("{0} channel has no recipient")]
    MissingRecipient(Channel),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Sms(#[from] SmsError),
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Result of delivering on a single channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelOutcome {
    pub channel: Channel,
    /// `None` on success.
    pub error: Option<String>,
}

/// Per-channel results for one notification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub device_id: DeviceId,
    pub tier: Tier,
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchReport {
    pub fn new(device_id: impl Into<DeviceId>, tier: Tier) -> Self {
        Self {
            device_id: device_id.into(),
            tier,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, channel: Channel, result: Result<(), DispatchError>) {
        self.outcomes.push(ChannelOutcome {
            channel,
            error: result.err().map(|e| e.to_string()),
        });
    }

    /// `true` when every attempted channel succeeded.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.error.is_none())
    }

    pub fn failed_channels(&self) -> Vec<Channel> {
        self.outcomes
            .iter()
            .filter(|o| o.error.is_some())
            .map(|o| o.channel)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Delivers a notification on each of its channels.
///
/// Implementations never fail as a whole; per-channel failures are carried
/// in the returned [`DispatchReport`].
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, request: &NotificationRequest) -> DispatchReport;
}

// ---------------------------------------------------------------------------
// ChannelDispatcher
// ---------------------------------------------------------------------------

pub struct ChannelDispatcher {
    event_bus: Arc<EventBus>,
    email: Option<EmailDelivery>,
    sms: Option<SmsDelivery>,
}

impl ChannelDispatcher {
    /// A dispatcher with only the local channels wired up.
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus,
            email: None,
            sms: None,
        }
    }

    pub fn with_email(mut self, email: EmailDelivery) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_sms(mut self, sms: SmsDelivery) -> Self {
        self.sms = Some(sms);
        self
    }

    fn publish_local(&self, event_type: &str, request: &NotificationRequest) {
        self.event_bus.publish(
            MonitorEvent::new(event_type)
                .with_device(request.device_id.clone())
                .with_payload(serde_json::json!({
                    "tier": request.tier,
                    "message": request.message,
                    "is_evacuation_advisory": request.is_evacuation_advisory,
                    "alert_volume": request.alert_volume,
                })),
        );
    }

    async fn send_email(&self, request: &NotificationRequest) -> Result<(), DispatchError> {
        let delivery = self
            .email
            .as_ref()
            .ok_or(DispatchError::NotConfigured(Channel::Email))?;
        let to = request
            .email_address
            .as_deref()
            .ok_or(DispatchError::MissingRecipient(Channel::Email))?;
        delivery.deliver(to, request).await?;
        Ok(())
    }

    async fn send_sms(&self, request: &NotificationRequest) -> Result<(), DispatchError> {
        let delivery = self
            .sms
            .as_ref()
            .ok_or(DispatchError::NotConfigured(Channel::Sms))?;
        let to = request
            .phone_number
            .as_deref()
            .ok_or(DispatchError::MissingRecipient(Channel::Sms))?;
        delivery.deliver(to, request).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for ChannelDispatcher {
    async fn dispatch(&self, request: &NotificationRequest) -> DispatchReport {
        let mut report = DispatchReport::new(request.device_id.clone(), request.tier);

        for &channel in &request.channels {
            let result = match channel {
                Channel::Audio => {
                    self.publish_local(EVENT_ALERT_AUDIO, request);
                    Ok(())
                }
                Channel::Vibration => {
                    self.publish_local(EVENT_ALERT_VIBRATION, request);
                    Ok(())
                }
                Channel::Email => self.send_email(request).await,
                Channel::Sms => self.send_sms(request).await,
            };

            if let Err(e) = &result {
                tracing::warn!(
                    device_id = %request.device_id,
                    channel = %channel,
                    error = %e,
                    "Alert channel delivery failed"
                );
            }
            report.record(channel, result);
        }

        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
