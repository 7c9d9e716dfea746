//! Event bus and notification delivery for the LPG safety monitor.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`; the presentation layer's live feed.
//! - [`NotificationDispatcher`]: the seam the alert engine calls.
//! - [`ChannelDispatcher`]: fans a request out to audio, vibration,
//!   email and SMS.
//! - [`delivery`]: the email (SMTP) and SMS (HTTP gateway) transports.

pub mod bus;
pub mod delivery;
pub mod dispatcher;

pub use bus::{EventBus, MonitorEvent};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::sms::{SmsConfig, SmsDelivery};
pub use dispatcher::{
    ChannelDispatcher, ChannelOutcome, DispatchError, DispatchReport, NotificationDispatcher,
};
