//! Notification channel identifiers.
//!
//! The string forms must match the channel names published on the event bus
//! and reported back in dispatch reports.

use serde::{Deserialize, Serialize};

/// Audible alarm played by the presentation layer.
pub const CHANNEL_AUDIO: &str = "audio";

/// Device/handset vibration triggered by the presentation layer.
pub const CHANNEL_VIBRATION: &str = "vibration";

/// Email notification delivered via SMTP.
pub const CHANNEL_EMAIL: &str = "email";

/// Text message delivered through the SMS gateway.
pub const CHANNEL_SMS: &str = "sms";

/// A notification channel an alert can be delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Audio,
    Vibration,
    Email,
    Sms,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Audio,
        Channel::Vibration,
        Channel::Email,
        Channel::Sms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Audio => CHANNEL_AUDIO,
            Channel::Vibration => CHANNEL_VIBRATION,
            Channel::Email => CHANNEL_EMAIL,
            Channel::Sms => CHANNEL_SMS,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_name_matches_constant() {
        for channel in Channel::ALL {
            let json = serde_json::to_value(channel).expect("channel serializes");
            assert_eq!(json, channel.as_str());
        }
    }
}
