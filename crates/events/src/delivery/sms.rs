//! SMS delivery through an HTTP gateway, with exponential-backoff retry.
//!
//! [`SmsDelivery`] POSTs `{"to": ..., "message": ...}` to the configured
//! gateway URL. Failed attempts are retried three times (1 s, 2 s, 4 s).

use std::time::Duration;

use gasguard_core::alert::NotificationRequest;

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// SMS bodies longer than this are truncated.
const MAX_SMS_CHARS: usize = 160;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("SMS gateway returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// SmsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub gateway_url: String,
    /// Sent as a bearer token when present.
    pub api_token: Option<String>,
}

impl SmsConfig {
    /// Load from `SMS_GATEWAY_URL` (required) and `SMS_GATEWAY_TOKEN`.
    ///
    /// Returns `None` if the gateway URL is not set.
    pub fn from_env() -> Option<Self> {
        let gateway_url = std::env::var("SMS_GATEWAY_URL").ok()?;
        Some(Self {
            gateway_url,
            api_token: std::env::var("SMS_GATEWAY_TOKEN").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// SmsDelivery
// ---------------------------------------------------------------------------

pub struct SmsDelivery {
    config: SmsConfig,
    client: reqwest::Client,
}

/// Short text for an alert SMS, capped at [`MAX_SMS_CHARS`] characters.
pub fn text_for(request: &NotificationRequest) -> String {
    let text = format!(
        "GasGuard {}: {} ({})",
        request.tier.as_str().to_uppercase(),
        request.message,
        request.device_id
    );
    text.chars().take(MAX_SMS_CHARS).collect()
}

impl SmsDelivery {
    pub fn new(config: SmsConfig) -> Result<Self, SmsError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { config, client })
    }

    /// Send the alert text for `request` to `phone_number`.
    ///
    /// Returns `Ok(())` on the first successful attempt.
    pub async fn deliver(
        &self,
        phone_number: &str,
        request: &NotificationRequest,
    ) -> Result<(), SmsError> {
        let payload = serde_json::json!({
            "to": phone_number,
            "message": text_for(request),
            "device_id": request.device_id,
            "tier": request.tier,
        });

        let mut last_err: Option<SmsError> = None;

        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.try_send(&payload).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        device_id = %request.device_id,
                        error = %e,
                        "SMS delivery attempt failed, retrying"
                    );
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        match self.try_send(&payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(
                    device_id = %request.device_id,
                    error = %e,
                    "SMS delivery failed after all retries"
                );
                Err(last_err.unwrap_or(e))
            }
        }
    }

    async fn try_send(&self, payload: &serde_json::Value) -> Result<(), SmsError> {
        let mut builder = self.client.post(&self.config.gateway_url).json(payload);
        if let Some(token) = &self.config.api_token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(SmsError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
