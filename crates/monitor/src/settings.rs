use std::time::Duration;

/// Scheduling and liveness settings for the ingestion loop.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Period between polls of a single device (default: 2 s).
    pub poll_interval: Duration,
    /// Period of the liveness sweep (default: 30 s).
    pub sweep_interval: Duration,
    /// A device silent for longer than this is demoted to offline
    /// (default: 120 s).
    pub heartbeat_timeout: chrono::Duration,
    /// Register the three demo sensors on start (default: `true`).
    pub seed_demo_devices: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            sweep_interval: Duration::from_secs(30),
            heartbeat_timeout: chrono::Duration::seconds(120),
            seed_demo_devices: true,
        }
    }
}

impl MonitorSettings {
    /// Load settings from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `POLL_INTERVAL_MS`            | `2000`  |
    /// | `LIVENESS_SWEEP_INTERVAL_SECS`| `30`    |
    /// | `HEARTBEAT_TIMEOUT_SECS`      | `120`   |
    /// | `SEED_DEMO_DEVICES`           | `true`  |
    pub fn from_env() -> Self {
        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        let sweep_interval_secs: u64 = std::env::var("LIVENESS_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("LIVENESS_SWEEP_INTERVAL_SECS must be a valid u64");

        let heartbeat_timeout_secs: i64 = std::env::var("HEARTBEAT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("HEARTBEAT_TIMEOUT_SECS must be a valid i64");

        let seed_demo_devices = std::env::var("SEED_DEMO_DEVICES")
            .map(|v| !matches!(v.trim(), "0" | "false" | "no"))
            .unwrap_or(true);

        Self {
            poll_interval: Duration::from_millis(poll_interval_ms),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            heartbeat_timeout: chrono::Duration::seconds(heartbeat_timeout_secs),
            seed_demo_devices,
        }
    }
}
