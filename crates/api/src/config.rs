//! Listener settings for the GasGuard API.
//!
//! Polling and liveness timing belong to `MonitorSettings`; SMTP and SMS
//! gateway settings belong to the delivery channels. This covers only where
//! the API listens and who may call it.

/// Where the API binds and which dashboard origins it serves.
///
/// Defaults match a dashboard dev server on the same machine.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Dashboard origins allowed by CORS, from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Seconds before an unfinished request is answered with 408 (default: `30`).
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Read the listener settings, falling back to the defaults below.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
        }
    }
}
