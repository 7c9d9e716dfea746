//! The single live [`AlertConfig`], replaced whole on every commit.
//!
//! Readers take an `Arc` snapshot once per evaluation, so an evaluation sees
//! either the old or the new value, never a mix.

use std::sync::Arc;

use gasguard_core::alert_config::{AlertConfig, AlertConfigValidator};
use gasguard_core::error::CoreError;
use tokio::sync::watch;

pub struct ConfigStore {
    tx: watch::Sender<Arc<AlertConfig>>,
}

impl ConfigStore {
    /// Start from `initial`, which must already be valid.
    pub fn new(initial: AlertConfig) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    pub fn snapshot(&self) -> Arc<AlertConfig> {
        self.tx.borrow().clone()
    }

    /// Validate `draft` and, only if it is clean, make it the live config.
    ///
    /// On rejection the previous config stays in place.
    pub fn commit(&self, draft: AlertConfig) -> Result<Arc<AlertConfig>, CoreError> {
        let validated = Arc::new(AlertConfigValidator::validate(draft)?);
        self.tx.send_replace(Arc::clone(&validated));
        Ok(validated)
    }

    /// Restore the factory defaults.
    pub fn reset(&self) -> Arc<AlertConfig> {
        let defaults = Arc::new(AlertConfig::default());
        self.tx.send_replace(Arc::clone(&defaults));
        defaults
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AlertConfig>> {
        self.tx.subscribe()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
