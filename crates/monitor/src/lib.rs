//! Stateful monitoring engine for LPG sensors.
//!
//! [`Monitor`] owns the [`DeviceRegistry`], [`HistoricalAggregator`],
//! [`AlertEngine`] and [`ConfigStore`], and runs one cancellable poller per
//! device plus a liveness sweep against a [`ReadingSource`].

pub mod aggregator;
pub mod config_store;
pub mod engine;
mod ingest;
pub mod monitor;
pub mod registry;
pub mod settings;
pub mod source;

pub use aggregator::HistoricalAggregator;
pub use config_store::ConfigStore;
pub use engine::{AlertEngine, AlertOutcome};
pub use monitor::{CycleOutcome, DeviceView, Monitor};
pub use registry::{DeviceRegistry, Heartbeat, StatusChange};
pub use settings::MonitorSettings;
pub use source::{ReadingSource, SimulatedSource, SourceError};
