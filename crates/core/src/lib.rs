//! Domain model and pure logic for the LPG safety monitor.
//!
//! Nothing in this crate performs I/O or holds locks; the stateful services
//! in `gasguard-monitor` and the delivery channels in `gasguard-events`
//! build on these types.

pub mod alert;
pub mod alert_config;
pub mod channels;
pub mod device;
pub mod error;
pub mod event_names;
pub mod history;
pub mod reading;
pub mod tier;
pub mod types;
