//! Remote notification transports.
//!
//! - [`email`]: SMTP delivery via `lettre`.
//! - [`sms`]: HTTP SMS gateway delivery with exponential-backoff retry.

pub mod email;
pub mod sms;
