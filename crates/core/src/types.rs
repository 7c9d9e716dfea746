/// Devices are addressed by their stable `lpg-NNN` identifier.
pub type DeviceId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Gas concentration in parts per million.
pub type Ppm = u32;
