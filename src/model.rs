//! Alert and sensor reading value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A decoded, validated sensor measurement
///
/// Immutable once decoded. The wire `time` field is an ISO-8601 string;
/// it is parsed into a UTC timestamp at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Measurement timestamp (RFC 3339 on the wire)
    pub time: DateTime<Utc>,
    /// Location identifier (e.g. "greenhouse-1")
    pub location: String,
    /// Sensor identifier (e.g. "temp-01")
    pub sensor: String,
    /// Numeric measurement value
    pub value: f64,
}

/// A sensor reading annotated with acknowledgment state, held for display
///
/// Alerts are value objects: repeated identical readings produce distinct
/// alerts. The `id` is generated when the alert enters the store and is the
/// stable identity used for acknowledgment (array positions shift on every
/// re-sort, so they are not usable as identities).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Stable identity assigned at append/load time (not persisted)
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// The underlying measurement
    #[serde(flatten)]
    pub reading: SensorReading,
    /// True once the user has marked this alert as seen
    pub acknowledged: bool,
}

impl Alert {
    /// Wrap a freshly arrived reading as an unacknowledged alert
    pub fn new(reading: SensorReading) -> Self {
        Self {
            id: Uuid::new_v4(),
            reading,
            acknowledged: false,
        }
    }
}
