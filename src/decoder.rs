//! Reading decoder
//!
//! Validates and parses a raw topic payload into a typed [`SensorReading`].
//! Decode failure is a recoverable, per-message event: the caller logs the
//! error and drops the message.

use crate::model::SensorReading;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Raw wire shape before validation
///
/// Flat JSON object, no envelope: `{ time, location, sensor, value }`.
#[derive(Debug, Deserialize)]
struct WireReading {
    time: String,
    location: String,
    sensor: String,
    value: f64,
}

/// Decode failure carrying the offending payload and the underlying cause
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not a JSON object of the expected shape
    /// (missing field, non-numeric value, not JSON at all)
    #[error("malformed payload {payload:?}: {source}")]
    Malformed {
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    /// `time` field present but not a parseable ISO-8601 timestamp
    #[error("invalid timestamp {time:?} in payload {payload:?}: {source}")]
    Timestamp {
        payload: String,
        time: String,
        #[source]
        source: chrono::ParseError,
    },

    /// `location` or `sensor` present but empty
    #[error("empty {field:?} field in payload {payload:?}")]
    EmptyField {
        payload: String,
        field: &'static str,
    },
}

/// Decode and validate a raw message payload
///
/// Requirements: the payload must deserialize as a flat record; `time` must
/// parse as an RFC 3339 timestamp; `value` must be numeric; `location` and
/// `sensor` must be non-empty strings.
pub fn decode_reading(payload: &[u8]) -> Result<SensorReading, DecodeError> {
    let text = String::from_utf8_lossy(payload);

    let wire: WireReading =
        serde_json::from_str(&text).map_err(|source| DecodeError::Malformed {
            payload: text.to_string(),
            source,
        })?;

    let time: DateTime<Utc> = DateTime::parse_from_rfc3339(&wire.time)
        .map_err(|source| DecodeError::Timestamp {
            payload: text.to_string(),
            time: wire.time.clone(),
            source,
        })?
        .with_timezone(&Utc);

    if wire.location.is_empty() {
        return Err(DecodeError::EmptyField {
            payload: text.to_string(),
            field: "location",
        });
    }
    if wire.sensor.is_empty() {
        return Err(DecodeError::EmptyField {
            payload: text.to_string(),
            field: "sensor",
        });
    }

    Ok(SensorReading {
        time,
        location: wire.location,
        sensor: wire.sensor,
        value: wire.value,
    })
}
