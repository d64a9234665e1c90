//! Canonical decoding of vehicle positions.
//!
//! The backend reports a point in one of three shapes, at the top level of a
//! payload or nested under `location`:
//!
//! - `{"lat": .., "lng": ..}`
//! - `{"latitude": .., "longitude": ..}`
//! - `{"coordinates": [lng, lat]}`
//!
//! [`extract_position`] is the only place those shapes are interpreted.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::models::Position;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WirePosition {
    LatLng { lat: f64, lng: f64 },
    LatitudeLongitude { latitude: f64, longitude: f64 },
    Coordinates { coordinates: Vec<f64> },
}

impl WirePosition {
    fn normalize(self) -> Option<Position> {
        match self {
            Self::LatLng { lat, lng } => Position::from_parts(Some(lat), Some(lng)),
            Self::LatitudeLongitude { latitude, longitude } => {
                Position::from_parts(Some(latitude), Some(longitude))
            }
            Self::Coordinates { coordinates } => match coordinates.as_slice() {
                [lng, lat, ..] => Position::from_parts(Some(*lat), Some(*lng)),
                _ => None,
            },
        }
    }
}

/// Extracts a position from a payload. `None` means "no position", never an
/// error.
#[must_use]
pub fn extract_position(payload: &Value) -> Option<Position> {
    if let Some(location) = payload.get("location").filter(|loc| loc.is_object()) {
        if let Some(position) = decode(location) {
            return Some(position);
        }
    }
    decode(payload)
}

fn decode(value: &Value) -> Option<Position> {
    WirePosition::deserialize(value).ok()?.normalize()
}

/// Reads the optional `timestamp` of a last-position record.
#[must_use]
pub fn extract_timestamp(payload: &Value) -> Option<DateTime<Utc>> {
    let raw = payload.get("timestamp")?;
    if let Some(text) = raw.as_str() {
        return DateTime::parse_from_rfc3339(text).ok().map(|ts| ts.with_timezone(&Utc));
    }
    raw.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis)
}
