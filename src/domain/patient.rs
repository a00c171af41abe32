//! Patient admission events
//!
//! A queue payload is a JSON object with four required string keys:
//!
//! ```json
//! {"id": "p1", "name": "Jane Doe", "condition": "flu", "admittedAt": "2024-01-01T10:00:00Z"}
//! ```
//!
//! Decoding is all-or-nothing. The `admittedAt` value is only checked for
//! presence here; it is parsed into a timestamp right before the insert.

use super::errors::{DecodeError, PersistenceError};
use super::ids::PatientId;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use serde_json::{Map, Value};

/// Decoded representation of one waiting-room payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionEvent {
    /// Producer-assigned patient identifier
    pub id: PatientId,

    /// Display name
    pub name: String,

    /// Free-text presenting condition
    pub condition: String,

    /// Admission time as sent by the producer (ISO-8601)
    #[serde(rename = "admittedAt")]
    pub admitted_at: String,
}

impl AdmissionEvent {
    /// Decode a raw queue payload
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Malformed`] if the payload is not a JSON object
    /// - [`DecodeError::MissingField`] if any of the four keys is absent
    /// - [`DecodeError::InvalidField`] if a key is not a string or `id` is blank
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(DecodeError::Malformed(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let id = required_str(&object, "id")?;
        let name = required_str(&object, "name")?;
        let condition = required_str(&object, "condition")?;
        let admitted_at = required_str(&object, "admittedAt")?;

        let id = PatientId::new(id).map_err(|reason| DecodeError::InvalidField {
            field: "id",
            reason,
        })?;

        Ok(Self {
            id,
            name: name.to_string(),
            condition: condition.to_string(),
            admitted_at: admitted_at.to_string(),
        })
    }

    /// Parse `admittedAt` into a timestamp
    pub fn admitted_at_timestamp(&self) -> Result<NaiveDateTime, PersistenceError> {
        parse_admission_timestamp(&self.admitted_at)
    }
}

fn required_str<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, DecodeError> {
    match object.get(field) {
        None => Err(DecodeError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(DecodeError::InvalidField {
            field,
            reason: format!("expected a string, got {}", json_kind(other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Offset-bearing shapes RFC 3339 rejects; a trailing `Z` is rewritten to `+00:00` first
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
];

/// Parse an ISO-8601 admission timestamp
///
/// Offset-qualified values (including `Z`) are normalized to UTC. Values
/// without an offset are taken as-is, and a bare date means midnight.
/// The result is a zone-less timestamp matching the `admitted_at` column.
pub fn parse_admission_timestamp(value: &str) -> Result<NaiveDateTime, PersistenceError> {
    let trimmed = value.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(with_offset.naive_utc());
    }

    let zulu = trimmed
        .strip_suffix(['Z', 'z'])
        .map(|local| format!("{local}+00:00"));
    let offset_candidate = zulu.as_deref().unwrap_or(trimmed);
    for format in OFFSET_FORMATS {
        if let Ok(with_offset) = DateTime::parse_from_str(offset_candidate, format) {
            return Ok(with_offset.naive_utc());
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive);
        }
    }

    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(date) => Ok(date.and_time(NaiveTime::MIN)),
        Err(e) => Err(PersistenceError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}
