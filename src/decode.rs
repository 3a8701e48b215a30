//! Notification payload decoding.
//!
//! Payloads are UTF-8 text carrying a JSON object with at least `timestamp`
//! (string) and `value` (number or numeric string). Decoding is pure; what
//! happens on failure is the caller's policy, not the decoder's.

use std::fmt;

use serde_json::Value;

use crate::MetricSample;

/// Result type alias for payload decoding
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors that can occur while decoding a notification payload
#[derive(Debug)]
pub enum DecodeError {
    /// Payload is not valid JSON
    InvalidJson(String),

    /// Payload parsed, but the top level is not an object
    NotAnObject,

    /// A required key is absent
    MissingField(&'static str),

    /// `timestamp` is present but not a string
    InvalidTimestamp(String),

    /// `value` is present but cannot be coerced to a float
    InvalidValue(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidJson(msg) => write!(f, "payload is not valid JSON: {}", msg),
            DecodeError::NotAnObject => write!(f, "payload is not a JSON object"),
            DecodeError::MissingField(key) => write!(f, "payload is missing key '{}'", key),
            DecodeError::InvalidTimestamp(got) => {
                write!(f, "payload key 'timestamp' is not a string: {}", got)
            }
            DecodeError::InvalidValue(got) => {
                write!(f, "payload key 'value' is not coercible to a float: {}", got)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode one raw payload into a [`MetricSample`].
///
/// A sample either comes back fully populated or not at all.
pub fn decode(payload: &str) -> DecodeResult<MetricSample> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let timestamp = object
        .get("timestamp")
        .ok_or(DecodeError::MissingField("timestamp"))?;
    let timestamp = timestamp
        .as_str()
        .ok_or_else(|| DecodeError::InvalidTimestamp(timestamp.to_string()))?
        .to_string();

    let raw_value = object.get("value").ok_or(DecodeError::MissingField("value"))?;
    let value = coerce_value(raw_value)
        .ok_or_else(|| DecodeError::InvalidValue(raw_value.to_string()))?;

    Ok(MetricSample { timestamp, value })
}

/// Accept a JSON number or a numeric string.
fn coerce_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
