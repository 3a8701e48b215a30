pub mod config;
pub mod db;
pub mod decode;
pub mod forward;
pub mod generator;
pub mod listener;

use serde::{Deserialize, Serialize};

/// One decoded metric sample, as delivered through the notification channel.
///
/// A sample is only ever constructed from a payload that carried both fields;
/// there is no partially-populated state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Timestamp as it appeared in the payload (passed through verbatim).
    pub timestamp: String,

    /// Sample value, coerced to a float during decoding.
    pub value: f64,
}
