//! Conversion of raw inbound payloads into [`Record`]s.
//!
//! Two payload shapes reach the core:
//!
//! ```text
//! stream message   {"value": 42, "status": 0.95}      -> Record (timestamp = now)
//!                  {"value": "Heartbeat"}             -> Sentinel
//! history item     {"value": 42.5, "timestamp": "...", "status": "warning"}
//!                                                     -> Record (timestamp kept)
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::record::{Record, Status, Thresholds};
use crate::error::PayloadError;

/// Reserved `value` carried by liveness-only heartbeat messages.
pub const HEARTBEAT: &str = "Heartbeat";

/// Result of normalizing a stream message.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Record(Record),
    /// Heartbeat; must never reach a buffer.
    Sentinel,
}

/// Normalize a raw stream message, stamping it with `now`.
pub fn normalize_stream(
    raw: &str,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Result<Normalized, PayloadError> {
    let parsed: Value =
        serde_json::from_str(raw.trim()).map_err(|e| PayloadError::Json(e.to_string()))?;
    normalize_stream_value(&parsed, thresholds, now)
}

/// Normalize an already-parsed stream message.
pub fn normalize_stream_value(
    parsed: &Value,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Result<Normalized, PayloadError> {
    let object = parsed.as_object().ok_or(PayloadError::NotAnObject)?;

    let value = match object.get("value") {
        None | Some(Value::Null) => return Err(PayloadError::MissingField("value")),
        Some(Value::String(s)) if s == HEARTBEAT => return Ok(Normalized::Sentinel),
        Some(v) => numeric_field("value", v)?,
    };

    let indicator = match object.get("status") {
        None | Some(Value::Null) => return Err(PayloadError::MissingField("status")),
        Some(v) => numeric_field("status", v)?,
    };

    Ok(Normalized::Record(Record::new(
        value,
        now,
        thresholds.classify(indicator),
    )))
}

/// Read a number that may arrive either as a JSON number or a numeric string.
fn numeric_field(field: &'static str, value: &Value) -> Result<f64, PayloadError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(PayloadError::InvalidField {
            field,
            reason: format!("expected a number, got {}", value),
        }),
    }
}

/// Status as delivered by a historical source.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawStatus {
    /// Already classified ("normal" / "warning").
    Label(Status),
    /// Raw risk indicator, classified through the thresholds.
    Indicator(f64),
}

/// One item of a historical fetch response.
///
/// Unknown fields (such as a row `id`) are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawHistoryItem {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<RawStatus>,
}

/// Normalize a history item. The source-provided timestamp is kept.
pub fn normalize_history(item: &RawHistoryItem, thresholds: &Thresholds) -> Record {
    let status = match item.status {
        Some(RawStatus::Label(status)) => status,
        Some(RawStatus::Indicator(indicator)) => thresholds.classify(indicator),
        None => Status::Normal,
    };
    Record::new(item.value, item.timestamp, status)
}
