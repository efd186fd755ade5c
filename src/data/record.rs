//! The canonical telemetry record and its status classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thresholds for status classification.
///
/// A sample whose raw risk indicator is strictly above `warning` is
/// classified as [`Status::Warning`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Indicator value above which a sample is a warning.
    pub warning: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        // Top 10% of a [0, 1] indicator range.
        Self { warning: 0.9 }
    }
}

impl Thresholds {
    /// Create thresholds with the given warning level.
    pub fn new(warning: f64) -> Self {
        Self { warning }
    }

    /// Classify a raw risk indicator.
    pub fn classify(&self, indicator: f64) -> Status {
        if indicator > self.warning {
            Status::Warning
        } else {
            Status::Normal
        }
    }
}

/// Status of a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Normal,
    Warning,
}

impl Status {
    /// Returns a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Normal => "Normal",
            Status::Warning => "Warning",
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Status::Warning)
    }
}

/// One normalized telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub value: f64,
    /// Serialized as RFC 3339 (ISO-8601) UTC.
    pub timestamp: DateTime<Utc>,
    pub status: Status,
}

impl Record {
    pub fn new(value: f64, timestamp: DateTime<Utc>, status: Status) -> Self {
        Self {
            value,
            timestamp,
            status,
        }
    }
}
