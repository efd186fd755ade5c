//! Synthetic historical source.
//!
//! Generates random samples one minute apart ending at the current instant.
//! Useful for demos and for running the shell without a backend.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;

use super::HistoricalDataSource;
use crate::data::{Record, Status};
use crate::error::FetchError;

/// Upper bound (exclusive) of generated values.
const VALUE_RANGE: u32 = 100;

/// A data source that fabricates historical records.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    warning_probability: f64,
    description: String,
}

impl SyntheticSource {
    /// Create a generator where each record is a warning with the given
    /// probability (clamped to `[0, 1]`).
    pub fn new(warning_probability: f64) -> Self {
        let warning_probability = if warning_probability.is_finite() {
            warning_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            warning_probability,
            description: "synthetic".to_string(),
        }
    }

    fn generate(&self, count: usize) -> Vec<Record> {
        let mut rng = rand::thread_rng();
        let now = Utc::now();

        (0..count)
            .map(|i| {
                let age = (count - 1 - i) as i64;
                let status = if rng.gen_bool(self.warning_probability) {
                    Status::Warning
                } else {
                    Status::Normal
                };
                Record::new(
                    rng.gen_range(0..VALUE_RANGE) as f64,
                    now - Duration::minutes(age),
                    status,
                )
            })
            .collect()
    }
}

#[async_trait]
impl HistoricalDataSource for SyntheticSource {
    async fn fetch_historical(&self, count: usize) -> Result<Vec<Record>, FetchError> {
        Ok(self.generate(count))
    }

    fn description(&self) -> &str {
        &self.description
    }
}
