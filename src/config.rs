//! Runtime settings.
//!
//! Settings are layered: serde defaults, then an optional TOML file, then
//! `PULSEWATCH_*` environment variables, then command-line overrides applied
//! by the binary.
//!
//! ```toml
//! stream_url = "ws://localhost:8000/ws"
//! history_url = "http://localhost:8000"
//! refresh_interval_secs = 30
//! warning_threshold = 0.9
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::{Thresholds, HISTORICAL_CAPACITY};

/// Environment variable prefix (`PULSEWATCH_STREAM_URL`, ...).
pub const ENV_PREFIX: &str = "PULSEWATCH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// WebSocket endpoint for the live stream.
    pub stream_url: String,
    /// Base URL of the historical REST service. `None` uses the synthetic source.
    pub history_url: Option<String>,
    /// Records requested per historical refresh.
    pub history_count: usize,
    pub liveness_interval_secs: u64,
    pub refresh_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Upper bound on the stream connect and handshake.
    pub connect_timeout_secs: u64,
    /// Risk indicator above which a sample is a warning.
    pub warning_threshold: f64,
    /// Warning probability for the synthetic source.
    pub synthetic_warning_probability: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stream_url: "ws://localhost:8000/ws".to_string(),
            history_url: None,
            history_count: HISTORICAL_CAPACITY,
            liveness_interval_secs: 30,
            refresh_interval_secs: 30,
            fetch_timeout_secs: 10,
            connect_timeout_secs: 10,
            warning_threshold: 0.9,
            synthetic_warning_probability: 0.1,
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()
    }

    /// Check ranges and clamp `history_count` to the historical capacity.
    pub fn validate(mut self) -> Result<Self> {
        if !self.warning_threshold.is_finite() {
            bail!("warning_threshold must be a finite number");
        }
        if !(0.0..=1.0).contains(&self.synthetic_warning_probability) {
            bail!("synthetic_warning_probability must be within [0, 1]");
        }
        if self.liveness_interval_secs == 0 || self.refresh_interval_secs == 0 {
            bail!("intervals must be at least one second");
        }
        if self.fetch_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            bail!("timeouts must be at least one second");
        }
        if self.history_count == 0 {
            bail!("history_count must be at least 1");
        }
        if self.history_count > HISTORICAL_CAPACITY {
            warn!(
                requested = self.history_count,
                capacity = HISTORICAL_CAPACITY,
                "history_count clamped to buffer capacity"
            );
            self.history_count = HISTORICAL_CAPACITY;
        }
        Ok(self)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.warning_threshold)
    }

    pub fn liveness_period(&self) -> Duration {
        Duration::from_secs(self.liveness_interval_secs)
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default().validate().unwrap();
        assert_eq!(settings.stream_url, "ws://localhost:8000/ws");
        assert_eq!(settings.history_count, 10);
        assert_eq!(settings.refresh_period(), Duration::from_secs(30));
        assert_eq!(settings.thresholds(), Thresholds::default());
        assert!(settings.history_url.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
stream_url = "ws://telemetry:9000/ws"
history_url = "http://telemetry:9000"
refresh_interval_secs = 5
warning_threshold = 0.75
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.stream_url, "ws://telemetry:9000/ws");
        assert_eq!(settings.history_url.as_deref(), Some("http://telemetry:9000"));
        assert_eq!(settings.refresh_interval_secs, 5);
        assert_eq!(settings.warning_threshold, 0.75);
        // Unset keys fall back to defaults.
        assert_eq!(settings.liveness_interval_secs, 30);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/pulsewatch.toml"))).is_err());
    }

    #[test]
    fn test_validation() {
        let settings = Settings {
            history_count: 50,
            ..Settings::default()
        };
        assert_eq!(settings.validate().unwrap().history_count, HISTORICAL_CAPACITY);

        let settings = Settings {
            refresh_interval_secs: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            connect_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            warning_threshold: f64::NAN,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            synthetic_warning_probability: 1.5,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
