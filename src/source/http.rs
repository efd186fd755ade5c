//! HTTP historical source.
//!
//! Queries `GET {base}/api/historical-data` and expects a JSON array of
//! history items (`{"value": .., "timestamp": "..", "status": ..}`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::HistoricalDataSource;
use crate::data::normalize::{normalize_history, RawHistoryItem};
use crate::data::{Record, Thresholds};
use crate::error::FetchError;

const HISTORICAL_PATH: &str = "/api/historical-data";

/// A historical source backed by the telemetry backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
    description: String,
    thresholds: Thresholds,
}

impl HttpSource {
    /// Create a source for the given base URL (e.g. `http://localhost:8000`).
    pub fn new(base_url: &str, thresholds: Thresholds, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, thresholds))
    }

    /// Create a source using an existing client.
    pub fn with_client(client: Client, base_url: &str, thresholds: Thresholds) -> Self {
        let url = historical_url(base_url);
        let description = format!("http: {}", url);
        Self {
            client,
            url,
            description,
            thresholds,
        }
    }

    /// Returns the full endpoint URL being queried.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn historical_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with(HISTORICAL_PATH) {
        base.to_string()
    } else {
        format!("{}{}", base, HISTORICAL_PATH)
    }
}

/// Decode a response body into records.
fn parse_items(body: &str, thresholds: &Thresholds) -> Result<Vec<Record>, FetchError> {
    let items: Vec<RawHistoryItem> =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(items
        .iter()
        .map(|item| normalize_history(item, thresholds))
        .collect())
}

#[async_trait]
impl HistoricalDataSource for HttpSource {
    async fn fetch_historical(&self, count: usize) -> Result<Vec<Record>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("count", count)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let mut records = parse_items(&body, &self.thresholds)?;
        debug!(received = records.len(), requested = count, "historical batch");
        records.truncate(count);
        Ok(records)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
