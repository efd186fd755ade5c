//! Historical data source abstraction.
//!
//! The core never talks to the historical query service directly. It holds
//! an `Arc<dyn HistoricalDataSource>` and asks it for a batch of records on
//! every refresh.

mod http;
mod synthetic;

pub use http::HttpSource;
pub use synthetic::SyntheticSource;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::data::Record;
use crate::error::FetchError;

/// Capability for fetching a batch of historical records.
///
/// # Example
///
/// ```
/// use pulsewatch::{HistoricalDataSource, SyntheticSource};
///
/// # tokio_test::block_on(async {
/// let source = SyntheticSource::new(0.1);
/// let records = source.fetch_historical(10).await.unwrap();
/// assert_eq!(records.len(), 10);
/// # });
/// ```
#[async_trait]
pub trait HistoricalDataSource: Send + Sync + Debug {
    /// Fetch up to `count` records.
    ///
    /// Sources may return fewer; the core truncates anything longer.
    async fn fetch_historical(&self, count: usize) -> Result<Vec<Record>, FetchError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
