//! Read-only view of the core state handed to the presentation layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::history::HistoryStore;
use super::record::Record;
use super::stats::AggregateStats;
use crate::app::Mode;
use crate::stream::ConnectionState;

/// An immutable, point-in-time copy of everything the presentation layer
/// may show.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Newest first.
    pub realtime_data: Vec<Record>,
    pub historical_data: Vec<Record>,
    pub mode: Mode,
    pub connection_state: ConnectionState,
    pub last_updated: Option<DateTime<Utc>>,
    pub stream_error: Option<String>,
    pub fetch_error: Option<String>,
    /// A historical fetch is in flight.
    pub historical_loading: bool,
    /// Stream messages dropped because they could not be parsed.
    pub malformed_messages: u64,
    pub stats: AggregateStats,
}

/// Everything a snapshot needs besides the buffers.
#[derive(Debug, Clone, Default)]
pub struct StatusFields {
    pub mode: Mode,
    pub connection_state: ConnectionState,
    pub last_updated: Option<DateTime<Utc>>,
    pub stream_error: Option<String>,
    pub fetch_error: Option<String>,
    pub historical_loading: bool,
    pub malformed_messages: u64,
}

impl Snapshot {
    /// Build a snapshot from the store, recomputing the aggregates.
    pub fn build(store: &HistoryStore, status: StatusFields) -> Self {
        let (realtime_data, historical_data) = store.snapshot();
        let stats = AggregateStats::compute(&realtime_data, &historical_data);

        Self {
            realtime_data,
            historical_data,
            mode: status.mode,
            connection_state: status.connection_state,
            last_updated: status.last_updated,
            stream_error: status.stream_error,
            fetch_error: status.fetch_error,
            historical_loading: status.historical_loading,
            malformed_messages: status.malformed_messages,
            stats,
        }
    }

    /// Pretty-printed JSON export of this snapshot.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
