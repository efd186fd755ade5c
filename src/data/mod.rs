//! Record model, normalization, buffers and derived statistics.
//!
//! ## Data Flow
//!
//! ```text
//! raw payload (stream message / history item)
//!        │
//!        ▼
//! normalize::normalize_stream() / normalize_history()
//!        │
//!        ├──▶ Sentinel (heartbeat, dropped)
//!        │
//!        ▼
//! HistoryStore (real-time ring / historical batch)
//!        │
//!        ▼
//! Snapshot::build() ──▶ AggregateStats::compute()
//! ```

pub mod history;
pub mod normalize;
pub mod record;
pub mod snapshot;
pub mod stats;

pub use history::{HistoryStore, HISTORICAL_CAPACITY, REALTIME_CAPACITY};
pub use normalize::{Normalized, RawHistoryItem, RawStatus, HEARTBEAT};
pub use record::{Record, Status, Thresholds};
pub use snapshot::{Snapshot, StatusFields};
pub use stats::AggregateStats;
