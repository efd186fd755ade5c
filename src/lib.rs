//! # pulsewatch
//!
//! Data-acquisition core for a real-time telemetry dashboard.
//!
//! A live stream of numeric samples arrives over a WebSocket while a batch
//! of historical samples is refreshed periodically from a query service.
//! Each sample is classified as normal or warning against a threshold, the
//! most recent samples are kept in bounded buffers, and aggregate statistics
//! are derived on every change. The operator can switch between streaming
//! and polling at any time.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        App (core loop)                       │
//! │                                                              │
//! │  StreamConnection ──▶ normalize ──▶ HistoryStore ──▶ Snapshot│
//! │        ▲                                ▲              │     │
//! │        │                                │              ▼     │
//! │    Connector            HistoricalDataSource      watch chan │
//! │  (WsConnector)       (HttpSource / Synthetic)                │
//! │                                                              │
//! │  PollScheduler: liveness tick + historical refresh           │
//! └──────────────────────────────────────────────────────────────┘
//!               ▲                                 │
//!     toggle / refresh / shutdown          snapshots
//!               │                                 ▼
//!                         AppHandle
//! ```
//!
//! - **[`app`]**: the core loop, mode control and the [`AppHandle`] API
//! - **[`data`]**: records, normalization, buffers, snapshots and statistics
//! - **[`stream`]**: push-channel lifecycle and the WebSocket connector
//! - **[`source`]**: the [`HistoricalDataSource`] trait and implementations
//! - **[`scheduler`]**: liveness and refresh timers
//! - **[`config`]**: layered [`Settings`]
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use pulsewatch::{App, Settings, SyntheticSource, WsConnector};
//!
//! # tokio_test::block_on(async {
//! let settings = Settings::default();
//! let source = Arc::new(SyntheticSource::new(settings.synthetic_warning_probability));
//! let handle = App::new(&settings, source, Arc::new(WsConnector::new()))
//!     .expect("default settings are valid")
//!     .spawn();
//!
//! handle.toggle_mode();
//! let snapshot = handle.snapshot();
//! println!("{} records", snapshot.stats.total_count);
//!
//! handle.shutdown().await;
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod source;
pub mod stream;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use app::{App, AppHandle, Mode};
pub use config::Settings;
pub use data::{AggregateStats, HistoryStore, Record, Snapshot, Status, Thresholds};
pub use error::{ConnectionError, FetchError, PayloadError};
pub use scheduler::PollScheduler;
pub use source::{HistoricalDataSource, HttpSource, SyntheticSource};
pub use stream::{Channel, ConnectionState, Connector, StreamConnection, WsConnector};
