//! Core state, mode control and the command/snapshot API.
//!
//! [`App`] owns every piece of mutable state: the buffers, the stream
//! connection, the timers and the error fields. It runs as a single task
//! that handles one event at a time, so no state is shared or locked.
//! The presentation layer talks to it through an [`AppHandle`]: commands go
//! in over a channel and immutable [`Snapshot`]s come out over a watch
//! channel.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, trace, warn};

use crate::config::Settings;
use crate::data::normalize::{normalize_stream, Normalized};
use crate::data::{HistoryStore, Record, Snapshot, StatusFields, Thresholds};
use crate::error::FetchError;
use crate::scheduler::{PollScheduler, Tick};
use crate::source::HistoricalDataSource;
use crate::stream::{Connector, StreamConnection, StreamEvent};

/// Acquisition strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Live records arrive over the push channel.
    #[default]
    Streaming,
    /// No push channel; only the liveness tick and historical refresh run.
    Polling,
}

impl Mode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            Mode::Streaming => Mode::Polling,
            Mode::Polling => Mode::Streaming,
        }
    }

    /// Returns the data-source label for this mode.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Streaming => "WebSocket",
            Mode::Polling => "Polling",
        }
    }
}

/// Commands accepted by the core loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    ToggleMode,
    RefreshHistory,
    Shutdown,
}

type FetchResult = Result<Vec<Record>, FetchError>;

/// Main application state.
pub struct App {
    stream_url: String,
    history_count: usize,
    thresholds: Thresholds,

    mode: Mode,
    connection: StreamConnection,
    scheduler: PollScheduler,
    store: HistoryStore,

    source: Arc<dyn HistoricalDataSource>,
    fetches: JoinSet<FetchResult>,

    last_updated: Option<DateTime<Utc>>,
    stream_error: Option<String>,
    fetch_error: Option<String>,
    malformed_messages: u64,

    snapshot_tx: watch::Sender<Snapshot>,
}

impl App {
    /// Create a new App with the given historical source and stream connector.
    ///
    /// `settings` is validated first. Nothing runs until [`App::spawn`].
    pub fn new(
        settings: &Settings,
        source: Arc<dyn HistoricalDataSource>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let settings = settings.clone().validate()?;
        let (snapshot_tx, _) = watch::channel(Snapshot::default());
        Ok(Self {
            stream_url: settings.stream_url.clone(),
            history_count: settings.history_count,
            thresholds: settings.thresholds(),
            mode: Mode::Streaming,
            connection: StreamConnection::new(connector),
            scheduler: PollScheduler::new(settings.liveness_period(), settings.refresh_period()),
            store: HistoryStore::new(),
            source,
            fetches: JoinSet::new(),
            last_updated: None,
            stream_error: None,
            fetch_error: None,
            malformed_messages: 0,
            snapshot_tx,
        })
    }

    /// Start the core loop on the current tokio runtime.
    pub fn spawn(self) -> AppHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let snapshots = self.snapshot_tx.subscribe();
        let source = self.source_description().to_string();
        let join = tokio::spawn(self.run(command_rx));

        AppHandle {
            commands: command_tx,
            snapshots,
            source,
            join: Some(join),
        }
    }

    /// Returns a description of the historical source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// Build a snapshot of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::build(
            &self.store,
            StatusFields {
                mode: self.mode,
                connection_state: self.connection.state(),
                last_updated: self.last_updated,
                stream_error: self.stream_error.clone(),
                fetch_error: self.fetch_error.clone(),
                historical_loading: !self.fetches.is_empty(),
                malformed_messages: self.malformed_messages,
            },
        )
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        self.start();
        self.publish();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::ToggleMode) => self.toggle().await,
                    Some(Command::RefreshHistory) => self.refresh_history(),
                    Some(Command::Shutdown) | None => break,
                },
                event = self.connection.next_event() => self.apply_stream_event(event),
                tick = self.scheduler.next_tick() => self.apply_tick(tick),
                Some(joined) = self.fetches.join_next(), if !self.fetches.is_empty() => {
                    self.apply_fetch_result(joined);
                }
            }
            self.publish();
        }

        self.teardown().await;
        self.publish();
    }

    fn start(&mut self) {
        info!(
            mode = self.mode.label(),
            source = self.source.description(),
            "core starting"
        );
        if self.mode == Mode::Streaming {
            self.connection.start(&self.stream_url);
        } else {
            self.scheduler.resume_liveness();
        }
        // First refresh tick fires immediately.
        self.scheduler.start_refresh();
    }

    /// Cancel timers, abort in-flight fetches and close the stream.
    async fn teardown(&mut self) {
        self.scheduler.cancel_all();
        self.fetches.shutdown().await;
        self.connection.stop().await;
        info!("core stopped");
    }

    /// Switch between Streaming and Polling.
    ///
    /// Buffered records are kept across the switch.
    pub async fn toggle(&mut self) {
        self.mode = self.mode.toggled();
        match self.mode {
            Mode::Polling => {
                self.connection.stop().await;
                self.scheduler.resume_liveness();
            }
            Mode::Streaming => {
                self.scheduler.pause_liveness();
                self.connection.start(&self.stream_url);
            }
        }
        info!(mode = self.mode.label(), "mode toggled");
    }

    /// Kick off a historical fetch. Results are applied as they complete.
    pub fn refresh_history(&mut self) {
        let source = self.source.clone();
        let count = self.history_count;
        debug!(count, in_flight = self.fetches.len(), "historical refresh");
        self.fetches
            .spawn(async move { source.fetch_historical(count).await });
    }

    fn apply_tick(&mut self, tick: Tick) {
        match tick {
            Tick::Liveness => {
                if self.mode == Mode::Polling {
                    self.last_updated = Some(Utc::now());
                    trace!("liveness tick");
                }
            }
            Tick::Refresh => self.refresh_history(),
        }
    }

    fn apply_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Opened => {
                self.stream_error = None;
            }
            StreamEvent::Message(text) => {
                match normalize_stream(&text, &self.thresholds, Utc::now()) {
                    Ok(Normalized::Record(record)) => {
                        trace!(
                            value = record.value,
                            status = record.status.label(),
                            "record received"
                        );
                        self.store.push_realtime(record);
                    }
                    Ok(Normalized::Sentinel) => trace!("heartbeat"),
                    Err(e) => {
                        self.malformed_messages += 1;
                        warn!(
                            dropped = self.malformed_messages,
                            "dropping malformed stream message: {}", e
                        );
                    }
                }
            }
            StreamEvent::Error(e) => {
                self.stream_error = Some(format!("Stream connection failed: {}", e));
            }
            StreamEvent::Closed => {}
        }
    }

    fn apply_fetch_result(&mut self, joined: Result<FetchResult, JoinError>) {
        match joined {
            Ok(Ok(mut records)) => {
                records.truncate(self.history_count);
                debug!(count = records.len(), "historical buffer replaced");
                self.store.replace_historical(records);
                self.fetch_error = None;
                self.last_updated = Some(Utc::now());
            }
            Ok(Err(e)) => {
                warn!("historical fetch failed: {}", e);
                self.fetch_error = Some(format!("Failed to fetch historical data: {}", e));
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                error!("historical fetch task panicked: {}", e);
                self.fetch_error = Some("Failed to fetch historical data".to_string());
            }
        }
    }

    /// Publish a fresh snapshot if anything observable changed.
    fn publish(&self) {
        let next = self.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("mode", &self.mode)
            .field("connection", &self.connection)
            .field("source", &self.source.description())
            .finish()
    }
}

/// Handle for reading snapshots and issuing commands to a running [`App`].
///
/// Dropping the handle stops the core; call [`AppHandle::shutdown`] to wait
/// for teardown to complete.
#[derive(Debug)]
pub struct AppHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    source: String,
    join: Option<JoinHandle<()>>,
}

impl AppHandle {
    /// Switch between Streaming and Polling.
    pub fn toggle_mode(&self) {
        self.send(Command::ToggleMode);
    }

    /// Refresh the historical buffer now, independent of the timer.
    pub fn refresh_history(&self) {
        self.send(Command::RefreshHistory);
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Returns a description of the historical source.
    pub fn source_description(&self) -> &str {
        &self.source
    }

    /// Wait until a snapshot satisfies `predicate`, or `timeout` elapses.
    pub async fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> Option<Snapshot>
    where
        F: FnMut(&Snapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let found = match tokio::time::timeout(timeout, rx.wait_for(|s| predicate(s))).await {
            Ok(Ok(snapshot)) => Some(snapshot.clone()),
            _ => None,
        };
        found
    }

    /// Stop the core and wait for the stream to close and timers to stop.
    pub async fn shutdown(mut self) {
        self.send(Command::Shutdown);
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                error!("core task ended abnormally: {}", e);
            }
        }
    }

    /// Export the latest snapshot as pretty JSON.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let json = self.snapshot().to_json_pretty()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!(?command, "core already stopped, command ignored");
        }
    }
}

impl Drop for AppHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}
