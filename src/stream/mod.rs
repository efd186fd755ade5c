//! Push-channel connection lifecycle.
//!
//! A [`StreamConnection`] owns at most one live channel at a time. Reading
//! happens in a worker task that forwards events back to the owner; the
//! owner applies them through [`StreamConnection::next_event`], which is the
//! only place connection state changes besides `start` and `stop`.
//!
//! ```text
//!          start()              opened             error
//!   Idle ──────────▶ Connecting ──────▶ Open ───────────────▶ Errored
//!                         │               │  peer close / stop()
//!                         └───────────────┴──────────────────▶ Closed
//! ```

mod transport;
mod websocket;

pub use transport::{Channel, Connector};
pub use websocket::WsConnector;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::ConnectionError;

/// Lifecycle state of the stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
    Errored,
}

impl ConnectionState {
    /// Returns the display label for this state.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Open => "Open",
            ConnectionState::Closed => "Closed",
            ConnectionState::Errored => "Errored",
        }
    }

    /// Connecting or open.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

/// An event that changed the connection, as seen by the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Opened,
    /// A raw text message, not yet normalized.
    Message(String),
    Error(ConnectionError),
    /// The peer closed the channel.
    Closed,
}

/// What the worker reports, tagged with the epoch of the `start` it belongs to.
#[derive(Debug)]
enum WorkerEvent {
    Opened,
    Message(String),
    Failed(ConnectionError),
    PeerClosed,
}

struct Worker {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Owns the lifecycle of one push-channel connection.
pub struct StreamConnection {
    connector: Arc<dyn Connector>,
    state: ConnectionState,
    /// Bumped on every start and stop; events from older epochs are stale.
    epoch: u64,
    worker: Option<Worker>,
    events_tx: mpsc::UnboundedSender<(u64, WorkerEvent)>,
    events_rx: mpsc::UnboundedReceiver<(u64, WorkerEvent)>,
    last_error: Option<ConnectionError>,
}

impl StreamConnection {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            state: ConnectionState::Idle,
            epoch: 0,
            worker: None,
            events_tx,
            events_rx,
            last_error: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The most recent transport error, if the connection is errored.
    pub fn last_error(&self) -> Option<&ConnectionError> {
        self.last_error.as_ref()
    }

    /// Begin connecting to `url`.
    ///
    /// Returns `false` without doing anything if a connection is already
    /// connecting or open.
    pub fn start(&mut self, url: &str) -> bool {
        if self.state.is_active() {
            debug!(state = self.state.label(), "stream already active, start ignored");
            return false;
        }

        // A previous worker may still be finishing its close after an error.
        if let Some(old) = self.worker.take() {
            let _ = old.stop_tx.send(true);
        }

        self.epoch += 1;
        self.state = ConnectionState::Connecting;
        self.last_error = None;

        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(run_worker(
            self.connector.clone(),
            url.to_string(),
            self.epoch,
            self.events_tx.clone(),
            stop_rx,
        ));
        self.worker = Some(Worker { stop_tx, join });

        info!(url, epoch = self.epoch, "stream connecting");
        true
    }

    /// Close the connection and wait for the channel to be released.
    ///
    /// Returns `false` if the connection was already closed.
    pub async fn stop(&mut self) -> bool {
        if self.state == ConnectionState::Closed && self.worker.is_none() {
            return false;
        }

        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(true);
            if let Err(e) = worker.join.await {
                warn!("stream worker ended abnormally: {}", e);
            }
        }

        self.epoch += 1;
        self.state = ConnectionState::Closed;
        info!(epoch = self.epoch, "stream closed");
        true
    }

    /// Wait for the next event from the current connection.
    ///
    /// Events from earlier connections are discarded here. Cancel-safe.
    pub async fn next_event(&mut self) -> StreamEvent {
        loop {
            // The sender half lives in `self`, so the channel never closes.
            let Some((epoch, event)) = self.events_rx.recv().await else {
                return std::future::pending().await;
            };

            if epoch != self.epoch {
                trace!(epoch, current = self.epoch, "dropping stale stream event");
                continue;
            }

            match event {
                WorkerEvent::Opened => {
                    self.state = ConnectionState::Open;
                    info!(epoch, "stream open");
                    return StreamEvent::Opened;
                }
                WorkerEvent::Message(text) => {
                    if self.state == ConnectionState::Open {
                        return StreamEvent::Message(text);
                    }
                }
                WorkerEvent::Failed(error) => {
                    self.state = ConnectionState::Errored;
                    self.last_error = Some(error.clone());
                    warn!(epoch, "stream error: {}", error);
                    return StreamEvent::Error(error);
                }
                WorkerEvent::PeerClosed => {
                    self.state = ConnectionState::Closed;
                    info!(epoch, "stream closed by peer");
                    return StreamEvent::Closed;
                }
            }
        }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        // The worker closes its channel on its own once signalled.
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(true);
        }
    }
}

impl std::fmt::Debug for StreamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConnection")
            .field("state", &self.state)
            .field("epoch", &self.epoch)
            .finish()
    }
}

/// Connect, forward inbound messages, and close the channel exactly once.
async fn run_worker(
    connector: Arc<dyn Connector>,
    url: String,
    epoch: u64,
    events: mpsc::UnboundedSender<(u64, WorkerEvent)>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut channel = tokio::select! {
        biased;
        _ = stop_rx.changed() => return,
        result = connector.connect(&url) => match result {
            Ok(channel) => channel,
            Err(e) => {
                let _ = events.send((epoch, WorkerEvent::Failed(e)));
                return;
            }
        },
    };

    let _ = events.send((epoch, WorkerEvent::Opened));

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            inbound = channel.recv() => match inbound {
                Some(Ok(text)) => {
                    if events.send((epoch, WorkerEvent::Message(text))).is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    let _ = events.send((epoch, WorkerEvent::Failed(e)));
                    break;
                }
                None => {
                    let _ = events.send((epoch, WorkerEvent::PeerClosed));
                    break;
                }
            },
        }
    }

    channel.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConnector;
    use std::time::Duration;

    const URL: &str = "ws://test/ws";

    async fn next(conn: &mut StreamConnection) -> StreamEvent {
        tokio::time::timeout(Duration::from_secs(1), conn.next_event())
            .await
            .expect("timed out waiting for stream event")
    }

    #[tokio::test]
    async fn test_start_open_message_stop() {
        let connector = ScriptedConnector::new();
        let mut conn = StreamConnection::new(connector.clone());
        assert_eq!(conn.state(), ConnectionState::Idle);

        assert!(conn.start(URL));
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert_eq!(next(&mut conn).await, StreamEvent::Opened);
        assert_eq!(conn.state(), ConnectionState::Open);

        connector.send(r#"{"value":1,"status":0}"#);
        assert_eq!(
            next(&mut conn).await,
            StreamEvent::Message(r#"{"value":1,"status":0}"#.to_string())
        );

        assert!(conn.stop().await);
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(connector.opens(), 1);
        assert_eq!(connector.closes(), 1);
    }

    #[tokio::test]
    async fn test_start_is_idempotent_while_active() {
        let connector = ScriptedConnector::new();
        let mut conn = StreamConnection::new(connector.clone());

        assert!(conn.start(URL));
        assert!(!conn.start(URL));
        next(&mut conn).await;
        assert!(!conn.start(URL));

        conn.stop().await;
        assert_eq!(connector.opens(), 1);
        assert_eq!(connector.closes(), 1);
    }

    #[tokio::test]
    async fn test_stop_twice_is_noop() {
        let connector = ScriptedConnector::new();
        let mut conn = StreamConnection::new(connector.clone());
        conn.start(URL);
        next(&mut conn).await;

        assert!(conn.stop().await);
        assert!(!conn.stop().await);
        assert_eq!(connector.closes(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_errored_and_closes_channel() {
        let connector = ScriptedConnector::new();
        let mut conn = StreamConnection::new(connector.clone());
        conn.start(URL);
        next(&mut conn).await;

        connector.fail("reset by peer");
        let event = next(&mut conn).await;
        assert!(matches!(event, StreamEvent::Error(ConnectionError::Transport(_))));
        assert_eq!(conn.state(), ConnectionState::Errored);
        assert!(conn.last_error().is_some());

        // Not retried; stop still transitions to Closed.
        assert!(conn.stop().await);
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(connector.opens(), 1);
        assert_eq!(connector.closes(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_is_errored() {
        let connector = ScriptedConnector::new();
        connector.set_fail_connect(true);
        let mut conn = StreamConnection::new(connector.clone());
        conn.start(URL);

        let event = next(&mut conn).await;
        assert!(matches!(event, StreamEvent::Error(ConnectionError::Connect(_))));
        assert_eq!(conn.state(), ConnectionState::Errored);

        conn.stop().await;
        assert_eq!(connector.opens(), 0);
        assert_eq!(connector.closes(), 0);
    }

    #[tokio::test]
    async fn test_peer_close() {
        let connector = ScriptedConnector::new();
        let mut conn = StreamConnection::new(connector.clone());
        conn.start(URL);
        next(&mut conn).await;

        connector.hang_up();
        assert_eq!(next(&mut conn).await, StreamEvent::Closed);
        assert_eq!(conn.state(), ConnectionState::Closed);

        // The worker already released the channel; stop only reaps it.
        conn.stop().await;
        assert_eq!(connector.closes(), 1);
    }

    #[tokio::test]
    async fn test_events_from_stopped_connection_are_discarded() {
        let connector = ScriptedConnector::new();
        let mut conn = StreamConnection::new(connector.clone());
        conn.start(URL);
        next(&mut conn).await;

        connector.send("late");
        conn.stop().await;

        conn.start(URL);
        // The first event seen belongs to the new connection.
        assert_eq!(next(&mut conn).await, StreamEvent::Opened);
        connector.send("fresh");
        assert_eq!(
            next(&mut conn).await,
            StreamEvent::Message("fresh".to_string())
        );
        conn.stop().await;
        assert_eq!(connector.opens(), 2);
        assert_eq!(connector.closes(), 2);
    }
}
