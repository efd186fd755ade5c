//! In-memory fakes for the transport and historical source seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use crate::data::{Record, Status};
use crate::error::{ConnectionError, FetchError};
use crate::source::HistoricalDataSource;
use crate::stream::{Channel, Connector};

type Inbound = Result<String, ConnectionError>;

/// Connector whose channels are fed by the test.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
    fail_connect: Mutex<bool>,
    peers: Mutex<Vec<mpsc::UnboundedSender<Inbound>>>,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn set_fail_connect(&self, fail: bool) {
        *self.fail_connect.lock().unwrap() = fail;
    }

    /// Deliver a text message on the most recently opened channel.
    pub fn send(&self, text: &str) {
        self.push(Ok(text.to_string()));
    }

    /// Fail the most recently opened channel with a transport error.
    pub fn fail(&self, reason: &str) {
        self.push(Err(ConnectionError::Transport(reason.to_string())));
    }

    /// Close the most recently opened channel from the peer side.
    pub fn hang_up(&self) {
        self.peers.lock().unwrap().pop();
    }

    fn push(&self, inbound: Inbound) {
        let peers = self.peers.lock().unwrap();
        let peer = peers.last().expect("no channel opened");
        let _ = peer.send(inbound);
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Channel>, ConnectionError> {
        if *self.fail_connect.lock().unwrap() {
            return Err(ConnectionError::Connect(format!("{}: refused", url)));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.lock().unwrap().push(tx);
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedChannel {
            inbound: rx,
            closes: self.closes.clone(),
        }))
    }
}

struct ScriptedChannel {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn recv(&mut self) -> Option<Inbound> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Historical source that replays queued responses.
///
/// Once the queue is drained, it keeps returning the last response.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<Record>, FetchError>>>,
    last: Mutex<Option<Result<Vec<Record>, FetchError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: Result<Vec<Record>, FetchError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoricalDataSource for ScriptedSource {
    async fn fetch_historical(&self, _count: usize) -> Result<Vec<Record>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => {
                *self.last.lock().unwrap() = Some(response.clone());
                response
            }
            None => self.last.lock().unwrap().clone().unwrap_or(Ok(Vec::new())),
        }
    }

    fn description(&self) -> &str {
        "scripted"
    }
}

/// `n` normal records with values `1..=n`.
pub fn records(n: usize) -> Vec<Record> {
    (1..=n)
        .map(|i| Record::new(i as f64, Utc::now(), Status::Normal))
        .collect()
}
