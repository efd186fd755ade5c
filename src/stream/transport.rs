//! Transport seam for the stream connection.
//!
//! A [`Connector`] opens [`Channel`]s. The production implementation is
//! [`WsConnector`](super::WsConnector); tests substitute in-memory channels.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::ConnectionError;

/// Opens message channels to a stream endpoint.
#[async_trait]
pub trait Connector: Send + Sync + Debug {
    async fn connect(&self, url: &str) -> Result<Box<dyn Channel>, ConnectionError>;
}

/// One open, full-duplex message channel.
#[async_trait]
pub trait Channel: Send {
    /// Receive the next text message.
    ///
    /// Returns `None` once the peer has closed the channel. Must be
    /// cancel-safe: it is raced against the stop signal.
    async fn recv(&mut self) -> Option<Result<String, ConnectionError>>;

    /// Close the channel. Called exactly once per opened channel.
    async fn close(&mut self);
}
