//! Error types for the synchronization core.
//!
//! None of these errors abort the core. Each is recorded into the snapshot
//! by the component that detects it and the system keeps running on
//! whatever data it already has.

use thiserror::Error;

/// Errors raised by the stream channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// The channel could not be opened.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The channel failed while reading.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors raised by a historical data source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse the response body.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Could not reach the historical service.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Source-specific failure.
    #[error("{0}")]
    Source(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

/// A stream message that could not be turned into a record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// The message body is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(String),

    /// The message is JSON but not an object.
    #[error("Expected a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("Missing field `{0}`")]
    MissingField(&'static str),

    /// A field is present but has the wrong shape.
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}
