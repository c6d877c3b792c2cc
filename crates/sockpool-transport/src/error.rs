//! Transport error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while dialing or using a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// IO error during connect/read/write operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed while encoding a structured message.
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Connect attempt did not complete within the configured timeout.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Protocol handshake with the peer failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Any other transport-specific failure.
    #[error("transport error: {0}")]
    Other(String),
}
