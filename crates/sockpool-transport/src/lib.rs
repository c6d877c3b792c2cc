//! # sockpool-transport
//!
//! Transport abstraction for the sockpool connection pool.
//!
//! The pool core is deliberately ignorant of wire protocols. Everything it
//! needs from a transport is captured by two object-safe traits:
//!
//! - [`Dialer`] establishes one open bidirectional connection to a target.
//! - [`Connection`] is a live session supporting text and JSON-encoded writes,
//!   a blocking read, and a graceful close.
//!
//! A production-ready [`TcpDialer`] is included, framing messages with a
//! length-delimited codec over TCP. Other transports (WebSocket, TLS, Unix
//! sockets) plug in by implementing the same two traits.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sockpool_transport::{Dialer, TcpDialer};
//!
//! let dialer = TcpDialer::new();
//! let mut conn = dialer.dial("127.0.0.1:6060").await?;
//! conn.send_text("hi").await?;
//! let reply = conn.recv().await?;
//! conn.close().await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod tcp;

pub use error::TransportError;
pub use tcp::TcpDialer;

use async_trait::async_trait;
use bytes::Bytes;

/// A live bidirectional connection produced by a [`Dialer`].
///
/// Implementations frame and serialize messages however their protocol
/// requires; the pool treats payloads as opaque.
#[async_trait]
pub trait Connection: Send {
    /// Write one text message to the peer.
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Write one JSON-encoded message to the peer.
    ///
    /// The default implementation serializes the value and sends it as a
    /// text message, which matches how most message protocols carry JSON.
    async fn send_json(&mut self, value: &serde_json::Value) -> Result<(), TransportError> {
        let text = serde_json::to_string(value)?;
        self.send_text(&text).await
    }

    /// Await the next inbound message.
    ///
    /// Blocks until a message arrives, or fails with
    /// [`TransportError::ConnectionClosed`] when the peer is gone.
    async fn recv(&mut self) -> Result<Bytes, TransportError>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Establishes connections to a fixed class of targets.
///
/// Dialers are shared across the pool and its background tasks, so
/// implementations must be `Send + Sync`.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Open a new connection to `target`.
    async fn dial(&self, target: &str) -> Result<Box<dyn Connection>, TransportError>;
}
