//! Length-delimited TCP transport.
//!
//! Frames each message with a 4-byte length prefix so that message
//! boundaries survive TCP's stream semantics. This is the reference
//! transport for the pool; protocol-specific transports implement the same
//! traits.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::TransportError;
use crate::{Connection, Dialer};

/// Dials length-delimited TCP connections.
///
/// # Example
///
/// ```rust,ignore
/// let dialer = TcpDialer::new().connect_timeout(Duration::from_secs(5));
/// let conn = dialer.dial("127.0.0.1:6060").await?;
/// ```
#[derive(Debug, Clone)]
pub struct TcpDialer {
    connect_timeout: Duration,
}

impl TcpDialer {
    /// Create a dialer with the default connect timeout (10 seconds).
    #[must_use]
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, target: &str) -> Result<Box<dyn Connection>, TransportError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(target))
            .await
            .map_err(|_| TransportError::ConnectTimeout(self.connect_timeout))??;

        tracing::debug!(endpoint = target, "TCP connection established");

        Ok(Box::new(TcpConnection {
            framed: Framed::new(stream, LengthDelimitedCodec::new()),
        }))
    }
}

/// One framed TCP session.
struct TcpConnection {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.framed
            .send(Bytes::copy_from_slice(text.as_bytes()))
            .await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Bytes, TransportError> {
        match self.framed.next().await {
            Some(Ok(frame)) => Ok(frame.freeze()),
            Some(Err(e)) => Err(e.into()),
            None => Err(TransportError::ConnectionClosed),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.framed.close().await?;
        Ok(())
    }
}
