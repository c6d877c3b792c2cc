//! In-crate stand-ins for the transport traits.
//!
//! Unit tests here only need a transport that succeeds; behavioral mocks
//! with failure injection and frame capture live in the sockpool-testing
//! crate.

use async_trait::async_trait;
use bytes::Bytes;
use sockpool_transport::{Connection, Dialer, TransportError};

pub(crate) struct StubConn;

#[async_trait]
impl Connection for StubConn {
    async fn send_text(&mut self, _text: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn recv(&mut self) -> Result<Bytes, TransportError> {
        Ok(Bytes::from_static(b"pong"))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub(crate) struct StubDialer;

#[async_trait]
impl Dialer for StubDialer {
    async fn dial(&self, _target: &str) -> Result<Box<dyn Connection>, TransportError> {
        Ok(Box::new(StubConn))
    }
}
