//! Pooled connection handles.

use std::fmt;
use std::sync::Weak;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use sockpool_transport::{Connection, TransportError};
use tokio::time::Instant;

use crate::error::PoolError;
use crate::pool::PoolShared;

/// One open connection plus its timing metadata.
///
/// Owned by the pool's idle set while unused, and moved into a
/// [`PooledSocket`] while a caller holds it.
pub(crate) struct IdleSocket {
    pub(crate) id: u64,
    pub(crate) conn: Box<dyn Connection>,
    pub(crate) created_at: Instant,
    pub(crate) last_used_at: Instant,
}

impl IdleSocket {
    /// Whether the connection should be evicted by a health sweep.
    ///
    /// A `None` threshold disables that check. Both comparisons are strict:
    /// a connection exactly at a limit is still healthy.
    pub(crate) fn is_stale(
        &self,
        max_lifetime: Option<Duration>,
        max_idle_time: Option<Duration>,
        now: Instant,
    ) -> bool {
        if let Some(limit) = max_lifetime {
            if now.duration_since(self.created_at) > limit {
                return true;
            }
        }
        if let Some(limit) = max_idle_time {
            if now.duration_since(self.last_used_at) > limit {
                return true;
            }
        }
        false
    }
}

/// A connection acquired from a [`Pool`](crate::Pool).
///
/// The handle owns the connection exclusively: send, receive and close all
/// take `&mut self`, so no lock beyond the ownership rules is needed on the
/// write path, and operations on one handle never contend with the pool or
/// with other handles.
///
/// Hand the connection back with [`release`](PooledSocket::release) when
/// done. Dropping the handle instead discards the connection (the pool's
/// book-keeping stays correct, but the connection is not reused).
pub struct PooledSocket {
    id: u64,
    inner: Option<IdleSocket>,
    pool: Weak<PoolShared>,
}

impl PooledSocket {
    pub(crate) fn new(inner: IdleSocket, pool: Weak<PoolShared>) -> Self {
        Self {
            id: inner.id,
            inner: Some(inner),
            pool,
        }
    }

    /// Send one text message.
    ///
    /// Refreshes the connection's idle timer and forwards the payload to
    /// the transport. Fails with [`PoolError::ConnectionClosed`] if the
    /// handle has been closed.
    pub async fn send(&mut self, text: &str) -> Result<(), PoolError> {
        let socket = self.inner.as_mut().ok_or(PoolError::ConnectionClosed)?;
        socket.last_used_at = Instant::now();
        socket.conn.send_text(text).await?;
        Ok(())
    }

    /// Send one JSON-encoded message.
    ///
    /// Same discipline as [`send`](PooledSocket::send); the value is
    /// serialized before being handed to the transport.
    pub async fn send_json<T: Serialize>(&mut self, value: &T) -> Result<(), PoolError> {
        let socket = self.inner.as_mut().ok_or(PoolError::ConnectionClosed)?;
        let value = serde_json::to_value(value).map_err(TransportError::Json)?;
        socket.last_used_at = Instant::now();
        socket.conn.send_json(&value).await?;
        Ok(())
    }

    /// Await the next inbound message.
    ///
    /// Reads do not refresh the idle timer: idle detection targets
    /// connections nobody is sending on, not connections mid-read.
    pub async fn recv(&mut self) -> Result<Bytes, PoolError> {
        let socket = self.inner.as_mut().ok_or(PoolError::ConnectionClosed)?;
        let payload = socket.conn.recv().await?;
        Ok(payload)
    }

    /// Close the connection and remove it from the pool's accounting.
    ///
    /// Not idempotent: a second call fails with
    /// [`PoolError::ConnectionClosed`]. Use
    /// [`release`](PooledSocket::release) to return a healthy connection
    /// instead.
    pub async fn close(&mut self) -> Result<(), PoolError> {
        let mut socket = self.inner.take().ok_or(PoolError::ConnectionClosed)?;
        if let Some(shared) = self.pool.upgrade() {
            shared.decrement_active();
        }
        tracing::debug!(id = socket.id, "closing connection");
        socket.conn.close().await?;
        Ok(())
    }

    /// Return the connection to the pool it was acquired from.
    ///
    /// Consuming the handle makes double release unrepresentable. A handle
    /// that was already closed, or whose pool is gone, is quietly discarded.
    pub async fn release(mut self) {
        let Some(socket) = self.inner.take() else {
            return;
        };
        match self.pool.upgrade() {
            Some(shared) => shared.release(socket).await,
            None => {
                tracing::debug!(id = socket.id, "pool is gone; discarding connection");
            }
        }
    }

    /// Pool-assigned identifier of the underlying connection.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the handle has been closed or released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl Drop for PooledSocket {
    fn drop(&mut self) {
        if let Some(socket) = self.inner.take() {
            if let Some(shared) = self.pool.upgrade() {
                shared.decrement_active();
            }
            tracing::debug!(
                id = socket.id,
                "handle dropped without release; discarding connection"
            );
        }
    }
}

impl fmt::Debug for PooledSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledSocket")
            .field("id", &self.id)
            .field("closed", &self.inner.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::test_support::StubConn;

    fn stub_socket(id: u64) -> IdleSocket {
        let now = Instant::now();
        IdleSocket {
            id,
            conn: Box::new(StubConn),
            created_at: now,
            last_used_at: now,
        }
    }

    fn stub_handle() -> PooledSocket {
        PooledSocket::new(stub_socket(1), Weak::new())
    }

    #[tokio::test]
    async fn operations_fail_deterministically_after_close() {
        let mut handle = stub_handle();
        handle.close().await.unwrap();

        assert!(handle.is_closed());
        assert!(matches!(
            handle.send("hi").await,
            Err(PoolError::ConnectionClosed)
        ));
        assert!(matches!(
            handle.send_json(&42).await,
            Err(PoolError::ConnectionClosed)
        ));
        assert!(matches!(
            handle.recv().await,
            Err(PoolError::ConnectionClosed)
        ));
        // close is not idempotent: the second call is a caller error.
        assert!(matches!(
            handle.close().await,
            Err(PoolError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn release_after_close_is_a_no_op() {
        let mut handle = stub_handle();
        handle.close().await.unwrap();
        handle.release().await;
    }

    #[tokio::test(start_paused = true)]
    async fn send_refreshes_idle_timer_and_recv_does_not() {
        let mut handle = stub_handle();
        let stamped = handle.inner.as_ref().unwrap().last_used_at;

        tokio::time::advance(Duration::from_secs(5)).await;
        handle.recv().await.unwrap();
        assert_eq!(handle.inner.as_ref().unwrap().last_used_at, stamped);

        handle.send("ping").await.unwrap();
        assert!(handle.inner.as_ref().unwrap().last_used_at > stamped);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_checks_are_disabled_by_none() {
        let socket = stub_socket(1);
        tokio::time::advance(Duration::from_secs(100_000)).await;
        assert!(!socket.is_stale(None, None, Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn lifetime_and_idle_limits_are_strict() {
        let socket = stub_socket(1);
        tokio::time::advance(Duration::from_secs(5)).await;
        let now = Instant::now();

        // Exactly at the limit is still healthy.
        assert!(!socket.is_stale(Some(Duration::from_secs(5)), None, now));
        assert!(!socket.is_stale(None, Some(Duration::from_secs(5)), now));

        // Past the limit is stale.
        assert!(socket.is_stale(Some(Duration::from_secs(4)), None, now));
        assert!(socket.is_stale(None, Some(Duration::from_secs(4)), now));
    }
}
