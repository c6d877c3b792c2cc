//! Pool error types.

use thiserror::Error;

use sockpool_transport::TransportError;

/// Errors that can occur while creating or using the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Invalid construction parameters.
    #[error("invalid pool configuration: {0}")]
    Config(String),

    /// Transport-level failure to establish a connection.
    ///
    /// Surfaced from [`Pool::new`](crate::Pool::new) and
    /// [`Pool::acquire`](crate::Pool::acquire); the pool never retries a
    /// failed dial on the caller's behalf.
    #[error("failed to dial {target}: {source}")]
    Dial {
        /// The dial target that could not be reached.
        target: String,
        /// The underlying transport failure.
        source: TransportError,
    },

    /// No idle connection exists and the pool is at its ceiling.
    ///
    /// Acquisition never blocks or queues; callers decide their own retry
    /// or backoff policy.
    #[error("pool exhausted: all {max} connections in use")]
    Exhausted {
        /// The configured connection ceiling.
        max: u32,
    },

    /// The pool has been closed.
    #[error("pool is closed")]
    PoolClosed,

    /// Operation attempted on an already-closed connection handle.
    #[error("connection is closed")]
    ConnectionClosed,

    /// I/O failure during send/receive, surfaced verbatim from the transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
