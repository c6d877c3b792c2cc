//! # sockpool
//!
//! Bounded, reusable pool of long-lived message-socket connections.
//!
//! Callers acquire a connection handle, use it to send and receive messages,
//! and release it back for reuse, never paying per-request connection
//! establishment cost and never oversubscribing the remote endpoint. A
//! background task periodically sweeps idle connections that have expired or
//! sat unused too long, and proactively refills the pool to its minimum.
//!
//! ## Features
//!
//! - Configurable min/max pool sizes with eager pre-warming
//! - LIFO reuse: the most recently released connection is handed out first
//! - Periodic health sweeps with lifetime and idle-time eviction
//! - Non-blocking acquisition: exhaustion surfaces an error, never a wait
//! - Transport-agnostic via the [`Dialer`]/[`Connection`] traits
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sockpool::{Pool, PoolConfig};
//! use sockpool_transport::TcpDialer;
//!
//! let config = PoolConfig::new(Arc::new(TcpDialer::new()), "127.0.0.1:6060")
//!     .min_conns(1)
//!     .max_conns(4)
//!     .max_conn_idle_time(Duration::from_secs(300))
//!     .health_check_period(Duration::from_secs(60));
//!
//! let pool = Pool::new(config).await?;
//!
//! let mut conn = pool.acquire().await?;
//! conn.send("hi").await?;
//! let reply = conn.recv().await?;
//! conn.release().await;
//!
//! pool.close().await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod pool;
pub mod socket;

mod health;

#[cfg(test)]
mod test_support;

// Configuration
pub use config::PoolConfig;

// Error types
pub use error::PoolError;

// Pool types
pub use pool::{Pool, PoolStatus};
pub use socket::PooledSocket;

// Re-export the transport surface for convenience
pub use sockpool_transport::{Connection, Dialer, TransportError};
