//! Connection pool implementation.
//!
//! The pool owns a LIFO set of idle connections, enforces min/max sizing,
//! and hands out [`PooledSocket`] handles. A background task (see
//! [`crate::health`]) sweeps the idle set on a fixed period.
//!
//! All mutations of the idle set and the active count happen under one
//! `parking_lot` mutex held only for the collection mutation itself; dial
//! operations run outside the lock against a reserved slot, so a slow
//! connect never serializes unrelated acquire/release traffic.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::health;
use crate::socket::{IdleSocket, PooledSocket};

/// A bounded pool of connections to one target endpoint.
///
/// Created by [`Pool::new`], which pre-warms the pool to its configured
/// minimum before returning. Handles are checked out with
/// [`acquire`](Pool::acquire) and returned with
/// [`PooledSocket::release`].
pub struct Pool {
    shared: Arc<PoolShared>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").finish_non_exhaustive()
    }
}

/// State shared between the pool, its handles, and the health task.
pub(crate) struct PoolShared {
    pub(crate) config: PoolConfig,
    pub(crate) state: Mutex<PoolState>,
    /// Counter of connections ever opened; also assigns connection ids.
    next_id: AtomicU64,
    closed: AtomicBool,
    pub(crate) shutdown: CancellationToken,
}

pub(crate) struct PoolState {
    /// Idle connections, most recently released at the tail.
    pub(crate) idle: Vec<IdleSocket>,
    /// Connections currently open (idle + acquired). Never exceeds
    /// `config.max_conns`.
    pub(crate) active: u32,
}

impl Pool {
    /// Create a pool and eagerly open `min_conns` connections.
    ///
    /// Fails with [`PoolError::Config`] on invalid parameters. If any of
    /// the initial dials fails, the connections opened so far are closed
    /// and the error is returned; no partial pool is ever handed out.
    /// The health-check task is started before this returns.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                idle: Vec::with_capacity(config.min_conns as usize),
                active: 0,
            }),
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            config,
        });

        for _ in 0..shared.config.min_conns {
            match shared.open_socket().await {
                Ok(socket) => {
                    let mut state = shared.state.lock();
                    state.idle.push(socket);
                    state.active += 1;
                }
                Err(e) => {
                    let opened: Vec<IdleSocket> = {
                        let mut state = shared.state.lock();
                        state.active = 0;
                        state.idle.drain(..).collect()
                    };
                    for mut socket in opened {
                        let _ = socket.conn.close().await;
                    }
                    return Err(e);
                }
            }
        }

        health::spawn(Arc::clone(&shared));

        tracing::info!(
            min = shared.config.min_conns,
            max = shared.config.max_conns,
            endpoint = %shared.config.target,
            "connection pool created"
        );

        Ok(Self { shared })
    }

    /// Get a connection from the pool.
    ///
    /// Pops the most recently released idle connection if one exists.
    /// Otherwise dials a new one, unless the pool is already at its
    /// ceiling, in which case this fails with [`PoolError::Exhausted`]
    /// immediately. Acquisition never blocks or queues.
    pub async fn acquire(&self) -> Result<PooledSocket, PoolError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(PoolError::PoolClosed);
        }

        tracing::trace!("acquiring connection from pool");

        let reserved = {
            let mut state = self.shared.state.lock();
            if let Some(socket) = state.idle.pop() {
                return Ok(PooledSocket::new(socket, Arc::downgrade(&self.shared)));
            }
            if state.active < self.shared.config.max_conns {
                state.active += 1;
                true
            } else {
                false
            }
        };

        if !reserved {
            return Err(PoolError::Exhausted {
                max: self.shared.config.max_conns,
            });
        }

        match self.shared.open_socket().await {
            Ok(socket) => Ok(PooledSocket::new(socket, Arc::downgrade(&self.shared))),
            Err(e) => {
                self.shared.decrement_active();
                Err(e)
            }
        }
    }

    /// Close the pool.
    ///
    /// Idempotent: concurrent and repeated calls run the shutdown logic at
    /// most once, and all of them return. Stops the health task and closes
    /// every idle connection. Handles currently acquired are not touched;
    /// releasing them afterwards closes them instead of re-queueing.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.shutdown.cancel();

        let idle: Vec<IdleSocket> = {
            let mut state = self.shared.state.lock();
            let drained: Vec<IdleSocket> = state.idle.drain(..).collect();
            state.active -= drained.len() as u32;
            drained
        };
        for mut socket in idle {
            if let Err(e) = socket.conn.close().await {
                tracing::debug!(id = socket.id, error = %e, "transport close failed");
            }
        }

        tracing::info!("connection pool closed");
    }

    /// Whether [`close`](Pool::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Snapshot of the pool's current sizing.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.shared.state.lock();
        PoolStatus {
            idle: state.idle.len() as u32,
            active: state.active,
            max: self.shared.config.max_conns,
            opened: self.shared.next_id.load(Ordering::Relaxed),
        }
    }

    /// The pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        // Stop the health task even if the pool was never closed explicitly;
        // idle connections then drop with the shared state.
        self.shared.shutdown.cancel();
    }
}

impl PoolShared {
    /// Dial one new connection. Callers account for the slot.
    async fn open_socket(&self) -> Result<IdleSocket, PoolError> {
        let conn = self
            .config
            .dialer
            .dial(&self.config.target)
            .await
            .map_err(|source| PoolError::Dial {
                target: self.config.target.clone(),
                source,
            })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Instant::now();
        tracing::debug!(id, "connection opened");

        Ok(IdleSocket {
            id,
            conn,
            created_at: now,
            last_used_at: now,
        })
    }

    pub(crate) fn is_pool_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn decrement_active(&self) {
        self.state.lock().active -= 1;
    }

    /// Return a connection to the idle set.
    ///
    /// If the pool is closed or the idle set is already at the ceiling the
    /// connection is closed instead. Either way the pool size is then
    /// maintained synchronously.
    pub(crate) async fn release(&self, socket: IdleSocket) {
        let rejected = {
            let mut state = self.state.lock();
            if self.is_pool_closed() || state.idle.len() as u32 >= self.config.max_conns {
                state.active -= 1;
                Some(socket)
            } else {
                state.idle.push(socket);
                None
            }
        };

        if let Some(mut socket) = rejected {
            tracing::debug!(id = socket.id, "closing returned connection");
            if let Err(e) = socket.conn.close().await {
                tracing::debug!(id = socket.id, error = %e, "transport close failed");
            }
        }

        self.maintain().await;
    }

    /// Restore the idle set to the configured bounds.
    ///
    /// Tops up toward `min_conns` while capacity remains, dialing outside
    /// the lock against a reserved slot; a failed dial stops the top-up
    /// without surfacing an error. Then trims idle connections above
    /// `max_conns` from the tail.
    pub(crate) async fn maintain(&self) {
        loop {
            {
                let mut state = self.state.lock();
                if self.is_pool_closed()
                    || state.idle.len() as u32 >= self.config.min_conns
                    || state.active >= self.config.max_conns
                {
                    break;
                }
                state.active += 1;
            }

            match self.open_socket().await {
                Ok(socket) => {
                    let rejected = {
                        let mut state = self.state.lock();
                        if self.is_pool_closed() {
                            state.active -= 1;
                            Some(socket)
                        } else {
                            state.idle.push(socket);
                            None
                        }
                    };
                    if let Some(mut socket) = rejected {
                        let _ = socket.conn.close().await;
                        break;
                    }
                }
                Err(e) => {
                    self.decrement_active();
                    tracing::warn!(error = %e, "pool refill dial failed");
                    break;
                }
            }
        }

        loop {
            let trimmed = {
                let mut state = self.state.lock();
                if state.idle.len() as u32 > self.config.max_conns {
                    state.active -= 1;
                    state.idle.pop()
                } else {
                    None
                }
            };
            match trimmed {
                Some(mut socket) => {
                    tracing::debug!(id = socket.id, "trimming excess idle connection");
                    let _ = socket.conn.close().await;
                }
                None => break,
            }
        }
    }
}

/// Snapshot of the pool's sizing, returned by [`Pool::status`].
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Idle connections available for reuse.
    pub idle: u32,
    /// Connections currently open (idle + acquired).
    pub active: u32,
    /// Configured connection ceiling.
    pub max: u32,
    /// Connections ever opened over the pool's lifetime.
    pub opened: u64,
}

impl PoolStatus {
    /// Acquired connections as a percentage of the ceiling.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        f64::from(self.active - self.idle) / f64::from(self.max) * 100.0
    }

    /// Whether an acquire would fail right now.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.idle == 0 && self.active >= self.max
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::test_support::{StubConn, StubDialer};

    fn config() -> PoolConfig {
        PoolConfig::new(Arc::new(StubDialer), "stub:0")
    }

    fn stub_socket(id: u64) -> IdleSocket {
        let now = Instant::now();
        IdleSocket {
            id,
            conn: Box::new(StubConn),
            created_at: now,
            last_used_at: now,
        }
    }

    #[tokio::test]
    async fn release_at_capacity_closes_instead_of_requeueing() {
        let pool = Pool::new(config().min_conns(1).max_conns(2)).await.unwrap();
        let handle = pool.acquire().await.unwrap();

        // Force the idle set to the ceiling while the handle is still out,
        // simulating the many-concurrent-returns race.
        {
            let mut state = pool.shared.state.lock();
            state.idle.push(stub_socket(100));
            state.idle.push(stub_socket(101));
            state.active += 2;
        }

        handle.release().await;

        let status = pool.status();
        assert_eq!(status.idle, 2);
        assert_eq!(status.active, 2);
    }

    #[tokio::test]
    async fn release_after_close_discards_the_connection() {
        let pool = Pool::new(config().min_conns(1).max_conns(2)).await.unwrap();
        let handle = pool.acquire().await.unwrap();

        pool.close().await;
        handle.release().await;

        let status = pool.status();
        assert_eq!(status.idle, 0);
        assert_eq!(status.active, 0);
    }

    #[tokio::test]
    async fn dropping_a_handle_frees_its_slot() {
        let pool = Pool::new(config().min_conns(1).max_conns(1)).await.unwrap();

        let handle = pool.acquire().await.unwrap();
        assert!(matches!(
            pool.acquire().await,
            Err(PoolError::Exhausted { .. })
        ));

        drop(handle);
        assert_eq!(pool.status().active, 0);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn status_reflects_sizing() {
        let pool = Pool::new(config().min_conns(2).max_conns(4)).await.unwrap();

        let status = pool.status();
        assert_eq!(status.idle, 2);
        assert_eq!(status.active, 2);
        assert_eq!(status.max, 4);
        assert_eq!(status.opened, 2);
        assert!((status.utilization() - 0.0).abs() < f64::EPSILON);
        assert!(!status.is_exhausted());

        let _a = pool.acquire().await.unwrap();
        let _b = pool.acquire().await.unwrap();
        let _c = pool.acquire().await.unwrap();
        let _d = pool.acquire().await.unwrap();

        let status = pool.status();
        assert_eq!(status.idle, 0);
        assert_eq!(status.active, 4);
        assert!((status.utilization() - 100.0).abs() < f64::EPSILON);
        assert!(status.is_exhausted());
    }

    #[tokio::test]
    async fn acquire_after_close_fails() {
        let pool = Pool::new(config()).await.unwrap();
        pool.close().await;
        assert!(matches!(pool.acquire().await, Err(PoolError::PoolClosed)));
        assert!(pool.is_closed());
    }
}
