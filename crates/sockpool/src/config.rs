//! Pool configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sockpool_transport::Dialer;

use crate::error::PoolError;

/// Configuration for creating a [`Pool`](crate::Pool).
///
/// Immutable once the pool is constructed. The dialer and target are
/// required at construction; everything else has a sensible default and can
/// be adjusted with the fluent setters.
///
/// # Example
///
/// ```rust,ignore
/// let config = PoolConfig::new(Arc::new(TcpDialer::new()), "127.0.0.1:6060")
///     .min_conns(2)
///     .max_conns(8)
///     .max_conn_lifetime(Duration::from_secs(3600));
/// ```
#[derive(Clone)]
pub struct PoolConfig {
    /// Floor the pool is proactively refilled to.
    pub min_conns: u32,

    /// Hard ceiling on simultaneously open connections (idle + acquired).
    pub max_conns: u32,

    /// Connections older than this are closed on the next health sweep,
    /// regardless of use. `None` disables the check.
    pub max_conn_lifetime: Option<Duration>,

    /// Idle connections unused longer than this are closed on the next
    /// health sweep. `None` disables the check.
    pub max_conn_idle_time: Option<Duration>,

    /// Interval between health sweeps. Must be positive.
    pub health_check_period: Duration,

    /// Endpoint the pool dials, passed verbatim to the dialer.
    pub target: String,

    /// Transport collaborator used to open connections.
    pub dialer: Arc<dyn Dialer>,
}

impl PoolConfig {
    /// Create a configuration with default sizing (1..=10 connections,
    /// sweeps every 60 seconds, no lifetime or idle-time limits).
    pub fn new(dialer: Arc<dyn Dialer>, target: impl Into<String>) -> Self {
        Self {
            min_conns: 1,
            max_conns: 10,
            max_conn_lifetime: None,
            max_conn_idle_time: None,
            health_check_period: Duration::from_secs(60),
            target: target.into(),
            dialer,
        }
    }

    /// Set the minimum number of connections.
    #[must_use]
    pub fn min_conns(mut self, count: u32) -> Self {
        self.min_conns = count;
        self
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn max_conns(mut self, count: u32) -> Self {
        self.max_conns = count;
        self
    }

    /// Set the maximum connection lifetime.
    #[must_use]
    pub fn max_conn_lifetime(mut self, limit: Duration) -> Self {
        self.max_conn_lifetime = Some(limit);
        self
    }

    /// Set the maximum idle time before eviction.
    #[must_use]
    pub fn max_conn_idle_time(mut self, limit: Duration) -> Self {
        self.max_conn_idle_time = Some(limit);
        self
    }

    /// Set the interval between health sweeps.
    #[must_use]
    pub fn health_check_period(mut self, period: Duration) -> Self {
        self.health_check_period = period;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.target.is_empty() {
            return Err(PoolError::Config("dial target must be provided".into()));
        }
        if self.min_conns == 0 {
            return Err(PoolError::Config("min_conns must be at least 1".into()));
        }
        if self.min_conns > self.max_conns {
            return Err(PoolError::Config(format!(
                "min_conns ({}) must not exceed max_conns ({})",
                self.min_conns, self.max_conns
            )));
        }
        if self.health_check_period.is_zero() {
            return Err(PoolError::Config(
                "health_check_period must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("min_conns", &self.min_conns)
            .field("max_conns", &self.max_conns)
            .field("max_conn_lifetime", &self.max_conn_lifetime)
            .field("max_conn_idle_time", &self.max_conn_idle_time)
            .field("health_check_period", &self.health_check_period)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
