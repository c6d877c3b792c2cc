//! Background health checking for idle connections.
//!
//! One task per pool. Each tick sweeps the idle set: connections past their
//! lifetime or idle-time limit are closed, the rest are kept in order, and
//! the pool is refilled toward its minimum before the sweep completes. The
//! task observes its cancellation token at every sweep boundary.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::pool::PoolShared;
use crate::socket::IdleSocket;

pub(crate) fn spawn(shared: Arc<PoolShared>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(shared.config.health_check_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // An interval's first tick completes immediately; consume it so the
        // first sweep runs one full period after pool creation.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => sweep(&shared).await,
                _ = shared.shutdown.cancelled() => {
                    tracing::debug!("health check task stopping");
                    break;
                }
            }
        }
    })
}

/// One health-check pass over the idle set.
async fn sweep(shared: &PoolShared) {
    let now = Instant::now();

    let stale: Vec<IdleSocket> = {
        let mut state = shared.state.lock();
        let (stale, healthy): (Vec<IdleSocket>, Vec<IdleSocket>) =
            std::mem::take(&mut state.idle).into_iter().partition(|s| {
                s.is_stale(
                    shared.config.max_conn_lifetime,
                    shared.config.max_conn_idle_time,
                    now,
                )
            });
        state.idle = healthy;
        state.active -= stale.len() as u32;
        stale
    };

    if !stale.is_empty() {
        tracing::debug!(count = stale.len(), "closing stale idle connections");
    }
    for mut socket in stale {
        if let Err(e) = socket.conn.close().await {
            tracing::debug!(id = socket.id, error = %e, "transport close failed");
        }
    }

    shared.maintain().await;
}
