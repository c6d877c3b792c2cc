//! Minimal pool usage against a local message endpoint.
//!
//! Run a length-delimited echo server on 127.0.0.1:6060, then:
//!
//! ```bash
//! cargo run -p sockpool --example basic
//! ```

use std::sync::Arc;
use std::time::Duration;

use sockpool::{Pool, PoolConfig};
use sockpool_transport::TcpDialer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PoolConfig::new(Arc::new(TcpDialer::new()), "127.0.0.1:6060")
        .min_conns(1)
        .max_conns(4)
        .max_conn_idle_time(Duration::from_secs(300))
        .health_check_period(Duration::from_secs(60));

    let pool = Pool::new(config).await?;

    let mut conn = pool.acquire().await?;
    conn.send("hi").await?;
    let reply = conn.recv().await?;
    println!("received {} bytes", reply.len());
    conn.release().await;

    pool.close().await;
    Ok(())
}
