//! # sockpool-testing
//!
//! Test infrastructure for sockpool development.
//!
//! Provides an in-memory implementation of the transport traits with the
//! observation points pool tests need: dial and close counters, injectable
//! dial failures, capture of every sent frame, and a scriptable inbox for
//! `recv`. The pool's behavioral test suite lives in this crate's `tests/`
//! directory.
//!
//! ## Example
//!
//! ```rust,ignore
//! let dialer = MockDialer::new();
//! let pool = Pool::new(PoolConfig::new(Arc::new(dialer.clone()), "mock:0")).await?;
//!
//! let mut conn = pool.acquire().await?;
//! conn.send("hi").await?;
//! assert_eq!(dialer.sent_frames(), vec![Frame::Text("hi".into())]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use sockpool_transport::{Connection, Dialer, TransportError};

/// One frame captured by a [`MockConnection`] on send.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A text message.
    Text(String),
    /// A JSON-encoded message.
    Json(serde_json::Value),
}

struct MockShared {
    dials: AtomicUsize,
    closed: AtomicUsize,
    /// Dials with ordinal >= this value fail. `usize::MAX` disables.
    fail_from: AtomicUsize,
    sent: Mutex<Vec<Frame>>,
    incoming: Mutex<VecDeque<Bytes>>,
}

/// In-memory [`Dialer`] whose connections record sends and replay a
/// scripted inbox.
///
/// Cloning is cheap and shares all counters, so a test can keep one clone
/// for assertions and hand another to the pool.
#[derive(Clone)]
pub struct MockDialer {
    shared: Arc<MockShared>,
}

impl MockDialer {
    /// Create a dialer that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MockShared {
                dials: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
                fail_from: AtomicUsize::new(usize::MAX),
                sent: Mutex::new(Vec::new()),
                incoming: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Make every dial with ordinal >= `index` fail (dials are numbered
    /// from zero, counting attempts made so far).
    pub fn fail_dials_from(&self, index: usize) {
        self.shared.fail_from.store(index, Ordering::SeqCst);
    }

    /// Let all further dials succeed again.
    pub fn allow_all_dials(&self) {
        self.shared.fail_from.store(usize::MAX, Ordering::SeqCst);
    }

    /// Number of dial attempts, successful or not.
    #[must_use]
    pub fn dial_count(&self) -> usize {
        self.shared.dials.load(Ordering::SeqCst)
    }

    /// Number of connections closed gracefully.
    #[must_use]
    pub fn closed_count(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Every frame sent over any connection, in send order.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<Frame> {
        self.shared.sent.lock().clone()
    }

    /// Queue one inbound payload; any connection's next `recv` drains it.
    pub fn queue_incoming(&self, payload: impl Into<Bytes>) {
        self.shared.incoming.lock().push_back(payload.into());
    }
}

impl Default for MockDialer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, target: &str) -> Result<Box<dyn Connection>, TransportError> {
        let ordinal = self.shared.dials.fetch_add(1, Ordering::SeqCst);
        if ordinal >= self.shared.fail_from.load(Ordering::SeqCst) {
            return Err(TransportError::Handshake(format!(
                "injected dial failure for {target}"
            )));
        }
        Ok(Box::new(MockConnection {
            shared: Arc::clone(&self.shared),
            closed: false,
        }))
    }
}

/// A connection produced by [`MockDialer`].
pub struct MockConnection {
    shared: Arc<MockShared>,
    closed: bool,
}

#[async_trait]
impl Connection for MockConnection {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }
        self.shared.sent.lock().push(Frame::Text(text.to_string()));
        Ok(())
    }

    async fn send_json(&mut self, value: &serde_json::Value) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }
        self.shared.sent.lock().push(Frame::Json(value.clone()));
        Ok(())
    }

    /// Pops the next scripted payload. An empty inbox reports connection
    /// loss rather than blocking, so paused-clock tests never hang.
    async fn recv(&mut self) -> Result<Bytes, TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }
        self.shared
            .incoming
            .lock()
            .pop_front()
            .ok_or(TransportError::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }
        self.closed = true;
        self.shared.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Install a `tracing` subscriber for test output, once per process.
///
/// Filtering follows `RUST_LOG`; output goes through the test writer so it
/// interleaves correctly with the libtest harness.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
