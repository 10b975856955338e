//! In-memory transport for testing code that owns a [`PersistentConnection`].
//!
//! # Why a mock transport?
//!
//! The reconnection driver and the submit command are mostly about what
//! happens when the network misbehaves: refused connects, slow connects,
//! writes that fail, peers that silently vanish.  Reproducing each of those
//! with real sockets is slow and flaky.  `MockConnector` lets a test flip a
//! switch instead, and records every line that would have gone on the wire.
//!
//! # Usage in tests
//!
//! ```ignore
//! let mock = MockConnector::new();
//! let conn = PersistentConnection::new(mock.clone(), DEFAULT_CONNECT_TIMEOUT);
//!
//! conn.connect(&config).await?;
//! conn.send("{...}").await?;
//! assert_eq!(mock.sent_lines().len(), 1);
//!
//! mock.drop_peer();           // the next is_active() returns false
//! mock.set_fail_writes(true); // the next send() fails with Transmission
//! mock.set_stall_writes(true); // the next send() never completes
//! ```
//!
//! Clones share one underlying state, so the test keeps a handle while the
//! connection owns another.
//!
//! [`PersistentConnection`]: super::PersistentConnection

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use checkin_core::ConnectionConfig;

use super::{Connector, LineSink};

#[derive(Default)]
struct MockNetwork {
    refuse_connections: AtomicBool,
    fail_writes: AtomicBool,
    stall_writes: AtomicBool,
    peer_closed: AtomicBool,
    connect_delay: Mutex<Option<Duration>>,
    connect_attempts: AtomicUsize,
    shutdowns: AtomicUsize,
    connected_to: Mutex<Vec<String>>,
    sent_lines: Mutex<Vec<String>>,
}

/// A [`Connector`] that never touches the network.
#[derive(Clone, Default)]
pub struct MockConnector {
    network: Arc<MockNetwork>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `true`, every `open` fails with `ConnectionRefused`.
    pub fn set_refuse_connections(&self, refuse: bool) {
        self.network.refuse_connections.store(refuse, Ordering::SeqCst);
    }

    /// When `true`, every `write_line` fails with `BrokenPipe`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.network.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// When `true`, every `write_line` waits forever, like a socket whose
    /// peer stopped reading.
    pub fn set_stall_writes(&self, stall: bool) {
        self.network.stall_writes.store(stall, Ordering::SeqCst);
    }

    /// Delays each `open` by `delay`, to exercise connect timeouts.
    pub fn set_connect_delay(&self, delay: Option<Duration>) {
        *lock(&self.network.connect_delay) = delay;
    }

    /// Simulates the server going away without any write failing.
    pub fn drop_peer(&self) {
        self.network.peer_closed.store(true, Ordering::SeqCst);
    }

    /// Number of `open` calls, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.network.connect_attempts.load(Ordering::SeqCst)
    }

    /// Number of sinks that have been shut down.
    pub fn shutdowns(&self) -> usize {
        self.network.shutdowns.load(Ordering::SeqCst)
    }

    /// `host:port` of every successful connect, oldest first.
    pub fn connected_to(&self) -> Vec<String> {
        lock(&self.network.connected_to).clone()
    }

    /// Every line written successfully, oldest first.
    pub fn sent_lines(&self) -> Vec<String> {
        lock(&self.network.sent_lines).clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Sink = MockSink;

    async fn open(&self, config: &ConnectionConfig) -> io::Result<MockSink> {
        self.network.connect_attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *lock(&self.network.connect_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.network.refuse_connections.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "mock: connection refused",
            ));
        }

        // A fresh socket starts with a live peer.
        self.network.peer_closed.store(false, Ordering::SeqCst);
        lock(&self.network.connected_to).push(config.to_string());
        Ok(MockSink {
            network: Arc::clone(&self.network),
        })
    }
}

/// The sink handed out by [`MockConnector`].
pub struct MockSink {
    network: Arc<MockNetwork>,
}

#[async_trait]
impl LineSink for MockSink {
    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.network.stall_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.network.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock: broken pipe"));
        }
        lock(&self.network.sent_lines).push(line.to_string());
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.network.peer_closed.load(Ordering::SeqCst)
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.network.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Locks a std mutex, recovering the data if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
