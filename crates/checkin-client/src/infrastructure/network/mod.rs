//! Network infrastructure for the check-in client.
//!
//! Owns the single outbound connection to the school's server and writes
//! newline-delimited JSON on it.
//!
//! Architecture:
//! - [`PersistentConnection`] owns at most one [`LineSink`] behind an async
//!   `Mutex`, so `connect`, `send`, `is_active` and `close` never interleave
//!   even though the reconnection driver and operator actions call them from
//!   different tasks.
//! - The actual socket is opened by a [`Connector`].  Production uses
//!   [`TcpConnector`]; tests use [`mock::MockConnector`].
//! - Connection state is published on a `watch` channel for observers.
//!
//! The connection never retries on its own.  Reconnecting is the job of the
//! driver in `application::maintain_connection`, one attempt per tick.
//!
//! # Limitations
//!
//! Only the connect is bounded (`connect_timeout`).  A write that blocks
//! because the server stopped reading has no timeout and holds the lock
//! until the OS gives up on the socket.

pub mod mock;

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use checkin_core::ConnectionConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
    io::{AsyncWriteExt, BufWriter},
    net::TcpStream,
    sync::{watch, Mutex},
    time,
};
use tracing::{debug, info, warn};

/// Default bound on a single connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The server refused the connection or could not be resolved.
    #[error("failed to connect to server at {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// The connect attempt did not finish within the configured timeout.
    #[error("timed out connecting to server at {addr} after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },
    /// `send` was called with no open connection.
    #[error("no active connection")]
    NotConnected,
    /// A write or flush failed; the connection has been torn down.
    #[error("transmission failed, connection dropped: {0}")]
    Transmission(#[source] io::Error),
}

/// Lifecycle of the server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// One open, line-oriented output stream.
#[async_trait]
pub trait LineSink: Send {
    /// Writes `line`, a single `\n`, and flushes.
    async fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Whether the underlying stream still looks usable.
    fn is_alive(&self) -> bool;

    /// Flushes and closes the stream.
    async fn shutdown(&mut self) -> io::Result<()>;
}

/// Opens [`LineSink`]s to a server address.
#[async_trait]
pub trait Connector: Send + Sync {
    type Sink: LineSink + 'static;

    async fn open(&self, config: &ConnectionConfig) -> io::Result<Self::Sink>;
}

// ── TCP transport ─────────────────────────────────────────────────────────────

/// Opens plain TCP connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Sink = TcpLineSink;

    async fn open(&self, config: &ConnectionConfig) -> io::Result<TcpLineSink> {
        let stream = TcpStream::connect((config.host(), config.port())).await?;
        stream.set_nodelay(true)?;
        Ok(TcpLineSink {
            writer: BufWriter::new(stream),
        })
    }
}

/// Buffered UTF-8 line writer over a TCP stream.
pub struct TcpLineSink {
    writer: BufWriter<TcpStream>,
}

#[async_trait]
impl LineSink for TcpLineSink {
    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Checks for a pending socket error, then does a non-blocking read.
    ///
    /// The server never writes to us, so a read returning 0 bytes means the
    /// peer closed its side.  Any stray bytes it did send are discarded.
    fn is_alive(&self) -> bool {
        let stream = self.writer.get_ref();
        if !matches!(stream.take_error(), Ok(None)) {
            return false;
        }
        let mut byte = [0u8; 1];
        match stream.try_read(&mut byte) {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => true,
            Err(_) => false,
        }
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

// ── Persistent connection ─────────────────────────────────────────────────────

/// The client's single connection to the server.
pub struct PersistentConnection<C: Connector> {
    connector: C,
    connect_timeout: Duration,
    sink: Mutex<Option<C::Sink>>,
    state: watch::Sender<ConnectionState>,
}

impl<C: Connector> PersistentConnection<C> {
    /// Creates a new (not yet connected) `PersistentConnection`.
    pub fn new(connector: C, connect_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            connect_timeout,
            sink: Mutex::new(None),
            state,
        }
    }

    /// Replaces any existing connection with a fresh one to `config`.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::ConnectFailed`] or [`ConnectionError::Timeout`];
    /// the state is left `Disconnected` in both cases.
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<(), ConnectionError> {
        let mut guard = self.sink.lock().await;
        Self::teardown(&mut guard).await;
        self.state.send_replace(ConnectionState::Connecting);

        let addr = config.to_string();
        let opened = match time::timeout(self.connect_timeout, self.connector.open(config)).await {
            Ok(Ok(sink)) => Ok(sink),
            Ok(Err(source)) => Err(ConnectionError::ConnectFailed { addr, source }),
            Err(_) => Err(ConnectionError::Timeout {
                addr,
                timeout: self.connect_timeout,
            }),
        };

        match opened {
            Ok(sink) => {
                *guard = Some(sink);
                self.state.send_replace(ConnectionState::Connected);
                info!("connected to server at {config}");
                Ok(())
            }
            Err(e) => {
                self.state.send_replace(ConnectionState::Disconnected);
                warn!("{e}");
                Err(e)
            }
        }
    }

    /// Writes one wire line.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::NotConnected`] if there is no connection.
    /// [`ConnectionError::Transmission`] if the write fails; the connection
    /// is closed before returning, so the caller must reconnect before the
    /// next send.
    pub async fn send(&self, line: &str) -> Result<(), ConnectionError> {
        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Err(ConnectionError::NotConnected);
        };

        if let Err(e) = sink.write_line(line).await {
            warn!("send failed, dropping connection: {e}");
            Self::teardown(&mut guard).await;
            self.state.send_replace(ConnectionState::Disconnected);
            return Err(ConnectionError::Transmission(e));
        }

        debug!(bytes = line.len() + 1, "wire line sent");
        Ok(())
    }

    /// `true` only while a connection exists and still looks alive.
    pub async fn is_active(&self) -> bool {
        let guard = self.sink.lock().await;
        guard.as_ref().is_some_and(|sink| sink.is_alive())
    }

    /// Closes the connection, ignoring shutdown errors.  Safe to call
    /// repeatedly.
    pub async fn close(&self) {
        let mut guard = self.sink.lock().await;
        Self::teardown(&mut guard).await;
        self.state.send_replace(ConnectionState::Disconnected);
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    async fn teardown(slot: &mut Option<C::Sink>) {
        if let Some(mut sink) = slot.take() {
            if let Err(e) = sink.shutdown().await {
                debug!("ignoring error while closing connection: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
