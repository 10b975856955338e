//! ConnectionDriver: keeps the server connection alive while the operator
//! wants it.
//!
//! One tick of the driver ([`ConnectionDriver::reconcile_once`]) compares
//! what the operator asked for (the stay-connected flag and the host/port
//! they typed) with the real state of the [`PersistentConnection`], takes at
//! most one step toward agreement, and reports what it did as a
//! [`ReconcileOutcome`].  [`ConnectionDriver::run`] repeats that on a fixed
//! interval until shutdown.
//!
//! # Why "reconcile" and not "reconnect"? (for beginners)
//!
//! A loop of `loop { connect(); sleep(); }` has to be told when to stop,
//! when the address changed, when the peer vanished.  A reconcile tick
//! instead looks at the current wish and the current reality every time, so
//! the operator can flip the flag, fix a typo in the IP, or pull the cable,
//! and the next tick simply does the right thing.  There is no backoff and
//! no retry cap: the tick period is the retry policy.
//!
//! The driver reads the operator's wishes through [`DriverContext`], which
//! the UI bridge implements on its application state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use checkin_core::{ConfigError, ConnectionConfig};
use tokio::{
    sync::watch,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::infrastructure::network::{
    ConnectionError, ConnectionState, Connector, PersistentConnection,
};

/// Default period between driver ticks.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(3);

/// What a single tick did.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The operator does not want a connection.
    Idle,
    /// Host or port failed validation; nothing was attempted.
    InvalidSettings(ConfigError),
    /// A new connection was established.
    Connected(ConnectionConfig),
    /// The connect attempt failed; the next tick tries again.
    RetryScheduled(ConnectionError),
    /// The connection was open but its peer is gone; it has been closed.
    ConnectionLost,
    /// Nothing to do.
    StillConnected,
}

/// The operator-facing side the driver reads from and reports to.
#[async_trait]
pub trait DriverContext: Send + Sync {
    /// Whether the operator has asked to stay connected.
    fn stay_connected(&self) -> bool;

    /// Host and port exactly as the operator typed them.
    async fn server_address(&self) -> (String, String);

    /// Called once per tick with the outcome.
    async fn apply_outcome(&self, outcome: &ReconcileOutcome);
}

/// Periodically reconciles the connection with the operator's wishes.
pub struct ConnectionDriver<C: Connector> {
    connection: Arc<PersistentConnection<C>>,
    context: Arc<dyn DriverContext>,
    interval: Duration,
}

impl<C: Connector> ConnectionDriver<C> {
    pub fn new(
        connection: Arc<PersistentConnection<C>>,
        context: Arc<dyn DriverContext>,
        interval: Duration,
    ) -> Self {
        Self {
            connection,
            context,
            interval,
        }
    }

    /// Performs one tick and reports its outcome to the context.
    pub async fn reconcile_once(&self) -> ReconcileOutcome {
        let outcome = self.step().await;
        self.context.apply_outcome(&outcome).await;
        outcome
    }

    async fn step(&self) -> ReconcileOutcome {
        if !self.context.stay_connected() {
            // A tick racing with the operator's "disconnect" may have
            // reopened the connection after it was closed.
            if self.connection.state() != ConnectionState::Disconnected {
                self.connection.close().await;
            }
            return ReconcileOutcome::Idle;
        }

        if self.connection.state() != ConnectionState::Connected {
            let (host, port) = self.context.server_address().await;
            let config = match ConnectionConfig::parse(&host, &port) {
                Ok(config) => config,
                Err(e) => {
                    debug!("not reconnecting, server settings are invalid: {e}");
                    return ReconcileOutcome::InvalidSettings(e);
                }
            };

            return match self.connection.connect(&config).await {
                Ok(()) => ReconcileOutcome::Connected(config),
                Err(e) => ReconcileOutcome::RetryScheduled(e),
            };
        }

        if !self.connection.is_active().await {
            info!("server connection lost, will reconnect");
            self.connection.close().await;
            return ReconcileOutcome::ConnectionLost;
        }

        ReconcileOutcome::StillConnected
    }

    /// Ticks every `interval` until `shutdown` becomes `true` or its sender
    /// is dropped.  The first tick runs immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.reconcile_once().await;
                    debug!(?outcome, "connection driver tick");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("connection driver stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
