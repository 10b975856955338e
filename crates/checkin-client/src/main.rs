//! Check-in station entry point.
//!
//! Reads one scanner result per line from stdin, shows the operator message
//! for each on stdout, and submits every successful scan to the server.
//! Logs go to stderr.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load settings (file, then CLI/env overrides)
//!  └─ AppState::from_settings()         -- shared state
//!  └─ toggle_connection()               -- sets the stay-connected flag
//!  └─ ConnectionDriver::run()           -- spawned, ticks every 3 s
//!  └─ scan loop over stdin lines
//!       └─ scan_payload() -> submit_visit()
//! ```
//!
//! Scans read before the first connect completes are refused with the usual
//! "connect first" message, exactly as when the server is down.
//!
//! Multi-line key/value payloads must be written on one line using `;` or
//! `|` as the entry separator.
//!
//! Ctrl+C is watched while a scan is being submitted too, so a write stuck
//! on an unresponsive server never keeps the station from shutting down.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::watch;
use tokio::time;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use checkin_client::application::{
    maintain_connection::{ConnectionDriver, DriverContext},
    submit_visit::SubmitVisitUseCase,
};
use checkin_client::infrastructure::{
    network::{Connector, PersistentConnection, TcpConnector},
    storage::config::{load_settings, save_settings, ClientSettings},
    ui_bridge::{get_status, scan_payload, submit_visit, toggle_connection, AppState},
};

/// Upper bound on each teardown step after the scan loop ends.
const TEARDOWN_GRACE: Duration = Duration::from_secs(2);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Student check-in station.
///
/// Every flag overrides the matching value from the settings file.
#[derive(Debug, Parser)]
#[command(
    name = "checkin-client",
    about = "Reads student QR scans from stdin and reports check-ins to the school server",
    version
)]
struct Cli {
    /// Path to the station's TOML settings file.
    #[arg(long, env = "CHECKIN_CONFIG")]
    config: Option<PathBuf>,

    /// Server host name or IP address.
    #[arg(long, env = "CHECKIN_SERVER_HOST")]
    host: Option<String>,

    /// Server TCP port.
    #[arg(long, env = "CHECKIN_SERVER_PORT")]
    port: Option<u16>,

    /// Gate device name sent with every check-in.
    #[arg(long, env = "CHECKIN_DEVICE")]
    device: Option<String>,

    /// Teacher or staff member registering entries.
    #[arg(long, env = "CHECKIN_OPERATOR")]
    operator: Option<String>,

    /// Expected entry time, `HH:MM`.
    #[arg(long, env = "CHECKIN_EXPECTED_TIME")]
    expected_time: Option<String>,

    /// Do not compute the punctuality verdict.
    #[arg(long)]
    no_punctuality: bool,

    /// Observation attached to every check-in of this session.
    #[arg(long, default_value = "")]
    observation: String,

    /// Start with the connection off.
    #[arg(long)]
    no_auto_connect: bool,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "CHECKIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Write the resolved settings back to `--config` and exit.
    #[arg(long, requires = "config")]
    save_config: bool,
}

impl Cli {
    /// Loads the settings file (if any) and applies the overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be read or
    /// parsed.
    fn resolve_settings(&self) -> anyhow::Result<ClientSettings> {
        let mut settings = match &self.config {
            Some(path) => load_settings(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => ClientSettings::default(),
        };

        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(device) = &self.device {
            settings.station.device = device.clone();
        }
        if let Some(operator) = &self.operator {
            settings.station.operator = operator.clone();
        }
        if let Some(expected) = &self.expected_time {
            settings.station.expected_entry_time = expected.clone();
        }
        if self.no_punctuality {
            settings.station.punctuality_enabled = false;
        }
        if self.no_auto_connect {
            settings.station.auto_connect = false;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
        Ok(settings)
    }

    /// With `--save-config`, writes `settings` to the `--config` path and
    /// returns that path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save_if_requested(&self, settings: &ClientSettings) -> anyhow::Result<Option<PathBuf>> {
        let Some(path) = self.config.as_ref().filter(|_| self.save_config) else {
            return Ok(None);
        };
        save_settings(path, settings)
            .with_context(|| format!("failed to save settings to {}", path.display()))?;
        Ok(Some(path.clone()))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.resolve_settings()?;
    if let Some(path) = cli.save_if_requested(&settings)? {
        println!("settings written to {}", path.display());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
        )
        .init();

    info!(
        "check-in station starting, server={}:{} device={:?}",
        settings.server.host, settings.server.port, settings.station.device
    );

    let state = AppState::from_settings(&settings);
    state.form.lock().await.observation = cli.observation.clone();

    let connection = Arc::new(PersistentConnection::new(
        TcpConnector,
        settings.connect_timeout(),
    ));
    let submit = SubmitVisitUseCase::new(Arc::clone(&connection));

    if settings.station.auto_connect {
        report(toggle_connection(Arc::clone(&state), &connection).await.error, &state).await;
    }

    // ── Reconnection driver ───────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let context: Arc<dyn DriverContext> = state.clone();
    let driver = ConnectionDriver::new(
        Arc::clone(&connection),
        context,
        settings.reconnect_interval(),
    );
    let driver_task = tokio::spawn(async move { driver.run(shutdown_rx).await });

    // ── Scan loop ─────────────────────────────────────────────────────────────
    let lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C signal: {e}");
        }
        info!("received Ctrl+C, shutting down");
    };
    match run_scan_loop(lines, &state, &submit, ctrl_c).await? {
        LoopExit::InputClosed => info!("stdin closed"),
        LoopExit::ShutdownRequested => {}
    }

    // ── Teardown ──────────────────────────────────────────────────────────────
    let _ = shutdown_tx.send(true);
    let driver_abort = driver_task.abort_handle();
    match time::timeout(TEARDOWN_GRACE, driver_task).await {
        Ok(Err(e)) if !e.is_cancelled() => warn!("connection driver task failed: {e}"),
        Ok(_) => {}
        Err(_) => {
            warn!("connection driver did not stop in time, aborting it");
            driver_abort.abort();
        }
    }
    if time::timeout(TEARDOWN_GRACE, connection.close()).await.is_err() {
        warn!("closing the server connection timed out");
    }

    info!("check-in station stopped");
    Ok(())
}

/// Why [`run_scan_loop`] returned.
#[derive(Debug, PartialEq, Eq)]
enum LoopExit {
    InputClosed,
    ShutdownRequested,
}

/// Feeds every input line to [`handle_scan`] until the input ends or
/// `shutdown` completes.
///
/// `shutdown` is raced against both the read and the submit, so a submit
/// blocked on the network is dropped, releasing the connection lock.
///
/// # Errors
///
/// Returns an error if reading the input fails.
async fn run_scan_loop<R, C, S>(
    mut lines: Lines<R>,
    state: &Arc<AppState>,
    submit: &SubmitVisitUseCase<C>,
    shutdown: S,
) -> anyhow::Result<LoopExit>
where
    R: AsyncBufRead + Unpin,
    C: Connector,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let raw = tokio::select! {
            line = lines.next_line() => match line.context("failed to read scan from stdin")? {
                Some(raw) => raw,
                None => return Ok(LoopExit::InputClosed),
            },
            () = &mut shutdown => return Ok(LoopExit::ShutdownRequested),
        };

        tokio::select! {
            () = handle_scan(state, submit, &raw) => {}
            () = &mut shutdown => return Ok(LoopExit::ShutdownRequested),
        }
    }
}

/// Runs one scan through parse and submit, printing the operator message
/// after each step.
async fn handle_scan<C: Connector>(
    state: &Arc<AppState>,
    submit: &SubmitVisitUseCase<C>,
    raw: &str,
) {
    let scanned = scan_payload(Arc::clone(state), raw).await;
    report(scanned.error, state).await;
    if !scanned.success {
        return;
    }

    let sent = submit_visit(Arc::clone(state), submit).await;
    report(sent.error, state).await;
}

/// Prints the command's error, or the status line it left on success.
async fn report(error: Option<String>, state: &Arc<AppState>) {
    match error {
        Some(message) => println!("{message}"),
        None => {
            if let Some(status) = get_status(Arc::clone(state)).await.data {
                println!("{}", status.message);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
