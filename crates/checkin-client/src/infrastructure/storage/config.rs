//! TOML settings for a check-in station.
//!
//! One file per gate device, passed with `--config`.  Every field has a
//! default, so an empty or missing file is a valid configuration:
//!
//! ```toml
//! [server]
//! host = "192.168.1.10"
//! port = 5050
//! connect_timeout_ms = 5000
//! reconnect_interval_secs = 3
//!
//! [station]
//! device = "Porteria 1"
//! operator = "Prof. Díaz"
//! punctuality_enabled = true
//! expected_entry_time = "07:00"
//! auto_connect = true
//!
//! [logging]
//! level = "info"
//! ```
//!
//! `host` and `port` are not validated here; the reconnection driver
//! revalidates them on every attempt so a bad value shows up as a status
//! message instead of a startup failure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Schema ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientSettings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub station: StationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where the check-ins go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on a single connect attempt.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Seconds between reconnection driver ticks.
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,
}

/// Metadata stamped on every check-in sent from this gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StationSettings {
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default = "default_true")]
    pub punctuality_enabled: bool,
    /// `HH:MM`, 24 h.
    #[serde(default = "default_expected_entry_time")]
    pub expected_entry_time: String,
    /// Start with the stay-connected flag set.
    #[serde(default = "default_true")]
    pub auto_connect: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "192.168.1.10".to_string()
}
fn default_port() -> u16 {
    5050
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_reconnect_interval_secs() -> u64 {
    3
}
fn default_true() -> bool {
    true
}
fn default_expected_entry_time() -> String {
    "07:00".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_interval_secs: default_reconnect_interval_secs(),
        }
    }
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            device: String::new(),
            operator: String::new(),
            punctuality_enabled: default_true(),
            expected_entry_time: default_expected_entry_time(),
            auto_connect: default_true(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ClientSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.server.connect_timeout_ms)
    }

    /// Driver tick period, never shorter than one second.
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.server.reconnect_interval_secs.max(1))
    }
}

// ── File access ───────────────────────────────────────────────────────────────

/// Loads settings from `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] for file-system errors other than "not
/// found", and [`SettingsError::Parse`] if the TOML is malformed.
pub fn load_settings(path: &Path) -> Result<ClientSettings, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientSettings::default()),
        Err(source) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `settings` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] for file-system failures or
/// [`SettingsError::Serialize`] if serialization fails.
pub fn save_settings(path: &Path, settings: &ClientSettings) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
