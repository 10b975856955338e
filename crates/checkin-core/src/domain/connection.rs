//! Server address settings entered by the operator.
//!
//! The host and port arrive as free text from the front end and may change
//! between reconnect attempts, so they are revalidated every time through
//! [`ConnectionConfig::parse`] rather than validated once at startup.

use std::fmt;

use thiserror::Error;

/// Why an operator-supplied server address was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("server host must not be blank")]
    BlankHost,
    /// The port text is not an integer in 1–65535.
    #[error("invalid server port {0:?}: expected an integer between 1 and 65535")]
    InvalidPort(String),
}

/// Validated server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    host: String,
    port: u16,
}

impl ConnectionConfig {
    /// Validates a host and a numeric port.
    ///
    /// # Errors
    ///
    /// [`ConfigError::BlankHost`] for a blank host, [`ConfigError::InvalidPort`]
    /// for port 0.
    pub fn new(host: &str, port: u16) -> Result<Self, ConfigError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ConfigError::BlankHost);
        }
        if port == 0 {
            return Err(ConfigError::InvalidPort(port.to_string()));
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Validates host and port as typed into a form.
    ///
    /// ```rust
    /// use checkin_core::ConnectionConfig;
    ///
    /// let cfg = ConnectionConfig::parse(" 192.168.1.10 ", "5050").unwrap();
    /// assert_eq!(cfg.to_string(), "192.168.1.10:5050");
    /// assert!(ConnectionConfig::parse("10.0.0.1", "70000").is_err());
    /// ```
    pub fn parse(host: &str, port: &str) -> Result<Self, ConfigError> {
        let port_text = port.trim();
        let port = port_text
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port_text.to_string()))?;
        Self::new(host, port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_host_and_port() {
        let cfg = ConnectionConfig::parse("  10.0.0.5 ", " 5050 ").unwrap();
        assert_eq!(cfg.host(), "10.0.0.5");
        assert_eq!(cfg.port(), 5050);
    }

    #[test]
    fn test_parse_rejects_blank_host() {
        assert_eq!(
            ConnectionConfig::parse("   ", "5050"),
            Err(ConfigError::BlankHost)
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range_ports() {
        for bad in ["0", "65536", "-1", "", "50x"] {
            assert!(
                matches!(
                    ConnectionConfig::parse("10.0.0.5", bad),
                    Err(ConfigError::InvalidPort(_))
                ),
                "port {bad:?} must be rejected"
            );
        }
    }

    #[test]
    fn test_parse_accepts_port_bounds() {
        assert_eq!(ConnectionConfig::parse("h", "1").unwrap().port(), 1);
        assert_eq!(ConnectionConfig::parse("h", "65535").unwrap().port(), 65535);
    }

    #[test]
    fn test_display_is_host_colon_port() {
        let cfg = ConnectionConfig::new("server.local", 5050).unwrap();
        assert_eq!(cfg.to_string(), "server.local:5050");
    }
}
