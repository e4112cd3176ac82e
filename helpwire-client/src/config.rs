//! Configuration for the helpwire client.

use std::path::Path;

use serde::{Deserialize, Serialize};

use helpwire_core::{ConnectionConfig, SessionConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connection settings.
    pub network: NetworkConfig,
    /// Session lifecycle settings.
    pub session: SessionSettings,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Connection target and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Server host or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Retry automatically after a lost connection.
    pub auto_reconnect: bool,
    /// Delay between reconnect attempts, in milliseconds.
    pub reconnect_interval_ms: u64,
    /// Seconds between keep-alive heartbeats.
    pub heartbeat_interval_secs: u64,
}

/// Session timeout and keep-alive policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Minutes of inactivity before the session expires.
    pub timeout_minutes: u64,
    /// Refresh the session automatically while connected.
    pub auto_refresh: bool,
    /// Seconds between automatic refreshes.
    pub refresh_interval_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            session: SessionSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7400,
            auto_reconnect: true,
            reconnect_interval_ms: helpwire_core::DEFAULT_RECONNECT_INTERVAL_MS,
            heartbeat_interval_secs: 30,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_minutes: helpwire_core::DEFAULT_TIMEOUT_MINUTES,
            auto_refresh: true,
            refresh_interval_secs: helpwire_core::DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// The core connection configuration.
    pub fn to_connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.network.host.clone(),
            port: self.network.port,
            auto_reconnect: self.network.auto_reconnect,
            reconnect_interval_ms: self.network.reconnect_interval_ms,
        }
    }

    /// The core session configuration.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            timeout_minutes: self.session.timeout_minutes,
            auto_refresh: self.session.auto_refresh,
            refresh_interval_secs: self.session.refresh_interval_secs,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
