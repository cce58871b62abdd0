//! Server configuration schema.
//!
//! The server reads one TOML file at startup:
//!
//! ```toml
//! listen = "0.0.0.0:9292"
//! default_url = "http://localhost:9292/"
//!
//! [remote]
//! timeout_ms = 2000
//!
//! [[screens]]
//! name = "lobby"
//! address = "127.0.0.1:9222"
//!
//! [[screens]]
//! name = "upstairs"
//! address = "https://pi.local:9292/api/v1/screen/abc123"
//! password = "opaque"
//! ```
//!
//! Every field except `screens` has a default, so a file listing only screens
//! is complete.  Screen identity is never stored here: local IDs are derived
//! from `address` and remote IDs are read out of it.

use std::path::PathBuf;
use std::time::Duration;

use kiosk_core::is_remote_address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for loading and validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// No `[[screens]]` entries.
    #[error("at least one screen must be configured")]
    NoScreens,

    /// A screen entry has an empty address.
    #[error("screen entry {index} has an empty address")]
    EmptyAddress { index: usize },

    /// `default_url` is empty.
    #[error("default_url must be set")]
    NoDefaultUrl,

    /// A deadline is zero, which would fail every operation at once.
    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Address the REST API binds to.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// URL shown on every Screen at startup.
    #[serde(default = "default_url")]
    pub default_url: String,
    /// Default `tracing` level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Name of the Kiosk grouping all screens.
    #[serde(default = "default_kiosk_name")]
    pub kiosk_name: String,
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub local: LocalSettings,
    #[serde(default)]
    pub screens: Vec<ScreenEntry>,
}

/// One configured Screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenEntry {
    /// Human-friendly name; the Screen ID is used when absent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Debugger address (local) or remote Screen base URL (remote).
    pub address: String,
    /// Opaque credential for remote Screens.  Carried, not yet sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// HTTP client settings shared by all remote Screens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteSettings {
    /// Overall deadline for one request, in milliseconds.
    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
    /// Dial and TLS handshake deadline, in milliseconds.
    #[serde(default = "default_remote_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Skip TLS certificate verification.  On by default because remote
    /// instances on a trusted LAN usually serve self-signed certificates.
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
}

/// Settings for locally attached Screens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalSettings {
    /// Deadline for one operation, including a lazy attach, in milliseconds.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

/// Classification of a configured address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenAddress {
    /// A browser debugging endpoint on this host (or reachable from it).
    Local(String),
    /// A Screen resource served by another instance.
    Remote(String),
}

impl ScreenAddress {
    /// Classifies `addr` by naive substring match on the screen path marker.
    pub fn classify(addr: &str) -> Self {
        if is_remote_address(addr) {
            ScreenAddress::Remote(addr.to_string())
        } else {
            ScreenAddress::Local(addr.to_string())
        }
    }
}

impl ScreenEntry {
    pub fn classify(&self) -> ScreenAddress {
        ScreenAddress::classify(&self.address)
    }
}

impl RemoteSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl LocalSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl ServerConfig {
    /// Checks the invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoScreens`], [`ConfigError::EmptyAddress`],
    /// [`ConfigError::NoDefaultUrl`] or [`ConfigError::ZeroTimeout`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.screens.is_empty() {
            return Err(ConfigError::NoScreens);
        }
        if let Some(index) = self.screens.iter().position(|s| s.address.trim().is_empty()) {
            return Err(ConfigError::EmptyAddress { index });
        }
        if self.default_url.trim().is_empty() {
            return Err(ConfigError::NoDefaultUrl);
        }
        let deadlines = [
            ("remote.timeout_ms", self.remote.timeout_ms),
            ("remote.connect_timeout_ms", self.remote.connect_timeout_ms),
            ("local.operation_timeout_ms", self.local.operation_timeout_ms),
        ];
        if let Some((field, _)) = deadlines.into_iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::ZeroTimeout { field });
        }
        Ok(())
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

/// Default REST listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9292";
/// Default local debugger address.
pub const DEFAULT_SCREEN_ADDR: &str = "127.0.0.1:9222";
/// Default URL shown on every Screen.
pub const DEFAULT_SCREEN_URL: &str = "http://localhost:9292/";

fn default_listen() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}
fn default_url() -> String {
    DEFAULT_SCREEN_URL.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_kiosk_name() -> String {
    "kiosk".to_string()
}
fn default_remote_timeout_ms() -> u64 {
    2000
}
fn default_true() -> bool {
    true
}
fn default_operation_timeout_ms() -> u64 {
    30_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            default_url: default_url(),
            log_level: default_log_level(),
            kiosk_name: default_kiosk_name(),
            remote: RemoteSettings::default(),
            local: LocalSettings::default(),
            screens: Vec::new(),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_remote_timeout_ms(),
            connect_timeout_ms: default_remote_timeout_ms(),
            accept_invalid_certs: default_true(),
        }
    }
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
