//! Domain layer for kiosk-server.
//!
//! Pure configuration types.  Reading the file from disk happens in
//! `infrastructure::storage`; turning entries into Screens happens in
//! `infrastructure::attach`.

pub mod config;

pub use config::{
    ConfigError, LocalSettings, RemoteSettings, ScreenAddress, ScreenEntry, ServerConfig,
};
