//! Reading the server config file.

use std::path::Path;

use tracing::debug;

use crate::domain::{ConfigError, ServerConfig};

/// Parses and validates configuration text.
///
/// # Errors
///
/// [`ConfigError::Parse`] for malformed TOML, or the validation errors of
/// [`ServerConfig::validate`].
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let cfg: ServerConfig = toml::from_str(content)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Loads the config at `path`.  Unlike most settings files a missing file is
/// an error: a server without Screens has nothing to do.
///
/// # Errors
///
/// [`ConfigError::Io`] when the file cannot be read, otherwise as
/// [`parse_config`].
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = parse_config(&content)?;
    debug!(path = %path.display(), screens = cfg.screens.len(), "loaded config");
    Ok(cfg)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
