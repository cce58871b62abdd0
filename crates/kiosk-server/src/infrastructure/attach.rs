//! Turning configured screen entries into Screens.

use std::sync::Arc;

use kiosk_core::{Screen, ScreenError};
use tracing::{info, warn};

use crate::application::{DevtoolsConnector, LocalScreen};
use crate::domain::{ScreenAddress, ScreenEntry, ServerConfig};
use crate::infrastructure::remote_screen::{RemoteScreen, RemoteScreenConfig};

/// Attaches one entry.  Local entries cannot fail here since they connect lazily.
///
/// # Errors
///
/// [`ScreenError::InvalidUrlFormat`] for a remote address without an ID, or
/// [`ScreenError::Transport`] if its HTTP client cannot be built.
pub fn attach_entry(
    entry: &ScreenEntry,
    cfg: &ServerConfig,
    connector: &Arc<dyn DevtoolsConnector>,
) -> Result<Arc<dyn Screen>, ScreenError> {
    match entry.classify() {
        ScreenAddress::Local(addr) => {
            let screen = LocalScreen::attach(entry.name.clone(), addr, Arc::clone(connector))
                .with_operation_timeout(cfg.local.operation_timeout());
            Ok(Arc::new(screen))
        }
        ScreenAddress::Remote(url) => {
            let config = RemoteScreenConfig::from_settings(&cfg.remote, entry.password.clone());
            Ok(Arc::new(RemoteScreen::attach(&url, entry.name.clone(), config)?))
        }
    }
}

/// Attaches every configured Screen.  Entries that fail are logged and left
/// out, so one bad address does not keep the others from serving.
pub fn attach_all(
    cfg: &ServerConfig,
    connector: &Arc<dyn DevtoolsConnector>,
) -> Vec<Arc<dyn Screen>> {
    cfg.screens
        .iter()
        .filter_map(|entry| match attach_entry(entry, cfg, connector) {
            Ok(screen) => {
                info!(
                    address = %entry.address,
                    screen = %screen.id(),
                    name = %screen.name(),
                    "attached to screen"
                );
                Some(screen)
            }
            Err(err) => {
                warn!(address = %entry.address, error = %err, "attach failed");
                None
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
