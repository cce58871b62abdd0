//! The Kiosk registry: a named, read-only index of Screens by ID.
//!
//! A `Kiosk` is built once from configuration and never mutated afterwards.
//! Hosts that need to hot-reload Screens build a new `Kiosk` and swap their
//! `Arc<Kiosk>`; this type does not offer removal or insertion.
//!
//! # Duplicate IDs
//!
//! When two Screens share an ID the later one wins.  That usually means two
//! configuration entries point at the same browser, so a warning is logged
//! naming the overwritten ID.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::warn;

use super::error::ScreenError;
use super::identity::derive_kiosk_id;
use super::screen::{Screen, ScreenStatus};

/// Read-only registry mapping Screen ID → Screen.
pub struct Kiosk {
    id: String,
    name: String,
    screens: HashMap<String, Arc<dyn Screen>>,
}

impl Kiosk {
    /// Builds a Kiosk, iterating `screens` once.
    pub fn new(
        name: impl Into<String>,
        screens: impl IntoIterator<Item = Arc<dyn Screen>>,
    ) -> Self {
        let name = name.into();
        let mut map: HashMap<String, Arc<dyn Screen>> = HashMap::new();
        for screen in screens {
            let id = screen.id().to_string();
            if map.insert(id.clone(), screen).is_some() {
                warn!(
                    screen = %id,
                    kiosk = %name,
                    "duplicate screen ID; later entry replaces earlier one"
                );
            }
        }
        Self {
            id: derive_kiosk_id(&name),
            name,
            screens: map,
        }
    }

    /// Stable ID of this Kiosk, derived from its name.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// IDs of every registered Screen, in no particular order.
    pub fn screens(&self) -> Vec<String> {
        self.screens.keys().cloned().collect()
    }

    /// Looks up a Screen by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ScreenError::NoSuchScreen`] when `id` is not registered.
    pub fn screen(&self, id: &str) -> Result<Arc<dyn Screen>, ScreenError> {
        self.screens
            .get(id)
            .cloned()
            .ok_or_else(|| ScreenError::NoSuchScreen { id: id.to_string() })
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Queries every Screen concurrently and reports each outcome separately.
    ///
    /// One unreachable Screen never hides the others: its entry carries the
    /// error while the rest carry their status.  Results are sorted by ID.
    pub async fn statuses(&self) -> Vec<(String, Result<ScreenStatus, ScreenError>)> {
        let mut ids = self.screens();
        ids.sort();

        let queries = ids.iter().map(|id| {
            let screen = Arc::clone(&self.screens[id]);
            async move { screen.stat().await }
        });
        let results = join_all(queries).await;

        ids.into_iter().zip(results).collect()
    }
}

impl std::fmt::Debug for Kiosk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kiosk")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("screens", &self.screens.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
