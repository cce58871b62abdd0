//! Screen identity derivation.
//!
//! Local Screens get a UUIDv5 computed from a fixed namespace and their
//! debugger address, so the same address always maps to the same ID, across
//! restarts and across hosts.  Nothing is persisted.
//!
//! Remote Screens keep the ID their owning instance already assigned: it is the
//! path segment that follows [`REMOTE_SCREEN_PATH_MARKER`] in the configured URL.
//!
//! # The namespace is part of the wire contract
//!
//! Changing [`LOCAL_SCREEN_NAMESPACE`] silently changes every local Screen ID,
//! which breaks every remote instance that proxies to one of them.

use uuid::Uuid;

use super::error::ScreenError;

/// Namespace under which all local Screen and Kiosk IDs are derived.
pub const LOCAL_SCREEN_NAMESPACE: Uuid = Uuid::from_u128(0xed77ce29_9f8f_4d4c_87c3_91078f49e9f9);

/// Path marker that identifies a remote Screen resource URL.
///
/// An address containing this marker is treated as remote; everything after
/// it is the remote Screen's ID.
pub const REMOTE_SCREEN_PATH_MARKER: &str = "/api/v1/screen/";

/// Derives the stable ID for a local Screen attached at `addr`.
///
/// Pure and infallible: the same input always yields the same ID.
pub fn derive_local_id(addr: &str) -> String {
    Uuid::new_v5(&LOCAL_SCREEN_NAMESPACE, addr.as_bytes()).to_string()
}

/// Derives the ID of a Kiosk from its name.
pub fn derive_kiosk_id(name: &str) -> String {
    let kiosk_space = Uuid::new_v5(&LOCAL_SCREEN_NAMESPACE, b"kiosk");
    Uuid::new_v5(&kiosk_space, name.as_bytes()).to_string()
}

/// Extracts a remote Screen's ID from its base REST URL.
///
/// # Errors
///
/// Returns [`ScreenError::InvalidUrlFormat`] when the marker is absent,
/// appears more than once, or is not followed by an ID.
pub fn extract_remote_id(url: &str) -> Result<String, ScreenError> {
    let mut parts = url.split(REMOTE_SCREEN_PATH_MARKER);
    let invalid = || ScreenError::InvalidUrlFormat {
        url: url.to_string(),
    };

    // `split` always yields the prefix, then one item per marker occurrence.
    let _prefix = parts.next();
    let id = parts.next().ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    let id = id.trim_end_matches('/');
    if id.is_empty() || id.contains('/') {
        return Err(invalid());
    }
    Ok(id.to_string())
}

/// Naive classification used by configuration: remote iff the marker appears.
pub fn is_remote_address(addr: &str) -> bool {
    addr.contains(REMOTE_SCREEN_PATH_MARKER)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
