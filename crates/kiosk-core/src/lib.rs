//! # kiosk-core
//!
//! Shared library for turning browser instances into controllable displays
//! ("Screens") and grouping them into a Kiosk.
//!
//! This crate is used by the server binary and by anything that wants to drive
//! Screens programmatically.  It has zero dependencies on sockets, HTTP clients,
//! or the browser remote-debugging protocol; those live in `kiosk-server`.
//!
//! # Architecture overview
//!
//! A **Screen** is anything that can show a URL, report what it is showing, and
//! hand back a screenshot.  Two kinds exist:
//!
//! - a *local* Screen drives a browser on this host through its debugging port;
//! - a *remote* Screen forwards the same calls to another instance of this
//!   service over its REST API.
//!
//! Callers never need to know which kind they hold: both implement the
//! [`Screen`] trait.  A [`Kiosk`] indexes many Screens by ID.
//!
//! - **`domain::screen`** – the [`Screen`] contract, [`ScreenStatus`] and the
//!   streamed [`Snapshot`] image type.
//! - **`domain::identity`** – deterministic ID derivation for local Screens
//!   and ID extraction for remote ones.
//! - **`domain::kiosk`** – the read-only [`Kiosk`] registry.
//! - **`domain::error`** – the [`ScreenError`] taxonomy.

pub mod domain;

pub use domain::error::{ErrorKind, ScreenError};
pub use domain::identity::{
    derive_kiosk_id, derive_local_id, extract_remote_id, is_remote_address,
    LOCAL_SCREEN_NAMESPACE, REMOTE_SCREEN_PATH_MARKER,
};
pub use domain::kiosk::Kiosk;
pub use domain::screen::{display_name, Screen, ScreenStatus, Snapshot, SNAPSHOT_CONTENT_TYPE};
