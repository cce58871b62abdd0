//! Error taxonomy shared by every Screen implementation.
//!
//! Screen operations never retry internally: each call either succeeds once or
//! returns one of these errors to its caller.  A failure on one Screen never
//! affects another Screen in the same [`Kiosk`](crate::Kiosk).

use std::time::Duration;

use thiserror::Error;

/// Coarse classification of a [`ScreenError`].
///
/// Useful for callers that map failures onto a transport (for example an HTTP
/// status code) without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed configuration detected at construction time.
    Configuration,
    /// A local debugging endpoint or a remote peer could not be reached.
    Connection,
    /// The driver or the remote peer reported a failed operation.
    Operation,
    /// A remote peer answered with a body that could not be decoded.
    Decode,
    /// An unknown Screen ID was requested from a Kiosk.
    Lookup,
    /// An operation exceeded its deadline.
    Timeout,
}

/// Error type for every Screen and Kiosk operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScreenError {
    /// A remote Screen URL does not contain the screen path marker exactly once.
    #[error("invalid screen URL: {url}")]
    InvalidUrlFormat { url: String },

    /// The debugging endpoint at `addr` could not be reached or attached.
    #[error("cannot connect to {addr}: {reason}")]
    Connection { addr: String, reason: String },

    /// Navigating the active page to `url` failed.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Capturing a screenshot failed.
    #[error("capture failed: {0}")]
    Capture(String),

    /// Reading page metadata failed.
    #[error("info retrieval failed: {0}")]
    Info(String),

    /// A remote peer answered with a non-2xx status.
    #[error("remote request failed with status {status}")]
    RemoteRequestFailed { status: u16 },

    /// DNS, TLS, connect or read failure while talking to a remote peer.
    #[error("transport error: {0}")]
    Transport(String),

    /// A remote peer answered 2xx with a body that is not a valid status payload.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// No Screen is registered under `id`.
    #[error("no such screen: {id}")]
    NoSuchScreen { id: String },

    /// `operation` did not finish within `after`.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl ScreenError {
    /// Returns the coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScreenError::InvalidUrlFormat { .. } => ErrorKind::Configuration,
            ScreenError::Connection { .. } | ScreenError::Transport(_) => ErrorKind::Connection,
            ScreenError::Navigation { .. }
            | ScreenError::Capture(_)
            | ScreenError::Info(_)
            | ScreenError::RemoteRequestFailed { .. } => ErrorKind::Operation,
            ScreenError::MalformedResponse(_) => ErrorKind::Decode,
            ScreenError::NoSuchScreen { .. } => ErrorKind::Lookup,
            ScreenError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// `true` when the underlying session is gone and must be re-established.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, ScreenError::Connection { .. })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
