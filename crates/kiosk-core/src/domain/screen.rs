//! The Screen contract.
//!
//! Both the local (DevTools-driven) and the remote (REST-proxied) Screen
//! implement [`Screen`].  Holders of an `Arc<dyn Screen>` cannot tell which one
//! they have, and should not need to.

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use super::error::ScreenError;

/// MIME type of every [`Snapshot`] body.  Screenshots are always PNG.
pub const SNAPSHOT_CONTENT_TYPE: &str = "image/png";

/// What a Screen is currently displaying.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenStatus {
    /// Page title; omitted from JSON when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// URL of the page currently shown.
    pub url: String,
}

/// A point-in-time screenshot, delivered as a byte stream.
///
/// The stream is consumed lazily; dropping the `Snapshot` closes it and, for
/// remote Screens, releases the underlying HTTP response.
pub struct Snapshot {
    body: BoxStream<'static, Result<Bytes, ScreenError>>,
}

impl Snapshot {
    /// Wraps an in-memory image.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            body: stream::once(async move { Ok(data) }).boxed(),
        }
    }

    /// Wraps a chunked byte source, such as an HTTP response body.
    pub fn from_stream<S>(body: S) -> Self
    where
        S: futures_util::Stream<Item = Result<Bytes, ScreenError>> + Send + 'static,
    {
        Self { body: body.boxed() }
    }

    /// Returns the chunk stream for forwarding without buffering.
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes, ScreenError>> {
        self.body
    }

    /// Reads the whole image into memory.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the underlying stream.
    pub async fn into_bytes(self) -> Result<Bytes, ScreenError> {
        let mut body = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot").finish_non_exhaustive()
    }
}

/// A controllable display, local or remote.
///
/// Implementations must be safe to share between tasks; concurrent calls are
/// allowed and each implementation decides how to serialise them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Screen: Send + Sync {
    /// ID of the Screen, unique across instances and stable for a given
    /// configuration.
    fn id(&self) -> &str;

    /// Human-friendly name; falls back to [`Screen::id`] when none was set.
    fn name(&self) -> &str;

    /// Shows `target` on the Screen, returning once the page has loaded.
    async fn show(&self, target: &str) -> Result<(), ScreenError>;

    /// Captures a viewport screenshot of the current display.
    async fn snap(&self) -> Result<Snapshot, ScreenError>;

    /// Reports the current display.
    async fn stat(&self) -> Result<ScreenStatus, ScreenError>;
}

/// Resolves the display name of a Screen, falling back to its ID.
pub fn display_name<'a>(name: &'a str, id: &'a str) -> &'a str {
    if name.is_empty() {
        id
    } else {
        name
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
