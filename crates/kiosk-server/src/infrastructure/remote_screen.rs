//! RemoteScreen: a Screen served by another instance's REST API.
//!
//! The base URL is the remote Screen's resource, e.g.
//! `https://pi.local:9292/api/v1/screen/<id>`.  Operations map to
//!
//! | operation | request                          |
//! |-----------|----------------------------------|
//! | show      | `GET <base>/show?target=<url>`   |
//! | snap      | `GET <base>/snap` (streamed)     |
//! | stat      | `GET <base>/stat`                |
//!
//! Any non-2xx reply is reported as [`ScreenError::RemoteRequestFailed`] with
//! the status code; the body is not interpreted.
//!
//! # TLS
//!
//! `accept_invalid_certs` defaults to **true**: remote instances on a kiosk
//! LAN typically present self-signed certificates.  That disables server
//! authentication, so anyone able to intercept traffic can impersonate a
//! remote Screen.  Set it to `false` wherever real certificates exist.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use kiosk_core::{display_name, extract_remote_id, Screen, ScreenError, ScreenStatus, Snapshot};
use serde::Deserialize;
use tracing::debug;

use crate::domain::RemoteSettings;

/// HTTP settings for one RemoteScreen.
#[derive(Debug, Clone)]
pub struct RemoteScreenConfig {
    /// Overall request deadline.
    pub timeout: Duration,
    /// Dial plus TLS handshake deadline.
    pub connect_timeout: Duration,
    /// Skip certificate verification (see the module docs).
    pub accept_invalid_certs: bool,
    /// Opaque credential.  Stored for a future auth scheme; never sent.
    pub password: Option<String>,
    /// Prebuilt client; when set the three HTTP fields above are ignored.
    pub client: Option<reqwest::Client>,
}

impl Default for RemoteScreenConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(2),
            accept_invalid_certs: true,
            password: None,
            client: None,
        }
    }
}

impl RemoteScreenConfig {
    /// Builds the per-screen config from the shared `[remote]` settings.
    pub fn from_settings(settings: &RemoteSettings, password: Option<String>) -> Self {
        Self {
            timeout: settings.timeout(),
            connect_timeout: settings.connect_timeout(),
            accept_invalid_certs: settings.accept_invalid_certs,
            password,
            client: None,
        }
    }
}

/// The subset of the remote screen detail this client reads.
#[derive(Debug, Deserialize)]
struct StatReply {
    display: ScreenStatus,
}

/// A Screen reached over HTTP.
#[derive(Debug)]
pub struct RemoteScreen {
    base: String,
    id: String,
    name: String,
    password: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl RemoteScreen {
    /// Parses the ID out of `url` and builds the HTTP client.  No request is made.
    ///
    /// # Errors
    ///
    /// [`ScreenError::InvalidUrlFormat`] when `url` has no usable ID, or
    /// [`ScreenError::Transport`] when the HTTP client cannot be built.
    pub fn attach(
        url: &str,
        name: impl Into<String>,
        config: RemoteScreenConfig,
    ) -> Result<Self, ScreenError> {
        let id = extract_remote_id(url)?;
        let client = match config.client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(config.timeout)
                .connect_timeout(config.connect_timeout)
                .danger_accept_invalid_certs(config.accept_invalid_certs)
                .build()
                .map_err(|e| ScreenError::Transport(e.to_string()))?,
        };
        Ok(Self {
            base: url.trim_end_matches('/').to_string(),
            id,
            name: name.into(),
            password: config.password,
            timeout: config.timeout,
            client,
        })
    }

    /// Base REST URL of the remote Screen.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Credential from the configuration, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    async fn get(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ScreenError> {
        let resp = request
            .send()
            .await
            .map_err(|e| self.transport(operation, e))?;
        let status = resp.status();
        debug!(screen = %self.id, operation, status = status.as_u16(), "remote reply");
        if !status.is_success() {
            return Err(ScreenError::RemoteRequestFailed {
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    /// Timeouts are transport failures too; the deadline is named in the text.
    fn transport(&self, operation: &'static str, err: reqwest::Error) -> ScreenError {
        if err.is_timeout() {
            return ScreenError::Transport(format!(
                "{operation} timed out after {:?}: {}",
                self.timeout,
                error_chain(&err)
            ));
        }
        ScreenError::Transport(error_chain(&err))
    }
}

/// Renders an error with its sources, since reqwest's top-level message
/// rarely names the root cause.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[async_trait]
impl Screen for RemoteScreen {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        display_name(&self.name, &self.id)
    }

    async fn show(&self, target: &str) -> Result<(), ScreenError> {
        let request = self
            .client
            .get(format!("{}/show", self.base))
            .query(&[("target", target)]);
        self.get("show", request).await?;
        Ok(())
    }

    async fn snap(&self) -> Result<Snapshot, ScreenError> {
        let request = self.client.get(format!("{}/snap", self.base));
        let resp = self.get("snap", request).await?;
        let body = resp
            .bytes_stream()
            .map_err(|e| ScreenError::Transport(error_chain(&e)));
        Ok(Snapshot::from_stream(body))
    }

    async fn stat(&self) -> Result<ScreenStatus, ScreenError> {
        let request = self.client.get(format!("{}/stat", self.base));
        let resp = self.get("stat", request).await?;
        let reply: StatReply = resp
            .json()
            .await
            .map_err(|e| ScreenError::MalformedResponse(error_chain(&e)))?;
        Ok(reply.display)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
