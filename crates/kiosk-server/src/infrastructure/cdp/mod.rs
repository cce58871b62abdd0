//! DevTools protocol driver.
//!
//! Implements the application's [`DevtoolsConnector`] and [`PageDriver`]
//! ports against a Chromium-style remote debugging endpoint:
//!
//! 1. `GET http://<addr>/json/list` enumerates targets.
//! 2. The first `page` target's `webSocketDebuggerUrl` is opened.
//! 3. `Page.enable` turns on load events; `Page.bringToFront` activates it.
//!
//! Only the handful of commands a kiosk needs are wrapped.

pub mod session;

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use kiosk_core::{ScreenError, ScreenStatus};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::application::{DevtoolsConnector, PageDriver};

pub use session::{CdpError, CdpEvent, CdpSession};

/// Debugger port Chromium uses when none is given.
pub const DEFAULT_DEBUG_PORT: u16 = 9222;

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Turns a configured local address into the HTTP base of its debugger.
///
/// | input                        | result                       |
/// |------------------------------|------------------------------|
/// | `127.0.0.1:9222`             | `http://127.0.0.1:9222`      |
/// | `9333`                       | `http://127.0.0.1:9333`      |
/// | `http://host:9222/`          | `http://host:9222`           |
/// | `ws://host:9222/devtools/..` | `http://host:9222`           |
pub fn resolve_endpoint(addr: &str) -> Result<String, ScreenError> {
    let addr = addr.trim();
    let invalid = || ScreenError::InvalidUrlFormat {
        url: addr.to_string(),
    };
    if addr.is_empty() {
        return Err(invalid());
    }
    if addr.chars().all(|c| c.is_ascii_digit()) {
        let port: u16 = addr.parse().map_err(|_| invalid())?;
        return Ok(format!("http://127.0.0.1:{port}"));
    }

    let (scheme, rest) = match addr.split_once("://") {
        Some(("http", rest)) | Some(("ws", rest)) => ("http", rest),
        Some(("https", rest)) | Some(("wss", rest)) => ("https", rest),
        Some(_) => return Err(invalid()),
        None => ("http", addr),
    };
    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(invalid());
    }
    Ok(format!("{scheme}://{authority}"))
}

/// One entry of `/json/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

/// Picks the first page that can still be attached to.
pub fn first_page(targets: &[TargetEntry]) -> Option<&TargetEntry> {
    targets
        .iter()
        .find(|t| t.kind == "page" && t.web_socket_debugger_url.is_some())
}

// ── Connector ─────────────────────────────────────────────────────────────────

/// Connects to debugger endpoints over HTTP discovery plus WebSocket.
#[derive(Debug, Clone)]
pub struct CdpConnector {
    http: reqwest::Client,
}

impl CdpConnector {
    /// Builds a connector with its own discovery client.
    pub fn new() -> Result<Self, ScreenError> {
        let http = reqwest::Client::builder()
            .timeout(DISCOVERY_TIMEOUT)
            .build()
            .map_err(|e| ScreenError::Transport(e.to_string()))?;
        Ok(Self::with_client(http))
    }

    /// Uses a caller-supplied client for `/json/list` requests.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn list_targets(&self, addr: &str, base: &str) -> Result<Vec<TargetEntry>, ScreenError> {
        let connection = |reason: String| ScreenError::Connection {
            addr: addr.to_string(),
            reason,
        };
        let resp = self
            .http
            .get(format!("{base}/json/list"))
            .send()
            .await
            .map_err(|e| connection(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(connection(format!("target list returned {}", resp.status())));
        }
        resp.json()
            .await
            .map_err(|e| ScreenError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl DevtoolsConnector for CdpConnector {
    async fn connect(&self, addr: &str) -> Result<Box<dyn PageDriver>, ScreenError> {
        let base = resolve_endpoint(addr)?;
        let targets = self.list_targets(addr, &base).await?;
        let target = first_page(&targets).ok_or_else(|| ScreenError::Connection {
            addr: addr.to_string(),
            reason: "no attachable page target".to_string(),
        })?;
        let ws_url = target.web_socket_debugger_url.as_deref().unwrap_or_default();
        debug!(addr, target = %target.id, url = %target.url, "opening page target");

        let session = CdpSession::connect(ws_url)
            .await
            .map_err(|e| ScreenError::Connection {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;
        let mut page = CdpPage {
            session,
            addr: addr.to_string(),
            target_id: target.id.clone(),
        };
        page.activate().await?;
        info!(addr, target = %page.target_id, "page activated");
        Ok(Box::new(page))
    }
}

// ── Page ──────────────────────────────────────────────────────────────────────

/// The one page a local Screen drives.
pub struct CdpPage {
    session: CdpSession,
    addr: String,
    target_id: String,
}

impl CdpPage {
    async fn activate(&mut self) -> Result<(), ScreenError> {
        self.session
            .send("Page.enable", json!({}))
            .await
            .map_err(|e| self.connection(e))?;
        self.session
            .send("Page.bringToFront", json!({}))
            .await
            .map_err(|e| self.connection(e))?;
        Ok(())
    }

    fn connection(&self, err: CdpError) -> ScreenError {
        ScreenError::Connection {
            addr: self.addr.clone(),
            reason: err.to_string(),
        }
    }

    /// Closed sockets become Connection errors; anything else goes through `other`.
    fn classify(&self, err: CdpError, other: impl FnOnce(String) -> ScreenError) -> ScreenError {
        match err {
            CdpError::Closed | CdpError::Handshake(_) => self.connection(err),
            _ => other(err.to_string()),
        }
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn navigate(&mut self, url: &str) -> Result<(), ScreenError> {
        let navigation = |reason: String| ScreenError::Navigation {
            url: url.to_string(),
            reason,
        };
        // Subscribe first so a fast load event is not missed.
        let mut events = self.session.subscribe();
        let result = self
            .session
            .send("Page.navigate", json!({ "url": url }))
            .await
            .map_err(|e| self.classify(e, navigation))?;

        if let Some(text) = result.get("errorText").and_then(Value::as_str) {
            if !text.is_empty() {
                return Err(navigation(text.to_string()));
            }
        }
        // Same-document navigations carry no loaderId and fire no load event.
        if result.get("loaderId").is_none() {
            return Ok(());
        }
        // Any load event counts.  A cancelled navigate drops its page (see
        // `LocalScreen::show`), so none can be left over from an earlier one.
        session::wait_for_event(&mut events, "Page.loadEventFired")
            .await
            .map_err(|e| self.connection(e))?;
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, ScreenError> {
        let result = self
            .session
            .send(
                "Page.captureScreenshot",
                json!({ "format": "png", "captureBeyondViewport": false }),
            )
            .await
            .map_err(|e| self.classify(e, ScreenError::Capture))?;
        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| ScreenError::Capture("screenshot reply has no data".to_string()))?;
        BASE64
            .decode(data)
            .map_err(|e| ScreenError::Capture(format!("invalid base64 image: {e}")))
    }

    async fn info(&mut self) -> Result<ScreenStatus, ScreenError> {
        let result = self
            .session
            .send(
                "Target.getTargetInfo",
                json!({ "targetId": self.target_id }),
            )
            .await
            .map_err(|e| self.classify(e, ScreenError::Info))?;
        let info = result
            .get("targetInfo")
            .ok_or_else(|| ScreenError::Info("target info reply has no targetInfo".to_string()))?;
        Ok(ScreenStatus {
            title: info
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            url: info
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
