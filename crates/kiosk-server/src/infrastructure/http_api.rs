//! REST API over a [`Kiosk`], served with axum.
//!
//! All routes are `GET` under `/api/v1`:
//!
//! | path                     | reply                                   |
//! |--------------------------|-----------------------------------------|
//! | `/screen`                | `{"screens": [ScreenDetail, ..]}`       |
//! | `/screen/{id}`           | `ScreenDetail`                          |
//! | `/screen/{id}/stat`      | `ScreenDetail`                          |
//! | `/screen/{id}/show`      | `ScreenDetail` after showing `?target=` |
//! | `/screen/{id}/snap`      | `image/png`, streamed                   |
//!
//! Unknown IDs are 404, a missing or unparseable target is 400, and any
//! Screen failure is 502 with the error text as a plain body.  These are the
//! replies a [`RemoteScreen`](super::remote_screen::RemoteScreen) on another
//! instance consumes.

use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use kiosk_core::{
    Kiosk, Screen, ScreenError, ScreenStatus, REMOTE_SCREEN_PATH_MARKER, SNAPSHOT_CONTENT_TYPE,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// JSON description of one Screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenDetail {
    /// Path of this Screen's resource.
    pub url: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Cache-busting snapshot path.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub snap: String,
    pub display: ScreenStatus,
}

impl ScreenDetail {
    fn new(screen: &dyn Screen, display: ScreenStatus) -> Self {
        let id = screen.id();
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        Self {
            url: format!("{REMOTE_SCREEN_PATH_MARKER}{id}"),
            id: id.to_string(),
            name: screen.name().to_string(),
            snap: format!("{REMOTE_SCREEN_PATH_MARKER}{id}/snap?{stamp}"),
            display,
        }
    }
}

/// Body of `GET /api/v1/screen`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenList {
    pub screens: Vec<ScreenDetail>,
}

#[derive(Debug, Deserialize)]
struct ShowParams {
    target: Option<String>,
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
    Screen(ScreenError),
}

impl From<ScreenError> for ApiError {
    fn from(err: ScreenError) -> Self {
        match err {
            ScreenError::NoSuchScreen { id } => ApiError::NotFound(id),
            other => ApiError::Screen(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(id) => (StatusCode::NOT_FOUND, format!("no screen with ID {id}")),
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason),
            ApiError::Screen(err) => (StatusCode::BAD_GATEWAY, format!("screen failed: {err}")),
        };
        (status, body).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Builds the `/api/v1` router for `kiosk`.
pub fn router(kiosk: Arc<Kiosk>) -> Router {
    let screens = Router::new()
        .route("/screen", get(list_screens))
        .route("/screen/{id}", get(stat_screen))
        .route("/screen/{id}/stat", get(stat_screen))
        .route("/screen/{id}/show", get(show_screen))
        .route("/screen/{id}/snap", get(snap_screen))
        .with_state(kiosk);
    Router::new().nest("/api/v1", screens)
}

/// Binds `listen` and serves the API until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error when the listener cannot be bound or the server fails.
pub async fn run_server(
    listen: &str,
    kiosk: Arc<Kiosk>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind REST listener on {listen}"))?;
    info!(addr = %listen, screens = kiosk.len(), "REST API listening");
    axum::serve(listener, router(kiosk))
        .with_graceful_shutdown(shutdown)
        .await
        .context("REST server failed")?;
    info!("REST API stopped");
    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn list_screens(State(kiosk): State<Arc<Kiosk>>) -> Json<ScreenList> {
    let mut list = ScreenList::default();
    for (id, status) in kiosk.statuses().await {
        let Ok(screen) = kiosk.screen(&id) else { continue };
        match status {
            Ok(display) => list.screens.push(ScreenDetail::new(screen.as_ref(), display)),
            Err(err) => warn!(screen = %id, error = %err, "skipping unreachable screen"),
        }
    }
    Json(list)
}

async fn stat_screen(
    State(kiosk): State<Arc<Kiosk>>,
    Path(id): Path<String>,
) -> Result<Json<ScreenDetail>, ApiError> {
    let screen = kiosk.screen(&id)?;
    detail(screen.as_ref()).await
}

async fn show_screen(
    State(kiosk): State<Arc<Kiosk>>,
    Path(id): Path<String>,
    Query(params): Query<ShowParams>,
) -> Result<Json<ScreenDetail>, ApiError> {
    let screen = kiosk.screen(&id)?;
    let target = normalize_target(params.target.as_deref().unwrap_or_default())?;
    screen.show(&target).await.map_err(|err| {
        warn!(screen = %id, target = %target, error = %err, "show failed");
        ApiError::Screen(err)
    })?;
    detail(screen.as_ref()).await
}

async fn snap_screen(
    State(kiosk): State<Arc<Kiosk>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let screen = kiosk.screen(&id)?;
    let snapshot = screen.snap().await.map_err(|err| {
        warn!(screen = %id, error = %err, "snap failed");
        ApiError::Screen(err)
    })?;
    let body = Body::from_stream(snapshot.into_stream());
    Ok(([(header::CONTENT_TYPE, SNAPSHOT_CONTENT_TYPE)], body).into_response())
}

async fn detail(screen: &dyn Screen) -> Result<Json<ScreenDetail>, ApiError> {
    let display = screen.stat().await.map_err(|err| {
        warn!(screen = %screen.id(), error = %err, "stat failed");
        ApiError::Screen(err)
    })?;
    Ok(Json(ScreenDetail::new(screen, display)))
}

/// Prefixes `http://` onto scheme-less targets and checks the result parses.
fn normalize_target(raw: &str) -> Result<String, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::BadRequest("target parameter is required".to_string()));
    }
    let candidate = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    match reqwest::Url::parse(&candidate) {
        Ok(url) if url.has_host() => Ok(url.to_string()),
        _ => Err(ApiError::BadRequest(format!("target {candidate:?} is not a real URL"))),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
