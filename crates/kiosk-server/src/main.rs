//! `kiosk`: turns browsers in remote-debugging mode into kiosk displays.
//!
//! # Usage
//!
//! ```text
//! kiosk server --config kiosk.toml
//! kiosk show   [--screen ADDR]... [--default-url URL]
//! kiosk snap   [--screen ADDR] --output shot.png
//! ```
//!
//! `server` attaches every configured Screen, shows the default URL on each
//! and serves the REST API until Ctrl+C.  `show` and `snap` drive local
//! debugger addresses directly, without a server.
//!
//! # Environment variable overrides
//!
//! | Variable                   | Default                  |
//! |----------------------------|--------------------------|
//! | `KIOSK_CONFIG`             | (required for `server`)  |
//! | `KIOSK_SCREEN_ADDRESS`     | `127.0.0.1:9222`         |
//! | `KIOSK_SCREEN_DEFAULT_URL` | `http://localhost:9292/` |
//! | `RUST_LOG`                 | `info` or the config's `log_level` |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use futures_util::{Stream, StreamExt};
use kiosk_core::{Kiosk, Screen, ScreenError};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kiosk_server::application::{show_on_all, DevtoolsConnector, LocalScreen};
use kiosk_server::domain::config::{DEFAULT_SCREEN_ADDR, DEFAULT_SCREEN_URL};
use kiosk_server::infrastructure::{attach_all, load_config, run_server, CdpConnector};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "kiosk",
    about = "Turns a Chromium browser in debug mode into a kiosk display",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the kiosk server.
    Server {
        /// Path to the server configuration file.
        #[arg(short, long, env = "KIOSK_CONFIG")]
        config: PathBuf,
    },
    /// Display a URL on one or more local screens.
    Show {
        #[command(flatten)]
        screens: ScreenArgs,
    },
    /// Write a PNG of a local screen's current display.
    Snap {
        #[command(flatten)]
        screens: ScreenArgs,
        /// File the PNG is written to.
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, Args)]
struct ScreenArgs {
    /// ip:port on which a Chromium debugger is listening.  May be repeated.
    #[arg(
        short = 's',
        long = "screen",
        env = "KIOSK_SCREEN_ADDRESS",
        value_delimiter = ',',
        default_value = DEFAULT_SCREEN_ADDR
    )]
    screens: Vec<String>,

    /// URL to open on the screens.
    #[arg(short, long, env = "KIOSK_SCREEN_DEFAULT_URL", default_value = DEFAULT_SCREEN_URL)]
    default_url: String,
}

impl ScreenArgs {
    fn validate(&self) -> anyhow::Result<()> {
        if self.screens.iter().all(|s| s.trim().is_empty()) {
            bail!("at least one screen must be specified");
        }
        if self.default_url.trim().is_empty() {
            bail!("default-url must be set");
        }
        Ok(())
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Server { config } => serve(config).await,
        Command::Show { screens } => {
            init_tracing("info");
            show(screens).await
        }
        Command::Snap { screens, output } => {
            init_tracing("info");
            snap(screens, output).await
        }
    }
}

/// `RUST_LOG` wins; otherwise `default_level`.
fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn connector() -> anyhow::Result<Arc<dyn DevtoolsConnector>> {
    Ok(Arc::new(CdpConnector::new().context("failed to build discovery client")?))
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn serve(path: PathBuf) -> anyhow::Result<()> {
    let cfg = load_config(&path).with_context(|| format!("invalid config {}", path.display()))?;
    init_tracing(&cfg.log_level);
    info!(config = %path.display(), listen = %cfg.listen, "kiosk server starting");

    let screens = attach_all(&cfg, &connector()?);
    let kiosk = Arc::new(Kiosk::new(cfg.kiosk_name.clone(), screens.iter().cloned()));
    info!(kiosk = %kiosk.id(), screens = kiosk.len(), "kiosk ready");

    // Local screens attach on first use, so this also warms their sessions.
    let default_url = cfg.default_url.clone();
    tokio::spawn(async move {
        show_on_all(&screens, &default_url).await;
    });

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    };
    run_server(&cfg.listen, kiosk, shutdown).await?;

    info!("kiosk server stopped");
    Ok(())
}

async fn show(args: ScreenArgs) -> anyhow::Result<()> {
    args.validate()?;
    let connector = connector()?;
    for addr in args.screens.iter().filter(|s| !s.trim().is_empty()) {
        let screen = LocalScreen::attach("", addr.as_str(), Arc::clone(&connector));
        screen
            .show(&args.default_url)
            .await
            .with_context(|| format!("screen {addr} could not show {}", args.default_url))?;
        info!(screen = %addr, url = %args.default_url, "shown");
    }
    Ok(())
}

async fn snap(args: ScreenArgs, output: PathBuf) -> anyhow::Result<()> {
    args.validate()?;
    let [addr] = args.screens.as_slice() else {
        bail!("snap really only makes sense with one screen");
    };
    let screen = LocalScreen::attach("", addr.as_str(), connector()?);
    let snapshot = screen
        .snap()
        .await
        .with_context(|| format!("screen {addr} could not provide a snapshot"))?;

    let written = write_snapshot(snapshot.into_stream(), &output).await?;
    info!(screen = %addr, output = %output.display(), bytes = written, "snapshot written");
    Ok(())
}

/// Streams PNG chunks into `path` and returns the number of bytes written.
async fn write_snapshot(
    mut body: impl Stream<Item = Result<Bytes, ScreenError>> + Unpin,
    path: &Path,
) -> anyhow::Result<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("snapshot stream failed")?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
