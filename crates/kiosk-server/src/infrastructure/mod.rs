//! Infrastructure layer for kiosk-server.
//!
//! Everything that owns a socket or a file handle lives here:
//!
//! - [`cdp`]: DevTools discovery and the WebSocket command/event session
//! - [`remote_screen`]: the REST-proxied Screen
//! - [`http_api`]: the `/api/v1` server other instances and the CLI talk to
//! - [`attach`]: config entries → `Arc<dyn Screen>`
//! - [`storage`]: config file loading

pub mod attach;
pub mod cdp;
pub mod http_api;
pub mod remote_screen;
pub mod storage;

pub use attach::{attach_all, attach_entry};
pub use cdp::CdpConnector;
pub use http_api::{router, run_server, ScreenDetail, ScreenList};
pub use remote_screen::{RemoteScreen, RemoteScreenConfig};
pub use storage::{load_config, parse_config};
