//! Application layer for kiosk-server.
//!
//! # Responsibilities
//!
//! - The [`LocalScreen`](local_screen::LocalScreen) state machine: lazy attach,
//!   one exclusive lock per Screen, per-operation deadline.
//! - The driver ports ([`DevtoolsConnector`](local_screen::DevtoolsConnector),
//!   [`PageDriver`](local_screen::PageDriver)) that infrastructure implements.
//! - The startup use case that shows the default URL on every Screen.
//!
//! # What does NOT belong here?
//!
//! - WebSocket framing or the DevTools wire format (`infrastructure::cdp`)
//! - HTTP clients or servers (`infrastructure::remote_screen`, `http_api`)

pub mod local_screen;
pub mod startup;

pub use local_screen::{DevtoolsConnector, LocalScreen, PageDriver};
pub use startup::show_on_all;
