//! kiosk-server library crate.
//!
//! Concrete Screens and the service around them.  The Screen contract itself
//! lives in `kiosk-core`; this crate provides the two implementations and the
//! glue that turns a config file into a running Kiosk.
//!
//! # Architecture
//!
//! ```text
//! REST client / CLI
//!         ↕
//! [kiosk-server]
//!   ├── domain/           Config schema, address classification
//!   ├── application/      LocalScreen state machine, startup use case
//!   └── infrastructure/
//!         ├── cdp/          DevTools protocol driver (tokio-tungstenite)
//!         ├── remote_screen REST-proxied Screen (reqwest)
//!         ├── http_api      /api/v1 routes (axum)
//!         ├── attach        config entries → Screens
//!         └── storage       TOML config loading
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain`, `kiosk-core`, and driver *traits* only,
//!   so the locking rules of a local Screen are testable without a browser.
//! - `infrastructure` implements those traits and owns every socket.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: local Screen state machine and startup use case.
pub mod application;

/// Infrastructure layer: DevTools driver, remote Screen, REST API, config file.
pub mod infrastructure;
