//! Domain entities for Kiosk displays.
//!
//! Everything here is pure: no sockets, no browser protocol, no file I/O.
//! The concrete Screen implementations live in `kiosk-server` and depend on
//! these types, never the other way around.

pub mod error;
pub mod identity;
pub mod kiosk;
pub mod screen;
