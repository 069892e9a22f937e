//! Client side of the StatusNotifierItem (SNI) protocol: mirrors the items a tray host discovers
//! into local state and keeps any number of tray surfaces in sync with them.
//!
//! The entry point is [`TrayService`]. Feed it [`HostEvent`]s (e.g. from [`watch_items`]) and the
//! [`ItemEvent`]s it hands back from [`TrayService::next_item_event`].

pub mod dbus;
pub mod names;

mod bus;
pub use bus::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod geometry;
pub use geometry::*;

mod host;
pub use host::*;

mod icon;
pub use icon::*;

mod item;
pub use item::*;

mod property;
pub use property::*;

mod registry;
pub use registry::*;

mod service;
pub use service::*;

mod tray;
pub use tray::*;

#[cfg(test)]
mod testing;
