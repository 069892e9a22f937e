//! Well-known bus names, paths and interfaces of the StatusNotifierItem protocol.

/// Object path an item lives at when its id carries no path.
pub const ITEM_OBJECT: &str = "/StatusNotifierItem";

/// Item interface used by nearly every implementation in the wild.
pub const ITEM_INTERFACE: &str = "org.kde.StatusNotifierItem";

pub const WATCHER_BUS: &str = "org.kde.StatusNotifierWatcher";
pub const WATCHER_OBJECT: &str = "/StatusNotifierWatcher";

pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";
