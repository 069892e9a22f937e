use futures::stream::{self, LocalBoxStream, StreamExt};

use crate::{dbus, names};

/// Discovery and loss of items, as reported by the host side of the tray.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    ItemRegistered(String),
    ItemUnregistered(String),
}

/// Follow the StatusNotifierWatcher: first every item registered so far, then registrations and
/// unregistrations as they happen.
///
/// This does not register a StatusNotifierHost; that is left to whoever owns the connection.
pub async fn watch_items(con: &zbus::Connection) -> zbus::Result<LocalBoxStream<'static, HostEvent>> {
    let snw = dbus::StatusNotifierWatcherProxy::builder(con)
        .destination(names::WATCHER_BUS)?
        .path(names::WATCHER_OBJECT)?
        .build()
        .await?;

    // start listening before asking for the current items, so nothing slips through in between
    let new_items = snw.receive_status_notifier_item_registered().await?;
    let gone_items = snw.receive_status_notifier_item_unregistered().await?;
    let initial = snw.registered_status_notifier_items().await?;
    log::debug!("watcher reports {} items", initial.len());

    let new_items = new_items.filter_map(|sig| async move {
        match sig.args() {
            Ok(args) => Some(HostEvent::ItemRegistered(args.service.to_owned())),
            Err(e) => {
                log::warn!("malformed StatusNotifierItemRegistered signal: {}", e);
                None
            }
        }
    });
    let gone_items = gone_items.filter_map(|sig| async move {
        match sig.args() {
            Ok(args) => Some(HostEvent::ItemUnregistered(args.service.to_owned())),
            Err(e) => {
                log::warn!("malformed StatusNotifierItemUnregistered signal: {}", e);
                None
            }
        }
    });

    Ok(stream::iter(initial.into_iter().map(HostEvent::ItemRegistered)).chain(stream::select(new_items, gone_items)).boxed_local())
}
