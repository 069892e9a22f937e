//! The calls an item makes on the bus, behind a trait so the item logic does not care whether it
//! talks to a real connection.

use derive_more::Display;
use futures::{
    future::LocalBoxFuture,
    stream::{LocalBoxStream, StreamExt},
    FutureExt,
};
use zbus::zvariant::OwnedValue;

use crate::{names, property::Payload, PropertyKind, Result};

/// Where an item lives on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemTarget {
    pub bus_name: String,
    pub object_path: String,
    pub interface: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// Methods of the item interface that we invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ItemMethod {
    #[display("Activate({x}, {y})")]
    Activate { x: i32, y: i32 },
    #[display("SecondaryActivate({x}, {y})")]
    SecondaryActivate { x: i32, y: i32 },
    #[display("ContextMenu({x}, {y})")]
    ContextMenu { x: i32, y: i32 },
    #[display("Scroll(\"{orientation}\", {delta})")]
    Scroll { delta: i32, orientation: Orientation },
}

impl ItemMethod {
    pub fn member(&self) -> &'static str {
        match self {
            ItemMethod::Activate { .. } => "Activate",
            ItemMethod::SecondaryActivate { .. } => "SecondaryActivate",
            ItemMethod::ContextMenu { .. } => "ContextMenu",
            ItemMethod::Scroll { .. } => "Scroll",
        }
    }
}

/// Everything an item needs from its connection.
///
/// The returned futures are `'static` so they can be spawned onto the local task set and outlive
/// the borrow of the bus.
pub trait ItemBus: Clone + 'static {
    /// `org.freedesktop.DBus.Properties.Get` of one property on the item interface.
    fn get_property(&self, target: &ItemTarget, property: PropertyKind) -> LocalBoxFuture<'static, Result<Payload>>;

    /// Invoke a method on the item interface, ignoring whatever it returns.
    fn call(&self, target: &ItemTarget, method: ItemMethod) -> LocalBoxFuture<'static, Result<()>>;

    /// Subscribe to every signal the item emits on its interface. The stream yields member names;
    /// dropping it ends the subscription.
    fn subscribe(&self, target: &ItemTarget) -> LocalBoxFuture<'static, Result<LocalBoxStream<'static, String>>>;
}

/// [`ItemBus`] over a zbus connection.
#[derive(Debug, Clone)]
pub struct DbusBus {
    con: zbus::Connection,
}

impl DbusBus {
    pub fn new(con: zbus::Connection) -> Self {
        Self { con }
    }
}

impl ItemBus for DbusBus {
    fn get_property(&self, target: &ItemTarget, property: PropertyKind) -> LocalBoxFuture<'static, Result<Payload>> {
        let con = self.con.clone();
        let target = target.clone();
        async move {
            let reply = con
                .call_method(
                    Some(target.bus_name.as_str()),
                    target.object_path.as_str(),
                    Some(names::PROPERTIES_INTERFACE),
                    "Get",
                    &(target.interface.as_str(), property.wire_name()),
                )
                .await?;
            let value: OwnedValue = reply.body()?;
            Ok(Payload::from(&*value))
        }
        .boxed_local()
    }

    fn call(&self, target: &ItemTarget, method: ItemMethod) -> LocalBoxFuture<'static, Result<()>> {
        let con = self.con.clone();
        let target = target.clone();
        async move {
            let destination = Some(target.bus_name.as_str());
            let path = target.object_path.as_str();
            let interface = Some(target.interface.as_str());
            match method {
                ItemMethod::Activate { x, y } | ItemMethod::SecondaryActivate { x, y } | ItemMethod::ContextMenu { x, y } => {
                    con.call_method(destination, path, interface, method.member(), &(x, y)).await?
                }
                ItemMethod::Scroll { delta, orientation } => {
                    let orientation: &'static str = orientation.into();
                    con.call_method(destination, path, interface, method.member(), &(orientation, delta)).await?
                }
            };
            Ok(())
        }
        .boxed_local()
    }

    fn subscribe(&self, target: &ItemTarget) -> LocalBoxFuture<'static, Result<LocalBoxStream<'static, String>>> {
        let con = self.con.clone();
        let target = target.clone();
        async move {
            // a bare proxy, since the interface name is only known at runtime
            let proxy: zbus::Proxy<'static> = zbus::ProxyBuilder::new_bare(&con)
                .destination(target.bus_name)?
                .path(target.object_path)?
                .interface(target.interface)?
                .cache_properties(zbus::CacheProperties::No)
                .build()
                .await?;
            // every signal on the item interface is of interest, not just the ones we know
            let signals = proxy.receive_all_signals().await?;
            Ok(signals.filter_map(|msg| async move { msg.member().map(|member| member.to_string()) }).boxed_local())
        }
        .boxed_local()
    }
}
