use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::{
    geometry::ClickPlacement,
    host::HostEvent,
    item::{ClickOutcome, ItemContext, ItemEvent, MouseButton, ScrollDirection, SniItem},
    registry::Registry,
    tray::{Surface, SurfaceId, TrayAggregator},
    ItemBus, ItemMethod, TrayConfig,
};

/// The item registry and the tray surfaces, wired together.
///
/// Items do their I/O in local tasks, so the service has to live inside a
/// [`tokio::task::LocalSet`]. The owning loop is expected to look like
///
/// ```ignore
/// loop {
///     tokio::select! {
///         Some(event) = host_events.next() => service.handle_host_event(event),
///         Some(event) = service.next_item_event() => service.handle_item_event(event),
///     }
/// }
/// ```
#[derive(Debug)]
pub struct TrayService<B> {
    registry: Registry<B>,
    displays: TrayAggregator,
    events: UnboundedReceiver<ItemEvent>,
}

impl<B: ItemBus> TrayService<B> {
    pub fn new(bus: B, config: &TrayConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = ItemContext { bus, interface: config.item_interface.clone(), events: tx };
        TrayService { registry: Registry::new(ctx), displays: TrayAggregator::new(), events: rx }
    }

    pub fn registry(&self) -> &Registry<B> {
        &self.registry
    }

    pub fn displays(&self) -> &TrayAggregator {
        &self.displays
    }

    /// Add a tray surface. It immediately gets a child for every item that already exists.
    pub fn register_surface(&mut self, surface: Box<dyn Surface>) -> SurfaceId {
        let existing: Vec<&str> = self.registry.list().into_iter().map(SniItem::unique_id).collect();
        self.displays.register_surface(surface, existing)
    }

    pub fn unregister_surface(&mut self, id: SurfaceId) -> bool {
        self.displays.unregister_surface(id)
    }

    /// Ids of the items whose children on this surface changed since the last call.
    pub fn take_stale(&mut self, id: SurfaceId) -> Vec<String> {
        self.displays.take_stale(id)
    }

    pub fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::ItemRegistered(id) => {
                self.registry.create_from_discovery(&id, &mut self.displays);
            }
            HostEvent::ItemUnregistered(id) => {
                self.registry.destroy_from_loss(&id, &mut self.displays);
            }
        }
    }

    pub fn handle_item_event(&mut self, event: ItemEvent) {
        self.registry.handle_event(event, &mut self.displays);
    }

    /// Wait for the next result of an item task. Never returns `None` while the service is alive,
    /// since the service itself holds a sender.
    pub async fn next_item_event(&mut self) -> Option<ItemEvent> {
        self.events.recv().await
    }

    pub fn try_next_item_event(&mut self) -> Option<ItemEvent> {
        self.events.try_recv().ok()
    }

    pub fn click(&self, id: &str, button: MouseButton, placement: &ClickPlacement) -> Option<ClickOutcome> {
        self.registry.click(id, button, placement)
    }

    pub fn scroll(&self, id: &str, direction: ScrollDirection) -> Option<ItemMethod> {
        self.registry.scroll(id, direction)
    }

    /// Whether every item has all of its requested properties.
    pub fn is_idle(&self) -> bool {
        self.registry.is_idle()
    }

    /// Destroy every item, detaching them from all surfaces.
    pub fn shutdown(&mut self) {
        self.registry.clear(&mut self.displays);
    }
}
