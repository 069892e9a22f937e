use std::collections::HashMap;

use crate::{
    geometry::ClickPlacement,
    item::{ClickOutcome, ItemContext, ItemEvent, MouseButton, ScrollDirection, SniItem},
    tray::TrayAggregator,
    ItemBus, ItemMethod,
};

/// Every StatusNotifierItem currently known, keyed by the id the host reported it under.
#[derive(Debug)]
pub struct Registry<B> {
    ctx: ItemContext<B>,
    items: HashMap<String, SniItem>,
    next_generation: u64,
}

impl<B: ItemBus> Registry<B> {
    pub fn new(ctx: ItemContext<B>) -> Self {
        Self { ctx, items: HashMap::new(), next_generation: 0 }
    }

    /// All live items, oldest first.
    pub fn list(&self) -> Vec<&SniItem> {
        let mut items: Vec<&SniItem> = self.items.values().collect();
        items.sort_by_key(|item| item.generation());
        items
    }

    pub fn get(&self, id: &str) -> Option<&SniItem> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether no item is still waiting for a property.
    pub fn is_idle(&self) -> bool {
        self.items.values().all(|item| item.pending_calls() == 0)
    }

    /// Start mirroring a newly discovered item. Returns false if an item with this id already exists.
    pub fn create_from_discovery(&mut self, id: &str, displays: &mut TrayAggregator) -> bool {
        if self.items.contains_key(id) {
            log::warn!("Got duplicate new item: {:?}", id);
            return false;
        }
        self.next_generation += 1;
        log::info!("new item: {}", id);
        let item = SniItem::create(&self.ctx, id, self.next_generation, displays);
        self.items.insert(id.to_owned(), item);
        true
    }

    /// Stop mirroring an item that went away. Returns false if no such item exists.
    pub fn destroy_from_loss(&mut self, id: &str, displays: &mut TrayAggregator) -> bool {
        match self.items.remove(id) {
            Some(item) => {
                log::info!("lost item: {}", id);
                item.destroy(displays);
                true
            }
            None => {
                log::warn!("Tried to remove nonexistent item {:?}", id);
                false
            }
        }
    }

    /// Route the result of an item's background task to the item, if it is still the one that
    /// started the task.
    pub fn handle_event(&mut self, event: ItemEvent, displays: &mut TrayAggregator) {
        match event {
            ItemEvent::PropertyFetched { id, generation, kind, result } => match self.live_item(&id, generation) {
                Some(item) => {
                    item.complete(kind, result, displays);
                }
                None => log::trace!("dropping {} result for stale item {} ({})", kind, id, generation),
            },
            ItemEvent::Signal { id, generation, name } => {
                let ctx = &self.ctx;
                match self.items.get_mut(&id).filter(|item| item.generation() == generation) {
                    Some(item) => item.handle_signal(ctx, &name),
                    None => log::trace!("dropping signal {} for stale item {} ({})", name, id, generation),
                }
            }
        }
    }

    fn live_item(&mut self, id: &str, generation: u64) -> Option<&mut SniItem> {
        self.items.get_mut(id).filter(|item| item.generation() == generation)
    }

    pub fn click(&self, id: &str, button: MouseButton, placement: &ClickPlacement) -> Option<ClickOutcome> {
        let item = self.items.get(id)?;
        Some(item.handle_click(&self.ctx, button, placement))
    }

    pub fn scroll(&self, id: &str, direction: ScrollDirection) -> Option<ItemMethod> {
        let item = self.items.get(id)?;
        Some(item.handle_scroll(&self.ctx, direction))
    }

    /// Destroy every item.
    pub fn clear(&mut self, displays: &mut TrayAggregator) {
        for (_, item) in self.items.drain() {
            item.destroy(displays);
        }
    }
}
