use std::collections::BTreeMap;

use derive_more::Display;

/// A rendered collection of tray icons, e.g. the tray widget of one bar.
///
/// Implementations own whatever widget they create for an item and only refer to the item by its
/// id; the current icon and label are looked up in the [`Registry`](crate::Registry) when redrawing.
pub trait Surface {
    /// Create a child for the item.
    fn attach(&mut self, item_id: &str);
    /// Drop the child of the item.
    fn detach(&mut self, item_id: &str);
    /// The item changed; redraw its child eventually.
    fn invalidate(&mut self, _item_id: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("surface#{_0}")]
pub struct SurfaceId(u64);

#[derive(Debug, Default)]
struct MirroredChild {
    stale: bool,
}

struct TraySurface {
    surface: Box<dyn Surface>,
    children: BTreeMap<String, MirroredChild>,
}

impl TraySurface {
    fn add(&mut self, item_id: &str) {
        if self.children.insert(item_id.to_owned(), MirroredChild { stale: true }).is_some() {
            self.surface.detach(item_id);
        }
        self.surface.attach(item_id);
    }
}

/// The set of tray surfaces, each mirroring every item of the registry.
#[derive(Default)]
pub struct TrayAggregator {
    surfaces: BTreeMap<SurfaceId, TraySurface>,
    next_id: u64,
}

impl std::fmt::Debug for TrayAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.surfaces.iter().map(|(id, s)| (id, &s.children))).finish()
    }
}

impl TrayAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a surface and give it a child for each of `items`, which should be the current
    /// contents of the registry.
    pub fn register_surface<'a>(&mut self, surface: Box<dyn Surface>, items: impl IntoIterator<Item = &'a str>) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;

        let mut entry = TraySurface { surface, children: BTreeMap::new() };
        for item_id in items {
            entry.add(item_id);
        }
        log::debug!("registered {} with {} items", id, entry.children.len());
        self.surfaces.insert(id, entry);
        id
    }

    /// Stop broadcasting to a surface. Returns false if it was not registered.
    pub fn unregister_surface(&mut self, id: SurfaceId) -> bool {
        self.surfaces.remove(&id).is_some()
    }

    pub fn broadcast_new_item(&mut self, item_id: &str) {
        for entry in self.surfaces.values_mut() {
            entry.add(item_id);
        }
    }

    pub fn broadcast_remove_item(&mut self, item_id: &str) {
        for entry in self.surfaces.values_mut() {
            if entry.children.remove(item_id).is_some() {
                entry.surface.detach(item_id);
            }
        }
    }

    /// Mark the child of an item stale on every surface. Nothing is redrawn here; see [`Self::take_stale`].
    pub fn broadcast_invalidate(&mut self, item_id: &str) {
        for entry in self.surfaces.values_mut() {
            if let Some(child) = entry.children.get_mut(item_id) {
                child.stale = true;
                entry.surface.invalidate(item_id);
            }
        }
    }

    /// The items whose children on this surface need a redraw, clearing their stale flag.
    pub fn take_stale(&mut self, id: SurfaceId) -> Vec<String> {
        let Some(entry) = self.surfaces.get_mut(&id) else { return Vec::new() };
        entry
            .children
            .iter_mut()
            .filter(|(_, child)| child.stale)
            .map(|(item_id, child)| {
                child.stale = false;
                item_id.clone()
            })
            .collect()
    }

    pub fn children(&self, id: SurfaceId) -> Vec<&str> {
        self.surfaces.get(&id).map(|entry| entry.children.keys().map(String::as_str).collect()).unwrap_or_default()
    }

    pub fn surfaces(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.surfaces.keys().copied()
    }
}
