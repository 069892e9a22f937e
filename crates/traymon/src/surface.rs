use sni_tray::{ItemBus, SniItem, Surface, SurfaceId, TrayService};

/// A tray surface that renders to stdout: one line when an item shows up or goes away, and one
/// line per changed item on every redraw.
pub struct PrintSurface;

impl Surface for PrintSurface {
    fn attach(&mut self, item_id: &str) {
        println!("+ {}", item_id);
    }

    fn detach(&mut self, item_id: &str) {
        println!("- {}", item_id);
    }
}

/// Print every item whose child on the given surface went stale since the last redraw.
pub fn redraw<B: ItemBus>(service: &mut TrayService<B>, surface: SurfaceId) {
    for id in service.take_stale(surface) {
        if let Some(item) = service.registry().get(&id) {
            println!("~ {}", describe(item));
        }
    }
}

pub fn describe(item: &SniItem) -> String {
    let style = item.style().map(|s| s.name()).unwrap_or("-");
    let mut line = format!("{}  {}  [{}]  {}", item.unique_id(), item.label(), style, item.icon());
    if let Some(tooltip) = item.tooltip().filter(|t| !t.is_empty()) {
        line.push_str(&format!("  \"{}\"", tooltip));
    }
    if item.menu_path().is_some() || item.is_menu() {
        line.push_str("  (menu)");
    }
    line
}
