use std::rc::Rc;

use futures::StreamExt;
use strum::IntoEnumIterator;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::{
    bus::{ItemBus, ItemMethod, ItemTarget, Orientation},
    geometry::ClickPlacement,
    icon::{Bitmap, Icon},
    names,
    property::{properties_for_signal, Payload, PixmapProperty, Properties, PropertyKind, PropertyRule, TextProperty},
    tray::TrayAggregator,
    Result,
};

/// Bus name and object path of an item, as derived from its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAddress {
    pub bus_name: String,
    pub object_path: String,
}

impl ItemAddress {
    /// Split an id of the form `{bus}{object_path}` (e.g. `:1.50/org/ayatana/NotificationItem/nm_applet`)
    /// at its first `/`. Ids without a path live at [`names::ITEM_OBJECT`].
    pub fn parse(unique_id: &str) -> Self {
        match unique_id.find('/') {
            Some(idx) => ItemAddress { bus_name: unique_id[..idx].to_owned(), object_path: unique_id[idx..].to_owned() },
            None => ItemAddress { bus_name: unique_id.to_owned(), object_path: names::ITEM_OBJECT.to_owned() },
        }
    }
}

/// How the tray child of an item should be styled, picked from the item's `Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconStyle {
    Active,
    Attention,
    Passive,
}

impl IconStyle {
    /// Only the first character of the status is looked at.
    pub fn from_status(status: &str) -> Option<Self> {
        match status.chars().next()? {
            'A' => Some(IconStyle::Active),
            'N' => Some(IconStyle::Attention),
            'P' => Some(IconStyle::Passive),
            _ => None,
        }
    }

    /// Widget name to style the child with.
    pub fn name(self) -> &'static str {
        match self {
            IconStyle::Active => "tray_active",
            IconStyle::Attention => "tray_attention",
            IconStyle::Passive => "tray_passive",
        }
    }

    /// The icon name and pixmap properties shown in this style.
    pub fn icon_sources(self) -> (TextProperty, PixmapProperty) {
        match self {
            IconStyle::Active | IconStyle::Passive => (TextProperty::IconName, PixmapProperty::IconPixmap),
            IconStyle::Attention => (TextProperty::AttentionIconName, PixmapProperty::AttentionIconPixmap),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
    Other(u32),
}

impl From<u32> for MouseButton {
    fn from(button: u32) -> Self {
        match button {
            1 => MouseButton::Primary,
            2 => MouseButton::Middle,
            3 => MouseButton::Secondary,
            other => MouseButton::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// What became of a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The item exports a menu; the caller should show it at `position`.
    OpenMenu { menu_path: String, position: (i32, i32) },
    Called(ItemMethod),
    Ignored,
}

/// Messages from the tasks an item spawns back to the loop that owns the item.
#[derive(Debug)]
pub enum ItemEvent {
    PropertyFetched { id: String, generation: u64, kind: PropertyKind, result: Result<Payload> },
    Signal { id: String, generation: u64, name: String },
}

/// What items share: the bus, the item interface the host negotiated, and the way back to the owner.
#[derive(Debug, Clone)]
pub struct ItemContext<B> {
    pub bus: B,
    pub interface: String,
    pub events: UnboundedSender<ItemEvent>,
}

/// A StatusNotifierItem (SNI), mirrored into local state.
///
/// All I/O happens in tasks spawned with [`tokio::task::spawn_local`], so an item must be created
/// from within a [`tokio::task::LocalSet`]. Their results come back as [`ItemEvent`]s which the owner
/// feeds into [`SniItem::complete`] and [`SniItem::handle_signal`].
#[derive(Debug)]
pub struct SniItem {
    unique_id: String,
    generation: u64,
    target: ItemTarget,
    properties: Properties,
    menu_path: Option<String>,
    is_menu: bool,
    icon: Icon,
    style: Option<IconStyle>,
    pending_calls: usize,
    cancel: CancellationToken,
    signal_task: Option<tokio::task::JoinHandle<()>>,
}

impl SniItem {
    /// Start mirroring the item with the given id: subscribe to its signals, give every tray surface a
    /// child for it and fetch all of its properties.
    pub fn create<B: ItemBus>(ctx: &ItemContext<B>, unique_id: &str, generation: u64, displays: &mut TrayAggregator) -> Self {
        let address = ItemAddress::parse(unique_id);
        let target = ItemTarget { bus_name: address.bus_name, object_path: address.object_path, interface: ctx.interface.clone() };

        let signal_task = tokio::task::spawn_local({
            let subscription = ctx.bus.subscribe(&target);
            let events = ctx.events.clone();
            let id = unique_id.to_owned();
            async move {
                let mut signals = match subscription.await {
                    Ok(signals) => signals,
                    Err(e) => {
                        log::warn!("failed to subscribe to signals of {}: {}", id, e);
                        return;
                    }
                };
                while let Some(name) = signals.next().await {
                    log::debug!("sni {}: received signal {}", id, name);
                    if events.send(ItemEvent::Signal { id: id.clone(), generation, name }).is_err() {
                        break;
                    }
                }
            }
        });

        let mut item = SniItem {
            unique_id: unique_id.to_owned(),
            generation,
            target,
            properties: Properties::default(),
            menu_path: None,
            is_menu: false,
            icon: Icon::None,
            style: None,
            pending_calls: 0,
            cancel: CancellationToken::new(),
            signal_task: Some(signal_task),
        };

        displays.broadcast_new_item(&item.unique_id);
        for kind in PropertyKind::iter() {
            item.fetch_property(ctx, kind);
        }
        item
    }

    /// Fetch one property. The result arrives as [`ItemEvent::PropertyFetched`], or as a cancellation
    /// error once the item is destroyed.
    pub fn fetch_property<B: ItemBus>(&mut self, ctx: &ItemContext<B>, kind: PropertyKind) {
        self.pending_calls += 1;

        let call = ctx.bus.get_property(&self.target, kind);
        let cancel = self.cancel.clone();
        let events = ctx.events.clone();
        let id = self.unique_id.clone();
        let generation = self.generation;
        tokio::task::spawn_local(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(crate::Error::Cancelled),
                result = call => result,
            };
            // the owner going away means nobody cares anymore
            let _ = events.send(ItemEvent::PropertyFetched { id, generation, kind, result });
        });
    }

    /// Apply the result of a property fetch. Returns whether anything was stored, in which case every
    /// surface has been told to redraw the item.
    pub fn complete(&mut self, kind: PropertyKind, result: Result<Payload>, displays: &mut TrayAggregator) -> bool {
        self.pending_calls = self.pending_calls.saturating_sub(1);
        if self.cancel.is_cancelled() {
            return false;
        }
        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                log::debug!("sni {}: failed to get {}: {}", self.unique_id, kind, e);
                return false;
            }
        };

        match kind.rule() {
            PropertyRule::Text(text) => {
                self.properties.store_text(text, payload);
                log::debug!("sni {}: property {} = {:?}", self.unique_id, kind, self.properties.text(text));
            }
            PropertyRule::Pixmap(pixmap) => self.properties.store_pixmap(pixmap, payload),
            PropertyRule::Menu => match payload {
                Payload::ObjectPath(path) => {
                    log::debug!("sni {}: property {} = {}", self.unique_id, kind, path);
                    self.menu_path = Some(path);
                }
                other => log::debug!("sni {}: ignoring {} of unexpected type {:?}", self.unique_id, kind, other),
            },
            PropertyRule::IsMenu => match payload {
                Payload::Bool(is_menu) => self.is_menu = is_menu,
                // the protocol says this is always a boolean
                other => log::warn!("sni {}: {} is not a boolean: {:?}", self.unique_id, kind, other),
            },
            PropertyRule::Opaque => {}
        }

        self.refresh_icon();
        displays.broadcast_invalidate(&self.unique_id);
        true
    }

    fn refresh_icon(&mut self) {
        let Some(style) = self.properties.text(TextProperty::Status).and_then(IconStyle::from_status) else { return };
        self.style = Some(style);
        let (name, pixmap) = style.icon_sources();
        self.set_icon(name, pixmap);
    }

    /// Visualizations are encouraged to prefer icon names over icon pixmaps if both are available.
    fn set_icon(&mut self, name: TextProperty, pixmap: PixmapProperty) {
        self.icon = match (self.properties.text(name), self.properties.pixmap(pixmap)) {
            (Some(name), _) => Icon::Named {
                name: name.to_owned(),
                theme_path: self.properties.text(TextProperty::IconThemePath).filter(|p| !p.is_empty()).map(str::to_owned),
            },
            (_, Some(bitmap)) => Icon::Pixmap(Rc::clone(bitmap)),
            _ => Icon::None,
        };
    }

    /// React to a signal of the item by re-fetching whatever it announced as changed.
    pub fn handle_signal<B: ItemBus>(&mut self, ctx: &ItemContext<B>, name: &str) {
        for kind in properties_for_signal(name) {
            self.fetch_property(ctx, *kind);
        }
    }

    /// Forward a click on the item's tray child.
    ///
    /// The remote method is always called at `(0, 0)`: passing the real position makes some items
    /// open their menu underneath the bar. The computed position is only used for our own menu.
    pub fn handle_click<B: ItemBus>(&self, ctx: &ItemContext<B>, button: MouseButton, placement: &ClickPlacement) -> ClickOutcome {
        let method = match button {
            MouseButton::Primary => match &self.menu_path {
                Some(menu_path) => {
                    return ClickOutcome::OpenMenu { menu_path: menu_path.clone(), position: placement.screen_position() };
                }
                None if self.is_menu => ItemMethod::ContextMenu { x: 0, y: 0 },
                None => ItemMethod::Activate { x: 0, y: 0 },
            },
            MouseButton::Middle => ItemMethod::SecondaryActivate { x: 0, y: 0 },
            MouseButton::Secondary => ItemMethod::ContextMenu { x: 0, y: 0 },
            MouseButton::Other(_) => return ClickOutcome::Ignored,
        };
        let (x, y) = placement.screen_position();
        log::debug!("sni: calling {} on {} at ( {}, {} )", method.member(), self.unique_id, x, y);
        self.invoke(ctx, method);
        ClickOutcome::Called(method)
    }

    pub fn handle_scroll<B: ItemBus>(&self, ctx: &ItemContext<B>, direction: ScrollDirection) -> ItemMethod {
        let delta = match direction {
            ScrollDirection::Down | ScrollDirection::Right => 1,
            ScrollDirection::Up | ScrollDirection::Left => -1,
        };
        let orientation = match direction {
            ScrollDirection::Up | ScrollDirection::Down => Orientation::Vertical,
            ScrollDirection::Left | ScrollDirection::Right => Orientation::Horizontal,
        };
        let method = ItemMethod::Scroll { delta, orientation };
        self.invoke(ctx, method);
        method
    }

    fn invoke<B: ItemBus>(&self, ctx: &ItemContext<B>, method: ItemMethod) {
        let call = ctx.bus.call(&self.target, method);
        let id = self.unique_id.clone();
        tokio::task::spawn_local(async move {
            if let Err(e) = call.await {
                log::debug!("sni {}: {} failed: {}", id, method, e);
            }
        });
    }

    /// Stop mirroring the item: cancel outstanding fetches, unsubscribe, drop cached state and remove
    /// the item's children from every surface.
    pub fn destroy(mut self, displays: &mut TrayAggregator) {
        self.teardown();
        self.properties.clear();
        self.menu_path = None;
        self.icon = Icon::None;
        self.style = None;
        displays.broadcast_remove_item(&self.unique_id);
        displays.broadcast_invalidate(&self.unique_id);
    }

    fn teardown(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.signal_task.take() {
            task.abort();
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bus_name(&self) -> &str {
        &self.target.bus_name
    }

    pub fn object_path(&self) -> &str {
        &self.target.object_path
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn title(&self) -> Option<&str> {
        self.properties.text(TextProperty::Title)
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.properties.text(TextProperty::ToolTip)
    }

    pub fn status(&self) -> Option<&str> {
        self.properties.text(TextProperty::Status)
    }

    /// Text to label the item with: its title, falling back to its id property and then its bus id.
    pub fn label(&self) -> &str {
        self.title()
            .filter(|t| !t.is_empty())
            .or_else(|| self.properties.text(TextProperty::Id).filter(|t| !t.is_empty()))
            .unwrap_or(&self.unique_id)
    }

    pub fn icon(&self) -> &Icon {
        &self.icon
    }

    pub fn pixmap(&self, kind: PixmapProperty) -> Option<&Bitmap> {
        self.properties.pixmap(kind).map(|b| &**b)
    }

    pub fn style(&self) -> Option<IconStyle> {
        self.style
    }

    pub fn menu_path(&self) -> Option<&str> {
        self.menu_path.as_deref()
    }

    pub fn is_menu(&self) -> bool {
        self.is_menu
    }

    pub fn pending_calls(&self) -> usize {
        self.pending_calls
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for SniItem {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        icon::RawPixmap,
        testing::{run_local, MockBus},
        tray::test::{RecordingSurface, SurfaceEvent::*},
    };
    use pretty_assertions::assert_eq;

    fn context(bus: MockBus) -> (ItemContext<MockBus>, tokio::sync::mpsc::UnboundedReceiver<ItemEvent>) {
        let (events, rx) = tokio::sync::mpsc::unbounded_channel();
        (ItemContext { bus, interface: names::ITEM_INTERFACE.to_owned(), events }, rx)
    }

    fn text(s: &str) -> Result<Payload> {
        Ok(Payload::Str(s.to_owned()))
    }

    fn pixel(argb: [u8; 4]) -> Result<Payload> {
        Ok(Payload::Pixmaps(vec![RawPixmap { width: 1, height: 1, data: argb.to_vec() }]))
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(
            ItemAddress::parse("org.example.App/Tray"),
            ItemAddress { bus_name: "org.example.App".to_owned(), object_path: "/Tray".to_owned() }
        );
        assert_eq!(
            ItemAddress::parse(":1.50/org/ayatana/NotificationItem/nm_applet"),
            ItemAddress { bus_name: ":1.50".to_owned(), object_path: "/org/ayatana/NotificationItem/nm_applet".to_owned() }
        );
        assert_eq!(
            ItemAddress::parse("org.example.App"),
            ItemAddress { bus_name: "org.example.App".to_owned(), object_path: "/StatusNotifierItem".to_owned() }
        );
    }

    #[test]
    fn test_icon_style_from_status() {
        assert_eq!(IconStyle::from_status("Active"), Some(IconStyle::Active));
        assert_eq!(IconStyle::from_status("NeedsAttention"), Some(IconStyle::Attention));
        assert_eq!(IconStyle::from_status("Passive"), Some(IconStyle::Passive));
        assert_eq!(IconStyle::from_status("Angry"), Some(IconStyle::Active));
        assert_eq!(IconStyle::from_status("active"), None);
        assert_eq!(IconStyle::from_status(""), None);
        assert_eq!(IconStyle::Active.name(), "tray_active");
        assert_eq!(IconStyle::Attention.name(), "tray_attention");
        assert_eq!(IconStyle::Passive.name(), "tray_passive");
    }

    #[test]
    fn test_mouse_button_from_number() {
        assert_eq!(MouseButton::from(1), MouseButton::Primary);
        assert_eq!(MouseButton::from(2), MouseButton::Middle);
        assert_eq!(MouseButton::from(3), MouseButton::Secondary);
        assert_eq!(MouseButton::from(9), MouseButton::Other(9));
        assert_eq!("down".parse::<ScrollDirection>().ok(), Some(ScrollDirection::Down));
    }

    #[test]
    fn test_icon_name_beats_pixmap() {
        run_local(async {
            let (ctx, _rx) = context(MockBus::gated());
            let mut displays = TrayAggregator::new();
            let expected_bitmap = crate::icon::decode_pixmaps(&[RawPixmap { width: 1, height: 1, data: vec![0xff, 0, 0xff, 0] }]).unwrap();
            assert_eq!(expected_bitmap.pixels(), [0xff00ff00]);
            for (status, expected_style) in [("Active", "tray_active"), ("NeedsAttention", "tray_attention"), ("Passive", "tray_passive")] {
                let (name_kind, pixmap_kind) = IconStyle::from_status(status).unwrap().icon_sources();
                let (name_prop, pixmap_prop) = match name_kind {
                    TextProperty::IconName => (PropertyKind::IconName, PropertyKind::IconPixmap),
                    _ => (PropertyKind::AttentionIconName, PropertyKind::AttentionIconPixmap),
                };
                for (has_name, has_pixmap) in [(false, false), (false, true), (true, false), (true, true)] {
                    let mut item = SniItem::create(&ctx, "org.example.App", 1, &mut displays);
                    item.complete(PropertyKind::Status, text(status), &mut displays);
                    if has_pixmap {
                        item.complete(pixmap_prop, pixel([0xff, 0, 0xff, 0]), &mut displays);
                    }
                    if has_name {
                        item.complete(name_prop, text("weather-clear"), &mut displays);
                    }
                    let expected = match (has_name, has_pixmap) {
                        (true, _) => Icon::Named { name: "weather-clear".to_owned(), theme_path: None },
                        (false, true) => Icon::Pixmap(Rc::new(expected_bitmap.clone())),
                        (false, false) => Icon::None,
                    };
                    assert_eq!(item.icon(), &expected, "{} name={} pixmap={}", status, has_name, has_pixmap);
                    assert_eq!(item.pixmap(pixmap_kind).is_some(), has_pixmap);
                    assert_eq!(item.style().map(IconStyle::name), Some(expected_style));
                }
            }
        });
    }

    #[test]
    fn test_empty_icon_name_still_beats_pixmap() {
        run_local(async {
            let (ctx, _rx) = context(MockBus::gated());
            let mut displays = TrayAggregator::new();
            let mut item = SniItem::create(&ctx, "org.example.App", 1, &mut displays);
            item.complete(PropertyKind::Status, text("Active"), &mut displays);
            item.complete(PropertyKind::IconPixmap, pixel([0xff, 1, 2, 3]), &mut displays);
            assert!(matches!(item.icon(), Icon::Pixmap(_)));
            assert_eq!(item.style(), Some(IconStyle::Active));
            item.complete(PropertyKind::IconName, text(""), &mut displays);
            assert_eq!(item.icon(), &Icon::Named { name: "".to_owned(), theme_path: None });
            assert!(item.pixmap(PixmapProperty::IconPixmap).is_some());

            item.complete(PropertyKind::IconThemePath, text("/opt/app/icons"), &mut displays);
            item.complete(PropertyKind::IconName, text("app"), &mut displays);
            assert_eq!(item.icon(), &Icon::Named { name: "app".to_owned(), theme_path: Some("/opt/app/icons".to_owned()) });
        });
    }

    #[test]
    fn test_menu_properties_keep_previous_value_on_wrong_type() {
        run_local(async {
            let (ctx, _rx) = context(MockBus::gated());
            let mut displays = TrayAggregator::new();
            let surface = RecordingSurface::default();
            displays.register_surface(Box::new(surface.clone()), []);
            let mut item = SniItem::create(&ctx, "org.example.App", 1, &mut displays);
            surface.take();

            assert!(item.complete(PropertyKind::Menu, Ok(Payload::ObjectPath("/Menu".to_owned())), &mut displays));
            assert!(item.complete(PropertyKind::Menu, text("/NotAPath"), &mut displays));
            assert_eq!(item.menu_path(), Some("/Menu"));

            // IsMenu is trusted to be a boolean, anything else is only logged
            assert!(item.complete(PropertyKind::IsMenu, Ok(Payload::Bool(true)), &mut displays));
            assert!(item.complete(PropertyKind::IsMenu, text("yes"), &mut displays));
            assert!(item.is_menu());
            assert_eq!(surface.take(), vec![Invalidate("org.example.App".into()); 4]);
        });
    }

    #[test]
    fn test_failed_fetch_changes_nothing() {
        run_local(async {
            let (ctx, _rx) = context(MockBus::gated());
            let mut displays = TrayAggregator::new();
            let surface = RecordingSurface::default();
            displays.register_surface(Box::new(surface.clone()), []);
            let mut item = SniItem::create(&ctx, "org.example.App", 1, &mut displays);
            surface.take();

            item.complete(PropertyKind::Title, text("Before"), &mut displays);
            surface.take();
            assert!(!item.complete(PropertyKind::Title, Err(crate::Error::Cancelled), &mut displays));
            assert_eq!(item.title(), Some("Before"));
            assert!(surface.take().is_empty());
        });
    }

    #[test]
    fn test_complete_after_teardown_is_ignored() {
        run_local(async {
            let (ctx, _rx) = context(MockBus::gated());
            let mut displays = TrayAggregator::new();
            let surface = RecordingSurface::default();
            displays.register_surface(Box::new(surface.clone()), []);
            let mut item = SniItem::create(&ctx, "org.example.App", 1, &mut displays);
            assert_eq!(item.pending_calls(), PropertyKind::iter().count());
            surface.take();

            item.teardown();
            assert!(item.is_cancelled());
            assert!(!item.complete(PropertyKind::Title, text("Too late"), &mut displays));
            assert_eq!(item.title(), None);
            assert_eq!(item.pending_calls(), PropertyKind::iter().count() - 1);
            assert!(surface.take().is_empty());
        });
    }

    #[test]
    fn test_label_falls_back_to_id() {
        run_local(async {
            let (ctx, _rx) = context(MockBus::gated());
            let mut displays = TrayAggregator::new();
            let mut item = SniItem::create(&ctx, "org.example.App", 1, &mut displays);
            assert_eq!(item.label(), "org.example.App");
            item.complete(PropertyKind::Id, text("example"), &mut displays);
            assert_eq!(item.label(), "example");
            item.complete(PropertyKind::Title, text(""), &mut displays);
            assert_eq!(item.label(), "example");
            item.complete(PropertyKind::Title, text("Example App"), &mut displays);
            assert_eq!(item.label(), "Example App");
        });
    }
}
