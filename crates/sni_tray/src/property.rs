//! The fixed set of item properties we mirror, and how each one is decoded and stored.

use std::rc::Rc;

use strum::{EnumCount, EnumIter, IntoStaticStr};
use zbus::zvariant::{Array, Value};

use crate::icon::{self, Bitmap, RawPixmap};

/// Every property fetched from an item, in the order they are requested on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, IntoStaticStr, strum::Display)]
pub enum PropertyKind {
    Category,
    Id,
    Title,
    Status,
    IconName,
    OverlayIconName,
    AttentionIconName,
    AttentionMovieName,
    IconThemePath,
    IconPixmap,
    OverlayIconPixmap,
    AttentionIconPixmap,
    ToolTip,
    WindowId,
    #[strum(serialize = "ItemIsMenu")]
    IsMenu,
    Menu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum TextProperty {
    Category,
    Id,
    Title,
    Status,
    IconName,
    OverlayIconName,
    AttentionIconName,
    AttentionMovieName,
    IconThemePath,
    ToolTip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum PixmapProperty {
    IconPixmap,
    OverlayIconPixmap,
    AttentionIconPixmap,
}

/// How the payload of a property is decoded and where it ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRule {
    /// Stored as a string, cleared if the payload is not a string.
    Text(TextProperty),
    /// Decoded with [`icon::decode_pixmaps`], cleared if that fails.
    Pixmap(PixmapProperty),
    /// Boolean, trusted to be one.
    IsMenu,
    /// Object path; anything else leaves the previous value alone.
    Menu,
    /// Fetched but not interpreted.
    Opaque,
}

impl PropertyKind {
    /// Name of the property on the bus.
    pub fn wire_name(self) -> &'static str {
        self.into()
    }

    pub fn rule(self) -> PropertyRule {
        use PropertyKind::*;
        match self {
            Category => PropertyRule::Text(TextProperty::Category),
            Id => PropertyRule::Text(TextProperty::Id),
            Title => PropertyRule::Text(TextProperty::Title),
            Status => PropertyRule::Text(TextProperty::Status),
            IconName => PropertyRule::Text(TextProperty::IconName),
            OverlayIconName => PropertyRule::Text(TextProperty::OverlayIconName),
            AttentionIconName => PropertyRule::Text(TextProperty::AttentionIconName),
            AttentionMovieName => PropertyRule::Text(TextProperty::AttentionMovieName),
            IconThemePath => PropertyRule::Text(TextProperty::IconThemePath),
            ToolTip => PropertyRule::Text(TextProperty::ToolTip),
            IconPixmap => PropertyRule::Pixmap(PixmapProperty::IconPixmap),
            OverlayIconPixmap => PropertyRule::Pixmap(PixmapProperty::OverlayIconPixmap),
            AttentionIconPixmap => PropertyRule::Pixmap(PixmapProperty::AttentionIconPixmap),
            IsMenu => PropertyRule::IsMenu,
            Menu => PropertyRule::Menu,
            WindowId => PropertyRule::Opaque,
        }
    }
}

/// The properties a change signal asks us to re-fetch. Unknown signals map to nothing.
pub fn properties_for_signal(signal: &str) -> &'static [PropertyKind] {
    use PropertyKind::*;
    match signal {
        "NewTitle" => &[Title],
        "NewStatus" => &[Status],
        "NewToolTip" => &[ToolTip],
        "NewIconThemePath" => &[IconThemePath],
        "NewIcon" => &[IconName, IconPixmap],
        "NewOverlayIcon" => &[OverlayIconName, OverlayIconPixmap],
        "NewAttentionIcon" => &[AttentionIconName, AttentionIconPixmap],
        _ => &[],
    }
}

/// A property value, reduced to the variant types the protocol uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Str(String),
    ObjectPath(String),
    Bool(bool),
    Pixmaps(Vec<RawPixmap>),
    /// Anything else, kept as its signature for logging.
    Other(String),
}

impl From<&Value<'_>> for Payload {
    fn from(value: &Value<'_>) -> Self {
        match value {
            Value::Value(inner) => Payload::from(&**inner),
            Value::Str(s) => Payload::Str(s.as_str().to_owned()),
            Value::ObjectPath(path) => Payload::ObjectPath(path.as_str().to_owned()),
            Value::Bool(b) => Payload::Bool(*b),
            Value::Array(array) => match pixmaps_from_array(array) {
                Some(pixmaps) => Payload::Pixmaps(pixmaps),
                None => Payload::Other(value.value_signature().to_string()),
            },
            other => Payload::Other(other.value_signature().to_string()),
        }
    }
}

fn pixmaps_from_array(array: &Array<'_>) -> Option<Vec<RawPixmap>> {
    if array.element_signature().as_str() != "(iiay)" {
        return None;
    }
    array
        .get()
        .iter()
        .map(|entry| match entry {
            Value::Structure(entry) => match entry.fields() {
                [Value::I32(width), Value::I32(height), Value::Array(bytes)] => {
                    let data = bytes
                        .get()
                        .iter()
                        .map(|b| match b {
                            Value::U8(b) => Some(*b),
                            _ => None,
                        })
                        .collect::<Option<Vec<u8>>>()?;
                    Some(RawPixmap { width: *width, height: *height, data })
                }
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// Cached property values of one item.
#[derive(Debug, Default)]
pub struct Properties {
    text: [Option<String>; TextProperty::COUNT],
    pixmaps: [Option<Rc<Bitmap>>; PixmapProperty::COUNT],
}

impl Properties {
    pub fn text(&self, kind: TextProperty) -> Option<&str> {
        self.text[kind as usize].as_deref()
    }

    pub fn pixmap(&self, kind: PixmapProperty) -> Option<&Rc<Bitmap>> {
        self.pixmaps[kind as usize].as_ref()
    }

    pub(crate) fn store_text(&mut self, kind: TextProperty, payload: Payload) {
        self.text[kind as usize] = match payload {
            Payload::Str(s) => Some(s),
            _ => None,
        };
    }

    pub(crate) fn store_pixmap(&mut self, kind: PixmapProperty, payload: Payload) {
        // drop the old bitmap before decoding the new one
        self.pixmaps[kind as usize] = None;
        if let Payload::Pixmaps(pixmaps) = payload {
            self.pixmaps[kind as usize] = icon::decode_pixmaps(&pixmaps).map(Rc::new);
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Properties::default();
    }
}
