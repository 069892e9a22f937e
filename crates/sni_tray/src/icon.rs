use std::{fmt, rc::Rc};

/// One entry of an `a(iiay)` icon pixmap property, as it came off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPixmap {
    pub width: i32,
    pub height: i32,
    /// ARGB32, one big-endian word per pixel.
    pub data: Vec<u8>,
}

/// A decoded icon: premultiplied ARGB32 in host byte order, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Encode back into the wire representation.
    pub fn to_network_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|px| px.to_be_bytes()).collect()
    }

    /// Straight-alpha RGBA bytes, which is the only layout gdk-pixbuf and most image crates accept.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for px in &self.pixels {
            let [a, r, g, b] = px.to_be_bytes();
            out.extend_from_slice(&[unpremultiply(r, a), unpremultiply(g, a), unpremultiply(b, a), a]);
        }
        out
    }
}

fn unpremultiply(channel: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        return 0;
    }
    let (channel, alpha) = (channel as u32, alpha as u32);
    ((channel * 255 + alpha / 2) / alpha).min(255) as u8
}

/// Load a bitmap from StatusNotifierItem's [Icon format].
///
/// Only the first entry is looked at, even if the item offers several resolutions. If that entry is
/// malformed (non-positive size, or a byte count other than `width * height * 4`), there is no icon.
///
/// [Icon format]: https://freedesktop.org/wiki/Specifications/StatusNotifierItem/Icons/
pub fn decode_pixmaps(pixmaps: &[RawPixmap]) -> Option<Bitmap> {
    let first = pixmaps.first()?;
    if first.width <= 0 || first.height <= 0 {
        return None;
    }
    let (width, height) = (first.width as u32, first.height as u32);
    let expected = (width as usize).checked_mul(height as usize)?.checked_mul(4)?;
    if first.data.len() != expected {
        return None;
    }

    let pixels = first.data.chunks_exact(4).map(|px| u32::from_be_bytes([px[0], px[1], px[2], px[3]])).collect();
    Some(Bitmap { width, height, pixels })
}

/// What a tray child should currently display for an item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Icon {
    #[default]
    None,
    /// Look `name` up in the icon theme, searching `theme_path` first if given.
    Named { name: String, theme_path: Option<String> },
    Pixmap(Rc<Bitmap>),
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Icon::None => write!(f, "-"),
            Icon::Named { name, theme_path: Some(path) } => write!(f, "{} ({})", name, path),
            Icon::Named { name, theme_path: None } => write!(f, "{}", name),
            Icon::Pixmap(bitmap) => write!(f, "<{}x{} pixmap>", bitmap.width(), bitmap.height()),
        }
    }
}
