use derive_more::Display;
use smart_default::SmartDefault;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Display)]
#[display("{x}*{y}:{width}*{height}")]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect { x, y, width, height }
    }
}

/// The screen edge a bar is attached to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, SmartDefault)]
pub enum BarEdge {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

/// Everything known about where a click on a tray child happened.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ClickPlacement {
    pub edge: BarEdge,
    /// Geometry of the monitor the bar is on.
    pub monitor: Rect,
    /// Allocation of the bar window.
    pub bar: Rect,
    /// Allocation of the tray child within the bar.
    pub widget: Rect,
    /// Pointer position relative to the tray child.
    pub pointer: (i32, i32),
}

impl ClickPlacement {
    /// Position just outside the bar, next to the clicked child, where a popup would go.
    pub fn screen_position(&self) -> (i32, i32) {
        let (px, py) = self.pointer;
        let x = match self.edge {
            BarEdge::Right => self.monitor.width - self.bar.width + px + self.widget.x,
            BarEdge::Left => self.bar.width,
            BarEdge::Top | BarEdge::Bottom => px + self.widget.x,
        };
        let y = match self.edge {
            BarEdge::Bottom => self.monitor.height - self.bar.height,
            BarEdge::Top => self.bar.height,
            BarEdge::Left | BarEdge::Right => py + self.widget.y,
        };
        (x, y)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn placement(edge: BarEdge) -> ClickPlacement {
        ClickPlacement {
            edge,
            monitor: Rect::new(0, 0, 1920, 1080),
            bar: Rect::new(0, 0, 1920, 30),
            widget: Rect::new(1800, 2, 24, 24),
            pointer: (5, 7),
        }
    }

    #[test]
    fn test_screen_position_horizontal_bars() {
        assert_eq!(placement(BarEdge::Top).screen_position(), (1805, 30));
        assert_eq!(placement(BarEdge::Bottom).screen_position(), (1805, 1050));
    }

    #[test]
    fn test_screen_position_vertical_bars() {
        let side = |edge| ClickPlacement { bar: Rect::new(0, 0, 40, 1080), widget: Rect::new(8, 900, 24, 24), ..placement(edge) };
        assert_eq!(side(BarEdge::Left).screen_position(), (40, 907));
        assert_eq!(side(BarEdge::Right).screen_position(), (1920 - 40 + 5 + 8, 907));
    }

    #[test]
    fn test_rect_display() {
        assert_eq!(Rect::new(1, 2, 3, 4).to_string(), "1*2:3*4");
    }
}
