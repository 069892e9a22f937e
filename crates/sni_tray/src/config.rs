use smart_default::SmartDefault;

use crate::names;

/// Settings handed over by whoever set up the host side of the tray.
#[derive(Debug, Clone, PartialEq, Eq, SmartDefault)]
pub struct TrayConfig {
    /// Interface the items implement. Some hosts negotiate `org.freedesktop.StatusNotifierItem` instead.
    #[default(_code = "names::ITEM_INTERFACE.to_owned()")]
    pub item_interface: String,
}

impl TrayConfig {
    pub fn with_item_interface(item_interface: impl Into<String>) -> Self {
        TrayConfig { item_interface: item_interface.into() }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_interface() {
        assert_eq!(TrayConfig::default().item_interface, "org.kde.StatusNotifierItem");
        assert_eq!(
            TrayConfig::with_item_interface("org.freedesktop.StatusNotifierItem").item_interface,
            "org.freedesktop.StatusNotifierItem"
        );
    }
}
