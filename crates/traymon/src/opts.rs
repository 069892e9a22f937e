use std::time::Duration;

use clap::{Parser, Subcommand};
use sni_tray::{names, ScrollDirection};

/// Struct that gets generated from `RawOpt`.
#[derive(Debug, PartialEq, Eq)]
pub struct Opt {
    pub log_debug: bool,
    pub item_interface: String,
    pub action: Action,
}

#[derive(Parser, Debug, PartialEq, Eq)]
#[command(version, about)]
pub(super) struct RawOpt {
    /// Write out debug logs.
    #[arg(long = "debug", global = true)]
    log_debug: bool,

    /// Interface the tray items implement.
    #[arg(long = "interface", global = true, default_value = names::ITEM_INTERFACE)]
    item_interface: String,

    #[command(subcommand)]
    action: RawAction,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum RawAction {
    /// Follow the tray, printing items as they come, go and change.
    #[command(name = "watch", alias = "w")]
    Watch {
        /// How often changed items are printed, in milliseconds.
        #[arg(long, default_value_t = 500)]
        redraw_interval: u64,
    },

    /// Print every item currently in the tray.
    #[command(name = "list", alias = "ls")]
    List {
        /// How long to wait for items to report their properties, in milliseconds.
        #[arg(long, default_value_t = 2000)]
        settle: u64,
    },

    /// Click on an item.
    #[command(name = "click")]
    Click {
        /// Id of the item, as printed by `list`.
        id: String,

        /// Mouse button: 1 is primary, 2 middle, 3 secondary.
        #[arg(short, long, default_value_t = 1)]
        button: u32,
    },

    /// Scroll on an item.
    #[command(name = "scroll")]
    Scroll {
        /// Id of the item, as printed by `list`.
        id: String,

        /// One of up, down, left, right.
        direction: ScrollDirection,
    },

    /// Print out the shell completions for traymon.
    #[command(name = "shell-completions")]
    ShellCompletions {
        #[arg(short, long)]
        shell: clap_complete::shells::Shell,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Watch { redraw_interval: Duration },
    List { settle: Duration },
    Click { id: String, button: u32 },
    Scroll { id: String, direction: ScrollDirection },
    ShellCompletions { shell: clap_complete::shells::Shell },
}

impl Opt {
    pub fn from_env() -> Self {
        let raw: RawOpt = RawOpt::parse();
        raw.into()
    }
}

impl From<RawOpt> for Opt {
    fn from(other: RawOpt) -> Self {
        let RawOpt { log_debug, item_interface, action } = other;
        let action = match action {
            RawAction::Watch { redraw_interval } => Action::Watch { redraw_interval: Duration::from_millis(redraw_interval) },
            RawAction::List { settle } => Action::List { settle: Duration::from_millis(settle) },
            RawAction::Click { id, button } => Action::Click { id, button },
            RawAction::Scroll { id, direction } => Action::Scroll { id, direction },
            RawAction::ShellCompletions { shell } => Action::ShellCompletions { shell },
        };
        Opt { log_debug, item_interface, action }
    }
}
