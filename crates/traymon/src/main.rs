use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::CommandFactory as _;
use futures::{stream::LocalBoxStream, StreamExt};
use sni_tray::{ClickOutcome, DbusBus, HostEvent, MouseButton, TrayConfig, TrayService};

mod opts;
mod surface;

type Service = TrayService<DbusBus>;

fn main() {
    let opts = opts::Opt::from_env();

    let log_level_filter = if opts.log_debug { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    if std::env::var("RUST_LOG").is_ok() {
        pretty_env_logger::init_timed();
    } else {
        pretty_env_logger::formatted_timed_builder()
            .filter(Some("traymon"), log_level_filter)
            .filter(Some("sni_tray"), log_level_filter)
            .init();
    }

    if let opts::Action::ShellCompletions { shell } = opts.action {
        clap_complete::generate(shell, &mut opts::RawOpt::command(), "traymon", &mut std::io::stdout());
        return;
    }

    if let Err(err) = run(opts) {
        log::error!("{:?}", err);
        std::process::exit(1);
    }
}

fn run(opts: opts::Opt) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().context("Failed to initialize tokio runtime")?;
    let local = tokio::task::LocalSet::new();
    let result = local.block_on(&rt, run_action(opts));

    // with the service gone only forwarded method calls are left, let them reach their items
    if rt.block_on(tokio::time::timeout(Duration::from_secs(2), local)).is_err() {
        log::warn!("Gave up waiting for outstanding calls");
    }
    result
}

async fn run_action(opts: opts::Opt) -> Result<()> {
    let con = zbus::Connection::session().await.context("Failed to connect to the session bus")?;
    let config = TrayConfig::with_item_interface(opts.item_interface);
    let mut service = TrayService::new(DbusBus::new(con.clone()), &config);
    let mut host_events = sni_tray::watch_items(&con).await.context("Failed to reach the StatusNotifierWatcher")?;

    let result = match opts.action {
        opts::Action::ShellCompletions { .. } => unreachable!(),
        opts::Action::Watch { redraw_interval } => watch(&mut service, &mut host_events, redraw_interval).await,
        opts::Action::List { settle } => {
            settle_items(&mut service, &mut host_events, settle).await;
            for item in service.registry().list() {
                println!("{}", surface::describe(item));
            }
            Ok(())
        }
        opts::Action::Click { id, button } => {
            settle_items(&mut service, &mut host_events, Duration::from_millis(500)).await;
            match service.click(&id, MouseButton::from(button), &Default::default()) {
                Some(ClickOutcome::OpenMenu { menu_path, .. }) => {
                    println!("{} exports a menu at {}", id, menu_path);
                    Ok(())
                }
                Some(ClickOutcome::Called(method)) => {
                    log::info!("Called {} on {}", method, id);
                    Ok(())
                }
                Some(ClickOutcome::Ignored) => Err(anyhow!("Button {} does nothing on tray items", button)),
                None => Err(anyhow!("No tray item with id {}", id)),
            }
        }
        opts::Action::Scroll { id, direction } => {
            settle_items(&mut service, &mut host_events, Duration::from_millis(500)).await;
            match service.scroll(&id, direction) {
                Some(method) => {
                    log::info!("Called {} on {}", method, id);
                    Ok(())
                }
                None => Err(anyhow!("No tray item with id {}", id)),
            }
        }
    };
    service.shutdown();
    result
}

/// Take in the items the watcher already knows about and wait until they reported their
/// properties, or until `timeout` runs out.
async fn settle_items(service: &mut Service, host_events: &mut LocalBoxStream<'static, HostEvent>, timeout: Duration) {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            biased;
            Some(event) = host_events.next() => service.handle_host_event(event),
            Some(event) = service.next_item_event() => {
                service.handle_item_event(event);
                if service.is_idle() {
                    break;
                }
            }
            _ = &mut deadline => {
                log::debug!("Items did not settle within {:?}", timeout);
                break;
            }
        }
    }
}

async fn watch(service: &mut Service, host_events: &mut LocalBoxStream<'static, HostEvent>, redraw_interval: Duration) -> Result<()> {
    let surface = service.register_surface(Box::new(surface::PrintSurface));
    let mut redraw = tokio::time::interval(redraw_interval);
    redraw.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
            event = host_events.next() => match event {
                Some(event) => service.handle_host_event(event),
                None => return Err(anyhow!("Lost connection to the StatusNotifierWatcher")),
            },
            Some(event) = service.next_item_event() => service.handle_item_event(event),
            _ = redraw.tick() => surface::redraw(service, surface),
        }
    }
    Ok(())
}
