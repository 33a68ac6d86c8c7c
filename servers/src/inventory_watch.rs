use anyhow::Result;
use std::sync::Arc;
use tokio::signal;

use lib_inventory::sync::{ClientSyncAgent, DashboardView, HttpBackend, RemoteChannel};
use servers::inventory_logic::config::{self, WatchConfig};
use servers::inventory_logic::logger;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config: WatchConfig = config::load_config()?;
    logger::setup_logging(&config.log_dir(), config.log_level(), "inventory_watch")?;

    let backend = HttpBackend::new(config.backend_url(), config.client_options())?;
    let source = RemoteChannel::for_backend(config.backend_url(), config.reconnect_delay())?;
    log::info!("Watching {} via {}", config.backend_url(), source.cable_url());

    let agent = ClientSyncAgent::spawn(&source, Arc::new(backend), config.agent_config());
    let mut views = agent.watch_view();
    let mut connectivity = agent.watch_connectivity();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                log::info!("Ctrl-C received, stopping.");
                break;
            }
            changed = connectivity.changed() => {
                if changed.is_err() {
                    break;
                }
                log::info!("Channel: {:?}", *connectivity.borrow_and_update());
            }
            changed = views.changed() => {
                if changed.is_err() {
                    log::warn!("Sync agent ended.");
                    break;
                }
                let view = views.borrow_and_update().clone();
                render(&view);
            }
        }
    }

    agent.shutdown();
    Ok(())
}

fn render(view: &DashboardView) {
    for store in view.inventory.stores() {
        let shoes: Vec<String> = store
            .shoes
            .iter()
            .map(|shoe| format!("{}={}", shoe.model, shoe.inventory))
            .collect();
        log::info!("{}: {}", store.name, shoes.join(", "));
    }
    for alert in &view.alerts {
        log::warn!("[{}] {}", alert.severity, alert.message);
    }
    if view.inventory.is_empty() {
        log::info!("No inventory data.");
    }
}
