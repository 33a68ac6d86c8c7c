use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::signal;

use servers::inventory_logic::config::{self, ServerConfig};
use servers::inventory_logic::{logger, routes, state};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config: ServerConfig = config::load_config()?;
    logger::setup_logging(&config.log_dir(), config.log_level(), "server_inventory")?;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let app_state = state::AppState::new(&config);

    if config.autostart() {
        log::info!("Starting upstream ingestion from {}", app_state.ingestion.config().ws_url);
        app_state.ingestion.start();
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let server_handle = tokio::spawn(routes::serve(listener, app_state.clone(), shutdown_tx.subscribe()));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = terminate() => {
            log::info!("SIGTERM received, initiating shutdown.");
        }
    }

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());
    app_state.ingestion.stop();

    // Wait for the server to drain
    match server_handle.await {
        Ok(Err(e)) => log::error!("{:#}", e),
        Err(e) => log::error!("Server task failed: {}", e),
        Ok(Ok(())) => {}
    }

    log::info!("Shutdown complete.");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut term_signal) => {
            term_signal.recv().await;
        }
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    // On non-unix platforms, just wait forever.
    std::future::pending::<()>().await;
}
