// main.rs

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn, Level};

use epaper_server::{
    app,
    epaper::{
        background_workers::{spawn_interval_trigger, spawn_reload_worker},
        catalog::{Catalog, DirectorySource},
        config::ServerConfig,
    },
    AppState,
};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

// --- Main Entry Point ---
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting e-paper image server...");
    let config = ServerConfig::from_env();

    // Catalog: no serving with an unknown catalog
    let source = Arc::new(DirectorySource::new(config.epaper_dir.clone()));
    let catalog = Arc::new(Catalog::load(source).await.with_context(|| {
        format!(
            "Failed to load e-paper catalog from {}",
            config.epaper_dir.display()
        )
    })?);

    info!(source = %catalog.describe(), entries = catalog.current().len(), "catalog ready");

    // Reload triggers
    let (reload_worker, _reload_handle) = spawn_reload_worker(catalog.clone());
    if let Some(period) = config.reload_interval {
        info!(?period, "periodic catalog reload enabled");
        spawn_interval_trigger(reload_worker.clone(), period);
    }
    #[cfg(unix)]
    if config.reload_on_sighup {
        epaper_server::epaper::background_workers::spawn_sighup_trigger(reload_worker.clone())
            .context("Failed to install SIGHUP handler")?;
    }

    let state = AppState { catalog };

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Axum server failed")?;
    Ok(())
}
