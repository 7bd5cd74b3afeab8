use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use dredge_tracker::api::{router, spawn_status_monitor, spawn_trail_flusher};
use dredge_tracker::utils::telemetry;
use dredge_tracker::{FileStorage, Tracker, TrackerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => TrackerConfig::from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => TrackerConfig::default(),
    };
    telemetry::init(config.log_level);

    let storage = FileStorage::new(&config.data_dir)
        .with_context(|| format!("opening data directory {}", config.data_dir))?;
    info!(data_dir = %storage.root().display(), "using data directory");
    let tracker = Arc::new(Tracker::open(config.clone(), Arc::new(storage)).context("restoring tracker state")?);

    let flusher = spawn_trail_flusher(tracker.clone());
    let monitor = spawn_status_monitor(tracker.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "dredge tracker listening");

    axum::serve(listener, router(tracker.clone()))
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await
        .context("server failed")?;

    flusher.abort();
    monitor.abort();

    // Pending trail points would otherwise wait for the next tick
    let final_flush = tracker.clone();
    match tokio::task::spawn_blocking(move || final_flush.flush_trails()).await {
        Ok(Ok(written)) => info!(written, "trails flushed on shutdown"),
        Ok(Err(e)) => error!(error = %e, "final trail flush failed"),
        Err(e) => error!(error = %e, "final trail flush task failed"),
    }
    Ok(())
}
