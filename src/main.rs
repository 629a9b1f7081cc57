use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use coworkd::engine::Engine;
use coworkd::maintenance;
use coworkd::notify::NotifyHub;
use coworkd::session::SessionStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("COWORKD_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    coworkd::observability::init(metrics_port);

    let data_dir = std::env::var("COWORKD_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let compact_threshold: u64 = std::env::var("COWORKD_COMPACT_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);
    let session_ttl_mins: i64 = std::env::var("COWORKD_SESSION_TTL_MINS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;
    let wal_path = PathBuf::from(&data_dir).join("bookings.wal");

    let notify = Arc::new(NotifyHub::new());
    let engine = Arc::new(Engine::new(wal_path, notify)?);
    let sessions = Arc::new(SessionStore::new(chrono::Duration::minutes(session_ttl_mins)));

    tokio::spawn(maintenance::run_compactor(engine.clone(), compact_threshold));
    tokio::spawn(maintenance::run_sweeper(sessions.clone()));

    info!("coworkd engine up");
    info!("  data_dir: {data_dir}");
    info!("  compact_threshold: {compact_threshold}");
    info!("  session_ttl: {session_ttl_mins}m");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    // Graceful shutdown on SIGTERM/ctrl-c
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("shutdown signal received");
    // One final compaction so the next boot replays a minimal log.
    if let Err(e) = engine.compact_wal().await {
        tracing::warn!("final WAL compaction failed: {e}");
    }
    info!("coworkd stopped");
    Ok(())
}
