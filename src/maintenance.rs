use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::engine::Engine;
use crate::session::SessionStore;

/// Background task that rewrites the WAL once enough appends have
/// accumulated since the last compaction. Spawned by the binary; the
/// engine itself schedules nothing.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match engine.compact_wal().await {
            Ok(()) => info!("compacted WAL after {appends} appends"),
            Err(e) => tracing::warn!("WAL compaction failed: {e}"),
        }
    }
}

/// Background task that drops expired sessions.
pub async fn run_sweeper(sessions: Arc<SessionStore>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let expired = sessions.collect_expired(chrono::Utc::now());
        for token in expired {
            if sessions.invalidate(&token) {
                tracing::debug!("swept expired session");
            }
        }
    }
}
