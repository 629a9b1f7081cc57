use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: audited service operations. Labels: action, status.
pub const OPERATIONS_TOTAL: &str = "coworkd_operations_total";

/// Histogram: operation latency in seconds. Labels: action.
pub const OPERATION_DURATION_SECONDS: &str = "coworkd_operation_duration_seconds";

/// Counter: failed token validations.
pub const AUTH_FAILURES_TOTAL: &str = "coworkd_auth_failures_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: spaces currently materialized.
pub const SPACES_ACTIVE: &str = "coworkd_spaces_active";

/// Gauge: live sessions in the token store.
pub const SESSIONS_ACTIVE: &str = "coworkd_sessions_active";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "coworkd_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "coworkd_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
