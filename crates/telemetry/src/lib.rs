//! atrium-telemetry - 可观测性库

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化 tracing
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// 初始化 JSON 格式的 tracing（生产环境）
pub fn init_tracing_json(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// 初始化 Prometheus metrics
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!(
        "rbac_session_cache_hits_total",
        "Session lookups answered from the cache"
    );
    metrics::describe_counter!(
        "rbac_session_cache_misses_total",
        "Session lookups resolved from durable storage"
    );
    metrics::describe_counter!(
        "rbac_session_cache_write_failures_total",
        "Session cache writes that failed and were ignored"
    );
    metrics::describe_counter!(
        "rbac_authorization_sync_touch_total",
        "Policy sync markers written, by domain"
    );
    metrics::describe_counter!(
        "rbac_authorization_sync_failures_total",
        "Policy sync marker writes that failed, by domain"
    );
    metrics::describe_counter!(
        "rbac_menu_cascade_rows_total",
        "Descendant rows touched by menu subtree cascades, by kind"
    );
}
