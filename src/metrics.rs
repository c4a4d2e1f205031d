use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "resolver_cache_hits_total",
            "Event requests answered from the resolver cache."
        );
        describe_counter!(
            "resolver_strategy_failures_total",
            "Strategy attempts that failed or were rejected, by strategy and reason."
        );
        describe_counter!(
            "resolver_fallbacks_total",
            "Resolutions that ended in a curated or generated fallback."
        );
        describe_counter!("media_resolved_total", "Media lookups by winning stage.");
        describe_counter!("wiki_request_errors_total", "Failed upstream requests by endpoint.");
        describe_histogram!("wiki_request_ms", "Upstream request time in milliseconds.");
        describe_gauge!("resolver_cache_ttl_secs", "Configured cache TTL in seconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Fails if another recorder is installed.
    pub fn init(cache_ttl_secs: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        ensure_metrics_described();
        gauge!("resolver_cache_ttl_secs").set(cache_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
