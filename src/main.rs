//! History timeline service — binary entrypoint.
//! Boots the Axum HTTP server, wiring the resolution pipeline, the custom
//! event store and the Prometheus endpoint.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use history_timeline::metrics::Metrics;
use history_timeline::store::CustomEventStore;
use history_timeline::strategy::Picker;
use history_timeline::{create_router, AppState, HttpWikiClient, TimelineConfig};

const DEFAULT_LOG_FILTER: &str =
    "warn,history_timeline=info,resolver=info,strategy=info,media=info,wiki=info,store=info";

/// Compact logs by default; `TIMELINE_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("TIMELINE_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = TimelineConfig::load_default().context("loading timeline config")?;
    tracing::info!(
        start_year = cfg.start_year,
        tolerance = cfg.year_tolerance,
        timeout_ms = cfg.strategy_timeout_ms,
        bind = %cfg.bind,
        "configuration loaded"
    );

    let metrics = Metrics::init(cfg.cache_ttl_secs)?;
    let wiki = Arc::new(HttpWikiClient::new(&cfg)?);
    let custom = Arc::new(CustomEventStore::open(&cfg.custom_events_path));

    let bind = cfg.bind.clone();
    let state = AppState::build(cfg, wiki, Arc::new(Picker::from_entropy()), custom);
    let app = create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    tracing::info!(addr = %bind, "listening");
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
