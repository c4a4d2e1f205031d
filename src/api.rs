use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::config::TimelineConfig;
use crate::error::ResolveError;
use crate::media::MediaResolver;
use crate::model::{EventRecord, MediaRecord};
use crate::resolver::EventResolver;
use crate::stats::{CallRecord, PerformanceSummary};
use crate::store::CustomEventStore;
use crate::strategy::{default_strategies, Picker};
use crate::timeline::{entry_for, SearchMatch, Timeline, TimelinePage, YearEntry};
use crate::wiki::WikiApi;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<EventResolver>,
    pub timeline: Arc<Timeline>,
}

impl AppState {
    /// Wire the pipeline against an upstream client.
    pub fn build(
        cfg: TimelineConfig,
        wiki: Arc<dyn WikiApi>,
        picker: Arc<Picker>,
        custom: Arc<CustomEventStore>,
    ) -> Self {
        let strategies = default_strategies(wiki.clone(), picker, &cfg);
        let media = Arc::new(MediaResolver::new(wiki, &cfg));
        let timeline = Arc::new(Timeline::from_config(&cfg));
        let resolver = EventResolver::new(cfg, strategies, custom).with_media(media);
        Self {
            resolver: Arc::new(resolver),
            timeline,
        }
    }

    pub fn custom(&self) -> Arc<CustomEventStore> {
        self.resolver.custom_store()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/events/{year}", get(get_event))
        .route("/events/{year}/media", get(get_event_media))
        .route("/custom", get(list_custom))
        .route("/custom/{year}", put(put_custom).delete(delete_custom))
        .route("/export", get(export_events))
        .route("/import", post(import_events))
        .route("/timeline", get(timeline_page))
        .route("/timeline/search", get(timeline_search))
        .route("/debug/calls", get(debug_calls))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorBody { error: msg })).into_response()
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Validation(m) => ApiError::BadRequest(m),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(format!("{e:#}"))
    }
}

#[derive(Deserialize)]
struct EventQuery {
    #[serde(default)]
    fresh: bool,
}

async fn get_event(
    State(state): State<AppState>,
    Path(year): Path<i32>,
    Query(q): Query<EventQuery>,
) -> Result<Json<EventRecord>, ApiError> {
    let rec = if q.fresh {
        state.resolver.resolve_random(year).await?
    } else {
        state.resolver.resolve_event(year).await?
    };
    // Background warm-up of the neighbouring years.
    state.resolver.prefetch([year - 1, year + 1]);
    Ok(Json(rec))
}

async fn get_event_media(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> Result<Json<Option<MediaRecord>>, ApiError> {
    let rec = state.resolver.resolve_event(year).await?;
    Ok(Json(state.resolver.resolve_media(&rec).await))
}

async fn list_custom(State(state): State<AppState>) -> Json<BTreeMap<i32, String>> {
    Json(state.custom().all())
}

#[derive(Deserialize)]
struct CustomBody {
    text: String,
}

/// Custom notes are limited to the years the timeline shows, so every saved
/// or imported note is also exported.
fn check_custom_year(state: &AppState, year: i32) -> Result<(), ApiError> {
    if state.timeline.contains(year) {
        Ok(())
    } else {
        let r = state.timeline.range();
        Err(ApiError::BadRequest(format!(
            "year {year} outside timeline {}..={}",
            r.start(),
            r.end()
        )))
    }
}

/// Run a store edit on the blocking pool; saves fsync.
async fn with_store<T, F>(state: &AppState, edit: F) -> Result<T, ApiError>
where
    F: FnOnce(&CustomEventStore) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = state.custom();
    tokio::task::spawn_blocking(move || edit(store.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("custom events task failed: {e}")))?
        .map_err(ApiError::from)
}

async fn put_custom(
    State(state): State<AppState>,
    Path(year): Path<i32>,
    Json(body): Json<CustomBody>,
) -> Result<Json<YearEntry>, ApiError> {
    check_custom_year(&state, year)?;
    with_store(&state, move |store| store.set(year, &body.text)).await?;
    Ok(Json(entry_for(year, &state.custom())))
}

#[derive(Serialize)]
struct DeletedOut {
    year: i32,
    deleted: bool,
}

async fn delete_custom(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> Result<Json<DeletedOut>, ApiError> {
    check_custom_year(&state, year)?;
    let deleted = with_store(&state, move |store| store.clear(year)).await?;
    Ok(Json(DeletedOut { year, deleted }))
}

async fn export_events(State(state): State<AppState>) -> Result<Response, ApiError> {
    let doc = state.timeline.export(&state.custom());
    let body = serde_json::to_string_pretty(&doc).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

#[derive(Serialize)]
struct ImportOut {
    merged: usize,
}

/// Keys outside the timeline are skipped like non-year keys.
async fn import_events(
    State(state): State<AppState>,
    Json(doc): Json<BTreeMap<String, String>>,
) -> Result<Json<ImportOut>, ApiError> {
    let years = state.timeline.range();
    let merged = with_store(&state, move |store| store.import(&doc, &years)).await?;
    Ok(Json(ImportOut { merged }))
}

#[derive(Deserialize)]
struct PageQuery {
    #[serde(default)]
    page: usize,
}

async fn timeline_page(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Json<TimelinePage> {
    Json(state.timeline.page(q.page, &state.custom()))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn timeline_search(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Json<Option<SearchMatch>> {
    Json(state.timeline.search(&q.q, &state.custom()))
}

#[derive(Serialize)]
struct CallsOut {
    summary: PerformanceSummary,
    strategies: Vec<&'static str>,
    failure_streak: u32,
    cached_events: usize,
    cached_media: usize,
    calls: Vec<CallRecord>,
}

async fn debug_calls(State(state): State<AppState>) -> Json<CallsOut> {
    let log = state.resolver.call_log();
    Json(CallsOut {
        summary: log.summary(),
        strategies: state.resolver.strategy_names(),
        failure_streak: state.resolver.failure_streak(),
        cached_events: state.resolver.cached_events(),
        cached_media: state.resolver.cached_media(),
        calls: log.snapshot_last_n(20),
    })
}
