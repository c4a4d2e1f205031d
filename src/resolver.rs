//! Event resolver: custom overlay → curated → cache → strategies → fallback.
//!
//! Each strategy attempt runs under its own timeout and is validated against
//! the requested year before it can be accepted. Exhaustion falls back to
//! local data, which never fails and is cached like any other result.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use tokio::task::JoinHandle;

use crate::cache::{random_key, year_key, TtlCache};
use crate::config::TimelineConfig;
use crate::error::ResolveError;
use crate::fallback;
use crate::media::MediaResolver;
use crate::model::{EventRecord, MediaRecord, SOURCE_CUSTOM};
use crate::stats::{CallLog, CallOutcome, CallRecord};
use crate::store::CustomEventStore;
use crate::strategy::{validate_candidate, Strategy, StrategyOutcome};
use crate::text;

pub struct EventResolver {
    cfg: TimelineConfig,
    strategies: Vec<Box<dyn Strategy>>,
    cache: TtlCache<EventRecord>,
    media: Option<Arc<MediaResolver>>,
    custom: Arc<CustomEventStore>,
    calls: Arc<CallLog>,
    failure_streak: AtomicU32,
}

struct Attempted {
    record: Option<(EventRecord, &'static str)>,
    last_error: Option<ResolveError>,
}

impl EventResolver {
    pub fn new(
        cfg: TimelineConfig,
        strategies: Vec<Box<dyn Strategy>>,
        custom: Arc<CustomEventStore>,
    ) -> Self {
        let cache = TtlCache::new(
            cfg.event_cache_capacity,
            Duration::from_secs(cfg.cache_ttl_secs),
        );
        let calls = Arc::new(CallLog::with_capacity(cfg.call_log_capacity));
        Self {
            cfg,
            strategies,
            cache,
            media: None,
            custom,
            calls,
            failure_streak: AtomicU32::new(0),
        }
    }

    pub fn with_media(mut self, media: Arc<MediaResolver>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.cfg
    }

    pub fn call_log(&self) -> Arc<CallLog> {
        self.calls.clone()
    }

    pub fn custom_store(&self) -> Arc<CustomEventStore> {
        self.custom.clone()
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn failure_streak(&self) -> u32 {
        self.failure_streak.load(Ordering::Relaxed)
    }

    pub fn reset_failure_streak(&self) {
        self.failure_streak.store(0, Ordering::Relaxed);
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        if let Some(m) = &self.media {
            m.clear_cache();
        }
    }

    pub fn cached_events(&self) -> usize {
        self.cache.len()
    }

    pub fn cached_media(&self) -> usize {
        self.media.as_ref().map_or(0, |m| m.cached_len())
    }

    /// Resolve the record shown for `year`. Only an out-of-range year is an
    /// error; every other failure ends in a fallback record.
    pub async fn resolve_event(&self, year: i32) -> Result<EventRecord, ResolveError> {
        self.check_year(year)?;
        let t0 = Instant::now();

        if let Some(text) = self.custom.get(year) {
            let rec = self.custom_record(year, &text);
            self.log_call(year, CallOutcome::Custom, &rec.source, None, None, t0);
            return Ok(rec);
        }

        if self.cfg.prefer_curated {
            if let Some(rec) = fallback::curated_event(year) {
                self.log_call(year, CallOutcome::Curated, &rec.source, None, None, t0);
                return Ok(rec);
            }
        }

        let key = year_key(year);
        if let Some(rec) = self.cache.get(&key) {
            counter!("resolver_cache_hits_total").increment(1);
            tracing::debug!(target: "resolver", year, source = %rec.source, "cache hit");
            self.log_call(year, CallOutcome::CacheHit, &rec.source, None, None, t0);
            return Ok(rec);
        }

        Ok(self.resolve_upstream(year, &key, t0).await)
    }

    /// Fresh upstream record for `year`, bypassing the overlay, curated data
    /// and the per-year cache. Stored under `random_<year>`.
    pub async fn resolve_random(&self, year: i32) -> Result<EventRecord, ResolveError> {
        self.check_year(year)?;
        let t0 = Instant::now();
        Ok(self.resolve_upstream(year, &random_key(year), t0).await)
    }

    /// Warm the year cache for `years` in background tasks. Years outside
    /// the range, with a custom note, served from curated data or already
    /// cached are skipped. Only accepted upstream records are cached; a
    /// miss leaves the cache and the failure streak untouched.
    pub fn prefetch<I>(self: &Arc<Self>, years: I) -> Vec<JoinHandle<()>>
    where
        I: IntoIterator<Item = i32>,
    {
        years
            .into_iter()
            .filter(|&year| self.wants_prefetch(year))
            .map(|year| {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.prefetch_year(year).await })
            })
            .collect()
    }

    fn wants_prefetch(&self, year: i32) -> bool {
        self.cfg.is_resolvable_year(year)
            && self.custom.get(year).is_none()
            && !(self.cfg.prefer_curated && fallback::curated_text(year).is_some())
            && self.cache.get(&year_key(year)).is_none()
    }

    async fn prefetch_year(&self, year: i32) {
        let max_streak = self.cfg.max_failure_streak;
        if max_streak > 0 && self.failure_streak.load(Ordering::Relaxed) >= max_streak {
            return;
        }
        let attempted = self.run_strategies(year).await;
        let Some((mut rec, strategy)) = attempted.record else {
            tracing::debug!(
                target: "resolver",
                year,
                last_error = ?attempted.last_error.map(|e| e.to_string()),
                "prefetch found nothing"
            );
            return;
        };
        if rec.media.is_none() {
            if let Some(m) = &self.media {
                rec.media = m.resolve(&rec).await;
            }
        }
        counter!("resolver_prefetched_total").increment(1);
        tracing::debug!(target: "resolver", year, strategy, source = %rec.source, "prefetched");
        self.cache.set(year_key(year), rec);
    }

    /// Media for an already resolved record; never errors.
    pub async fn resolve_media(&self, record: &EventRecord) -> Option<MediaRecord> {
        if let Some(m) = record.media.clone() {
            return Some(m.corrected());
        }
        match &self.media {
            Some(m) => m.resolve(record).await,
            None => fallback::curated_media(record.year),
        }
    }

    fn check_year(&self, year: i32) -> Result<(), ResolveError> {
        if self.cfg.is_resolvable_year(year) {
            Ok(())
        } else {
            Err(ResolveError::Validation(format!(
                "year {year} outside {}..={}",
                self.cfg.min_year,
                TimelineConfig::current_year()
            )))
        }
    }

    fn custom_record(&self, year: i32, text: &str) -> EventRecord {
        let mut rec = EventRecord::new(
            year,
            text::truncate_chars(&text::extract_event_name(text), text::MAX_NAME_CHARS),
            text,
            SOURCE_CUSTOM,
        );
        rec.media = fallback::curated_media(year);
        rec
    }

    async fn resolve_upstream(&self, year: i32, key: &str, t0: Instant) -> EventRecord {
        let max_streak = self.cfg.max_failure_streak;
        let streak = self.failure_streak.load(Ordering::Relaxed);

        let attempted = if max_streak > 0 && streak >= max_streak {
            tracing::info!(target: "resolver", year, streak, "failure streak reached; skipping upstream");
            Attempted {
                record: None,
                last_error: Some(ResolveError::Network(format!(
                    "upstream skipped after {streak} consecutive failures"
                ))),
            }
        } else {
            self.run_strategies(year).await
        };

        match attempted.record {
            Some((mut rec, strategy)) => {
                self.failure_streak.store(0, Ordering::Relaxed);
                if rec.media.is_none() {
                    if let Some(m) = &self.media {
                        rec.media = m.resolve(&rec).await;
                    }
                }
                self.cache.set(key, rec.clone());
                tracing::info!(
                    target: "resolver",
                    year,
                    resolved_year = rec.year,
                    strategy,
                    source = %rec.source,
                    has_media = rec.media.is_some(),
                    "event resolved"
                );
                self.log_call(year, CallOutcome::Resolved, &rec.source, Some(strategy), None, t0);
                rec
            }
            None => {
                self.failure_streak.fetch_add(1, Ordering::Relaxed);
                let rec = fallback::fallback_event(year);
                counter!("resolver_fallbacks_total").increment(1);
                let err = attempted.last_error.map(|e| e.to_string());
                tracing::warn!(
                    target: "resolver",
                    year,
                    source = %rec.source,
                    last_error = err.as_deref().unwrap_or("none"),
                    "all strategies exhausted; using fallback"
                );
                self.cache.set(key, rec.clone());
                self.log_call(year, CallOutcome::Fallback, &rec.source, None, err, t0);
                rec
            }
        }
    }

    async fn run_strategies(&self, year: i32) -> Attempted {
        let mut last_error = None;

        for strategy in &self.strategies {
            let outcome = self.run_strategy(strategy.as_ref(), year).await;
            tracing::trace!(target: "resolver", year, strategy = strategy.name(), outcome = outcome.label(), "attempt finished");
            match outcome {
                StrategyOutcome::Accepted(rec) => {
                    return Attempted {
                        record: Some((rec, strategy.name())),
                        last_error,
                    };
                }
                StrategyOutcome::Rejected(reason) => {
                    counter!("resolver_strategy_failures_total", "strategy" => strategy.name(), "reason" => "rejected").increment(1);
                    tracing::debug!(target: "resolver", year, strategy = strategy.name(), reason = %reason, "candidate rejected");
                    last_error = Some(ResolveError::Validation(reason));
                }
                StrategyOutcome::Failed(e) => {
                    counter!("resolver_strategy_failures_total", "strategy" => strategy.name(), "reason" => e.kind()).increment(1);
                    tracing::debug!(target: "resolver", year, strategy = strategy.name(), error = %e, "strategy failed");
                    last_error = Some(e);
                }
            }
        }

        Attempted {
            record: None,
            last_error,
        }
    }

    async fn run_strategy(&self, strategy: &dyn Strategy, year: i32) -> StrategyOutcome {
        let limit = Duration::from_millis(self.cfg.strategy_timeout_ms);
        match tokio::time::timeout(limit, strategy.attempt(year)).await {
            Err(_) => StrategyOutcome::Failed(ResolveError::timeout(strategy.name(), limit)),
            Ok(Err(e)) => StrategyOutcome::Failed(e),
            Ok(Ok(rec)) => match validate_candidate(&rec, year, self.cfg.year_tolerance) {
                Ok(()) => StrategyOutcome::Accepted(rec),
                Err(reason) => StrategyOutcome::Rejected(reason),
            },
        }
    }

    fn log_call(
        &self,
        year: i32,
        outcome: CallOutcome,
        source: &str,
        strategy: Option<&str>,
        error: Option<String>,
        t0: Instant,
    ) {
        self.calls.push(CallRecord {
            ts_ms: crate::model::now_ms(),
            year,
            outcome,
            source: source.to_string(),
            strategy: strategy.map(str::to_string),
            error,
            duration_ms: t0.elapsed().as_millis() as u64,
        });
    }
}
