// src/config/timeline.rs
use anyhow::{Context, Result};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const DEFAULT_CONFIG_PATH: &str = "config/timeline.toml";
pub const ENV_CONFIG_PATH: &str = "TIMELINE_CONFIG_PATH";

pub const ENV_YEAR_TOLERANCE: &str = "TIMELINE_YEAR_TOLERANCE";
pub const ENV_STRATEGY_TIMEOUT_MS: &str = "TIMELINE_STRATEGY_TIMEOUT_MS";
pub const ENV_RATE_LIMIT_MS: &str = "TIMELINE_RATE_LIMIT_MS";
pub const ENV_BIND: &str = "TIMELINE_BIND";
pub const ENV_CUSTOM_EVENTS_PATH: &str = "TIMELINE_CUSTOM_EVENTS_PATH";

fn default_start_year() -> i32 {
    1900
}
fn default_min_year() -> i32 {
    1000
}
fn default_years_per_page() -> usize {
    10
}
fn default_year_tolerance() -> i32 {
    2
}
fn default_widening_steps() -> Vec<i32> {
    vec![0, 2, 5]
}
fn default_strategy_timeout_ms() -> u64 {
    2000
}
fn default_rate_limit_ms() -> u64 {
    100
}
fn default_media_rate_limit_ms() -> u64 {
    500
}
fn default_event_cache_capacity() -> usize {
    100
}
fn default_media_cache_capacity() -> usize {
    200
}
fn default_feed_cache_capacity() -> usize {
    50
}
fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_max_failure_streak() -> u32 {
    5
}
fn default_prefer_curated() -> bool {
    true
}
fn default_call_log_capacity() -> usize {
    100
}
fn default_rest_base_url() -> String {
    "https://en.wikipedia.org/api/rest_v1".to_string()
}
fn default_action_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}
fn default_commons_api_url() -> String {
    "https://commons.wikimedia.org/w/api.php".to_string()
}
fn default_user_agent() -> String {
    "history-timeline/0.1 (educational; +https://en.wikipedia.org)".to_string()
}
fn default_custom_events_path() -> PathBuf {
    PathBuf::from("data/custom_events.json")
}
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Runtime configuration, loaded from TOML with env overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// First year shown on the timeline (curated data starts here).
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    /// Earliest year the resolver accepts; may precede `start_year`.
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    #[serde(default = "default_years_per_page")]
    pub years_per_page: usize,

    /// Max |candidate year - requested year| for acceptance.
    #[serde(default = "default_year_tolerance")]
    pub year_tolerance: i32,
    /// On-this-day filter steps; steps above `year_tolerance` are ignored.
    #[serde(default = "default_widening_steps")]
    pub widening_steps: Vec<i32>,
    #[serde(default = "default_strategy_timeout_ms")]
    pub strategy_timeout_ms: u64,
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    #[serde(default = "default_media_rate_limit_ms")]
    pub media_rate_limit_ms: u64,

    #[serde(default = "default_event_cache_capacity")]
    pub event_cache_capacity: usize,
    #[serde(default = "default_media_cache_capacity")]
    pub media_cache_capacity: usize,
    #[serde(default = "default_feed_cache_capacity")]
    pub feed_cache_capacity: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Consecutive exhausted resolutions before upstream is skipped.
    #[serde(default = "default_max_failure_streak")]
    pub max_failure_streak: u32,
    /// Serve curated events ahead of upstream strategies.
    #[serde(default = "default_prefer_curated")]
    pub prefer_curated: bool,
    #[serde(default = "default_call_log_capacity")]
    pub call_log_capacity: usize,

    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,
    #[serde(default = "default_action_api_url")]
    pub action_api_url: String,
    #[serde(default = "default_commons_api_url")]
    pub commons_api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_custom_events_path")]
    pub custom_events_path: PathBuf,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            min_year: default_min_year(),
            years_per_page: default_years_per_page(),
            year_tolerance: default_year_tolerance(),
            widening_steps: default_widening_steps(),
            strategy_timeout_ms: default_strategy_timeout_ms(),
            rate_limit_ms: default_rate_limit_ms(),
            media_rate_limit_ms: default_media_rate_limit_ms(),
            event_cache_capacity: default_event_cache_capacity(),
            media_cache_capacity: default_media_cache_capacity(),
            feed_cache_capacity: default_feed_cache_capacity(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_failure_streak: default_max_failure_streak(),
            prefer_curated: default_prefer_curated(),
            call_log_capacity: default_call_log_capacity(),
            rest_base_url: default_rest_base_url(),
            action_api_url: default_action_api_url(),
            commons_api_url: default_commons_api_url(),
            user_agent: default_user_agent(),
            custom_events_path: default_custom_events_path(),
            bind: default_bind(),
        }
    }
}

impl TimelineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading timeline config from {}", path.display()))?;
        let cfg: TimelineConfig = toml::from_str(&data)
            .with_context(|| format!("parsing timeline config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Resolution order:
    /// 1) $TIMELINE_CONFIG_PATH (must exist)
    /// 2) config/timeline.toml
    /// 3) built-in defaults
    ///
    /// Env overrides are applied last.
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!("{ENV_CONFIG_PATH} points to non-existent path");
            }
            Self::load_from_file(&pb)?
        } else {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                Self::load_from_file(&default_path)?
            } else {
                Self::default()
            }
        };
        Ok(base.with_env_overrides().sanitized())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = parse_env::<i32>(ENV_YEAR_TOLERANCE) {
            self.year_tolerance = v;
        }
        if let Some(v) = parse_env::<u64>(ENV_STRATEGY_TIMEOUT_MS) {
            self.strategy_timeout_ms = v;
        }
        if let Some(v) = parse_env::<u64>(ENV_RATE_LIMIT_MS) {
            self.rate_limit_ms = v;
        }
        if let Ok(v) = env::var(ENV_BIND) {
            if !v.trim().is_empty() {
                self.bind = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var(ENV_CUSTOM_EVENTS_PATH) {
            if !v.trim().is_empty() {
                self.custom_events_path = PathBuf::from(v.trim());
            }
        }
        self
    }

    /// Clamp values into workable ranges instead of failing startup.
    pub fn sanitized(mut self) -> Self {
        self.year_tolerance = self.year_tolerance.clamp(0, 10);
        self.strategy_timeout_ms = self.strategy_timeout_ms.clamp(250, 10_000);
        self.rate_limit_ms = self.rate_limit_ms.min(5_000);
        self.media_rate_limit_ms = self.media_rate_limit_ms.min(5_000);
        self.years_per_page = self.years_per_page.max(1);
        self.event_cache_capacity = self.event_cache_capacity.max(1);
        self.media_cache_capacity = self.media_cache_capacity.max(1);
        self.feed_cache_capacity = self.feed_cache_capacity.max(1);
        self.call_log_capacity = self.call_log_capacity.max(1);
        if self.min_year > self.start_year {
            self.min_year = self.start_year;
        }
        self.widening_steps.retain(|s| *s >= 0);
        self.widening_steps.sort_unstable();
        self.widening_steps.dedup();
        if self.widening_steps.is_empty() {
            self.widening_steps = vec![0];
        }
        self
    }

    /// Widening steps capped by the validation tolerance, so the feed
    /// strategy never proposes a year the validator would reject.
    pub fn effective_widening_steps(&self) -> Vec<i32> {
        let mut steps: Vec<i32> = self
            .widening_steps
            .iter()
            .copied()
            .filter(|s| *s <= self.year_tolerance)
            .collect();
        if !steps.contains(&self.year_tolerance) {
            steps.push(self.year_tolerance);
        }
        steps
    }

    pub fn current_year() -> i32 {
        chrono::Utc::now().year()
    }

    pub fn is_resolvable_year(&self, year: i32) -> bool {
        (self.min_year..=Self::current_year()).contains(&year)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}
