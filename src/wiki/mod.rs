// src/wiki/mod.rs
//! Typed access to the Wikipedia REST/action APIs and Wikimedia Commons.
//!
//! Strategies and the media resolver only see the [`WikiApi`] trait, so tests
//! can swap in a mock upstream.

pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::de::DeserializeOwned;

use crate::config::TimelineConfig;
use crate::error::ResolveError;
use crate::rate_limit::RateLimiter;

pub use types::{
    FeedItem, FeedPage, ImageRef, MediaItem, OnThisDayFeed, PageSummary, SearchHit, SrcSet,
};

use types::{MediaList, QueryEnvelope};

pub const COMMONS_FILE_PATH: &str = "https://commons.wikimedia.org/wiki/Special:FilePath/";

#[async_trait]
pub trait WikiApi: Send + Sync {
    async fn on_this_day(&self, month: u32, day: u32) -> Result<OnThisDayFeed, ResolveError>;

    /// Full-text search over articles (namespace 0).
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>, ResolveError>;

    /// Article titles in `Category:<category>`.
    async fn category_members(&self, category: &str, limit: u32)
        -> Result<Vec<String>, ResolveError>;

    async fn page_summary(&self, title: &str) -> Result<PageSummary, ResolveError>;

    async fn page_media(&self, title: &str) -> Result<Vec<MediaItem>, ResolveError>;

    /// File titles (`File:...`) on Commons matching `term`.
    async fn commons_search(&self, term: &str, limit: u32) -> Result<Vec<String>, ResolveError>;

    /// File titles in a Commons category.
    async fn commons_category_files(
        &self,
        category: &str,
        limit: u32,
    ) -> Result<Vec<String>, ResolveError>;

    /// HEAD request; returns the content type of a 2xx response.
    async fn probe(&self, url: &str) -> Result<String, ResolveError>;
}

/// Display URL for a Commons file title, scaled server-side.
pub fn commons_file_url(file_title: &str) -> String {
    let name = file_title.strip_prefix("File:").unwrap_or(file_title);
    format!(
        "{COMMONS_FILE_PATH}{}?width=600",
        urlencoding::encode(name)
    )
}

/// Title as it appears in REST paths.
pub fn encode_title(title: &str) -> String {
    urlencoding::encode(&title.trim().replace(' ', "_")).into_owned()
}

pub struct HttpWikiClient {
    http: reqwest::Client,
    rest_base: String,
    action_api: String,
    commons_api: String,
    limiter: Arc<RateLimiter>,
}

impl HttpWikiClient {
    pub fn new(cfg: &TimelineConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_millis(cfg.strategy_timeout_ms))
            .build()
            .context("building wiki http client")?;
        Ok(Self {
            http,
            rest_base: cfg.rest_base_url.trim_end_matches('/').to_string(),
            action_api: cfg.action_api_url.clone(),
            commons_api: cfg.commons_api_url.clone(),
            limiter: Arc::new(RateLimiter::from_millis(cfg.rate_limit_ms)),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ResolveError> {
        self.limiter.await_slot().await;
        let t0 = Instant::now();

        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .inspect_err(|_| {
                counter!("wiki_request_errors_total", "endpoint" => endpoint).increment(1)
            })?;

        let status = resp.status();
        if !status.is_success() {
            counter!("wiki_request_errors_total", "endpoint" => endpoint).increment(1);
            tracing::debug!(target: "wiki", endpoint, status = status.as_u16(), url, "non-2xx");
            return Err(ResolveError::UpstreamStatus {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }

        let body = resp.text().await?;
        let parsed = serde_json::from_str::<T>(&body)?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("wiki_request_ms", "endpoint" => endpoint).record(ms);
        tracing::debug!(target: "wiki", endpoint, ms, "fetched");
        Ok(parsed)
    }

    async fn query_list(
        &self,
        endpoint: &'static str,
        api: &str,
        params: Vec<(&str, String)>,
    ) -> Result<types::QueryBody, ResolveError> {
        let mut query = vec![
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("utf8", "1".to_string()),
        ];
        query.extend(params);
        let env: QueryEnvelope = self.get_json(endpoint, api, &query).await?;
        Ok(env.query.unwrap_or_default())
    }
}

#[async_trait]
impl WikiApi for HttpWikiClient {
    async fn on_this_day(&self, month: u32, day: u32) -> Result<OnThisDayFeed, ResolveError> {
        let url = format!("{}/feed/onthisday/all/{month:02}/{day:02}", self.rest_base);
        self.get_json("onthisday", &url, &[]).await
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>, ResolveError> {
        let body = self
            .query_list(
                "search",
                &self.action_api,
                vec![
                    ("list", "search".to_string()),
                    ("srsearch", query.to_string()),
                    ("srnamespace", "0".to_string()),
                    ("srlimit", limit.to_string()),
                ],
            )
            .await?;
        Ok(body.search)
    }

    async fn category_members(
        &self,
        category: &str,
        limit: u32,
    ) -> Result<Vec<String>, ResolveError> {
        let body = self
            .query_list(
                "categorymembers",
                &self.action_api,
                vec![
                    ("list", "categorymembers".to_string()),
                    ("cmtitle", format!("Category:{category}")),
                    ("cmnamespace", "0".to_string()),
                    ("cmlimit", limit.to_string()),
                ],
            )
            .await?;
        Ok(body
            .categorymembers
            .into_iter()
            .filter(|m| m.ns == 0)
            .map(|m| m.title)
            .collect())
    }

    async fn page_summary(&self, title: &str) -> Result<PageSummary, ResolveError> {
        let url = format!("{}/page/summary/{}", self.rest_base, encode_title(title));
        self.get_json("summary", &url, &[]).await
    }

    async fn page_media(&self, title: &str) -> Result<Vec<MediaItem>, ResolveError> {
        let url = format!("{}/page/media/{}", self.rest_base, encode_title(title));
        let list: MediaList = self.get_json("media", &url, &[]).await?;
        Ok(list.items)
    }

    async fn commons_search(&self, term: &str, limit: u32) -> Result<Vec<String>, ResolveError> {
        let body = self
            .query_list(
                "commons_search",
                &self.commons_api,
                vec![
                    ("list", "search".to_string()),
                    ("srsearch", term.to_string()),
                    ("srnamespace", "6".to_string()),
                    ("srlimit", limit.to_string()),
                ],
            )
            .await?;
        Ok(body.search.into_iter().map(|h| h.title).collect())
    }

    async fn commons_category_files(
        &self,
        category: &str,
        limit: u32,
    ) -> Result<Vec<String>, ResolveError> {
        let body = self
            .query_list(
                "commons_category",
                &self.commons_api,
                vec![
                    ("list", "categorymembers".to_string()),
                    ("cmtitle", format!("Category:{category}")),
                    ("cmnamespace", "6".to_string()),
                    ("cmlimit", limit.to_string()),
                ],
            )
            .await?;
        Ok(body.categorymembers.into_iter().map(|m| m.title).collect())
    }

    async fn probe(&self, url: &str) -> Result<String, ResolveError> {
        self.limiter.await_slot().await;
        let resp = self
            .http
            .head(url)
            .timeout(Duration::from_secs(3))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ResolveError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string())
    }
}
